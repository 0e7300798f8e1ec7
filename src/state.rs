use std::sync::Arc;
use crate::{
    config::Config,
    services::{CredentialStore, ProgressStore},
    worker::{Orchestrator, TaskQueue},
};

// Application state shared between handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProgressStore>,
    pub credentials: Arc<CredentialStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub queue: TaskQueue,
    pub config: Arc<Config>,
}
