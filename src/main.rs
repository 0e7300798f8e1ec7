mod models;
mod handlers;
mod services;
mod middleware;
mod worker;
mod keywords;
mod config;
mod errors;
mod state;

use axum::{
    routing::{get, post},
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
};
use tower_http::{
    services::ServeDir,
    limit::RequestBodyLimitLayer,
};
use tower_sessions::{MemoryStore, SessionManagerLayer};
use tower_sessions::cookie::SameSite;
use std::{path::PathBuf, sync::Arc};
use anyhow::Context;
use crate::{
    config::{Config, MailConfig, StoreBackend, StoreConfig},
    services::{
        CommandPipeline, CredentialStore, LogNotifier, MemoryProgressStore, Notifier,
        ProgressStore, RedisProgressStore, SmtpNotifier,
    },
    state::AppState,
    worker::{Orchestrator, TaskQueue},
};
use tracing_subscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize basic tracing subscriber
    tracing_subscriber::fmt::init();

    let config = Config::load().context("Failed to load configuration")?;
    let address = format!("{}:{}", config.server.host, config.server.port);

    let state = build_state(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("Server running on {}", address);

    axum::serve(listener, app.into_make_service())
        .await
        .context("Server stopped unexpectedly")?;
    Ok(())
}

fn build_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn ProgressStore>> {
    match config.backend {
        StoreBackend::Redis => {
            let client = redis::Client::open(config.url.as_str())
                .context("Failed to create Redis client")?;
            Ok(Arc::new(RedisProgressStore::new(Arc::new(client))))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory progress store; task state is lost on restart");
            Ok(Arc::new(MemoryProgressStore::new()))
        }
    }
}

fn build_notifier(config: &MailConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    if !config.enabled {
        tracing::warn!("Mail delivery disabled; notifications are only logged");
        return Ok(Arc::new(LogNotifier));
    }
    Ok(Arc::new(SmtpNotifier::from_config(config)?))
}

// Wires the store, collaborators and worker pool together. Needs a running runtime.
fn build_state(config: Config) -> anyhow::Result<AppState> {
    let store = build_store(&config.store)?;
    let notifier = build_notifier(&config.mail)?;

    let credentials = CredentialStore::from_config(&config.users);
    tracing::info!("Loaded {} user accounts", credentials.user_count());

    let output_dir = PathBuf::from(&config.output.dir);
    let pipeline = Arc::new(CommandPipeline::new(
        config.pipeline.search_command.clone(),
        config.pipeline.aggregate_command.clone(),
        output_dir.clone(),
    ));

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        pipeline,
        notifier,
        output_dir,
        config.worker.processing_delay(),
    ));

    let queue = TaskQueue::start(
        orchestrator.clone(),
        config.worker.worker_count,
        config.worker.max_concurrent_tasks,
    );

    Ok(AppState {
        store,
        credentials: Arc::new(credentials),
        orchestrator,
        queue,
        config: Arc::new(config),
    })
}

fn build_router(state: AppState) -> Router {
    // Session store setup
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_name("session");

    let max_file_size = state.config.upload.max_file_size;

    Router::new()
        // Auth routes
        .route("/", get(handlers::serve_login_page))
        .route("/login", post(handlers::handle_login))
        .route("/logout", get(handlers::handle_logout))

        // Search routes
        .route("/search", get(handlers::serve_search_page).post(handlers::submit_search))

        // Task routes
        .route("/tasks", get(handlers::serve_task_list))
        .route("/status/:task_id", get(handlers::get_task_status))
        .route("/download/:task_id", get(handlers::download_results))

        // Static files
        .nest_service("/static", ServeDir::new("static"))

        .layer(from_fn(middleware::require_auth))
        .layer(session_layer)

        // File upload limits from config
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_file_size))

        .with_state(state)
}
