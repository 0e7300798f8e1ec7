use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub worker: WorkerConfig,
    pub upload: UploadConfig,
    pub output: OutputConfig,
    pub pipeline: PipelineConfig,
    pub mail: MailConfig,
    #[serde(default)]
    pub users: HashMap<String, UserEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: String,
    // Name of the env var that may carry the store credentials as JSON
    pub credentials_env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    pub worker_count: usize,
    pub max_concurrent_tasks: usize,
    pub processing_delay_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub max_file_size: usize,  // 10MB in bytes
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    pub search_command: Vec<String>,
    pub aggregate_command: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UserEntry {
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct StoreCredentials {
    url: String,
}

impl WorkerConfig {
    pub fn processing_delay(&self) -> Duration {
        Duration::from_secs(self.processing_delay_secs)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let mut config: Config = config.try_deserialize()?;
        config.apply_store_credentials(std::env::var(&config.store.credentials_env).ok())?;
        Ok(config)
    }

    fn apply_store_credentials(&mut self, raw: Option<String>) -> Result<(), config::ConfigError> {
        let Some(raw) = raw else {
            tracing::debug!("{} not set, using configured store url", self.store.credentials_env);
            return Ok(());
        };

        let credentials: StoreCredentials = serde_json::from_str(&raw).map_err(|e| {
            config::ConfigError::Message(format!(
                "Invalid JSON in {}: {}",
                self.store.credentials_env, e
            ))
        })?;

        tracing::info!("Store url taken from {}", self.store.credentials_env);
        self.store.url = credentials.url;
        Ok(())
    }
}
