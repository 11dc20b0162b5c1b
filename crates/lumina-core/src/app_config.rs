use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    /// Base URL of the hosted chat-completion gateway, without a trailing
    /// path (e.g. `https://openrouter.ai/api/v1`).
    pub model_base_url: String,
    pub model_api_key: String,
    pub model_name: String,
    /// Per-call completion token ceiling.
    pub model_max_tokens: u32,
    pub model_temperature: f64,
    /// Hard deadline per model call; a timed-out call is a segment failure.
    pub model_call_timeout_secs: u64,
    /// Byte ceiling for repair parsing of model output.
    pub repair_max_bytes: usize,
    /// Concurrent segment fetcher budget for the fan-out phase.
    pub ingest_workers: usize,
    /// Directory for raw-output debug artifacts.
    pub artifact_dir: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("model_base_url", &self.model_base_url)
            .field("model_api_key", &"[redacted]")
            .field("model_name", &self.model_name)
            .field("model_max_tokens", &self.model_max_tokens)
            .field("model_temperature", &self.model_temperature)
            .field("model_call_timeout_secs", &self.model_call_timeout_secs)
            .field("repair_max_bytes", &self.repair_max_bytes)
            .field("ingest_workers", &self.ingest_workers)
            .field("artifact_dir", &self.artifact_dir)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
