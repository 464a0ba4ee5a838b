// Service configuration, layered with the 'config' crate and '.env' via dotenv

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server_address: String,
    // Root of the rental backend, e.g. https://api.example.com (no trailing slash needed)
    pub backend_base_url: String,
    pub proxy_url: Option<String>,
    pub backend_timeout_secs: u64,
    // 1 means a single attempt, no retry
    pub backend_max_attempts: u32,
    pub backend_retry_delay_ms: u64,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Config::builder()
            // Add default values
            .set_default("server_address", "127.0.0.1:3000")?
            .set_default("backend_base_url", "http://127.0.0.1:8000")?
            .set_default("backend_timeout_secs", 15_i64)?
            .set_default("backend_max_attempts", 1_i64)?
            .set_default("backend_retry_delay_ms", 500_i64)?
            // Load from a configuration file (e.g., config.toml)
            .add_source(File::with_name("config").required(false))
            // Load from environment variables (e.g., APP_BACKEND_BASE_URL)
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    pub fn backend_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.backend_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
impl Settings {
    pub fn for_backend(base_url: &str) -> Self {
        Settings {
            server_address: "127.0.0.1:0".to_string(),
            backend_base_url: base_url.to_string(),
            proxy_url: None,
            backend_timeout_secs: 5,
            backend_max_attempts: 1,
            backend_retry_delay_ms: 10,
        }
    }
}
