use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::core::constants::{
    DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_HISTORY_WINDOW, DEFAULT_MODEL,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRIEVAL_LIMIT, DEFAULT_TEMPERATURE,
};
use crate::core::inference::EndpointSettings;

/// User configuration stored in `config.toml`. Every key is optional and
/// falls back to a built-in default.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Base URL of an OpenAI-compatible API (e.g., "https://api.groq.com/openai/v1")
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Prior messages sent with each request
    pub history_window: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    /// Knowledge snippets added to each prompt
    pub retrieval_limit: Option<usize>,
    pub data_dir: Option<PathBuf>,
    pub knowledge_dir: Option<PathBuf>,
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV)
    }

    pub fn history_window(&self) -> usize {
        self.history_window.unwrap_or(DEFAULT_HISTORY_WINDOW)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn retrieval_limit(&self) -> usize {
        self.retrieval_limit.unwrap_or(DEFAULT_RETRIEVAL_LIMIT)
    }

    /// Endpoint settings, with an optional per-run model override.
    pub fn endpoint_settings(&self, model_override: Option<&str>) -> EndpointSettings {
        EndpointSettings {
            base_url: self.base_url().to_string(),
            model: model_override
                .filter(|model| !model.trim().is_empty())
                .unwrap_or_else(|| self.model())
                .to_string(),
            temperature: self.temperature(),
            timeout: self.request_timeout(),
        }
    }
}
