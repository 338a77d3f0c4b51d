//! Registry of setting handlers.

use std::collections::HashMap;

use super::handlers::{
    api_key_env_handler, base_url_handler, data_dir_handler, history_window_handler,
    knowledge_dir_handler, model_handler, request_timeout_handler, retrieval_limit_handler,
    temperature_handler,
};
use super::SettingHandler;

/// Registry of all available setting handlers.
pub struct SettingRegistry {
    handlers: HashMap<&'static str, Box<dyn SettingHandler>>,
    /// Keys in display order for `compass set` output.
    display_order: Vec<&'static str>,
}

impl SettingRegistry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            display_order: Vec::new(),
        };

        // Register handlers in display order
        registry.register(Box::new(base_url_handler()));
        registry.register(Box::new(model_handler()));
        registry.register(Box::new(temperature_handler()));
        registry.register(Box::new(api_key_env_handler()));
        registry.register(Box::new(history_window_handler()));
        registry.register(Box::new(request_timeout_handler()));
        registry.register(Box::new(retrieval_limit_handler()));
        registry.register(Box::new(data_dir_handler()));
        registry.register(Box::new(knowledge_dir_handler()));

        registry
    }

    fn register(&mut self, handler: Box<dyn SettingHandler>) {
        let key = handler.key();
        self.display_order.push(key);
        self.handlers.insert(key, handler);
    }

    /// Get a handler by key. Underscores are accepted in place of dashes.
    pub fn get(&self, key: &str) -> Option<&dyn SettingHandler> {
        let key = key.trim().replace('_', "-");
        self.handlers.get(key.as_str()).map(|h| h.as_ref())
    }

    /// Get all keys in display order.
    pub fn keys_display_order(&self) -> &[&'static str] {
        &self.display_order
    }
}

impl Default for SettingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::settings::{run_set, run_unset, SettingError};
    use crate::core::config::Config;
    use tempfile::TempDir;

    #[test]
    fn every_key_is_reachable() {
        let registry = SettingRegistry::new();
        for key in registry.keys_display_order() {
            assert_eq!(registry.get(key).map(|h| h.key()), Some(*key));
        }
        assert!(registry.get("history_window").is_some());
        assert!(registry.get("theme").is_none());
    }

    #[test]
    fn set_and_unset_round_trip_through_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.toml");

        let message = run_set(&path, Some("model"), &["llama-3.3-70b-versatile".to_string()])
            .expect("set should succeed");
        assert_eq!(message, "✅ Set model to: llama-3.3-70b-versatile");
        assert_eq!(
            Config::load_from_path(&path).unwrap().model(),
            "llama-3.3-70b-versatile"
        );

        let listing = run_set(&path, None, &[]).unwrap();
        assert!(listing.starts_with("Current configuration:"));
        assert!(listing.contains("  model: llama-3.3-70b-versatile"));
        assert!(listing.contains("  base-url: (unset, default: https://api.groq.com/openai/v1)"));

        run_unset(&path, "model").unwrap();
        assert_eq!(Config::load_from_path(&path).unwrap().model, None);
    }

    #[test]
    fn unknown_key_leaves_file_untouched() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.toml");

        let err = run_set(&path, Some("theme"), &["dark".to_string()]).unwrap_err();
        assert!(matches!(err, SettingError::UnknownKey(ref key) if key == "theme"));
        assert!(!path.exists());
    }
}
