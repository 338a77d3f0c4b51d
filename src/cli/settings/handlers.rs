//! Data-driven handlers for every `config.toml` key.

use std::path::PathBuf;

use crate::cli::settings::error::SettingError;
use crate::cli::settings::SettingHandler;
use crate::core::config::Config;
use crate::core::constants::{
    DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_HISTORY_WINDOW, DEFAULT_MODEL,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRIEVAL_LIMIT, DEFAULT_TEMPERATURE,
};
use crate::core::paths::path_display;

/// Handler for a single optional config field.
pub struct ValueHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    expected: &'static str,
    default_display: fn() -> String,
    get: fn(&Config) -> Option<String>,
    /// Parse and store; `None` rejects the input.
    apply: fn(&mut Config, &str) -> Option<()>,
    clear: fn(&mut Config),
}

impl SettingHandler for ValueHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        let input = args.join(" ");
        let input = input.trim();
        if input.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        }

        (self.apply)(config, input).ok_or_else(|| SettingError::InvalidValue {
            key: self.key,
            input: input.to_string(),
            expected: self.expected,
        })?;

        let shown = (self.get)(config).unwrap_or_else(|| input.to_string());
        Ok(format!("✅ Set {} to: {shown}", self.key))
    }

    fn unset(&self, config: &mut Config) -> String {
        (self.clear)(config);
        format!(
            "✅ Unset {} (will use default: {})",
            self.key,
            (self.default_display)()
        )
    }

    fn format(&self, config: &Config) -> String {
        match (self.get)(config) {
            Some(value) => format!("  {}: {value}", self.key),
            None => format!(
                "  {}: (unset, default: {})",
                self.key,
                (self.default_display)()
            ),
        }
    }
}

fn parse_url(input: &str) -> Option<String> {
    (input.starts_with("http://") || input.starts_with("https://")).then(|| input.to_string())
}

fn parse_temperature(input: &str) -> Option<f32> {
    input
        .parse::<f32>()
        .ok()
        .filter(|value| (0.0..=2.0).contains(value))
}

fn parse_env_name(input: &str) -> Option<String> {
    let valid = input
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !input.starts_with(|c: char| c.is_ascii_digit());
    valid.then(|| input.to_string())
}

fn parse_positive(input: &str) -> Option<u64> {
    input.parse::<u64>().ok().filter(|value| *value > 0)
}

fn show_path(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(path_display)
}

pub fn base_url_handler() -> ValueHandler {
    ValueHandler {
        key: "base-url",
        hint: "To set the API endpoint, provide its base URL:",
        example: "compass set base-url https://api.groq.com/openai/v1",
        expected: "an http:// or https:// URL",
        default_display: || DEFAULT_BASE_URL.to_string(),
        get: |c| c.base_url.clone(),
        apply: |c, v| {
            c.base_url = Some(parse_url(v)?);
            Some(())
        },
        clear: |c| c.base_url = None,
    }
}

pub fn model_handler() -> ValueHandler {
    ValueHandler {
        key: "model",
        hint: "To set the model, provide its identifier:",
        example: "compass set model llama-3.3-70b-versatile",
        expected: "a model identifier",
        default_display: || DEFAULT_MODEL.to_string(),
        get: |c| c.model.clone(),
        apply: |c, v| {
            c.model = Some(v.to_string());
            Some(())
        },
        clear: |c| c.model = None,
    }
}

pub fn temperature_handler() -> ValueHandler {
    ValueHandler {
        key: "temperature",
        hint: "To set the sampling temperature, provide a number:",
        example: "compass set temperature 0.7",
        expected: "a number between 0 and 2",
        default_display: || DEFAULT_TEMPERATURE.to_string(),
        get: |c| c.temperature.map(|t| t.to_string()),
        apply: |c, v| {
            c.temperature = Some(parse_temperature(v)?);
            Some(())
        },
        clear: |c| c.temperature = None,
    }
}

pub fn api_key_env_handler() -> ValueHandler {
    ValueHandler {
        key: "api-key-env",
        hint: "To change which environment variable holds the API key, name it:",
        example: "compass set api-key-env OPENAI_API_KEY",
        expected: "an environment variable name (letters, digits, underscores)",
        default_display: || DEFAULT_API_KEY_ENV.to_string(),
        get: |c| c.api_key_env.clone(),
        apply: |c, v| {
            c.api_key_env = Some(parse_env_name(v)?);
            Some(())
        },
        clear: |c| c.api_key_env = None,
    }
}

pub fn history_window_handler() -> ValueHandler {
    ValueHandler {
        key: "history-window",
        hint: "To set how many prior messages are sent, provide a count:",
        example: "compass set history-window 12",
        expected: "a whole number",
        default_display: || DEFAULT_HISTORY_WINDOW.to_string(),
        get: |c| c.history_window.map(|n| n.to_string()),
        apply: |c, v| {
            c.history_window = Some(v.parse().ok()?);
            Some(())
        },
        clear: |c| c.history_window = None,
    }
}

pub fn request_timeout_handler() -> ValueHandler {
    ValueHandler {
        key: "request-timeout",
        hint: "To set the request timeout, provide seconds:",
        example: "compass set request-timeout 90",
        expected: "a positive number of seconds",
        default_display: || DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
        get: |c| c.request_timeout_secs.map(|n| n.to_string()),
        apply: |c, v| {
            c.request_timeout_secs = Some(parse_positive(v)?);
            Some(())
        },
        clear: |c| c.request_timeout_secs = None,
    }
}

pub fn retrieval_limit_handler() -> ValueHandler {
    ValueHandler {
        key: "retrieval-limit",
        hint: "To set how many knowledge snippets join each prompt, provide a count:",
        example: "compass set retrieval-limit 2",
        expected: "a whole number",
        default_display: || DEFAULT_RETRIEVAL_LIMIT.to_string(),
        get: |c| c.retrieval_limit.map(|n| n.to_string()),
        apply: |c, v| {
            c.retrieval_limit = Some(v.parse().ok()?);
            Some(())
        },
        clear: |c| c.retrieval_limit = None,
    }
}

pub fn data_dir_handler() -> ValueHandler {
    ValueHandler {
        key: "data-dir",
        hint: "To move profile and conversation storage, provide a directory:",
        example: "compass set data-dir ~/Documents/compass",
        expected: "a directory path",
        default_display: || "platform data directory".to_string(),
        get: |c| show_path(&c.data_dir),
        apply: |c, v| {
            c.data_dir = Some(PathBuf::from(v));
            Some(())
        },
        clear: |c| c.data_dir = None,
    }
}

pub fn knowledge_dir_handler() -> ValueHandler {
    ValueHandler {
        key: "knowledge-dir",
        hint: "To read reference documents from elsewhere, provide a directory:",
        example: "compass set knowledge-dir ~/career-notes",
        expected: "a directory path",
        default_display: || "knowledge/ in the data directory".to_string(),
        get: |c| show_path(&c.knowledge_dir),
        apply: |c, v| {
            c.knowledge_dir = Some(PathBuf::from(v));
            Some(())
        },
        clear: |c| c.knowledge_dir = None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(input: &str) -> Vec<String> {
        input.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn temperature_rejects_out_of_range() {
        let handler = temperature_handler();
        let mut config = Config::default();

        let err = handler.set(&args("3.5"), &mut config).unwrap_err();
        assert!(matches!(err, SettingError::InvalidValue { key: "temperature", .. }));
        assert_eq!(config.temperature, None);

        let message = handler.set(&args("0.7"), &mut config).unwrap();
        assert_eq!(message, "✅ Set temperature to: 0.7");
        assert_eq!(config.temperature, Some(0.7));
    }

    #[test]
    fn base_url_requires_scheme() {
        let handler = base_url_handler();
        let mut config = Config::default();
        assert!(handler.set(&args("api.groq.com"), &mut config).is_err());
        assert!(handler
            .set(&args("http://localhost:11434/v1"), &mut config)
            .is_ok());
        assert_eq!(config.base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn missing_value_gives_example() {
        let handler = history_window_handler();
        let err = handler.set(&[], &mut Config::default()).unwrap_err();
        match err {
            SettingError::MissingArgs { example, .. } => {
                assert_eq!(example, "compass set history-window 12")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn env_name_validation() {
        assert_eq!(parse_env_name("OPENAI_API_KEY").as_deref(), Some("OPENAI_API_KEY"));
        assert!(parse_env_name("1KEY").is_none());
        assert!(parse_env_name("MY-KEY").is_none());
    }

    #[test]
    fn format_shows_default_when_unset() {
        let handler = request_timeout_handler();
        let mut config = Config::default();
        assert_eq!(handler.format(&config), "  request-timeout: (unset, default: 60)");
        handler.set(&args("90"), &mut config).unwrap();
        assert_eq!(handler.format(&config), "  request-timeout: 90");
        assert_eq!(
            handler.unset(&mut config),
            "✅ Unset request-timeout (will use default: 60)"
        );
        assert_eq!(config.request_timeout_secs, None);
    }

    #[test]
    fn multi_word_paths_are_joined() {
        let handler = data_dir_handler();
        let mut config = Config::default();
        handler
            .set(&args("/srv/My Documents"), &mut config)
            .unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/My Documents")));
    }
}
