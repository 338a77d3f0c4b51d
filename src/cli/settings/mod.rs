//! Settings management for CLI set/unset commands.
//!
//! Each configuration key has a handler that knows how to parse, clear and
//! display its value. Handlers edit an in-memory [`Config`]; the callers here
//! load and save the file around them.

pub mod error;
pub mod handlers;
pub mod registry;

pub use error::SettingError;
pub use registry::SettingRegistry;

use std::path::Path;

use crate::core::config::Config;

/// Trait for handling a configuration setting.
pub trait SettingHandler: Send + Sync {
    /// Returns the configuration key this handler manages.
    fn key(&self) -> &'static str;

    /// Set the value from the arguments given after the key.
    ///
    /// Returns a success message to display.
    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError>;

    /// Clear the value so the default applies again.
    fn unset(&self, config: &mut Config) -> String;

    /// Format the current value for display in `compass set` output.
    fn format(&self, config: &Config) -> String;
}

/// `compass set`: with no key, print every setting.
pub fn run_set(
    config_path: &Path,
    key: Option<&str>,
    args: &[String],
) -> Result<String, SettingError> {
    let registry = SettingRegistry::new();
    let mut config = load(config_path)?;

    let Some(key) = key else {
        return Ok(describe_all(&registry, &config));
    };
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    if args.is_empty() {
        return Ok(handler.format(&config));
    }

    let message = handler.set(args, &mut config)?;
    save(config_path, &config)?;
    Ok(message)
}

/// `compass unset <key>`.
pub fn run_unset(config_path: &Path, key: &str) -> Result<String, SettingError> {
    let registry = SettingRegistry::new();
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    let mut config = load(config_path)?;
    let message = handler.unset(&mut config);
    save(config_path, &config)?;
    Ok(message)
}

pub fn describe_all(registry: &SettingRegistry, config: &Config) -> String {
    let mut lines = vec!["Current configuration:".to_string()];
    lines.extend(
        registry
            .keys_display_order()
            .iter()
            .filter_map(|key| registry.get(key))
            .map(|handler| handler.format(config)),
    );
    lines.join("\n")
}

fn load(config_path: &Path) -> Result<Config, SettingError> {
    Config::load_from_path(config_path).map_err(|err| SettingError::ConfigError(err.to_string()))
}

fn save(config_path: &Path, config: &Config) -> Result<(), SettingError> {
    config
        .save_to_path(config_path)
        .map_err(|err| SettingError::ConfigError(err.to_string()))
}
