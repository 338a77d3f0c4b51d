//! The single API secret: where it comes from and how setup stores it.
//!
//! The key is only ever read from the process environment or the `.env` file
//! that feeds it. It is never written to the JSON documents, the config file,
//! the diagnostics log, or the screen.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::core::paths::path_display;

/// Prefix Groq uses for its API keys.
const GROQ_KEY_PREFIX: &str = "gsk_";

#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl AsRef<str>) -> Option<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The raw secret, for building request headers only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Outcome of looking for the secret at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Startup {
    Ready(ApiKey),
    NeedsSetup { var: String },
}

impl Startup {
    pub fn needs_setup(&self) -> bool {
        matches!(self, Startup::NeedsSetup { .. })
    }
}

#[derive(Debug)]
pub enum CredentialError {
    /// The environment variable is unset or blank.
    Missing { var: String },

    /// Setup input was rejected.
    Invalid { reason: String },

    /// The `.env` file could not be updated.
    Write { path: PathBuf, source: io::Error },
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::Missing { var } => write!(
                f,
                "{var} is not set. Export it or add `{var}=<your key>` to a .env file"
            ),
            CredentialError::Invalid { reason } => write!(f, "Invalid API key: {reason}"),
            CredentialError::Write { path, source } => {
                write!(f, "Failed to update {}: {}", path_display(path), source)
            }
        }
    }
}

impl StdError for CredentialError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            CredentialError::Write { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub fn resolve<F>(var: &str, lookup: F) -> Startup
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var).and_then(ApiKey::new) {
        Some(key) => Startup::Ready(key),
        None => Startup::NeedsSetup {
            var: var.to_string(),
        },
    }
}

/// Resolve against the process environment (which `.env` was loaded into).
pub fn resolve_from_env(var: &str) -> Startup {
    resolve(var, |name| std::env::var(name).ok())
}

pub fn require(var: &str) -> Result<ApiKey, CredentialError> {
    match resolve_from_env(var) {
        Startup::Ready(key) => Ok(key),
        Startup::NeedsSetup { var } => Err(CredentialError::Missing { var }),
    }
}

/// Read one variable from a `.env` file without touching the process environment.
pub fn lookup_env_file(path: &Path, var: &str) -> Option<String> {
    dotenvy::from_path_iter(path)
        .ok()?
        .filter_map(Result::ok)
        .find(|(name, _)| name == var)
        .map(|(_, value)| value)
}

/// Check setup input before it is stored.
pub fn validate(var: &str, input: &str) -> Result<ApiKey, CredentialError> {
    let key = ApiKey::new(input).ok_or_else(|| CredentialError::Invalid {
        reason: "the key is empty".to_string(),
    })?;
    if key.expose().chars().any(char::is_whitespace) {
        return Err(CredentialError::Invalid {
            reason: "the key must not contain whitespace".to_string(),
        });
    }
    if var == crate::core::constants::DEFAULT_API_KEY_ENV
        && !key.expose().starts_with(GROQ_KEY_PREFIX)
    {
        return Err(CredentialError::Invalid {
            reason: format!("Groq keys start with '{GROQ_KEY_PREFIX}'"),
        });
    }
    Ok(key)
}

/// Set `var` in the `.env` file at `path`, replacing an existing assignment
/// or appending a new one. Other lines are kept as they are.
pub fn store_in_env_file(path: &Path, var: &str, key: &ApiKey) -> Result<(), CredentialError> {
    let write_err = |source: io::Error| CredentialError::Write {
        path: path.to_path_buf(),
        source,
    };

    let existing = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(write_err(err)),
    };

    let assignment = format!("{var}={}", key.expose());
    let mut replaced = false;
    let mut lines: Vec<String> = existing
        .lines()
        .map(|line| {
            let body = line.trim_start();
            let body = body.strip_prefix("export ").unwrap_or(body).trim_start();
            let assigns_var = body
                .strip_prefix(var)
                .is_some_and(|rest| rest.trim_start().starts_with('='));
            if assigns_var && !replaced {
                replaced = true;
                assignment.clone()
            } else {
                line.to_string()
            }
        })
        .collect();
    if !replaced {
        lines.push(assignment);
    }

    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp_file = NamedTempFile::new_in(parent).map_err(write_err)?;
    for line in &lines {
        writeln!(temp_file, "{line}").map_err(write_err)?;
    }
    temp_file.as_file_mut().sync_all().map_err(write_err)?;
    temp_file.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}
