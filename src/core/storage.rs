//! Whole-document JSON persistence shared by the profile and conversation stores.
//!
//! Documents are always read in full and written in full. Writes go through a
//! temporary file in the target directory that is synced and then renamed over
//! the destination, so an interrupted write leaves the previous document intact.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::core::paths::path_display;

/// Errors that can occur while reading or writing a JSON document.
#[derive(Debug)]
pub enum StorageError {
    /// The document exists but could not be read.
    Read { path: PathBuf, source: io::Error },

    /// The document was read but is not valid JSON for the expected record.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The document could not be written or moved into place.
    Write { path: PathBuf, source: io::Error },
}

impl StorageError {
    pub fn path(&self) -> &Path {
        match self {
            StorageError::Read { path, .. }
            | StorageError::Parse { path, .. }
            | StorageError::Write { path, .. } => path,
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Read { path, source } => {
                write!(f, "Failed to read {}: {}", path_display(path), source)
            }
            StorageError::Parse { path, source } => {
                write!(f, "Failed to parse {}: {}", path_display(path), source)
            }
            StorageError::Write { path, source } => {
                write!(f, "Failed to write {}: {}", path_display(path), source)
            }
        }
    }
}

impl StdError for StorageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StorageError::Read { source, .. } => Some(source),
            StorageError::Parse { source, .. } => Some(source),
            StorageError::Write { source, .. } => Some(source),
        }
    }
}

/// Read a document. A missing or blank file yields `Ok(None)`.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StorageError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if contents.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| StorageError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Read a document, substituting defaults for anything missing or unreadable.
///
/// Failures are logged and never reach the caller.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match read_document(path) {
        Ok(Some(document)) => document,
        Ok(None) => T::default(),
        Err(err) => {
            warn!(error = %err, "falling back to defaults for unreadable document");
            T::default()
        }
    }
}

/// Serialize `document` as pretty JSON and atomically replace `path` with it.
pub fn write_document<T: Serialize>(path: &Path, document: &T) -> Result<(), StorageError> {
    let write_err = |source: io::Error| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = parent {
        fs::create_dir_all(dir).map_err(write_err)?;
    }

    let contents = serde_json::to_string_pretty(document)
        .map_err(|err| write_err(io::Error::new(io::ErrorKind::InvalidData, err)))?;

    let mut temp_file = match parent {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new_in("."),
    }
    .map_err(write_err)?;

    temp_file.write_all(contents.as_bytes()).map_err(write_err)?;
    temp_file.write_all(b"\n").map_err(write_err)?;
    temp_file.as_file_mut().sync_all().map_err(write_err)?;
    temp_file
        .persist(path)
        .map_err(|err| write_err(err.error))?;
    Ok(())
}

pub fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(default)]
        name: String,
        #[serde(default)]
        count: u32,
    }

    #[test]
    fn missing_and_blank_documents_are_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("doc.json");
        assert!(read_document::<Sample>(&path).unwrap().is_none());

        fs::write(&path, "  \n").unwrap();
        assert!(read_document::<Sample>(&path).unwrap().is_none());
    }

    #[test]
    fn corrupt_document_reports_parse_error_and_loads_default() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("doc.json");
        fs::write(&path, "{\"name\": \"trunc").unwrap();

        let err = read_document::<Sample>(&path).unwrap_err();
        assert!(matches!(err, StorageError::Parse { .. }));
        assert_eq!(err.path(), path.as_path());

        assert_eq!(load_or_default::<Sample>(&path), Sample::default());
    }

    #[test]
    fn write_creates_parent_directories_and_replaces_content() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("nested").join("doc.json");

        let first = Sample {
            name: "first".to_string(),
            count: 1,
        };
        write_document(&path, &first).expect("first write");
        let second = Sample {
            name: "second".to_string(),
            count: 2,
        };
        write_document(&path, &second).expect("second write");

        assert_eq!(read_document::<Sample>(&path).unwrap(), Some(second));
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name() != "doc.json")
            .collect();
        assert!(leftovers.is_empty(), "temp files should not be left behind");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("doc.json");
        fs::write(&path, r#"{"name":"only-name"}"#).unwrap();

        let loaded: Sample = load_or_default(&path);
        assert_eq!(loaded.name, "only-name");
        assert_eq!(loaded.count, 0);
    }
}
