//! The user's career profile and its on-disk store.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::core::storage::{self, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EducationLevel {
    #[default]
    Student,
    Undergraduate,
    Graduate,
    #[serde(rename = "PhD/Professional", alias = "Professional")]
    Professional,
}

impl EducationLevel {
    pub const ALL: [EducationLevel; 4] = [
        EducationLevel::Student,
        EducationLevel::Undergraduate,
        EducationLevel::Graduate,
        EducationLevel::Professional,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EducationLevel::Student => "Student",
            EducationLevel::Undergraduate => "Undergraduate",
            EducationLevel::Graduate => "Graduate",
            EducationLevel::Professional => "PhD/Professional",
        }
    }

    /// The following level, wrapping around; used by the profile editor.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|level| *level == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let index = Self::ALL.iter().position(|level| *level == self).unwrap_or(0);
        Self::ALL[(index + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EducationLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(EducationLevel::Student),
            "undergraduate" | "undergrad" => Ok(EducationLevel::Undergraduate),
            "graduate" | "grad" => Ok(EducationLevel::Graduate),
            "phd" | "professional" | "phd/professional" => Ok(EducationLevel::Professional),
            other => Err(format!(
                "unknown education level '{other}' (expected student, undergraduate, graduate or professional)"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Education {
    pub level: EducationLevel,
    /// Free-text field of study, e.g. "biology".
    pub field: String,
}

impl Education {
    pub fn is_default(&self) -> bool {
        self.level == EducationLevel::default() && self.field.trim().is_empty()
    }
}

impl fmt::Display for Education {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = self.field.trim();
        if field.is_empty() {
            write!(f, "{}", self.level)
        } else {
            write!(f, "{} in {}", self.level, field)
        }
    }
}

impl<'de> Deserialize<'de> for Education {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Record {
            #[serde(default)]
            level: EducationLevel,
            #[serde(default)]
            field: String,
        }

        // Older documents stored the level as a bare string.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Level(String),
            Record(Record),
        }

        Ok(match Raw::deserialize(deserializer)? {
            // Free text that is not a level is kept as the field of study.
            Raw::Level(text) => match text.parse() {
                Ok(level) => Education {
                    level,
                    field: String::new(),
                },
                Err(_) => Education {
                    level: EducationLevel::default(),
                    field: text.trim().to_string(),
                },
            },
            Raw::Record(record) => Education {
                level: record.level,
                field: record.field,
            },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, deserialize_with = "string_set")]
    pub skills: BTreeSet<String>,
    #[serde(default)]
    pub education: Education,
    #[serde(default, alias = "interest", deserialize_with = "string_set")]
    pub interests: BTreeSet<String>,
}

impl Profile {
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.interests.is_empty() && self.education.is_default()
    }

    pub fn skills_text(&self) -> String {
        join_set(&self.skills)
    }

    pub fn interests_text(&self) -> String {
        join_set(&self.interests)
    }

    /// One-line summary injected into prompts, or `None` for an untouched profile.
    pub fn context_line(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        if !self.skills.is_empty() {
            parts.push(format!("Skills({})", self.skills_text()));
        }
        parts.push(format!("Education({})", self.education));
        if !self.interests.is_empty() {
            parts.push(format!("Interests({})", self.interests_text()));
        }
        Some(format!("User Profile: {}.", parts.join(", ")))
    }
}

/// Split comma- or newline-separated user input into a normalized set.
pub fn parse_list(input: &str) -> BTreeSet<String> {
    input
        .split([',', '\n', ';'])
        .map(|item| item.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|item| !item.is_empty())
        .collect()
}

fn join_set(items: &BTreeSet<String>) -> String {
    items.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn string_set<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        List(Vec<String>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => parse_list(&text),
        Raw::List(items) => parse_list(&items.join(",")),
    })
}

/// Persists the single profile record.
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the profile; anything missing or unreadable becomes a default.
    pub fn load(&self) -> Profile {
        storage::load_or_default(&self.path)
    }

    pub fn save(&self, profile: &Profile) -> Result<(), StorageError> {
        storage::write_document(&self.path, profile)?;
        info!(
            skills = profile.skills.len(),
            interests = profile.interests.len(),
            "profile saved"
        );
        Ok(())
    }

    /// Overwrite the stored profile with defaults.
    pub fn reset(&self) -> Result<Profile, StorageError> {
        let profile = Profile::default();
        self.save(&profile)?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store() -> (TempDir, ProfileStore) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ProfileStore::new(temp_dir.path().join("profile.json"));
        (temp_dir, store)
    }

    #[test]
    fn load_missing_profile_returns_defaults() {
        let (_dir, store) = store();
        let profile = store.load();
        assert_eq!(profile, Profile::default());
        assert!(profile.is_empty());
        assert_eq!(profile.education.level, EducationLevel::Student);
    }

    #[test]
    fn load_empty_or_corrupt_profile_returns_defaults() {
        let (_dir, store) = store();
        fs::write(store.path(), "").unwrap();
        assert_eq!(store.load(), Profile::default());

        fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load(), Profile::default());
    }

    #[test]
    fn save_then_load_preserves_profile() {
        let (_dir, store) = store();
        let profile = Profile {
            skills: parse_list("Python, SQL"),
            education: Education {
                level: EducationLevel::Graduate,
                field: "biology".to_string(),
            },
            interests: parse_list("science communication"),
        };
        store.save(&profile).expect("save profile");
        assert_eq!(store.load(), profile);
    }

    #[test]
    fn legacy_string_fields_are_accepted() {
        let (_dir, store) = store();
        fs::write(
            store.path(),
            r#"{"skills": "Python, Machine Learning", "education": "PhD/Professional", "interest": "Data Scientist"}"#,
        )
        .unwrap();

        let profile = store.load();
        assert!(profile.skills.contains("Machine Learning"));
        assert_eq!(profile.education.level, EducationLevel::Professional);
        assert!(profile.interests.contains("Data Scientist"));
    }

    #[test]
    fn unknown_legacy_education_is_kept_as_field() {
        let profile: Profile =
            serde_json::from_str(r#"{"education": "  BSc in Biology "}"#).unwrap();
        assert_eq!(profile.education.level, EducationLevel::Student);
        assert_eq!(profile.education.field, "BSc in Biology");

        let (_dir, store) = store();
        store.save(&profile).unwrap();
        assert_eq!(store.load().education.field, "BSc in Biology");
    }

    #[test]
    fn missing_fields_default_individually() {
        let (_dir, store) = store();
        fs::write(store.path(), r#"{"skills": ["Rust"]}"#).unwrap();

        let profile = store.load();
        assert_eq!(profile.skills_text(), "Rust");
        assert!(profile.interests.is_empty());
        assert!(profile.education.is_default());
    }

    #[test]
    fn reset_overwrites_with_defaults() {
        let (_dir, store) = store();
        let profile = Profile {
            skills: parse_list("Go"),
            ..Default::default()
        };
        store.save(&profile).unwrap();

        let reset = store.reset().unwrap();
        assert!(reset.is_empty());
        assert_eq!(store.load(), Profile::default());
    }

    #[test]
    fn parse_list_trims_and_dedupes() {
        let items = parse_list("  Python ,python, Python\n  data   analysis,,");
        let collected: Vec<_> = items.into_iter().collect();
        assert_eq!(collected, vec!["Python", "data analysis", "python"]);
    }

    #[test]
    fn context_line_only_mentions_filled_fields() {
        assert!(Profile::default().context_line().is_none());

        let profile = Profile {
            education: Education {
                level: EducationLevel::Undergraduate,
                field: "biology".to_string(),
            },
            ..Default::default()
        };
        assert_eq!(
            profile.context_line().as_deref(),
            Some("User Profile: Education(Undergraduate in biology).")
        );
    }

    #[test]
    fn education_levels_cycle() {
        assert_eq!(EducationLevel::Student.next(), EducationLevel::Undergraduate);
        assert_eq!(EducationLevel::Professional.next(), EducationLevel::Student);
        assert_eq!(EducationLevel::Student.previous(), EducationLevel::Professional);
        assert_eq!("grad".parse::<EducationLevel>(), Ok(EducationLevel::Graduate));
        assert!("astronaut".parse::<EducationLevel>().is_err());
    }
}
