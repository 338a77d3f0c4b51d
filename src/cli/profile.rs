//! `compass profile` commands.

use std::error::Error;

use crate::core::profile::{parse_list, EducationLevel, Profile, ProfileStore};

/// Fields given on the command line; `None` leaves a field unchanged.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub skills: Option<String>,
    pub education: Option<String>,
    pub field: Option<String>,
    pub interests: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.skills.is_none()
            && self.education.is_none()
            && self.field.is_none()
            && self.interests.is_none()
    }

    pub fn apply(&self, profile: &mut Profile) -> Result<(), String> {
        if let Some(level) = &self.education {
            profile.education.level = level.parse::<EducationLevel>()?;
        }
        if let Some(field) = &self.field {
            profile.education.field = field.trim().to_string();
        }
        if let Some(skills) = &self.skills {
            profile.skills = parse_list(skills);
        }
        if let Some(interests) = &self.interests {
            profile.interests = parse_list(interests);
        }
        Ok(())
    }
}

pub fn format_profile(profile: &Profile) -> String {
    let or_none = |text: String| if text.is_empty() { "(none)".to_string() } else { text };
    format!(
        "Skills:    {}\nEducation: {}\nInterests: {}",
        or_none(profile.skills_text()),
        profile.education,
        or_none(profile.interests_text()),
    )
}

pub fn show(store: &ProfileStore) {
    println!("{}", format_profile(&store.load()));
}

pub fn set(store: &ProfileStore, update: &ProfileUpdate) -> Result<(), Box<dyn Error>> {
    if update.is_empty() {
        eprintln!("⚠️  Nothing to change. Pass --skills, --education, --field or --interests.");
        eprintln!("Example: compass profile set --skills \"python, statistics\" --education graduate --field biology");
        std::process::exit(2);
    }

    let mut profile = store.load();
    update.apply(&mut profile)?;
    store.save(&profile)?;
    println!("✅ Profile saved\n{}", format_profile(&profile));
    Ok(())
}

pub fn reset(store: &ProfileStore) -> Result<(), Box<dyn Error>> {
    store.reset()?;
    println!("✅ Profile reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn update_changes_only_given_fields() {
        let mut profile = Profile {
            interests: parse_list("research"),
            ..Default::default()
        };
        let update = ProfileUpdate {
            skills: Some("python, lab work".to_string()),
            education: Some("grad".to_string()),
            field: Some(" biology ".to_string()),
            ..Default::default()
        };

        update.apply(&mut profile).unwrap();
        assert_eq!(profile.skills_text(), "lab work, python");
        assert_eq!(profile.education.to_string(), "Graduate in biology");
        assert_eq!(profile.interests_text(), "research");
    }

    #[test]
    fn bad_level_is_rejected() {
        let mut profile = Profile::default();
        let update = ProfileUpdate {
            education: Some("kindergarten".to_string()),
            ..Default::default()
        };
        assert!(update.apply(&mut profile).is_err());
        assert_eq!(profile, Profile::default());
    }

    #[test]
    fn empty_profile_formats_placeholders() {
        assert_eq!(
            format_profile(&Profile::default()),
            "Skills:    (none)\nEducation: Student\nInterests: (none)"
        );
    }

    #[test]
    fn set_persists_update() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ProfileStore::new(temp_dir.path().join("profile.json"));
        let update = ProfileUpdate {
            interests: Some("AI; design".to_string()),
            ..Default::default()
        };

        set(&store, &update).unwrap();
        assert_eq!(store.load().interests_text(), "AI, design");
        reset(&store).unwrap();
        assert!(store.load().is_empty());
    }
}
