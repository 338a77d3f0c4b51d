use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use crate::core::constants::{CONVERSATIONS_FILE, KNOWLEDGE_DIR, LOG_FILE, PROFILE_FILE};

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.local/share/compass/profile.json` → `~/.local/share/compass/profile.json`
/// - Windows: paths are shown unchanged
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "compass", "compass")
}

/// Locations of everything Compass keeps on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub data_dir: PathBuf,
    pub profile: PathBuf,
    pub conversations: PathBuf,
    pub log: PathBuf,
    pub knowledge_dir: PathBuf,
}

impl DataPaths {
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            profile: data_dir.join(PROFILE_FILE),
            conversations: data_dir.join(CONVERSATIONS_FILE),
            log: data_dir.join(LOG_FILE),
            knowledge_dir: data_dir.join(KNOWLEDGE_DIR),
            data_dir,
        }
    }

    /// Resolve the data directory: explicit override first, then the platform default.
    pub fn resolve(override_dir: Option<&Path>) -> Result<Self, String> {
        if let Some(dir) = override_dir {
            return Ok(Self::in_dir(dir));
        }
        project_dirs()
            .map(|dirs| Self::in_dir(dirs.data_dir()))
            .ok_or_else(|| "Failed to determine a data directory for this platform".to_string())
    }

    pub fn with_knowledge_dir(mut self, knowledge_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = knowledge_dir {
            self.knowledge_dir = dir;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_paths_share_one_directory() {
        let paths = DataPaths::in_dir("/tmp/compass-test");
        assert_eq!(paths.profile, PathBuf::from("/tmp/compass-test/profile.json"));
        assert_eq!(
            paths.conversations,
            PathBuf::from("/tmp/compass-test/conversations.json")
        );
        assert_eq!(paths.knowledge_dir, PathBuf::from("/tmp/compass-test/knowledge"));
    }

    #[test]
    fn override_wins_over_platform_default() {
        let paths = DataPaths::resolve(Some(Path::new("/srv/compass"))).unwrap();
        assert_eq!(paths.data_dir, PathBuf::from("/srv/compass"));

        let paths = paths.with_knowledge_dir(Some(PathBuf::from("/srv/docs")));
        assert_eq!(paths.knowledge_dir, PathBuf::from("/srv/docs"));
    }

    #[cfg(unix)]
    #[test]
    fn path_display_leaves_non_home_paths_alone() {
        assert_eq!(path_display("/etc/compass"), "/etc/compass");
    }
}
