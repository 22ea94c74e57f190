//! Platform directory resolution.

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("could not determine OS configuration directory")]
    NoConfigDir,

    #[error("platform I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where `config.ron` and the debug log file live.
///
/// Follows OS conventions via `dirs`: XDG on Linux, Known Folders on
/// Windows, Library on macOS.
#[derive(Clone, Debug, PartialEq)]
pub struct PlatformDirs {
    pub config_dir: PathBuf,
    pub log_dir: PathBuf,
}

const APP_NAME: &str = "galaxy";

impl PlatformDirs {
    /// Resolve without touching the filesystem.
    pub fn resolve() -> Result<Self, PlatformError> {
        let base = dirs::config_dir().ok_or(PlatformError::NoConfigDir)?;
        Ok(Self::resolve_with_root(&base))
    }

    /// Resolve under a custom root.
    pub fn resolve_with_root(root: &Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            config_dir: app_dir.join("config"),
            log_dir: app_dir.join("logs"),
        }
    }

    /// Point the config directory elsewhere, keeping logs next to it.
    pub fn with_config_dir(config_dir: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
            log_dir: config_dir.join("logs"),
        }
    }

    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_dirs_are_absolute() {
        let dirs = PlatformDirs::resolve().expect("no config dir on this platform");
        assert!(dirs.config_dir.is_absolute());
        assert!(dirs.log_dir.is_absolute());
        assert!(dirs.config_dir.ends_with(Path::new(APP_NAME).join("config")));
    }

    #[test]
    fn test_directory_creation() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = PlatformDirs::resolve_with_root(tmp.path());
        dirs.create_dirs().unwrap();
        assert!(dirs.config_dir.is_dir());
        assert!(dirs.log_dir.is_dir());
    }

    #[test]
    fn test_config_dir_override_keeps_logs_beside_it() {
        let dirs = PlatformDirs::with_config_dir(Path::new("/tmp/galaxy-test"));
        assert_eq!(dirs.config_dir, PathBuf::from("/tmp/galaxy-test"));
        assert_eq!(dirs.log_dir, Path::new("/tmp/galaxy-test").join("logs"));
    }
}
