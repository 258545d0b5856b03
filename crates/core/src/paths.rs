//! Filesystem location defaults.
//!
//! Follows the XDG layout through the `dirs` crate: the job database lives
//! under the cache dir, processor definitions under the config dir, and
//! command output defaults to `~/Videos`.

use std::path::{Path, PathBuf};

/// Application directory name under the XDG cache/config roots.
const APP_DIR: &str = "catcher";

/// Default location of the SQLite job database.
pub fn default_db_path() -> PathBuf {
    base_dir(dirs::cache_dir(), ".cache")
        .join(APP_DIR)
        .join("jobs.db")
}

/// Default location of the processor definitions file.
pub fn default_config_path() -> PathBuf {
    base_dir(dirs::config_dir(), ".config")
        .join(APP_DIR)
        .join("config.toml")
}

/// Directory processors write into when none is configured.
pub fn default_target_dir() -> PathBuf {
    home().join("Videos")
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        let rest = rest.trim_start_matches('/');
        if rest.is_empty() {
            return home();
        }
        return home().join(rest);
    }
    PathBuf::from(path)
}

fn base_dir(xdg: Option<PathBuf>, fallback: &str) -> PathBuf {
    xdg.unwrap_or_else(|| home().join(fallback))
}

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| Path::new(".").to_path_buf())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_tilde_prefix() {
        let expanded = expand_path("~/Downloads/videos");
        assert_eq!(expanded, home().join("Downloads/videos"));
    }

    #[test]
    fn bare_tilde_is_home() {
        assert_eq!(expand_path("~"), home());
    }

    #[test]
    fn absolute_paths_are_untouched() {
        assert_eq!(expand_path("/srv/media"), PathBuf::from("/srv/media"));
    }

    #[test]
    fn defaults_live_under_app_dir() {
        assert!(default_db_path().ends_with("catcher/jobs.db"));
        assert!(default_config_path().ends_with("catcher/config.toml"));
        assert!(default_target_dir().ends_with("Videos"));
    }
}
