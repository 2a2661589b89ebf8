//! Path utilities.
//!
//! Resolves where snipvault keeps its configuration and data.

use std::path::{Path, PathBuf};

/// Get the snipvault configuration directory.
///
/// On Unix, prefers `~/.config/snipvault` when it exists, otherwise falls
/// back to the platform config directory.
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        if let Some(home) = dirs::home_dir() {
            let xdg_config = home.join(".config").join("snipvault");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }
    }

    dirs::config_dir().map(|p| p.join("snipvault"))
}

/// Get the snipvault data directory.
///
/// This follows XDG conventions:
/// - `$XDG_DATA_HOME/snipvault` if set
/// - `~/.local/share/snipvault` otherwise
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("snipvault"))
}

/// Directory holding snippet records inside a data directory.
pub fn snippets_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("snippets")
}

/// Directory holding the version history inside a data directory.
pub fn history_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("history")
}

/// Check that a single path component is safe to use as a file name.
///
/// Rejects empty names, separators, and `.`/`..`.
pub fn is_safe_component(component: &str) -> bool {
    !(component.is_empty()
        || component.contains('/')
        || component.contains('\\')
        || component == "."
        || component == "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_ends_with_app_name() {
        if let Some(dir) = data_dir() {
            assert!(dir.ends_with("snipvault"));
        }
    }

    #[test]
    fn test_layout_under_data_dir() {
        let base = Path::new("/var/lib/snipvault");
        assert_eq!(snippets_dir(base), PathBuf::from("/var/lib/snipvault/snippets"));
        assert_eq!(history_dir(base), PathBuf::from("/var/lib/snipvault/history"));
    }

    #[test]
    fn test_is_safe_component() {
        assert!(is_safe_component("snp_01hq"));
        assert!(!is_safe_component(""));
        assert!(!is_safe_component(".."));
        assert!(!is_safe_component("a/b"));
        assert!(!is_safe_component("a\\b"));
    }
}
