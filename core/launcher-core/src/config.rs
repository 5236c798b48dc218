//! Runtime preferences loaded from `launcher.toml`.
//!
//! The file is optional; every field has a default and unknown fields are
//! rejected so typos surface in the log instead of being ignored.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LINUX_TERMINAL: &str = "gnome-terminal";
pub const DEFAULT_EXIT_POLL_INTERVAL_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Terminal emulator program used by the Linux launcher.
    pub linux_terminal: String,
    /// How often supervised children are polled for exit.
    pub exit_poll_interval_ms: u64,
    /// Override for the view transport socket.
    pub socket_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            linux_terminal: DEFAULT_LINUX_TERMINAL.to_string(),
            exit_poll_interval_ms: DEFAULT_EXIT_POLL_INTERVAL_MS,
            socket_path: None,
        }
    }
}

impl RuntimeConfig {
    pub fn exit_poll_interval(&self) -> Duration {
        Duration::from_millis(self.exit_poll_interval_ms.max(10))
    }
}

/// Loads runtime preferences, returning defaults when the file is missing.
pub fn load_runtime_config(path: &Path) -> Result<RuntimeConfig, String> {
    if !path.exists() {
        return Ok(RuntimeConfig::default());
    }

    let content = fs_err::read_to_string(path)
        .map_err(|err| format!("Failed to read runtime config {}: {}", path.display(), err))?;
    toml::from_str::<RuntimeConfig>(&content)
        .map_err(|err| format!("Failed to parse runtime config {}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_runtime_config_defaults_when_file_missing() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let config = load_runtime_config(&temp_dir.path().join("missing.toml")).expect("load");
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.exit_poll_interval(), Duration::from_millis(200));
    }

    #[test]
    fn load_runtime_config_parses_overrides() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("launcher.toml");
        fs_err::write(
            &path,
            r#"
linux_terminal = "kitty"
exit_poll_interval_ms = 50
socket_path = "/run/user/1000/launcher.sock"
"#,
        )
        .expect("write config");

        let config = load_runtime_config(&path).expect("load");
        assert_eq!(config.linux_terminal, "kitty");
        assert_eq!(config.exit_poll_interval_ms, 50);
        assert_eq!(
            config.socket_path,
            Some(PathBuf::from("/run/user/1000/launcher.sock"))
        );
    }

    #[test]
    fn load_runtime_config_partial_file_keeps_defaults() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("launcher.toml");
        fs_err::write(&path, "exit_poll_interval_ms = 500\n").expect("write config");

        let config = load_runtime_config(&path).expect("load");
        assert_eq!(config.linux_terminal, DEFAULT_LINUX_TERMINAL);
        assert_eq!(config.exit_poll_interval_ms, 500);
    }

    #[test]
    fn load_runtime_config_rejects_unknown_fields() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("launcher.toml");
        fs_err::write(&path, "terminal = \"xterm\"\n").expect("write config");

        let err = load_runtime_config(&path).unwrap_err();
        assert!(err.contains("Failed to parse runtime config"));
    }

    #[test]
    fn poll_interval_has_a_floor() {
        let config = RuntimeConfig {
            exit_poll_interval_ms: 0,
            ..RuntimeConfig::default()
        };
        assert_eq!(config.exit_poll_interval(), Duration::from_millis(10));
    }
}
