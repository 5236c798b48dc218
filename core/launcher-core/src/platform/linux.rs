use std::path::Path;
use std::time::Duration;

use super::{
    dispatch_terminal, posix_sequence_invocation, spawn_posix_sequence, Invocation,
    Platform, PlatformLauncher, SpawnedProcess,
};
use crate::error::Result;

/// Linux: the configured terminal emulator, `sh -c` for sequences.
#[derive(Debug, Clone)]
pub struct LinuxLauncher {
    terminal: String,
    poll_interval: Duration,
}

impl LinuxLauncher {
    pub fn new(terminal: &str, poll_interval: Duration) -> Self {
        Self {
            terminal: terminal.to_string(),
            poll_interval,
        }
    }

    pub fn terminal_invocation(&self, directory: &Path) -> Invocation {
        let dir = directory.display().to_string();
        let program = self.terminal.as_str();
        let binary = Path::new(program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(program);

        let args: Vec<String> = match binary {
            "gnome-terminal" | "kgx" | "tilix" | "xfce4-terminal" | "mate-terminal" => {
                vec![format!("--working-directory={dir}")]
            }
            "konsole" => vec!["--workdir".to_string(), dir],
            "kitty" => vec!["--directory".to_string(), dir],
            "alacritty" => vec!["--working-directory".to_string(), dir],
            "wezterm" => vec!["start".to_string(), "--cwd".to_string(), dir],
            // Unknown emulators inherit the directory from the spawn cwd.
            _ => Vec::new(),
        };

        Invocation {
            program: program.to_string(),
            args,
            raw_tail: None,
            current_dir: directory.to_path_buf(),
        }
    }

    pub fn sequence_invocation(&self, directory: &Path, command_sequence: &str) -> Invocation {
        posix_sequence_invocation(directory, command_sequence)
    }
}

impl PlatformLauncher for LinuxLauncher {
    fn platform(&self) -> &'static str {
        Platform::Linux.as_str()
    }

    fn open_interactive_terminal(&self, directory: &Path) -> Result<()> {
        tracing::info!(path = %directory.display(), terminal = %self.terminal, "Opening terminal");
        dispatch_terminal(self.terminal_invocation(directory), None);
        Ok(())
    }

    fn run_detached_sequence(
        &self,
        directory: &Path,
        command_sequence: &str,
    ) -> Result<SpawnedProcess> {
        spawn_posix_sequence(
            &self.sequence_invocation(directory, command_sequence),
            self.poll_interval,
        )
    }
}
