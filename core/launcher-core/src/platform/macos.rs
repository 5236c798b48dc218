use std::path::Path;
use std::time::Duration;

use super::{
    dispatch_terminal, posix_sequence_invocation, spawn_posix_sequence, Invocation,
    Platform, PlatformLauncher, SpawnedProcess,
};
use crate::error::Result;

/// macOS: Terminal.app via `open -a`, `sh -c` for sequences.
#[derive(Debug, Clone)]
pub struct MacOsLauncher {
    poll_interval: Duration,
}

impl MacOsLauncher {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn terminal_invocation(&self, directory: &Path) -> Invocation {
        let dir = directory.display().to_string();
        Invocation::new("open", &["-a", "Terminal", &dir], directory)
    }
}

impl PlatformLauncher for MacOsLauncher {
    fn platform(&self) -> &'static str {
        Platform::MacOs.as_str()
    }

    fn open_interactive_terminal(&self, directory: &Path) -> Result<()> {
        tracing::info!(path = %directory.display(), "Opening Terminal");
        dispatch_terminal(self.terminal_invocation(directory), None);
        Ok(())
    }

    fn run_detached_sequence(
        &self,
        directory: &Path,
        command_sequence: &str,
    ) -> Result<SpawnedProcess> {
        spawn_posix_sequence(
            &posix_sequence_invocation(directory, command_sequence),
            self.poll_interval,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_opens_terminal_app_at_directory() {
        let invocation =
            MacOsLauncher::new(Duration::from_millis(20)).terminal_invocation(Path::new("/Users/me/app"));
        assert_eq!(invocation.describe(), "open -a Terminal /Users/me/app");
    }
}
