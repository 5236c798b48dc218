use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use super::{dispatch_terminal, process, Invocation, Platform, PlatformLauncher, SpawnedProcess};
use crate::error::Result;

#[cfg(windows)]
const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;

/// Windows: PowerShell with a `cmd` fallback for terminals, a visible
/// `cmd /K` console for sequences so output stays observable.
#[derive(Debug, Clone)]
pub struct WindowsLauncher {
    poll_interval: Duration,
}

impl WindowsLauncher {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn terminal_invocation(&self, directory: &Path) -> Invocation {
        Invocation::new("cmd", &["/C", "start", "powershell", "-NoExit"], directory)
    }

    pub fn fallback_terminal_invocation(&self, directory: &Path) -> Invocation {
        Invocation::new("cmd", &["/C", "start", "cmd", "/K"], directory)
    }

    /// The sequence follows `/K` unquoted so `cmd.exe` sees it exactly as typed.
    pub fn sequence_invocation(&self, directory: &Path, command_sequence: &str) -> Invocation {
        Invocation::new("cmd", &["/K"], directory).with_raw_tail(command_sequence)
    }
}

impl PlatformLauncher for WindowsLauncher {
    fn platform(&self) -> &'static str {
        Platform::Windows.as_str()
    }

    fn open_interactive_terminal(&self, directory: &Path) -> Result<()> {
        tracing::info!(path = %directory.display(), "Opening PowerShell");
        dispatch_terminal(
            self.terminal_invocation(directory),
            Some(self.fallback_terminal_invocation(directory)),
        );
        Ok(())
    }

    fn run_detached_sequence(
        &self,
        directory: &Path,
        command_sequence: &str,
    ) -> Result<SpawnedProcess> {
        let invocation = self.sequence_invocation(directory, command_sequence);
        let mut command = invocation.command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(CREATE_NEW_CONSOLE);
        }

        process::spawn_supervised(command, &invocation.program, self.poll_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launcher() -> WindowsLauncher {
        WindowsLauncher::new(Duration::from_millis(20))
    }

    #[test]
    fn terminal_prefers_powershell_then_cmd() {
        let dir = Path::new("C:\\work\\app");
        assert_eq!(
            launcher().terminal_invocation(dir).describe(),
            "cmd /C start powershell -NoExit"
        );
        assert_eq!(
            launcher().fallback_terminal_invocation(dir).describe(),
            "cmd /C start cmd /K"
        );
        assert_eq!(launcher().terminal_invocation(dir).current_dir, dir);
    }

    #[test]
    fn sequence_runs_in_persistent_console() {
        let invocation = launcher().sequence_invocation(Path::new("C:\\work\\app"), "npm run dev");
        assert_eq!(invocation.program, "cmd");
        assert_eq!(invocation.args, vec!["/K"]);
        assert_eq!(invocation.raw_tail.as_deref(), Some("npm run dev"));
    }

    #[test]
    fn quoted_sequence_is_passed_verbatim() {
        let sequence = r#"echo "a b" && npm start"#;
        let invocation = launcher().sequence_invocation(Path::new("C:\\work\\app"), sequence);
        assert_eq!(invocation.raw_tail.as_deref(), Some(sequence));
        assert_eq!(invocation.describe(), r#"cmd /K echo "a b" && npm start"#);
    }

    #[cfg(windows)]
    #[test]
    fn cmd_receives_quotes_unescaped() {
        let temp = tempfile::TempDir::new().unwrap();
        let output = Invocation::new("cmd", &["/C"], temp.path())
            .with_raw_tail(r#"echo "a b""#)
            .command()
            .output()
            .expect("spawn cmd");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout.trim(), r#""a b""#);
    }
}
