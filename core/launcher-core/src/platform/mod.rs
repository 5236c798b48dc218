//! OS-specific strategies for opening terminals and running command sequences.
//! Add new variants in `launcher_for` so they are selected at startup.

mod linux;
mod macos;
pub mod process;
mod windows;

pub use linux::LinuxLauncher;
pub use macos::MacOsLauncher;
pub use process::{ProcessControl, ProcessEvent, ProcessHandle, SpawnedProcess};
pub use windows::WindowsLauncher;

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use crate::config::RuntimeConfig;
use crate::error::{LauncherError, Result};

/// Capability set every platform variant provides.
///
/// Implementors should:
/// - Never block longer than an OS spawn call
/// - Log (not return) failures of fire-and-forget terminal launches
/// - Pass the command sequence through verbatim, empty or not
pub trait PlatformLauncher: Send + Sync {
    /// Short identifier of the variant (e.g., "linux").
    fn platform(&self) -> &'static str;

    /// Opens an interactive terminal at `directory`. Returns once the attempt
    /// has been dispatched.
    fn open_interactive_terminal(&self, directory: &Path) -> Result<()>;

    /// Runs `command_sequence` through the platform's command interpreter as a
    /// detached child rooted at `directory`.
    fn run_detached_sequence(
        &self,
        directory: &Path,
        command_sequence: &str,
    ) -> Result<SpawnedProcess>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    pub fn current() -> Option<Self> {
        if cfg!(target_os = "windows") {
            Some(Platform::Windows)
        } else if cfg!(target_os = "macos") {
            Some(Platform::MacOs)
        } else if cfg!(target_os = "linux") {
            Some(Platform::Linux)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
        }
    }
}

/// Selects the launcher variant for `platform`; `None` yields a launcher whose
/// operations fail with `PlatformUnsupported`.
pub fn launcher_for(platform: Option<Platform>, config: &RuntimeConfig) -> Arc<dyn PlatformLauncher> {
    let poll = config.exit_poll_interval();
    match platform {
        Some(Platform::Windows) => Arc::new(WindowsLauncher::new(poll)),
        Some(Platform::MacOs) => Arc::new(MacOsLauncher::new(poll)),
        Some(Platform::Linux) => Arc::new(LinuxLauncher::new(&config.linux_terminal, poll)),
        None => Arc::new(UnsupportedLauncher::new(std::env::consts::OS)),
    }
}

/// Launcher for the running OS.
pub fn detect(config: &RuntimeConfig) -> Arc<dyn PlatformLauncher> {
    launcher_for(Platform::current(), config)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Invocations
// ═══════════════════════════════════════════════════════════════════════════════

/// A fully resolved program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Appended after `args` without any quoting or escaping on Windows,
    /// where `cmd.exe` parses its own command line.
    pub raw_tail: Option<String>,
    pub current_dir: PathBuf,
}

impl Invocation {
    pub fn new(program: &str, args: &[&str], current_dir: &Path) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            raw_tail: None,
            current_dir: current_dir.to_path_buf(),
        }
    }

    pub fn with_raw_tail(mut self, tail: &str) -> Self {
        self.raw_tail = Some(tail.to_string());
        self
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).current_dir(&self.current_dir);
        if let Some(tail) = &self.raw_tail {
            append_raw(&mut command, tail);
        }
        command
    }

    pub fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(|arg| arg.as_str()))
            .chain(self.raw_tail.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn run_to_completion(&self) -> std::result::Result<(), String> {
        let status = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|err| err.to_string())?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("exited with {status}"))
        }
    }
}

#[cfg(windows)]
fn append_raw(command: &mut Command, tail: &str) {
    use std::os::windows::process::CommandExt;
    command.raw_arg(tail);
}

#[cfg(not(windows))]
fn append_raw(command: &mut Command, tail: &str) {
    command.arg(tail);
}

/// `sh -c <sequence>` rooted at `directory`, shared by the POSIX variants.
pub(crate) fn posix_sequence_invocation(directory: &Path, command_sequence: &str) -> Invocation {
    Invocation::new("sh", &["-c", command_sequence], directory)
}

/// Spawns a POSIX sequence silently in its own process group so terminal
/// signals aimed at the launcher do not reach it.
pub(crate) fn spawn_posix_sequence(
    invocation: &Invocation,
    poll_interval: std::time::Duration,
) -> Result<SpawnedProcess> {
    let mut command = invocation.command();
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    process::spawn_supervised(command, &invocation.program, poll_interval)
}

/// Which attempt of a terminal launch succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TerminalOutcome {
    Primary,
    Fallback,
    Failed,
}

/// Runs `primary`, then `fallback` at most once if the primary fails.
pub(crate) fn run_terminal_chain(
    primary: &Invocation,
    fallback: Option<&Invocation>,
) -> TerminalOutcome {
    let err = match primary.run_to_completion() {
        Ok(()) => {
            tracing::info!(command = %primary.describe(), "Opened terminal");
            return TerminalOutcome::Primary;
        }
        Err(err) => err,
    };
    tracing::error!(command = %primary.describe(), error = %err, "Terminal launch failed");

    let Some(fallback) = fallback else {
        return TerminalOutcome::Failed;
    };
    match fallback.run_to_completion() {
        Ok(()) => {
            tracing::info!(command = %fallback.describe(), "Opened fallback terminal");
            TerminalOutcome::Fallback
        }
        Err(err) => {
            tracing::error!(
                command = %fallback.describe(),
                error = %err,
                "Fallback terminal launch failed"
            );
            TerminalOutcome::Failed
        }
    }
}

/// Runs the terminal chain in the background. Outcomes are only logged.
pub(crate) fn dispatch_terminal(primary: Invocation, fallback: Option<Invocation>) {
    let spawned = thread::Builder::new()
        .name("open-terminal".to_string())
        .spawn(move || {
            run_terminal_chain(&primary, fallback.as_ref());
        });

    if let Err(err) = spawned {
        tracing::error!(error = %err, "Failed to start terminal launcher thread");
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Unsupported Platforms
// ═══════════════════════════════════════════════════════════════════════════════

/// Stand-in selected when no strategy matches the running OS.
#[derive(Debug, Clone)]
pub struct UnsupportedLauncher {
    os: String,
}

impl UnsupportedLauncher {
    pub fn new(os: &str) -> Self {
        Self { os: os.to_string() }
    }
}

impl PlatformLauncher for UnsupportedLauncher {
    fn platform(&self) -> &'static str {
        "unsupported"
    }

    fn open_interactive_terminal(&self, _directory: &Path) -> Result<()> {
        Err(LauncherError::PlatformUnsupported(self.os.clone()))
    }

    fn run_detached_sequence(
        &self,
        _directory: &Path,
        _command_sequence: &str,
    ) -> Result<SpawnedProcess> {
        Err(LauncherError::PlatformUnsupported(self.os.clone()))
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use std::collections::HashMap;
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::sync::Mutex;

    /// What the fake launcher observed, in order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum FakeOp {
        TerminalOpened(PathBuf),
        Spawned {
            pid: u32,
            directory: PathBuf,
            command_sequence: String,
        },
        TerminateRequested(u32),
    }

    #[derive(Default)]
    struct FakeState {
        next_pid: u32,
        ops: Vec<FakeOp>,
        controls: Vec<(u32, Receiver<ProcessControl>)>,
        emitters: HashMap<u32, Sender<ProcessEvent>>,
        fail_next_spawn: bool,
    }

    impl FakeState {
        /// Records termination requests delivered since the last call.
        fn collect_terminations(&mut self) {
            let mut requested = Vec::new();
            for (pid, control) in &self.controls {
                while let Ok(ProcessControl::Terminate) = control.try_recv() {
                    requested.push(*pid);
                }
            }
            self.ops
                .extend(requested.into_iter().map(FakeOp::TerminateRequested));
        }
    }

    /// Recording launcher: hands out fake pids and lets tests inject events.
    pub struct FakeLauncher {
        state: Mutex<FakeState>,
    }

    impl Default for FakeLauncher {
        fn default() -> Self {
            Self {
                state: Mutex::new(FakeState {
                    next_pid: 1000,
                    ..FakeState::default()
                }),
            }
        }
    }

    impl FakeLauncher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn ops(&self) -> Vec<FakeOp> {
            let mut state = self.state.lock().unwrap();
            state.collect_terminations();
            state.ops.clone()
        }

        pub fn terminations(&self) -> Vec<u32> {
            self.ops()
                .into_iter()
                .filter_map(|op| match op {
                    FakeOp::TerminateRequested(pid) => Some(pid),
                    _ => None,
                })
                .collect()
        }

        pub fn fail_next_spawn(&self) {
            self.state.lock().unwrap().fail_next_spawn = true;
        }

        /// Pushes `event` onto the stream of the process with `pid`.
        pub fn emit(&self, pid: u32, event: ProcessEvent) {
            let state = self.state.lock().unwrap();
            if let Some(sender) = state.emitters.get(&pid) {
                let _ = sender.send(event);
            }
        }
    }

    impl PlatformLauncher for FakeLauncher {
        fn platform(&self) -> &'static str {
            "fake"
        }

        fn open_interactive_terminal(&self, directory: &Path) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.ops.push(FakeOp::TerminalOpened(directory.to_path_buf()));
            Ok(())
        }

        fn run_detached_sequence(
            &self,
            directory: &Path,
            command_sequence: &str,
        ) -> Result<SpawnedProcess> {
            let mut state = self.state.lock().unwrap();
            state.collect_terminations();

            if state.fail_next_spawn {
                state.fail_next_spawn = false;
                return Err(LauncherError::launch("fake", "spawn refused"));
            }

            state.next_pid += 1;
            let pid = state.next_pid;
            state.ops.push(FakeOp::Spawned {
                pid,
                directory: directory.to_path_buf(),
                command_sequence: command_sequence.to_string(),
            });

            let (control_tx, control_rx) = mpsc::channel();
            let (event_tx, event_rx) = mpsc::channel();
            state.controls.push((pid, control_rx));
            state.emitters.insert(pid, event_tx);

            Ok(SpawnedProcess {
                handle: ProcessHandle::new(pid, control_tx),
                events: event_rx,
            })
        }
    }
}
