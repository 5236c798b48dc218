//! Supervised child processes and their event streams.
//!
//! A spawned child is owned by a supervisor thread, not by the caller. The
//! caller gets a [`ProcessHandle`] (pid plus a control channel) and a
//! receiver of [`ProcessEvent`]s. Two reader threads forward stdout/stderr
//! line chunks; the supervisor polls for exit and honours termination
//! requests. Dropping the handle only closes the control channel; the child
//! keeps running and its events keep flowing until it exits.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use crate::error::{LauncherError, Result};

/// Events observed on a supervised child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// One chunk (line) of standard output.
    Output(String),
    /// One chunk (line) of standard error.
    ErrorOutput(String),
    /// Terminal: the process exited. `None` when killed by a signal.
    Exited(Option<i32>),
    /// Terminal: the process could not be observed after launch.
    Failed(String),
}

impl ProcessEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessEvent::Exited(_) | ProcessEvent::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessControl {
    Terminate,
}

/// Exclusive handle to a supervised child.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    control: Sender<ProcessControl>,
}

impl ProcessHandle {
    pub fn new(pid: u32, control: Sender<ProcessControl>) -> Self {
        Self { pid, control }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Asks the supervisor to terminate the child. Delivery is the only
    /// thing reported here; the kill itself happens on the supervisor thread.
    pub fn terminate(&self) -> Result<()> {
        self.control
            .send(ProcessControl::Terminate)
            .map_err(|_| LauncherError::TerminateFailed {
                pid: self.pid,
                details: "process supervisor has already exited".to_string(),
            })
    }
}

/// A freshly launched child: its handle plus its event stream.
#[derive(Debug)]
pub struct SpawnedProcess {
    pub handle: ProcessHandle,
    pub events: Receiver<ProcessEvent>,
}

/// Spawns `command` and hands the child to a supervisor thread.
///
/// `label` names the command in errors and logs. Synchronous launch failures
/// are returned as `LaunchFailure`; later failures arrive as
/// [`ProcessEvent::Failed`].
pub fn spawn_supervised(
    mut command: Command,
    label: &str,
    poll_interval: Duration,
) -> Result<SpawnedProcess> {
    let mut child = command
        .spawn()
        .map_err(|err| LauncherError::launch(label, err))?;
    let pid = child.id();

    let (event_tx, event_rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        spawn_reader(stdout, event_tx.clone(), ProcessEvent::Output, format!("stdout-{pid}"));
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader(
            stderr,
            event_tx.clone(),
            ProcessEvent::ErrorOutput,
            format!("stderr-{pid}"),
        );
    }

    let (control_tx, control_rx) = mpsc::channel();
    thread::Builder::new()
        .name(format!("supervise-{pid}"))
        .spawn(move || supervise(child, control_rx, event_tx, poll_interval))
        .map_err(|err| {
            LauncherError::launch(label, format!("could not start supervisor thread: {err}"))
        })?;

    Ok(SpawnedProcess {
        handle: ProcessHandle::new(pid, control_tx),
        events: event_rx,
    })
}

fn spawn_reader<R>(
    stream: R,
    events: Sender<ProcessEvent>,
    wrap: fn(String) -> ProcessEvent,
    name: String,
) where
    R: Read + Send + 'static,
{
    let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            match reader.read_until(b'\n', &mut buffer) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let chunk = String::from_utf8_lossy(&buffer)
                        .trim_end_matches(&['\r', '\n'][..])
                        .to_string();
                    if events.send(wrap(chunk)).is_err() {
                        break;
                    }
                }
            }
        }
    });

    if let Err(err) = spawned {
        tracing::warn!(stream = %name, error = %err, "Failed to start output reader");
    }
}

fn supervise(
    mut child: Child,
    control: Receiver<ProcessControl>,
    events: Sender<ProcessEvent>,
    poll_interval: Duration,
) {
    let pid = child.id();
    let mut control_open = true;

    loop {
        if control_open {
            match control.try_recv() {
                Ok(ProcessControl::Terminate) => match terminate_tree(&mut child) {
                    Ok(()) => tracing::debug!(pid, "Termination signal delivered"),
                    Err(err) => tracing::warn!(pid, error = %err, "Termination request failed"),
                },
                Err(TryRecvError::Empty) => {}
                // Handle dropped: keep observing, never kill.
                Err(TryRecvError::Disconnected) => control_open = false,
            }
        }

        match child.try_wait() {
            Ok(Some(status)) => {
                let _ = events.send(ProcessEvent::Exited(status.code()));
                return;
            }
            Ok(None) => thread::sleep(poll_interval),
            Err(err) => {
                let _ = events.send(ProcessEvent::Failed(err.to_string()));
                return;
            }
        }
    }
}

#[cfg(unix)]
fn terminate_tree(child: &mut Child) -> std::io::Result<()> {
    // POSIX children lead their own process group; signal the whole group so
    // the commands `sh -c` started go down with it.
    let pgid = child.id() as libc::pid_t;
    let rc = unsafe { libc::kill(-pgid, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        child.kill()
    }
}

#[cfg(not(unix))]
fn terminate_tree(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}
