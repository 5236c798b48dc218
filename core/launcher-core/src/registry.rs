//! Tracks the per-project child processes started through the launcher.
//!
//! One [`ProjectSession`] per project id. Starting a project that already has
//! a session first asks the old process to terminate, then spawns the new
//! one. Stopping only drops the bookkeeping: the OS process keeps running,
//! detached from the launcher's lifecycle.
//!
//! Each session's event stream is drained by a pump thread that logs output
//! and forwards exit/error notifications to the registry's [`EventSink`].
//! The owner of the registry feeds those back through
//! [`ProcessRegistry::handle_event`], which removes the entry if (and only if)
//! it still belongs to the process that produced the event.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;

use crate::error::{LauncherError, Result};
use crate::platform::{PlatformLauncher, ProcessEvent, ProcessHandle};
use crate::process_info::is_process_alive;

/// Distinguishes successive sessions of the same project id.
pub type SessionToken = u64;

/// A lifecycle event tagged with the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub project_id: String,
    pub token: SessionToken,
    pub pid: u32,
    pub event: ProcessEvent,
}

/// Where session pumps deliver exit/error events.
pub type EventSink = Arc<dyn Fn(SessionEvent) + Send + Sync>;

#[derive(Debug)]
pub struct ProjectSession {
    pub project_id: String,
    pub working_directory: PathBuf,
    pub command_sequence: String,
    pub started_at: DateTime<Utc>,
    token: SessionToken,
    handle: ProcessHandle,
}

impl ProjectSession {
    pub fn pid(&self) -> u32 {
        self.handle.pid()
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }
}

/// Serializable view of a tracked session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub project_id: String,
    pub process_id: u32,
    pub working_directory: String,
    pub command_sequence: String,
    pub started_at: DateTime<Utc>,
    pub alive: bool,
}

pub struct ProcessRegistry {
    launcher: Arc<dyn PlatformLauncher>,
    sessions: HashMap<String, ProjectSession>,
    sink: EventSink,
    next_token: SessionToken,
}

impl ProcessRegistry {
    pub fn new(launcher: Arc<dyn PlatformLauncher>, sink: EventSink) -> Self {
        Self {
            launcher,
            sessions: HashMap::new(),
            sink,
            next_token: 0,
        }
    }

    /// Starts `command_sequence` for `project_id`, replacing any tracked
    /// session. Returns the native process id.
    pub fn start(
        &mut self,
        project_id: &str,
        working_directory: &Path,
        command_sequence: &str,
    ) -> Result<u32> {
        if let Some(previous) = self.sessions.remove(project_id) {
            tracing::info!(
                project_id = %project_id,
                pid = previous.pid(),
                "Project already running; terminating previous process"
            );
            if let Err(err) = previous.handle.terminate() {
                tracing::warn!(project_id = %project_id, error = %err, "Could not terminate previous process");
            }
        }

        if !working_directory.is_dir() {
            return Err(LauncherError::launch(
                command_sequence,
                format!(
                    "working directory does not exist: {}",
                    working_directory.display()
                ),
            ));
        }

        let spawned = self
            .launcher
            .run_detached_sequence(working_directory, command_sequence)?;
        let pid = spawned.handle.pid();
        self.next_token += 1;
        let token = self.next_token;

        self.watch(project_id, token, pid, spawned.events);
        self.sessions.insert(
            project_id.to_string(),
            ProjectSession {
                project_id: project_id.to_string(),
                working_directory: working_directory.to_path_buf(),
                command_sequence: command_sequence.to_string(),
                started_at: Utc::now(),
                token,
                handle: spawned.handle,
            },
        );

        tracing::info!(
            project_id = %project_id,
            pid,
            path = %working_directory.display(),
            commands = %command_sequence,
            "Project started"
        );
        Ok(pid)
    }

    /// Stops tracking `project_id`. The process itself is left running.
    /// Returns whether a session was tracked.
    pub fn stop(&mut self, project_id: &str) -> bool {
        match self.sessions.remove(project_id) {
            Some(session) => {
                tracing::info!(
                    project_id = %project_id,
                    pid = session.pid(),
                    "Project removed from tracking; process left running"
                );
                true
            }
            None => {
                tracing::info!(project_id = %project_id, "Project not running");
                false
            }
        }
    }

    pub fn is_running(&self, project_id: &str) -> bool {
        self.sessions.contains_key(project_id)
    }

    pub fn get(&self, project_id: &str) -> Option<&ProjectSession> {
        self.sessions.get(project_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Applies an exit/error event. Returns true when it removed the session.
    /// Events for replaced or already-removed sessions are ignored.
    pub fn handle_event(&mut self, event: SessionEvent) -> bool {
        if !event.event.is_terminal() {
            return false;
        }

        let tracked = self
            .sessions
            .get(&event.project_id)
            .is_some_and(|session| session.token == event.token);
        if !tracked {
            tracing::debug!(
                project_id = %event.project_id,
                pid = event.pid,
                "Lifecycle event for untracked session ignored"
            );
            return false;
        }

        self.sessions.remove(&event.project_id);
        tracing::info!(
            project_id = %event.project_id,
            pid = event.pid,
            "Project removed from tracking after process ended"
        );
        true
    }

    /// Sessions ordered by start time.
    pub fn summaries(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .values()
            .map(|session| SessionSummary {
                project_id: session.project_id.clone(),
                process_id: session.pid(),
                working_directory: session.working_directory.display().to_string(),
                command_sequence: session.command_sequence.clone(),
                started_at: session.started_at,
                alive: is_process_alive(session.pid()),
            })
            .collect();
        summaries.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.project_id.cmp(&b.project_id))
        });
        summaries
    }

    fn watch(
        &self,
        project_id: &str,
        token: SessionToken,
        pid: u32,
        events: Receiver<ProcessEvent>,
    ) {
        let sink = Arc::clone(&self.sink);
        let id = project_id.to_string();
        let spawned = thread::Builder::new()
            .name(format!("session-{pid}"))
            .spawn(move || pump_events(id, token, pid, events, sink));

        if let Err(err) = spawned {
            tracing::warn!(
                project_id = %project_id,
                pid,
                error = %err,
                "Failed to watch project process; exit will not be observed"
            );
        }
    }
}

fn pump_events(
    project_id: String,
    token: SessionToken,
    pid: u32,
    events: Receiver<ProcessEvent>,
    sink: EventSink,
) {
    for event in events {
        match &event {
            ProcessEvent::Output(chunk) => {
                tracing::info!(project_id = %project_id, pid, "stdout: {}", chunk);
                continue;
            }
            ProcessEvent::ErrorOutput(chunk) => {
                tracing::warn!(project_id = %project_id, pid, "stderr: {}", chunk);
                continue;
            }
            ProcessEvent::Exited(code) => {
                tracing::info!(project_id = %project_id, pid, exit_code = ?code, "Project process exited");
            }
            ProcessEvent::Failed(details) => {
                tracing::error!(project_id = %project_id, pid, error = %details, "Project process error");
            }
        }

        sink(SessionEvent {
            project_id: project_id.clone(),
            token,
            pid,
            event,
        });
    }
}
