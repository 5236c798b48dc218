//! Routes named commands to the registry or the broker and converts every
//! outcome into a [`Response`]. Nothing below `dispatch` reaches the caller
//! as an error.

use lazy_launcher_protocol::{
    parse_payload, parse_project_id, parse_start_project, Broadcast, CommandName, ErrorInfo,
    OpenTerminalParams, Request, Response, SetLocaleParams, SetThemeParams, PROTOCOL_VERSION,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::broker::{StateSyncBroker, SubscriberId};
use crate::error::{LauncherError, Result};
use crate::platform::PlatformLauncher;
use crate::registry::{EventSink, ProcessRegistry, SessionEvent};

pub const APP_NAME: &str = "Lazy Project Launcher";

/// Who issued a command. Only the privileged side may change UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    View,
    Privileged,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::View => "view",
            Origin::Privileged => "privileged",
        }
    }
}

pub struct Controller {
    launcher: Arc<dyn PlatformLauncher>,
    registry: ProcessRegistry,
    broker: StateSyncBroker,
}

impl Controller {
    pub fn new(launcher: Arc<dyn PlatformLauncher>, broker: StateSyncBroker, sink: EventSink) -> Self {
        Self {
            registry: ProcessRegistry::new(Arc::clone(&launcher), sink),
            launcher,
            broker,
        }
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn broker(&self) -> &StateSyncBroker {
        &self.broker
    }

    pub fn dispatch(&mut self, origin: Origin, request: Request) -> Response {
        let id = request.id.clone();
        let command = request.command.clone();
        tracing::debug!(command = %command, origin = origin.as_str(), "Dispatching command");

        match self.route(origin, request) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(command = %command, code = err.code(), error = %err, "Command failed");
                Response::failure(id, err.code(), err.to_string())
            }
        }
    }

    /// Registers a view for broadcasts and returns the state it starts from.
    pub fn subscribe(
        &mut self,
        id: Option<String>,
        events: Sender<Broadcast>,
    ) -> (SubscriberId, Response) {
        let subscriber = self.broker.add_subscriber(events);
        tracing::info!(subscribers = self.broker.subscriber_count(), "View subscribed");
        (subscriber, Response::ok(id).with_data(to_data(&self.broker.state())))
    }

    pub fn unsubscribe(&mut self, subscriber: SubscriberId) {
        if self.broker.remove_subscriber(subscriber) {
            tracing::info!(subscribers = self.broker.subscriber_count(), "View unsubscribed");
        }
    }

    pub fn handle_session_event(&mut self, event: SessionEvent) -> bool {
        self.registry.handle_event(event)
    }

    fn route(&mut self, origin: Origin, request: Request) -> Result<Response> {
        let Request {
            command,
            id,
            payload,
        } = request;

        let name = match CommandName::parse(&command) {
            Some(name) if name.is_privileged() && origin == Origin::View => None,
            other => other,
        };
        let Some(name) = name else {
            return Err(LauncherError::UnknownCommand(command));
        };

        match name {
            CommandName::OpenTerminal => {
                let params: OpenTerminalParams =
                    parse_payload(name, payload).map_err(|err| invalid(name, err))?;
                let directory = match params.path.filter(|path| !path.trim().is_empty()) {
                    Some(path) => PathBuf::from(path),
                    None => std::env::current_dir()
                        .map_err(|err| LauncherError::launch("open-terminal", err))?,
                };
                self.launcher.open_interactive_terminal(&directory)?;
                Ok(Response::ok(id))
            }
            CommandName::StartProject => {
                let params = parse_start_project(payload).map_err(|err| invalid(name, err))?;
                let pid = self.registry.start(
                    &params.project_id,
                    &PathBuf::from(&params.path),
                    &params.commands,
                )?;
                Ok(Response::ok(id).with_process_id(pid))
            }
            CommandName::StopProject => {
                let params = parse_project_id(name, payload).map_err(|err| invalid(name, err))?;
                if self.registry.stop(&params.project_id) {
                    Ok(Response::ok(id))
                } else {
                    Ok(Response::ok(id).with_message("not running"))
                }
            }
            CommandName::ProjectStatus => {
                let params = parse_project_id(name, payload).map_err(|err| invalid(name, err))?;
                let running = self.registry.is_running(&params.project_id);
                Ok(Response::ok(id).with_data(json!({
                    "projectId": params.project_id,
                    "running": running,
                })))
            }
            CommandName::ListSessions => {
                Ok(Response::ok(id).with_data(to_data(&self.registry.summaries())))
            }
            CommandName::GetUiState => Ok(Response::ok(id).with_data(to_data(&self.broker.state()))),
            CommandName::AppInfo => Ok(Response::ok(id).with_data(json!({
                "name": APP_NAME,
                "version": env!("CARGO_PKG_VERSION"),
                "platform": self.launcher.platform(),
                "protocolVersion": PROTOCOL_VERSION,
            }))),
            CommandName::Subscribe => Err(LauncherError::InvalidPayload {
                command,
                details: "subscribe needs a streaming connection".to_string(),
            }),
            CommandName::SetTheme => {
                let params: SetThemeParams =
                    parse_payload(name, payload).map_err(|err| invalid(name, err))?;
                self.broker.set_theme(&params.theme);
                Ok(Response::ok(id).with_data(to_data(&self.broker.state())))
            }
            CommandName::SetLocale => {
                let params: SetLocaleParams =
                    parse_payload(name, payload).map_err(|err| invalid(name, err))?;
                self.broker.set_locale(&params.locale);
                Ok(Response::ok(id).with_data(to_data(&self.broker.state())))
            }
        }
    }
}

fn invalid(command: CommandName, err: ErrorInfo) -> LauncherError {
    LauncherError::InvalidPayload {
        command: command.to_string(),
        details: err.message,
    }
}

fn to_data<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        tracing::error!(error = %err, "Failed to serialize response data");
        Value::Null
    })
}
