//! Single-threaded event loop that owns the [`Controller`].
//!
//! Transport threads, the privileged console and session pumps all post into
//! one inbox. Messages are handled one at a time to completion, so registry
//! and broker state need no locking and a restart (terminate, then spawn)
//! never interleaves with another command.

use lazy_launcher_protocol::{Broadcast, Request, Response};
use std::ops::Deref;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::broker::{StateSyncBroker, SubscriberId};
use crate::controller::{Controller, Origin};
use crate::error::{LauncherError, Result};
use crate::platform::PlatformLauncher;
use crate::registry::{EventSink, SessionEvent};

pub enum RuntimeMessage {
    Command {
        origin: Origin,
        request: Request,
        reply: Sender<Response>,
    },
    Subscribe {
        id: Option<String>,
        events: Sender<Broadcast>,
        reply: Sender<(SubscriberId, Response)>,
    },
    Unsubscribe(SubscriberId),
    Session(SessionEvent),
    Shutdown,
}

pub struct Runtime {
    controller: Controller,
    inbox: Receiver<RuntimeMessage>,
}

impl Runtime {
    /// Builds the loop and its front door. Nothing runs until [`Runtime::run`].
    pub fn new(launcher: Arc<dyn PlatformLauncher>, broker: StateSyncBroker) -> (Self, RuntimeHandle) {
        let (tx, inbox) = mpsc::channel();

        let session_tx = tx.clone();
        let sink: EventSink = Arc::new(move |event: SessionEvent| {
            if session_tx.send(RuntimeMessage::Session(event)).is_err() {
                tracing::debug!("Runtime stopped; dropping session event");
            }
        });

        let runtime = Self {
            controller: Controller::new(launcher, broker, sink),
            inbox,
        };
        (runtime, RuntimeHandle { inbox: tx })
    }

    /// Runs on the calling thread until a `Shutdown` message arrives.
    pub fn run(mut self) {
        tracing::info!("Runtime started");

        while let Ok(message) = self.inbox.recv() {
            match message {
                RuntimeMessage::Command {
                    origin,
                    request,
                    reply,
                } => {
                    let response = self.controller.dispatch(origin, request);
                    let _ = reply.send(response);
                }
                RuntimeMessage::Subscribe { id, events, reply } => {
                    let subscription = self.controller.subscribe(id, events);
                    let _ = reply.send(subscription);
                }
                RuntimeMessage::Unsubscribe(subscriber) => {
                    self.controller.unsubscribe(subscriber);
                }
                RuntimeMessage::Session(event) => {
                    self.controller.handle_session_event(event);
                }
                RuntimeMessage::Shutdown => break,
            }
        }

        tracing::info!(
            tracked_sessions = self.controller.registry().len(),
            "Runtime stopped; tracked processes keep running"
        );
    }
}

/// Spawns the runtime on its own thread.
pub fn spawn(
    launcher: Arc<dyn PlatformLauncher>,
    broker: StateSyncBroker,
) -> std::io::Result<(RuntimeHandle, JoinHandle<()>)> {
    let (runtime, handle) = Runtime::new(launcher, broker);
    let thread = thread::Builder::new()
        .name("launcher-runtime".to_string())
        .spawn(move || runtime.run())?;
    Ok((handle, thread))
}

/// Cloneable sender side of the runtime inbox.
#[derive(Clone)]
pub struct RuntimeHandle {
    inbox: Sender<RuntimeMessage>,
}

impl RuntimeHandle {
    /// Sends a command and waits for its response.
    pub fn dispatch(&self, origin: Origin, request: Request) -> Response {
        let id = request.id.clone();
        let (reply, response) = mpsc::channel();
        let message = RuntimeMessage::Command {
            origin,
            request,
            reply,
        };

        if self.inbox.send(message).is_err() {
            return stopped(id);
        }
        response.recv().unwrap_or_else(|_| stopped(id))
    }

    /// Subscribes to broadcasts. Returns the initial-state response and the
    /// broadcast stream.
    pub fn subscribe(&self, id: Option<String>) -> Result<(Response, Subscription)> {
        let (events, broadcasts) = mpsc::channel();
        let (reply, response) = mpsc::channel();

        self.inbox
            .send(RuntimeMessage::Subscribe { id, events, reply })
            .map_err(|_| LauncherError::RuntimeStopped)?;
        let (subscriber, response) = response.recv().map_err(|_| LauncherError::RuntimeStopped)?;
        let subscription = Subscription {
            subscriber,
            broadcasts,
            inbox: self.inbox.clone(),
        };
        Ok((response, subscription))
    }

    pub fn shutdown(&self) {
        if self.inbox.send(RuntimeMessage::Shutdown).is_err() {
            tracing::debug!("Runtime already stopped");
        }
    }
}

/// Broadcast stream of one view. Dropping it unregisters the view.
pub struct Subscription {
    subscriber: SubscriberId,
    broadcasts: Receiver<Broadcast>,
    inbox: Sender<RuntimeMessage>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.subscriber
    }
}

impl Deref for Subscription {
    type Target = Receiver<Broadcast>;

    fn deref(&self) -> &Self::Target {
        &self.broadcasts
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.inbox.send(RuntimeMessage::Unsubscribe(self.subscriber));
    }
}

fn stopped(id: Option<String>) -> Response {
    let err = LauncherError::RuntimeStopped;
    Response::failure(id, err.code(), err.to_string())
}
