use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::core::{Config, ConnectionState, Error, Result};
use crate::protocol::{Command, SilenceTimer, TimerEffects};
use crate::sync::{Observer, SyncController};
use super::{ReconnectRequest, TransportEvent, UserAction};

/// Sending side of a session's inputs
#[derive(Clone)]
pub struct SessionHandle {
    events: mpsc::Sender<TransportEvent>,
    actions: mpsc::Sender<UserAction>,
}

impl SessionHandle {
    /// Forwards a transport event
    pub async fn send_event(&self, event: TransportEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|e| Error::transport_lost(format!("Session stopped: {}", e)))
    }

    /// Forwards a user action
    pub async fn send_action(&self, action: UserAction) -> Result<()> {
        self.actions
            .send(action)
            .await
            .map_err(|e| Error::protocol(format!("Session stopped: {}", e)))
    }

    /// Returns a sender for transport events
    pub fn events(&self) -> mpsc::Sender<TransportEvent> {
        self.events.clone()
    }
}

/// Receiving side of a session's outputs
pub struct SessionIo {
    /// Commands for the transport to write
    pub commands: mpsc::Receiver<Command>,
    /// Requests for the transport to open a new connection
    pub reconnects: mpsc::Receiver<ReconnectRequest>,
}

/// Event loop that owns the controller and its two timers
pub struct Session<O: Observer> {
    /// Client state
    controller: SyncController<O>,
    /// Transport events
    events: mpsc::Receiver<TransportEvent>,
    /// User actions
    actions: mpsc::Receiver<UserAction>,
    /// Reconnect requests
    reconnect_tx: mpsc::Sender<ReconnectRequest>,
    /// Pending silence timer
    silence_deadline: Option<Instant>,
    /// Pending reconnect timer
    reconnect_deadline: Option<Instant>,
}

impl<O: Observer> Session<O> {
    /// Creates a session and the channels used to drive it
    pub fn new(config: Config, observer: O) -> Result<(Self, SessionHandle, SessionIo)> {
        config.validate()?;

        let (events_tx, events_rx) = mpsc::channel(config.command_buffer);
        let (actions_tx, actions_rx) = mpsc::channel(config.command_buffer);
        let (commands_tx, commands_rx) = mpsc::channel(config.command_buffer);
        let (reconnect_tx, reconnect_rx) = mpsc::channel(1);

        let session = Session {
            controller: SyncController::new(config, commands_tx, observer),
            events: events_rx,
            actions: actions_rx,
            reconnect_tx,
            silence_deadline: None,
            reconnect_deadline: None,
        };
        let handle = SessionHandle {
            events: events_tx,
            actions: actions_tx,
        };
        let io = SessionIo {
            commands: commands_rx,
            reconnects: reconnect_rx,
        };
        Ok((session, handle, io))
    }

    /// Returns the controller
    pub fn controller(&self) -> &SyncController<O> {
        &self.controller
    }

    /// Runs until every handle is dropped, then returns the controller
    pub async fn run(mut self) -> Result<SyncController<O>> {
        let mut events_open = true;
        let mut actions_open = true;

        while events_open || actions_open {
            tokio::select! {
                event = self.events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        debug!("transport event channel closed");
                        events_open = false;
                    }
                },

                action = self.actions.recv(), if actions_open => match action {
                    Some(action) => self.handle_action(action),
                    None => {
                        debug!("user action channel closed");
                        actions_open = false;
                    }
                },

                _ = sleep_until_deadline(self.silence_deadline) => {
                    self.silence_deadline = None;
                    let effects = self.controller.on_silence_elapsed();
                    self.apply(effects);
                }

                _ = sleep_until_deadline(self.reconnect_deadline) => {
                    self.reconnect_deadline = None;
                    let effects = self.controller.on_reconnect_started();
                    self.apply(effects);
                    if self.controller.connection_state() == ConnectionState::Connecting {
                        self.request_reconnect();
                    }
                }
            }
        }

        info!(state = %self.controller.connection_state(), "session finished");
        Ok(self.controller)
    }

    fn handle_event(&mut self, event: TransportEvent) {
        let effects = match event {
            TransportEvent::Opened => self.controller.on_open(),
            TransportEvent::Message(text) => self.controller.handle_text(&text),
            TransportEvent::Closed => self.controller.on_close(),
            TransportEvent::Error(reason) => self.controller.on_error(&reason),
        };
        self.apply(effects);
    }

    fn handle_action(&mut self, action: UserAction) {
        let result = match action {
            UserAction::SelectDigit(position) => {
                self.controller.user_select_digit(position);
                Ok(())
            }
            UserAction::Nudge(direction) => self.controller.user_nudge(direction),
            UserAction::SetMode(code) => self.controller.user_set_mode(&code),
            UserAction::ToggleEngagement => {
                self.controller.user_toggle_engagement();
                Ok(())
            }
            UserAction::Exit => {
                self.controller.user_exit();
                Ok(())
            }
            UserAction::RequestMeasurements => {
                self.controller.user_request_measurements();
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!(error = %e, "user action rejected");
        }
    }

    fn apply(&mut self, effects: TimerEffects) {
        match effects.silence {
            Some(SilenceTimer::Arm(window)) => self.silence_deadline = Some(Instant::now() + window),
            Some(SilenceTimer::Cancel) => self.silence_deadline = None,
            None => {}
        }
        if effects.cancel_reconnect {
            debug!("scheduled reconnect dropped");
            self.reconnect_deadline = None;
        }
        if let Some(delay) = effects.reconnect_after {
            debug!(?delay, "reconnect scheduled");
            self.reconnect_deadline = Some(Instant::now() + delay);
        }
    }

    fn request_reconnect(&mut self) {
        let request = ReconnectRequest {
            attempt: self.controller.liveness().info().attempts,
        };
        if let Err(e) = self.reconnect_tx.try_send(request) {
            warn!(error = %e, "reconnect request not delivered");
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => futures::future::pending().await,
    }
}
