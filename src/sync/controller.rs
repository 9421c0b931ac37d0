use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::core::{Config, ConnectionState, Direction, EngagementState, Error, Result};
use crate::model::{Mode, ModeRegistry, NumericDigitModel};
use crate::protocol::{
    Command, InboundMessage, LivenessMonitor, MeasurementsSnapshot, StateUpdate, TimerEffects,
};
use super::observer::{Observer, Status};
use super::reconciler::Reconciler;

/// Owns the client state and applies every inbound frame and user action
///
/// All mutation goes through `&mut self`, so one task owns the controller
/// and events are applied strictly in arrival order.
pub struct SyncController<O: Observer> {
    /// Configuration
    config: Config,
    /// Setpoint digits
    model: NumericDigitModel,
    /// Output engagement, authoritative from the device
    engagement: EngagementState,
    /// Connection liveness
    liveness: LivenessMonitor,
    /// Setpoint reconciliation policy
    reconciler: Reconciler,
    /// Last readings received
    measurements: Option<MeasurementsSnapshot>,
    /// Outbound command queue
    commands: mpsc::Sender<Command>,
    /// Rendering collaborator
    observer: O,
}

impl<O: Observer> SyncController<O> {
    /// Creates an idle controller waiting for the first connection
    pub fn new(config: Config, commands: mpsc::Sender<Command>, observer: O) -> Self {
        SyncController {
            model: NumericDigitModel::new(),
            engagement: EngagementState::default(),
            liveness: LivenessMonitor::from_config(&config),
            reconciler: Reconciler::from_config(&config),
            measurements: None,
            commands,
            observer,
            config,
        }
    }

    /// Returns the setpoint model
    pub fn model(&self) -> &NumericDigitModel {
        &self.model
    }

    /// Returns the engagement state
    pub fn engagement(&self) -> EngagementState {
        self.engagement
    }

    /// Returns the connection state
    pub fn connection_state(&self) -> ConnectionState {
        self.liveness.current()
    }

    /// Returns the liveness monitor
    pub fn liveness(&self) -> &LivenessMonitor {
        &self.liveness
    }

    /// Returns the last readings received
    pub fn measurements(&self) -> Option<&MeasurementsSnapshot> {
        self.measurements.as_ref()
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the observer
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Returns the observer mutably
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    // --- Transport events ---

    /// Transport opened
    pub fn on_open(&mut self) -> TimerEffects {
        let before = self.liveness.current();
        let effects = self.track_liveness(LivenessMonitor::on_open);
        if before != ConnectionState::Live && self.liveness.current() == ConnectionState::Live {
            self.observer.on_status(&Status::Connected);
        }
        effects
    }

    /// Transport closed
    pub fn on_close(&mut self) -> TimerEffects {
        let effects = self.track_liveness(LivenessMonitor::on_close);
        self.observer.on_status(&Status::Disconnected);
        effects
    }

    /// Transport errored
    pub fn on_error(&mut self, reason: &str) -> TimerEffects {
        let effects = self.track_liveness(LivenessMonitor::on_error);
        self.observer.on_status(&Status::ConnectionError(reason.to_string()));
        effects
    }

    /// Silence timer fired
    pub fn on_silence_elapsed(&mut self) -> TimerEffects {
        let before = self.liveness.current();
        let effects = self.track_liveness(LivenessMonitor::on_silence_elapsed);
        if before == ConnectionState::Live && self.liveness.current() == ConnectionState::SilentTimeout {
            self.observer.on_status(&Status::NoUpdates);
        }
        effects
    }

    /// Reconnect timer fired
    pub fn on_reconnect_started(&mut self) -> TimerEffects {
        self.track_liveness(LivenessMonitor::on_reconnect_started)
    }

    /// Raw text frame received
    ///
    /// Liveness is reset before parsing: a junk frame still proves the
    /// transport is alive.
    pub fn handle_text(&mut self, text: &str) -> TimerEffects {
        let effects = self.record_receipt();
        match InboundMessage::parse(text) {
            Ok(message) => self.apply(message),
            Err(e) => {
                warn!(error = %e, "discarding inbound frame");
                self.observer.on_status(&Status::MessageError(e.to_string()));
            }
        }
        effects
    }

    /// Decoded message received
    pub fn handle_message(&mut self, message: InboundMessage) -> TimerEffects {
        let effects = self.record_receipt();
        self.apply(message);
        effects
    }

    fn record_receipt(&mut self) -> TimerEffects {
        let before = self.liveness.current();
        let effects = self.track_liveness(LivenessMonitor::on_message);
        if before == ConnectionState::SilentTimeout && self.liveness.current() == ConnectionState::Live {
            self.observer.on_status(&Status::UpdatesResumed);
        }
        effects
    }

    fn track_liveness(&mut self, transition: fn(&mut LivenessMonitor) -> TimerEffects) -> TimerEffects {
        let before = self.liveness.current();
        let effects = transition(&mut self.liveness);
        let after = self.liveness.current();
        if before != after {
            self.observer.on_connection_state_changed(after);
        }
        effects
    }

    fn apply(&mut self, message: InboundMessage) {
        if let Some(error) = message.error {
            warn!(%error, "device reported an error");
            self.observer.on_status(&Status::DeviceError(error));
        }

        if let Some(readings) = message.measurements {
            let snapshot = MeasurementsSnapshot::capture(readings);
            self.observer.on_measurements(&snapshot);
            self.measurements = Some(snapshot);
        }

        if let Some(state) = message.state {
            self.apply_state(state.decode(self.config.protocol_revision));
        }
    }

    fn apply_state(&mut self, update: StateUpdate) {
        let incoming_mode = match update.mode.as_deref() {
            Some(code) => match ModeRegistry::lookup(code) {
                Ok(mode) => Some(mode),
                Err(e) => {
                    warn!(code, "ignoring update for unknown mode");
                    self.surface(&e);
                    None
                }
            },
            None => None,
        };

        if let Some(mode) = incoming_mode {
            if mode != self.model.mode() {
                info!(from = %self.model.mode(), to = %mode, "device changed mode");
                self.model.set_mode(mode);
                self.notify_model();
            }
        }

        if let Some(engaged) = update.engaged {
            if engaged != self.engagement.is_engaged() {
                info!(engaged, "device changed engagement");
                self.engagement = EngagementState(engaged);
                self.observer.on_engagement_changed(self.engagement);
            }
        }

        if let (Some(value), Some(mode)) = (update.value, incoming_mode) {
            let local = self.model.to_value();
            let accept = self.reconciler.should_accept_incoming(
                self.model.mode(),
                mode,
                value,
                local,
                self.engagement.is_engaged(),
            );
            if !accept {
                debug!(value, local, "keeping local setpoint");
                return;
            }

            let before = self.model.digits().to_vec();
            match self.model.load_value(value) {
                Ok(()) => {
                    if self.model.digits() != before.as_slice() {
                        self.notify_model();
                    }
                }
                Err(e) => {
                    warn!(error = %e, "device setpoint does not fit display");
                    self.surface(&e);
                }
            }
        }
    }

    // --- User actions ---

    /// Selects a digit for editing
    pub fn user_select_digit(&mut self, position: usize) {
        let before = self.model.selected();
        self.model.select_digit(position);
        if self.model.selected() != before {
            self.notify_model();
        }
    }

    /// Nudges the selected digit and sends the new setpoint
    pub fn user_nudge(&mut self, direction: Direction) -> Result<()> {
        match self.model.nudge_selected(direction, self.config.nudge_strategy) {
            Ok(true) => {
                self.notify_model();
                self.send(Command::SetValue(self.model.to_value()));
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => {
                self.surface(&e);
                Err(e)
            }
        }
    }

    /// Switches to another mode, resetting the setpoint to zero
    pub fn user_set_mode(&mut self, code: &str) -> Result<()> {
        let mode = ModeRegistry::lookup(code).map_err(|e| {
            self.surface(&e);
            e
        })?;

        let code = match mode {
            Mode::Idle => {
                self.user_exit();
                return Ok(());
            }
            Mode::Active(code) => code,
        };

        if mode == self.model.mode() {
            debug!(%mode, "mode already active");
            return Ok(());
        }

        info!(%mode, "switching mode");
        self.model.set_mode(mode);
        self.notify_model();
        self.send(Command::SetMode(code));
        self.send(Command::SetValue(self.model.to_value()));
        Ok(())
    }

    /// Flips engagement optimistically and asks the device to follow
    pub fn user_toggle_engagement(&mut self) {
        self.engagement = self.engagement.toggled();
        self.observer.on_engagement_changed(self.engagement);
        self.send(Command::engagement(
            self.config.protocol_revision,
            self.engagement.is_engaged(),
            self.model.to_value(),
        ));
    }

    /// Leaves the active mode for the idle menu
    pub fn user_exit(&mut self) {
        self.send(Command::Exit);
        if self.model.is_active() {
            self.model.set_mode(Mode::Idle);
            self.notify_model();
        }
    }

    /// Asks the device for an immediate measurement update
    pub fn user_request_measurements(&mut self) {
        self.send(Command::GetMeasurements);
    }

    fn notify_model(&mut self) {
        self.observer
            .on_model_changed(self.model.digits(), self.model.selected(), self.model.mode());
    }

    fn surface(&mut self, error: &Error) {
        let status = match error {
            Error::UnknownMode(code) => Status::UnknownMode(code.clone()),
            Error::Overflow { value, mode } => Status::Overflow {
                value: *value,
                mode: *mode,
            },
            Error::MalformedMessage(msg) => Status::MessageError(msg.clone()),
            other => Status::MessageError(other.to_string()),
        };
        self.observer.on_status(&status);
    }

    fn send(&mut self, command: Command) {
        let state = self.liveness.current();
        if !state.is_open() {
            debug!(command = command.name(), %state, "transport not ready, dropping command");
            return;
        }

        match self.commands.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => {
                warn!(command = command.name(), "command queue full, dropping command");
            }
            Err(TrySendError::Closed(command)) => {
                warn!(command = command.name(), "command queue closed, dropping command");
            }
        }
    }
}
