use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::{Config, ConnectionState};

/// What the timer collaborator must do with the silence timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilenceTimer {
    /// (Re)arm to fire after the given window, replacing any pending fire
    Arm(Duration),
    /// Cancel any pending fire
    Cancel,
}

/// Timer work requested by a liveness transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerEffects {
    /// Silence timer change, if any
    pub silence: Option<SilenceTimer>,
    /// Schedule a single reconnect attempt after this delay
    pub reconnect_after: Option<Duration>,
    /// Drop any scheduled reconnect attempt
    pub cancel_reconnect: bool,
}

impl TimerEffects {
    /// No timer work
    pub fn none() -> Self {
        TimerEffects::default()
    }

    fn arm(window: Duration) -> Self {
        TimerEffects {
            silence: Some(SilenceTimer::Arm(window)),
            ..TimerEffects::default()
        }
    }
}

/// Snapshot of the monitor for status displays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessInfo {
    /// Current state
    pub state: ConnectionState,
    /// Whether a reconnect is scheduled but not started
    pub reconnect_pending: bool,
    /// Connection attempts started since creation
    pub attempts: u32,
}

/// Connection liveness state machine
///
/// Holds no timers itself. Every mutator returns the [`TimerEffects`] the
/// caller must apply, so the machine can be driven by tokio timers in
/// production and by direct calls in tests.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    /// Current state
    state: ConnectionState,
    /// Silence window
    silence_window: Duration,
    /// Delay before reconnecting
    reconnect_delay: Duration,
    /// A reconnect is scheduled and has not started yet
    reconnect_pending: bool,
    /// Connection attempts started
    attempts: u32,
}

impl LivenessMonitor {
    /// Creates a monitor in `Connecting`, for the initial attempt
    pub fn new(silence_window: Duration, reconnect_delay: Duration) -> Self {
        LivenessMonitor {
            state: ConnectionState::Connecting,
            silence_window,
            reconnect_delay,
            reconnect_pending: false,
            attempts: 1,
        }
    }

    /// Creates a monitor using the configured windows
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.silence_window, config.reconnect_delay)
    }

    /// Returns the current state
    pub fn current(&self) -> ConnectionState {
        self.state
    }

    /// Returns a snapshot for status displays
    pub fn info(&self) -> LivenessInfo {
        LivenessInfo {
            state: self.state,
            reconnect_pending: self.reconnect_pending,
            attempts: self.attempts,
        }
    }

    /// Transport reported open
    ///
    /// An open while `Closed` means the transport came back before the
    /// reconnect timer fired; it counts as a new attempt and the scheduled
    /// reconnect is dropped.
    pub fn on_open(&mut self) -> TimerEffects {
        match self.state {
            ConnectionState::Connecting => {
                info!(attempt = self.attempts, "transport open");
                self.state = ConnectionState::Live;
                TimerEffects::arm(self.silence_window)
            }
            ConnectionState::Closed => {
                self.attempts += 1;
                info!(attempt = self.attempts, "transport reopened before reconnect");
                self.state = ConnectionState::Live;
                let cancel_reconnect = std::mem::take(&mut self.reconnect_pending);
                TimerEffects {
                    cancel_reconnect,
                    ..TimerEffects::arm(self.silence_window)
                }
            }
            state => {
                warn!(%state, "ignoring open on an open transport");
                TimerEffects::none()
            }
        }
    }

    /// Any inbound frame arrived, parseable or not
    pub fn on_message(&mut self) -> TimerEffects {
        match self.state {
            ConnectionState::Live => TimerEffects::arm(self.silence_window),
            ConnectionState::SilentTimeout => {
                info!("updates resumed");
                self.state = ConnectionState::Live;
                TimerEffects::arm(self.silence_window)
            }
            state => {
                debug!(%state, "message while transport not open");
                TimerEffects::none()
            }
        }
    }

    /// The silence timer fired
    pub fn on_silence_elapsed(&mut self) -> TimerEffects {
        if self.state == ConnectionState::Live {
            warn!(window = ?self.silence_window, "no message received within silence window");
            self.state = ConnectionState::SilentTimeout;
        } else {
            debug!(state = %self.state, "stale silence timer");
        }
        TimerEffects::none()
    }

    /// Transport reported close
    pub fn on_close(&mut self) -> TimerEffects {
        info!(state = %self.state, "transport closed");
        self.lose()
    }

    /// Transport reported an error
    pub fn on_error(&mut self) -> TimerEffects {
        warn!(state = %self.state, "transport error");
        self.lose()
    }

    /// The reconnect timer fired and a new attempt is starting
    pub fn on_reconnect_started(&mut self) -> TimerEffects {
        if self.state != ConnectionState::Closed {
            debug!(state = %self.state, "reconnect fired outside of closed");
            return TimerEffects::none();
        }
        self.reconnect_pending = false;
        self.attempts += 1;
        self.state = ConnectionState::Connecting;
        info!(attempt = self.attempts, "reconnecting");
        TimerEffects::none()
    }

    fn lose(&mut self) -> TimerEffects {
        self.state = ConnectionState::Closed;
        let reconnect_after = if self.reconnect_pending {
            None
        } else {
            self.reconnect_pending = true;
            Some(self.reconnect_delay)
        };
        TimerEffects {
            silence: Some(SilenceTimer::Cancel),
            reconnect_after,
            cancel_reconnect: false,
        }
    }
}
