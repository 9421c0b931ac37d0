use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// Client's belief about the transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Transport handshake in progress
    Connecting,
    /// Transport open and messages arriving
    Live,
    /// Transport nominally open but silent for longer than the window
    SilentTimeout,
    /// Transport closed or errored, reconnect pending
    Closed,
}

impl ConnectionState {
    /// Returns whether the transport reports itself open
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Live | ConnectionState::SilentTimeout)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Live => "live",
            ConnectionState::SilentTimeout => "silent",
            ConnectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Whether the controlled output is currently applied to the load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngagementState(pub bool);

impl EngagementState {
    /// Returns whether the output is engaged
    pub fn is_engaged(&self) -> bool {
        self.0
    }

    /// Returns the opposite state
    pub fn toggled(&self) -> Self {
        EngagementState(!self.0)
    }
}

/// Direction of a single nudge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Returns +1 or -1
    pub fn sign(&self) -> i8 {
        match self {
            Direction::Up => 1,
            Direction::Down => -1,
        }
    }
}

/// How a nudge on the selected digit edits the setpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NudgeStrategy {
    /// Spin the selected digit on its own, wrapping 9 -> 0 and 0 -> 9
    #[default]
    DigitCycle,
    /// Add or subtract the place value of the selected digit, clamped
    PlaceValue,
}

/// Device protocol revision, which decides how the engagement flag is named
///
/// | revision | inbound flag (fallback)          | outbound command          |
/// |----------|----------------------------------|---------------------------|
/// | `Relay`  | `relayEnabled` (`outputActive`)  | `setRelay` bool           |
/// | `Output` | `outputActive` (`relayEnabled`)  | `setOutput {active,value}`|
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProtocolRevision {
    #[default]
    Relay,
    Output,
}

/// Configuration for the setpoint client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Silence after which a live transport is no longer trusted
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub silence_window: Duration,
    /// Delay between a close/error and the next connection attempt
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub reconnect_delay: Duration,
    /// Nudge semantics used for every mode
    pub nudge_strategy: NudgeStrategy,
    /// Minimum difference for an echoed value to overwrite an engaged edit
    pub reconcile_epsilon: f64,
    /// Engagement flag naming on the wire
    pub protocol_revision: ProtocolRevision,
    /// Capacity of the outbound command queue
    pub command_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            silence_window: Duration::from_secs(super::SILENCE_WINDOW_SECS),
            reconnect_delay: Duration::from_secs(super::RECONNECT_DELAY_SECS),
            nudge_strategy: NudgeStrategy::default(),
            reconcile_epsilon: super::RECONCILE_EPSILON,
            protocol_revision: ProtocolRevision::default(),
            command_buffer: 32,
        }
    }
}

impl Config {
    /// Parses a JSON configuration document, filling missing fields with defaults
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)
            .map_err(|e| Error::config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every field is usable
    pub fn validate(&self) -> Result<()> {
        if self.silence_window.is_zero() {
            return Err(Error::config("silence window must be non-zero"));
        }
        if self.reconnect_delay.is_zero() {
            return Err(Error::config("reconnect delay must be non-zero"));
        }
        if !self.reconcile_epsilon.is_finite() || self.reconcile_epsilon < 0.0 {
            return Err(Error::config(format!(
                "reconcile epsilon must be a non-negative number, got {}",
                self.reconcile_epsilon
            )));
        }
        if self.command_buffer == 0 {
            return Err(Error::config("command buffer must hold at least one command"));
        }
        Ok(())
    }
}
