//! Core types shared by the setpoint client
//!
//! This module contains the error type, configuration, and the small value
//! types used throughout the library.

pub mod error;
pub mod types;
pub mod serde;

pub use self::error::{Error, Result};
pub use self::types::{
    Config,
    ConnectionState,
    Direction,
    EngagementState,
    NudgeStrategy,
    ProtocolRevision,
};

/// Seconds of inbound silence before a live transport is distrusted
pub const SILENCE_WINDOW_SECS: u64 = 10;

/// Seconds to wait after a close or error before reconnecting
pub const RECONNECT_DELAY_SECS: u64 = 2;

/// Default reconciliation threshold while the output is engaged
pub const RECONCILE_EPSILON: f64 = 1e-4;

/// Mode code the device uses for "no active setpoint"
pub const IDLE_MODE_CODE: &str = "MENU";

/// Maximum inbound text frame size in bytes
pub const MAX_FRAME_SIZE: usize = 8192;
