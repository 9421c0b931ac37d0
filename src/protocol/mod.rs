//! Protocol implementation module
//!
//! This module defines the device's wire messages, the text frame codec,
//! and the connection liveness state machine.

pub mod codec;
pub mod message;
pub mod state;

pub use self::codec::MessageCodec;
pub use self::message::{
    Command, InboundMessage, MeasurementDisplay, Measurements, MeasurementsSnapshot,
    StateUpdate, Uptime, WireState,
};
pub use self::state::{LivenessInfo, LivenessMonitor, SilenceTimer, TimerEffects};
