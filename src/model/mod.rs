//! Setpoint model
//!
//! This module defines the device's operating modes and the digit-wise
//! representation of the setpoint that the user edits.

pub mod digits;
pub mod modes;

pub use self::digits::NumericDigitModel;
pub use self::modes::{Mode, ModeCode, ModeRegistry, ModeSpec};
