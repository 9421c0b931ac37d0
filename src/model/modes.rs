use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result, IDLE_MODE_CODE};

/// Editable operating modes of the load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModeCode {
    /// Constant current
    CC,
    /// Constant voltage
    CV,
    /// Constant resistance
    CR,
    /// Constant power
    CP,
}

impl ModeCode {
    /// Returns the display parameters for this mode
    pub fn spec(&self) -> &'static ModeSpec {
        match self {
            ModeCode::CC => &MODES[0],
            ModeCode::CV => &MODES[1],
            ModeCode::CR => &MODES[2],
            ModeCode::CP => &MODES[3],
        }
    }

    /// Returns the canonical code
    pub fn as_str(&self) -> &'static str {
        self.spec().code
    }

    /// Returns the code the firmware expects in `setMode`
    pub fn wire_code(&self) -> &'static str {
        self.spec().wire_code
    }
}

impl fmt::Display for ModeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Display and validation parameters of one mode
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSpec {
    /// Mode identity
    pub mode: ModeCode,
    /// Canonical code
    pub code: &'static str,
    /// Firmware spelling, sent in `setMode` and accepted inbound
    pub wire_code: &'static str,
    /// Unit symbol
    pub unit: &'static str,
    /// Digits after the decimal point
    pub decimal_places: usize,
    /// Digits before the decimal point
    pub integer_digit_count: usize,
    /// Total positional digits
    pub digit_count: usize,
    /// Upper clamp for local edits
    pub max_value: Option<f64>,
}

impl ModeSpec {
    /// Largest value the digit display can show
    pub fn display_max(&self) -> f64 {
        10f64.powi(self.integer_digit_count as i32) - 10f64.powi(-(self.decimal_places as i32))
    }
}

static MODES: [ModeSpec; 4] = [
    ModeSpec {
        mode: ModeCode::CC,
        code: "CC",
        wire_code: "CC",
        unit: "A",
        decimal_places: 2,
        integer_digit_count: 2,
        digit_count: 4,
        max_value: Some(20.0),
    },
    ModeSpec {
        mode: ModeCode::CV,
        code: "CV",
        wire_code: "CV",
        unit: "V",
        decimal_places: 2,
        integer_digit_count: 3,
        digit_count: 5,
        max_value: Some(100.0),
    },
    ModeSpec {
        mode: ModeCode::CR,
        code: "CR",
        wire_code: "CR",
        unit: "kΩ",
        decimal_places: 3,
        integer_digit_count: 2,
        digit_count: 5,
        max_value: None,
    },
    ModeSpec {
        mode: ModeCode::CP,
        code: "CP",
        wire_code: "CW",
        unit: "W",
        decimal_places: 2,
        integer_digit_count: 2,
        digit_count: 4,
        max_value: Some(50.0),
    },
];

/// Active operating mode, or the idle menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// No active setpoint
    Idle,
    /// Editable mode
    Active(ModeCode),
}

impl Mode {
    /// Returns the display parameters, if the mode is editable
    pub fn spec(&self) -> Option<&'static ModeSpec> {
        match self {
            Mode::Idle => None,
            Mode::Active(code) => Some(code.spec()),
        }
    }

    /// Returns whether this is the idle menu
    pub fn is_idle(&self) -> bool {
        matches!(self, Mode::Idle)
    }

    /// Returns the wire code
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Idle => IDLE_MODE_CODE,
            Mode::Active(code) => code.as_str(),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Static table of the device's operating modes
pub struct ModeRegistry;

impl ModeRegistry {
    /// Resolves a wire code to a mode
    pub fn lookup(code: &str) -> Result<Mode> {
        if code == IDLE_MODE_CODE {
            return Ok(Mode::Idle);
        }

        MODES
            .iter()
            .find(|spec| spec.code == code || spec.wire_code == code)
            .map(|spec| Mode::Active(spec.mode))
            .ok_or_else(|| Error::unknown_mode(code))
    }

    /// Returns every editable mode
    pub fn all() -> &'static [ModeSpec] {
        &MODES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_widths_consistent() {
        for spec in ModeRegistry::all() {
            assert_eq!(
                spec.integer_digit_count + spec.decimal_places,
                spec.digit_count,
                "mode {}",
                spec.code
            );
            assert_eq!(spec.mode.spec(), spec);
        }
    }

    #[test]
    fn test_max_values_fit_display() {
        for spec in ModeRegistry::all() {
            if let Some(max) = spec.max_value {
                assert!(max <= spec.display_max(), "mode {}", spec.code);
            }
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(ModeRegistry::lookup("CC").unwrap(), Mode::Active(ModeCode::CC));
        assert_eq!(ModeRegistry::lookup("CR").unwrap(), Mode::Active(ModeCode::CR));
        assert_eq!(ModeRegistry::lookup("MENU").unwrap(), Mode::Idle);
        assert_eq!(ModeRegistry::lookup("CW").unwrap(), Mode::Active(ModeCode::CP));
    }

    #[test]
    fn test_wire_codes() {
        assert_eq!(ModeCode::CP.as_str(), "CP");
        assert_eq!(ModeCode::CP.wire_code(), "CW");
        for spec in ModeRegistry::all() {
            assert_eq!(ModeRegistry::lookup(spec.wire_code).unwrap(), Mode::Active(spec.mode));
        }
    }

    #[test]
    fn test_lookup_unknown() {
        assert!(matches!(ModeRegistry::lookup("SETTINGS"), Err(Error::UnknownMode(_))));
        assert!(matches!(ModeRegistry::lookup("cc"), Err(Error::UnknownMode(_))));
        assert!(matches!(ModeRegistry::lookup(""), Err(Error::UnknownMode(_))));
    }

    #[test]
    fn test_display_max() {
        assert!((ModeCode::CC.spec().display_max() - 99.99).abs() < 1e-9);
        assert!((ModeCode::CR.spec().display_max() - 99.999).abs() < 1e-9);
    }
}
