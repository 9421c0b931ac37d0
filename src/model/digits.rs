use std::fmt;

use tracing::debug;

use crate::core::{Direction, Error, NudgeStrategy, Result};
use super::modes::{Mode, ModeSpec};

/// Positional base-10 representation of the setpoint
///
/// `digits[0]` is the most significant digit. The length of `digits` always
/// equals the active mode's `digit_count`, and is zero while idle.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericDigitModel {
    /// Active mode
    mode: Mode,
    /// Digit values, each in `0..=9`
    digits: Vec<u8>,
    /// Digit currently targeted by nudges
    selected: Option<usize>,
}

impl Default for NumericDigitModel {
    fn default() -> Self {
        Self::new()
    }
}

impl NumericDigitModel {
    /// Creates an idle model with no digits
    pub fn new() -> Self {
        NumericDigitModel {
            mode: Mode::Idle,
            digits: Vec::new(),
            selected: None,
        }
    }

    /// Creates a zeroed model in the given mode
    pub fn with_mode(mode: Mode) -> Self {
        let mut model = Self::new();
        model.set_mode(mode);
        model
    }

    /// Returns the active mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns the digit values
    pub fn digits(&self) -> &[u8] {
        &self.digits
    }

    /// Returns the selected digit position
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Returns whether a real mode is active
    pub fn is_active(&self) -> bool {
        !self.mode.is_idle()
    }

    /// Replaces the digits with a zero-filled set sized for `mode`
    pub fn set_mode(&mut self, mode: Mode) {
        let width = mode.spec().map(|spec| spec.digit_count).unwrap_or(0);
        debug!(%mode, width, "resizing digit model");
        self.mode = mode;
        self.digits = vec![0; width];
        self.selected = None;
    }

    /// Reads the digits back as a decimal value; 0 while idle
    pub fn to_value(&self) -> f64 {
        let spec = match self.mode.spec() {
            Some(spec) => spec,
            None => return 0.0,
        };

        let scaled = self
            .digits
            .iter()
            .fold(0u64, |acc, digit| acc * 10 + u64::from(*digit));
        scaled as f64 / 10f64.powi(spec.decimal_places as i32)
    }

    /// Overwrites every digit from `value`, rounded to the mode's precision
    ///
    /// Values that are negative, non-finite, or wider than the integer digits
    /// are rejected with [`Error::Overflow`] and leave the digits untouched.
    pub fn load_value(&mut self, value: f64) -> Result<()> {
        let spec = match self.mode.spec() {
            Some(spec) => spec,
            None => return Ok(()),
        };

        self.digits = Self::encode(spec, value)?;
        Ok(())
    }

    fn encode(spec: &ModeSpec, value: f64) -> Result<Vec<u8>> {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::overflow(value, spec.code));
        }
        // -0.0 formats with a sign
        let value = if value == 0.0 { 0.0 } else { value };

        let formatted = format!("{:.*}", spec.decimal_places, value);
        let (integer, fraction) = formatted
            .split_once('.')
            .unwrap_or((formatted.as_str(), ""));

        if integer.len() > spec.integer_digit_count {
            return Err(Error::overflow(value, spec.code));
        }

        let mut text = format!("{:0>width$}", integer, width = spec.integer_digit_count);
        text.push_str(&format!("{:0<width$}", fraction, width = spec.decimal_places));
        text.truncate(spec.digit_count);

        text.chars()
            .map(|c| c.to_digit(10).map(|d| d as u8))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| Error::overflow(value, spec.code))
    }

    /// Selects the digit at `position`; ignored when out of range
    pub fn select_digit(&mut self, position: usize) {
        if position < self.digits.len() {
            self.selected = Some(position);
        }
    }

    /// Applies one nudge to the selected digit
    ///
    /// Returns whether any digit changed. Does nothing while idle or with no
    /// digit selected.
    pub fn nudge_selected(&mut self, direction: Direction, strategy: NudgeStrategy) -> Result<bool> {
        let (spec, position) = match (self.mode.spec(), self.selected) {
            (Some(spec), Some(position)) => (spec, position),
            _ => return Ok(false),
        };

        match strategy {
            NudgeStrategy::DigitCycle => {
                let digit = self.digits[position];
                self.digits[position] = match direction {
                    Direction::Up => (digit + 1) % 10,
                    Direction::Down => (digit + 9) % 10,
                };
                Ok(true)
            }
            NudgeStrategy::PlaceValue => {
                let exponent = spec.integer_digit_count as i32 - position as i32 - 1;
                let place = 10f64.powi(exponent);
                let mut target = (self.to_value() + f64::from(direction.sign()) * place).max(0.0);
                if let Some(max) = spec.max_value {
                    target = target.min(max);
                }

                let before = self.digits.clone();
                self.digits = Self::encode(spec, target)?;
                Ok(self.digits != before)
            }
        }
    }
}

impl fmt::Display for NumericDigitModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let spec = match self.mode.spec() {
            Some(spec) => spec,
            None => return f.write_str(self.mode.as_str()),
        };

        for (i, digit) in self.digits.iter().enumerate() {
            if i == spec.integer_digit_count {
                f.write_str(".")?;
            }
            write!(f, "{}", digit)?;
        }
        write!(f, " {}", spec.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModeCode, ModeRegistry};

    fn model(code: ModeCode) -> NumericDigitModel {
        NumericDigitModel::with_mode(Mode::Active(code))
    }

    #[test]
    fn test_set_mode_resizes() {
        let mut m = model(ModeCode::CC);
        assert_eq!(m.digits(), &[0, 0, 0, 0]);

        m.load_value(12.34).unwrap();
        m.select_digit(1);
        m.set_mode(Mode::Active(ModeCode::CV));
        assert_eq!(m.digits(), &[0, 0, 0, 0, 0]);
        assert_eq!(m.selected(), None);

        m.set_mode(Mode::Idle);
        assert!(m.digits().is_empty());
        assert_eq!(m.to_value(), 0.0);
    }

    #[test]
    fn test_load_and_read_value() {
        let mut m = model(ModeCode::CC);
        m.load_value(5.5).unwrap();
        assert_eq!(m.digits(), &[0, 5, 5, 0]);
        assert_eq!(m.to_value(), 5.5);
        assert_eq!(m.to_string(), "05.50 A");
    }

    #[test]
    fn test_load_rounds_to_precision() {
        let mut m = model(ModeCode::CC);
        m.load_value(1.236).unwrap();
        assert_eq!(m.digits(), &[0, 1, 2, 4]);

        let mut m = model(ModeCode::CR);
        m.load_value(0.5).unwrap();
        assert_eq!(m.digits(), &[0, 0, 5, 0, 0]);
    }

    #[test]
    fn test_load_value_idempotent() {
        let samples = [0.0, 0.01, 1.0, 5.5, 9.99, 12.34, 19.05, 99.99, 123.45, 0.125, 42.007];
        for spec in ModeRegistry::all() {
            let mut m = NumericDigitModel::with_mode(Mode::Active(spec.mode));
            for &value in &samples {
                if m.load_value(value).is_err() {
                    continue;
                }
                let digits = m.digits().to_vec();
                let read = m.to_value();
                m.load_value(read).unwrap();
                assert_eq!(m.digits(), digits.as_slice(), "mode {} value {}", spec.code, value);
            }
        }
    }

    #[test]
    fn test_load_overflow_leaves_digits() {
        let mut m = model(ModeCode::CC);
        m.load_value(7.25).unwrap();

        assert!(matches!(m.load_value(100.0), Err(Error::Overflow { .. })));
        assert!(matches!(m.load_value(-1.0), Err(Error::Overflow { .. })));
        assert!(matches!(m.load_value(f64::NAN), Err(Error::Overflow { .. })));
        assert!(matches!(m.load_value(f64::INFINITY), Err(Error::Overflow { .. })));
        assert_eq!(m.digits(), &[0, 7, 2, 5]);

        m.load_value(-0.0).unwrap();
        assert_eq!(m.digits(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_idle_is_noop() {
        let mut m = NumericDigitModel::new();
        m.load_value(5.0).unwrap();
        m.select_digit(0);
        assert!(m.digits().is_empty());
        assert_eq!(m.selected(), None);
        assert!(!m.nudge_selected(Direction::Up, NudgeStrategy::DigitCycle).unwrap());
        assert!(!m.nudge_selected(Direction::Up, NudgeStrategy::PlaceValue).unwrap());
        assert_eq!(m.to_string(), "MENU");
    }

    #[test]
    fn test_select_out_of_range() {
        let mut m = model(ModeCode::CC);
        m.select_digit(4);
        assert_eq!(m.selected(), None);
        m.select_digit(3);
        assert_eq!(m.selected(), Some(3));
        m.select_digit(10);
        assert_eq!(m.selected(), Some(3));
    }

    #[test]
    fn test_nudge_without_selection() {
        let mut m = model(ModeCode::CC);
        m.load_value(5.5).unwrap();
        assert!(!m.nudge_selected(Direction::Up, NudgeStrategy::DigitCycle).unwrap());
        assert_eq!(m.digits(), &[0, 5, 5, 0]);
    }

    #[test]
    fn test_digit_cycle_wraps() {
        let mut m = model(ModeCode::CC);
        m.load_value(9.09).unwrap();
        assert_eq!(m.digits(), &[0, 9, 0, 9]);

        m.select_digit(1);
        m.nudge_selected(Direction::Up, NudgeStrategy::DigitCycle).unwrap();
        assert_eq!(m.digits(), &[0, 0, 0, 9]);

        m.select_digit(2);
        m.nudge_selected(Direction::Down, NudgeStrategy::DigitCycle).unwrap();
        assert_eq!(m.digits(), &[0, 0, 9, 9]);
    }

    #[test]
    fn test_digit_cycle_touches_only_selected() {
        let mut m = model(ModeCode::CV);
        m.load_value(123.45).unwrap();
        for position in 0..5 {
            let before = m.digits().to_vec();
            m.select_digit(position);
            for direction in [Direction::Up, Direction::Down, Direction::Up] {
                m.nudge_selected(direction, NudgeStrategy::DigitCycle).unwrap();
            }
            for (i, (a, b)) in before.iter().zip(m.digits()).enumerate() {
                if i == position {
                    assert_eq!((a + 1) % 10, *b);
                } else {
                    assert_eq!(a, b);
                }
            }
        }
    }

    #[test]
    fn test_place_value_most_significant() {
        let mut m = model(ModeCode::CC);
        m.load_value(5.5).unwrap();
        m.select_digit(0);

        assert!(m.nudge_selected(Direction::Up, NudgeStrategy::PlaceValue).unwrap());
        assert_eq!(m.to_value(), 15.5);

        // clamps at the CC maximum
        m.nudge_selected(Direction::Up, NudgeStrategy::PlaceValue).unwrap();
        assert_eq!(m.to_value(), 20.0);

        m.nudge_selected(Direction::Down, NudgeStrategy::PlaceValue).unwrap();
        assert_eq!(m.to_value(), 10.0);
        m.nudge_selected(Direction::Down, NudgeStrategy::PlaceValue).unwrap();
        assert_eq!(m.to_value(), 0.0);

        // clamps at zero
        assert!(!m.nudge_selected(Direction::Down, NudgeStrategy::PlaceValue).unwrap());
        assert_eq!(m.to_value(), 0.0);
    }

    #[test]
    fn test_place_value_carries() {
        let mut m = model(ModeCode::CC);
        m.load_value(9.99).unwrap();
        m.select_digit(3);
        m.nudge_selected(Direction::Up, NudgeStrategy::PlaceValue).unwrap();
        assert_eq!(m.digits(), &[1, 0, 0, 0]);

        m.select_digit(2);
        m.nudge_selected(Direction::Down, NudgeStrategy::PlaceValue).unwrap();
        assert_eq!(m.digits(), &[0, 9, 9, 0]);
    }

    #[test]
    fn test_place_value_unbounded_overflow() {
        let mut m = model(ModeCode::CR);
        m.load_value(95.0).unwrap();
        m.select_digit(0);
        assert!(matches!(
            m.nudge_selected(Direction::Up, NudgeStrategy::PlaceValue),
            Err(Error::Overflow { .. })
        ));
        assert_eq!(m.to_value(), 95.0);
    }
}
