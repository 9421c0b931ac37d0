use crate::core::{Config, RECONCILE_EPSILON};
use crate::model::Mode;

/// Decides whether an authoritative setpoint overwrites the local edit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciler {
    /// Smallest difference that overwrites the display while engaged
    epsilon: f64,
}

impl Default for Reconciler {
    fn default() -> Self {
        Reconciler::new(RECONCILE_EPSILON)
    }
}

impl Reconciler {
    /// Creates a reconciler with the given threshold
    pub fn new(epsilon: f64) -> Self {
        Reconciler { epsilon }
    }

    /// Creates a reconciler using the configured threshold
    pub fn from_config(config: &Config) -> Self {
        Reconciler::new(config.reconcile_epsilon)
    }

    /// Returns the threshold
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Returns whether `incoming_value` should be loaded into the model
    ///
    /// Rules, in order:
    /// 1. a value for another mode never applies;
    /// 2. while disengaged the display always tracks the device;
    /// 3. while engaged only a difference strictly greater than epsilon wins.
    ///
    /// Non-finite incoming values are always rejected.
    pub fn should_accept_incoming(
        &self,
        active_mode: Mode,
        incoming_mode: Mode,
        incoming_value: f64,
        local_value: f64,
        output_engaged: bool,
    ) -> bool {
        if incoming_mode != active_mode || active_mode.is_idle() {
            return false;
        }
        if !incoming_value.is_finite() {
            return false;
        }
        if !output_engaged {
            return true;
        }
        (incoming_value - local_value).abs() > self.epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModeCode;

    const CC: Mode = Mode::Active(ModeCode::CC);
    const CV: Mode = Mode::Active(ModeCode::CV);

    #[test]
    fn test_other_mode_rejected() {
        let r = Reconciler::default();
        assert!(!r.should_accept_incoming(CC, CV, 5.0, 1.0, false));
        assert!(!r.should_accept_incoming(CC, CV, 5.0, 1.0, true));
        assert!(!r.should_accept_incoming(Mode::Idle, Mode::Idle, 5.0, 0.0, false));
    }

    #[test]
    fn test_disengaged_always_accepts() {
        let r = Reconciler::default();
        for delta in [0.0, 1e-6, 1e-4, 1e-3, 1.0, -7.5] {
            assert!(r.should_accept_incoming(CC, CC, 5.0 + delta, 5.0, false), "delta {}", delta);
        }
    }

    #[test]
    fn test_engaged_threshold() {
        let r = Reconciler::default();
        // exactly epsilon is not enough
        assert!(!r.should_accept_incoming(CC, CC, 1e-4, 0.0, true));
        assert!(!r.should_accept_incoming(CC, CC, 0.0, 1e-4, true));
        assert!(!r.should_accept_incoming(CC, CC, 5.0, 5.0, true));
        assert!(!r.should_accept_incoming(CC, CC, 5.00005, 5.0, true));

        assert!(r.should_accept_incoming(CC, CC, 1e-3, 0.0, true));
        assert!(r.should_accept_incoming(CC, CC, 5.0, 5.001, true));
        assert!(r.should_accept_incoming(CC, CC, 7.0, 5.0, true));
    }

    #[test]
    fn test_non_finite_rejected() {
        let r = Reconciler::default();
        assert!(!r.should_accept_incoming(CC, CC, f64::NAN, 5.0, false));
        assert!(!r.should_accept_incoming(CC, CC, f64::INFINITY, 5.0, true));
    }

    #[test]
    fn test_configured_epsilon() {
        let config = Config {
            reconcile_epsilon: 0.5,
            ..Config::default()
        };
        let r = Reconciler::from_config(&config);
        assert_eq!(r.epsilon(), 0.5);
        assert!(!r.should_accept_incoming(CC, CC, 5.4, 5.0, true));
        assert!(r.should_accept_incoming(CC, CC, 5.6, 5.0, true));
    }
}
