use tokio::sync::mpsc;

use crate::core::{ConnectionState, EngagementState};
use crate::model::Mode;
use crate::protocol::MeasurementsSnapshot;

/// Transient status surfaced to the user
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// Transport opened
    Connected,
    /// Transport closed; reconnect scheduled
    Disconnected,
    /// Transport reported an error
    ConnectionError(String),
    /// Transport open but silent beyond the window
    NoUpdates,
    /// Updates resumed after a silence
    UpdatesResumed,
    /// A frame could not be decoded
    MessageError(String),
    /// A mode code was not recognised
    UnknownMode(String),
    /// A value did not fit the active mode's digits
    Overflow { value: f64, mode: &'static str },
    /// The device rejected a command
    DeviceError(String),
}

/// Rendering collaborator
///
/// Called after each processed event, from the same task that mutates the
/// model. Every method has an empty default.
pub trait Observer {
    fn on_model_changed(&mut self, _digits: &[u8], _selected: Option<usize>, _mode: Mode) {}
    fn on_engagement_changed(&mut self, _engagement: EngagementState) {}
    fn on_connection_state_changed(&mut self, _state: ConnectionState) {}
    fn on_measurements(&mut self, _snapshot: &MeasurementsSnapshot) {}
    fn on_status(&mut self, _status: &Status) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl Observer for NullObserver {}

/// Owned form of an observer callback
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    ModelChanged {
        digits: Vec<u8>,
        selected: Option<usize>,
        mode: Mode,
    },
    EngagementChanged(EngagementState),
    ConnectionStateChanged(ConnectionState),
    Measurements(MeasurementsSnapshot),
    Status(Status),
}

impl Observer for Vec<ObserverEvent> {
    fn on_model_changed(&mut self, digits: &[u8], selected: Option<usize>, mode: Mode) {
        self.push(ObserverEvent::ModelChanged {
            digits: digits.to_vec(),
            selected,
            mode,
        });
    }

    fn on_engagement_changed(&mut self, engagement: EngagementState) {
        self.push(ObserverEvent::EngagementChanged(engagement));
    }

    fn on_connection_state_changed(&mut self, state: ConnectionState) {
        self.push(ObserverEvent::ConnectionStateChanged(state));
    }

    fn on_measurements(&mut self, snapshot: &MeasurementsSnapshot) {
        self.push(ObserverEvent::Measurements(snapshot.clone()));
    }

    fn on_status(&mut self, status: &Status) {
        self.push(ObserverEvent::Status(status.clone()));
    }
}

/// Forwards callbacks to another task; a closed receiver is ignored
impl Observer for mpsc::UnboundedSender<ObserverEvent> {
    fn on_model_changed(&mut self, digits: &[u8], selected: Option<usize>, mode: Mode) {
        let _ = self.send(ObserverEvent::ModelChanged {
            digits: digits.to_vec(),
            selected,
            mode,
        });
    }

    fn on_engagement_changed(&mut self, engagement: EngagementState) {
        let _ = self.send(ObserverEvent::EngagementChanged(engagement));
    }

    fn on_connection_state_changed(&mut self, state: ConnectionState) {
        let _ = self.send(ObserverEvent::ConnectionStateChanged(state));
    }

    fn on_measurements(&mut self, snapshot: &MeasurementsSnapshot) {
        let _ = self.send(ObserverEvent::Measurements(snapshot.clone()));
    }

    fn on_status(&mut self, status: &Status) {
        let _ = self.send(ObserverEvent::Status(status.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModeCode;

    #[test]
    fn test_channel_observer_forwards() {
        let (mut tx, mut rx) = mpsc::unbounded_channel();
        tx.on_model_changed(&[0, 1], Some(1), Mode::Active(ModeCode::CC));
        tx.on_status(&Status::NoUpdates);

        assert_eq!(
            rx.try_recv().unwrap(),
            ObserverEvent::ModelChanged {
                digits: vec![0, 1],
                selected: Some(1),
                mode: Mode::Active(ModeCode::CC),
            }
        );
        assert_eq!(rx.try_recv().unwrap(), ObserverEvent::Status(Status::NoUpdates));
    }

    #[test]
    fn test_closed_channel_ignored() {
        let (mut tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        tx.on_connection_state_changed(ConnectionState::Live);
    }
}
