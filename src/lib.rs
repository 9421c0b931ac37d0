//! eload_link: setpoint synchronization client for a networked electronic load
//!
//! The device streams its operating mode, setpoint, output engagement and
//! live readings as JSON frames. This library keeps a digit-by-digit local
//! copy of the setpoint in step with those frames, lets the user edit it
//! without being overwritten by echoes, and tracks connection liveness.
pub mod core;
pub mod model;
pub mod network;
pub mod protocol;
pub mod sync;
pub mod util;

// Re-export commonly used items
pub use crate::core::{Config, ConnectionState, Direction, EngagementState, Error, Result};
pub use crate::model::{Mode, ModeCode, ModeRegistry, NumericDigitModel};
pub use crate::network::{ReconnectRequest, Session, SessionHandle, SessionIo, TransportEvent, UserAction};
pub use crate::protocol::{Command, InboundMessage, LivenessMonitor, MessageCodec};
pub use crate::sync::{NullObserver, Observer, ObserverEvent, Reconciler, Status, SyncController};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
