//! Synchronization module
//!
//! This module reconciles the device's authoritative state with the user's
//! local edits and reports the result to the rendering collaborator.

pub mod controller;
pub mod observer;
pub mod reconciler;

pub use self::controller::SyncController;
pub use self::observer::{NullObserver, Observer, ObserverEvent, Status};
pub use self::reconciler::Reconciler;
