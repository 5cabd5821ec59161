//! Side-effect seams the state machine drives.
//!
//! The machine never talks to the network itself. Notifications and
//! observer broadcasts go through these traits so the transport and the
//! notification providers stay outside the core.

use std::fmt;

use crate::types::AlertSnapshot;

/// Sends the "help requested" notification to external targets.
///
/// Implementations must not block: the machine calls this while holding its
/// state lock, so delivery has to be handed off (spawned) and its outcome
/// reported through logging.
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Start a best-effort notification burst for the given alert state.
    fn dispatch(&self, snapshot: &AlertSnapshot);
}

/// Pushes alert state to connected observers.
pub trait StatusBroadcaster: Send + Sync + fmt::Debug {
    /// Queue `snapshot` for every connected observer without blocking.
    ///
    /// Returns the number of observers it was queued for.
    fn broadcast(&self, snapshot: &AlertSnapshot) -> usize;

    /// Number of currently connected observers.
    fn connection_count(&self) -> usize;
}

/// A notifier that does nothing, for deployments with no channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn dispatch(&self, _snapshot: &AlertSnapshot) {}
}

/// A broadcaster with no observers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBroadcaster;

impl StatusBroadcaster for NoopBroadcaster {
    fn broadcast(&self, _snapshot: &AlertSnapshot) -> usize {
        0
    }

    fn connection_count(&self) -> usize {
        0
    }
}
