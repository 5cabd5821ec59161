//! Named, cancellable timers owned by the alert state machine.

use std::fmt;

use tokio::task::JoinHandle;

use crate::types::AlertStatus;

/// The timers the alert machine can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Re-sends notifications periodically while triggered.
    RepeatNotify,
    /// Resets an acknowledged alert once.
    AckReset,
    /// Resets a triggered alert nobody acknowledged once.
    UnackedReset,
}

impl TimerKind {
    /// Timers started on entering `status`.
    ///
    /// Entering any status first cancels every outstanding timer, so this
    /// table is the complete description of which timers run in which state.
    #[must_use]
    pub const fn started_by(status: AlertStatus) -> &'static [Self] {
        match status {
            AlertStatus::Ready => &[],
            AlertStatus::Triggered => &[Self::RepeatNotify, Self::UnackedReset],
            AlertStatus::Acknowledged => &[Self::AckReset],
        }
    }

    /// Returns the timer name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RepeatNotify => "repeat_notify",
            Self::AckReset => "ack_reset",
            Self::UnackedReset => "unacked_reset",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// At most one outstanding task per [`TimerKind`].
#[derive(Debug, Default)]
pub(crate) struct TimerSet {
    repeat_notify: Option<JoinHandle<()>>,
    ack_reset: Option<JoinHandle<()>>,
    unacked_reset: Option<JoinHandle<()>>,
}

impl TimerSet {
    fn slot(&mut self, kind: TimerKind) -> &mut Option<JoinHandle<()>> {
        match kind {
            TimerKind::RepeatNotify => &mut self.repeat_notify,
            TimerKind::AckReset => &mut self.ack_reset,
            TimerKind::UnackedReset => &mut self.unacked_reset,
        }
    }

    /// Install a timer task, aborting any previous one of the same kind.
    pub(crate) fn start(&mut self, kind: TimerKind, handle: JoinHandle<()>) {
        if let Some(previous) = self.slot(kind).replace(handle) {
            previous.abort();
        }
    }

    /// Abort every outstanding timer task.
    pub(crate) fn cancel_all(&mut self) {
        for kind in [
            TimerKind::RepeatNotify,
            TimerKind::AckReset,
            TimerKind::UnackedReset,
        ] {
            if let Some(handle) = self.slot(kind).take() {
                handle.abort();
            }
        }
    }

    /// Kinds with an installed timer that has not finished yet.
    pub(crate) fn active(&self) -> Vec<TimerKind> {
        [
            (TimerKind::RepeatNotify, &self.repeat_notify),
            (TimerKind::AckReset, &self.ack_reset),
            (TimerKind::UnackedReset, &self.unacked_reset),
        ]
        .into_iter()
        .filter(|(_, handle)| handle.as_ref().is_some_and(|h| !h.is_finished()))
        .map(|(kind, _)| kind)
        .collect()
    }
}
