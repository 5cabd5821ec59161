//! The alert state machine.
//!
//! [`AlertMachine`] owns the single alert. Every transition runs under one
//! lock, so transitions never interleave and a [`snapshot`](AlertMachine::snapshot)
//! never observes a half-applied change. Entering a state bumps an epoch,
//! cancels every timer and starts the timers listed in
//! [`TimerKind::started_by`]; a timer that fires with a stale epoch does
//! nothing.

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::sink::{Notifier, StatusBroadcaster};
use crate::timers::{TimerKind, TimerSet};
use crate::types::{AlertSnapshot, AlertStatus, AlertTimings, TransitionOutcome};

/// The shared help request alert.
///
/// Cloning is cheap; all clones drive the same alert. Transition methods
/// spawn timer tasks and must be called from within a Tokio runtime.
#[derive(Debug, Clone)]
pub struct AlertMachine {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    timings: AlertTimings,
    notifier: Arc<dyn Notifier>,
    broadcaster: Arc<dyn StatusBroadcaster>,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    status: AlertStatus,
    last_trigger: Option<DateTime<Utc>>,
    epoch: u64,
    timers: TimerSet,
    closed: bool,
}

impl AlertMachine {
    /// Create a machine in [`AlertStatus::Ready`].
    pub fn new(
        timings: AlertTimings,
        notifier: Arc<dyn Notifier>,
        broadcaster: Arc<dyn StatusBroadcaster>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                timings,
                notifier,
                broadcaster,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    /// The timings this machine was built with.
    #[must_use]
    pub fn timings(&self) -> AlertTimings {
        self.shared.timings
    }

    /// Raise the alert.
    ///
    /// From `Ready` or `Acknowledged` this records the trigger time, sends a
    /// notification burst, starts the repeat and unacknowledged-reset timers
    /// and broadcasts the new state. While already triggered it is ignored,
    /// so racing duplicate requests produce one notification stream.
    pub fn trigger(&self) -> TransitionOutcome {
        let mut inner = self.shared.inner.lock();

        if inner.closed || inner.status.is_triggered() {
            debug!(status = %inner.status, "trigger ignored");
            return TransitionOutcome::Ignored(self.shared.snapshot_of(&inner));
        }

        inner.last_trigger = Some(Utc::now());
        let snapshot = Shared::enter(&self.shared, &mut inner, AlertStatus::Triggered);
        self.shared.notifier.dispatch(&snapshot);

        TransitionOutcome::Applied(snapshot)
    }

    /// Acknowledge a triggered alert.
    ///
    /// Only legal from `Triggered`; anything else is ignored. Stops the
    /// notification stream and schedules the acknowledged alert to reset.
    pub fn acknowledge(&self) -> TransitionOutcome {
        let mut inner = self.shared.inner.lock();

        if inner.closed || !inner.status.is_triggered() {
            debug!(status = %inner.status, "acknowledge ignored");
            return TransitionOutcome::Ignored(self.shared.snapshot_of(&inner));
        }

        let snapshot = Shared::enter(&self.shared, &mut inner, AlertStatus::Acknowledged);
        TransitionOutcome::Applied(snapshot)
    }

    /// Force the alert back to `Ready` from any state, cancelling all timers.
    ///
    /// Driven by the reset timers; no client request reaches this.
    pub fn reset(&self) -> TransitionOutcome {
        let mut inner = self.shared.inner.lock();

        if inner.closed {
            return TransitionOutcome::Ignored(self.shared.snapshot_of(&inner));
        }

        let snapshot = Shared::enter(&self.shared, &mut inner, AlertStatus::Ready);
        TransitionOutcome::Applied(snapshot)
    }

    /// Current state, without side effects.
    #[must_use]
    pub fn snapshot(&self) -> AlertSnapshot {
        let inner = self.shared.inner.lock();
        self.shared.snapshot_of(&inner)
    }

    /// Broadcast the current state to every observer.
    ///
    /// The snapshot is taken and sent under the alert lock, so a periodic
    /// refresh can never land behind a newer transition's broadcast.
    pub fn broadcast_current(&self) -> usize {
        let inner = self.shared.inner.lock();
        let snapshot = self.shared.snapshot_of(&inner);
        self.shared.broadcaster.broadcast(&snapshot)
    }

    /// Timers currently outstanding.
    #[must_use]
    pub fn active_timers(&self) -> Vec<TimerKind> {
        self.shared.inner.lock().timers.active()
    }

    /// Cancel every timer and refuse further transitions.
    ///
    /// Called on process shutdown so no timer fires after teardown.
    pub fn shutdown(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.closed {
            return;
        }

        inner.closed = true;
        inner.epoch += 1;
        inner.timers.cancel_all();
        info!(status = %inner.status, "alert machine shut down, timers cancelled");
    }

    /// Returns true once [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.inner.lock().closed
    }
}

impl Shared {
    fn snapshot_of(&self, inner: &Inner) -> AlertSnapshot {
        AlertSnapshot {
            status: inner.status,
            last_trigger: inner.last_trigger,
            connections: self.broadcaster.connection_count(),
        }
    }

    /// Apply a state entry: swap timers per the table, then broadcast.
    fn enter(this: &Arc<Self>, inner: &mut Inner, status: AlertStatus) -> AlertSnapshot {
        let previous = inner.status;
        inner.status = status;
        inner.epoch += 1;
        inner.timers.cancel_all();

        for &kind in TimerKind::started_by(status) {
            let handle = this.spawn_timer(Arc::downgrade(this), kind, inner.epoch);
            inner.timers.start(kind, handle);
        }

        info!(from = %previous, to = %status, "alert state changed");

        let snapshot = this.snapshot_of(inner);
        let delivered = this.broadcaster.broadcast(&snapshot);
        debug!(observers = delivered, status = %status, "broadcast alert state");
        snapshot
    }

    fn spawn_timer(&self, weak: Weak<Self>, kind: TimerKind, epoch: u64) -> JoinHandle<()> {
        match kind {
            TimerKind::RepeatNotify => {
                let period = self.timings.repeat_notify;
                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        ticker.tick().await;
                        let Some(shared) = weak.upgrade() else { break };
                        if !shared.repeat_notify(epoch) {
                            break;
                        }
                    }
                })
            }
            TimerKind::AckReset | TimerKind::UnackedReset => {
                let delay = if kind == TimerKind::AckReset {
                    self.timings.ack_reset
                } else {
                    self.timings.unacked_reset
                };
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(shared) = weak.upgrade() {
                        Self::expire(&shared, kind, epoch);
                    }
                })
            }
        }
    }

    /// One repeat tick. Returns false once the timer is stale.
    fn repeat_notify(&self, epoch: u64) -> bool {
        let inner = self.inner.lock();
        if inner.epoch != epoch || !inner.status.is_triggered() {
            return false;
        }

        let snapshot = self.snapshot_of(&inner);
        debug!("re-sending help notification");
        self.notifier.dispatch(&snapshot);
        true
    }

    fn expire(this: &Arc<Self>, kind: TimerKind, epoch: u64) {
        let mut inner = this.inner.lock();
        if inner.epoch != epoch {
            debug!(timer = %kind, "stale timer fired, ignoring");
            return;
        }

        info!(timer = %kind, status = %inner.status, "alert timer expired, resetting");
        Self::enter(this, &mut inner, AlertStatus::Ready);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.inner.get_mut().timers.cancel_all();
    }
}
