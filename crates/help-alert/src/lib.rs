//! Help request alert state machine.
//!
//! `help-alert` owns the single shared "help requested" alert: any client may
//! trigger it, an authorized admin acknowledges it, and timers bring it back
//! to ready on their own.
//!
//! # States
//!
//! ```text
//! Ready --trigger--> Triggered --acknowledge--> Acknowledged
//!   ^                    |                           |
//!   +---- unacked reset -+------- ack reset ---------+
//! ```
//!
//! Illegal requests (trigger while triggered, acknowledge while not
//! triggered) are reported as [`TransitionOutcome::Ignored`], never as errors.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use help_alert::{AlertMachine, AlertStatus, AlertTimings, NoopBroadcaster, NoopNotifier};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let machine = AlertMachine::new(
//!     AlertTimings::default(),
//!     Arc::new(NoopNotifier),
//!     Arc::new(NoopBroadcaster),
//! );
//!
//! assert!(machine.trigger().is_applied());
//! assert!(!machine.trigger().is_applied());
//! assert!(machine.acknowledge().is_applied());
//! assert_eq!(machine.snapshot().status, AlertStatus::Acknowledged);
//! # machine.shutdown();
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod machine;
pub mod sink;
pub mod timers;
pub mod types;

pub use machine::AlertMachine;
pub use sink::{NoopBroadcaster, NoopNotifier, Notifier, StatusBroadcaster};
pub use timers::TimerKind;
pub use types::{AlertSnapshot, AlertStatus, AlertTimings, TransitionOutcome};
