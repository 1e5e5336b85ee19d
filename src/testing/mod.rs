//! Deterministic harness utilities.
//!
//! Synthetic nights for the signal processor and the CLI `simulate`
//! command are always available. The manual scheduler and scripted device
//! that drive a tracking session without real timers or sensors are only
//! compiled for unit tests or when the `test_harness` Cargo feature is
//! enabled, so production builds carry no fake collaborators.

pub mod fixtures;
#[cfg(any(test, feature = "test_harness"))]
pub mod harness;

pub use fixtures::{constant_records, NightSpec};
#[cfg(any(test, feature = "test_harness"))]
pub use harness::{cyclic_wrist, run_until, HarnessSession, ManualScheduler, ScriptedDevice};
