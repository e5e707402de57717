//! Timer session reconciliation: the server's active session on one side, the
//! local selection on the other.

pub mod api;
pub mod controller;
pub mod countdown;
pub mod launch;
pub mod payload;
pub mod restore;
pub mod state;
pub mod worker;

pub use api::{HttpTimerApi, TimerApi};
pub use controller::{
    CompleteOutcome, NextOutcome, StopOutcome, SwitchOutcome, TimerSessionController,
};
pub use countdown::{AutoStopLatch, ClockReading, ResumePlan};
pub use launch::{DescendantClear, LaunchIntent, LaunchIntentSlot};
pub use payload::{PathTarget, StartRequest};
pub use restore::{plan_restore, RestoreInput, RestorePlan};
pub use state::{Baseline, ClockSettings, ControllerState, ControllerView, RestoreGuard, TimerPhase};
pub use worker::TimerWorker;
