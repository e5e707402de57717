use chrono::{DateTime, Utc};
use serde::Serialize;

use super::countdown::{AutoStopLatch, ClockReading};
use super::launch::DescendantClear;
use crate::models::{ActiveSession, Selection, TimerKind};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerPhase {
    #[default]
    Idle,
    RunningStopwatch,
    RunningTimer,
    Switching,
    Completing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ExplicitWrite,
    Launch,
}

/// Ordering between explicit selection writes and the restore pass.
///
/// An explicit write raises `skip_once`; a launch additionally bumps the
/// generation and may leave a clear policy for the first pass that runs.
/// Either way exactly one pass is swallowed.
#[derive(Debug, Clone, Default)]
pub struct RestoreGuard {
    skip_once: bool,
    launch_generation: u64,
    seen_launch_generation: u64,
    clear_policy: Option<DescendantClear>,
}

impl RestoreGuard {
    pub fn suppress_next(&mut self) {
        self.skip_once = true;
    }

    pub fn cancel_suppression(&mut self) {
        self.skip_once = false;
    }

    pub fn record_launch(&mut self, clear_policy: Option<DescendantClear>) {
        self.skip_once = true;
        self.launch_generation += 1;
        self.clear_policy = clear_policy;
    }

    /// Called at the top of every pass. `Some` means this pass must not act.
    pub fn begin_pass(&mut self) -> Option<SkipReason> {
        let launched = self.seen_launch_generation != self.launch_generation;
        self.seen_launch_generation = self.launch_generation;
        if std::mem::take(&mut self.skip_once) {
            return Some(if launched {
                SkipReason::Launch
            } else {
                SkipReason::ExplicitWrite
            });
        }
        launched.then_some(SkipReason::Launch)
    }

    pub fn clear_policy(&self) -> Option<DescendantClear> {
        self.clear_policy
    }

    pub fn consume_clear_policy(&mut self) {
        self.clear_policy = None;
    }

    pub fn launch_generation(&self) -> u64 {
        self.launch_generation
    }
}

/// What the running session is actually timing. `session` is `None` while a
/// locally started session has not been confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub session: Option<String>,
    pub selection: Selection,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClockSettings {
    pub kind: TimerKind,
    pub countdown_secs: u64,
}

impl ClockSettings {
    pub fn new(countdown_secs: u64) -> Self {
        Self {
            kind: TimerKind::Stopwatch,
            countdown_secs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerState {
    pub active: Option<ActiveSession>,
    /// When `active` was last fetched; ages a server-reported remaining time.
    pub fetched_at: DateTime<Utc>,
    pub baseline: Option<Baseline>,
    pub switch_armed: bool,
    pub restore: RestoreGuard,
    pub commit_token: u64,
    pub switches_in_flight: u32,
    pub completing: bool,
    pub auto_stop: AutoStopLatch,
    /// Selection captured by a stop, re-applied once the session is gone.
    pub last_stopped: Option<Selection>,
    pub clock: ClockSettings,
    pub visible: bool,
}

impl ControllerState {
    pub fn new(clock: ClockSettings) -> Self {
        Self {
            active: None,
            fetched_at: Utc::now(),
            baseline: None,
            switch_armed: false,
            restore: RestoreGuard::default(),
            commit_token: 0,
            switches_in_flight: 0,
            completing: false,
            auto_stop: AutoStopLatch::default(),
            last_stopped: None,
            clock,
            visible: true,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        if self.completing {
            return TimerPhase::Completing;
        }
        if self.switches_in_flight > 0 {
            return TimerPhase::Switching;
        }
        match self.active.as_ref().map(|session| session.kind) {
            Some(TimerKind::Stopwatch) => TimerPhase::RunningStopwatch,
            Some(TimerKind::Timer) => TimerPhase::RunningTimer,
            None => TimerPhase::Idle,
        }
    }

    pub fn active_identity(&self) -> Option<String> {
        self.active.as_ref().map(ActiveSession::identity)
    }

    pub fn clock_reading(&self, now: DateTime<Utc>) -> ClockReading {
        ClockReading::read(self.active.as_ref(), self.fetched_at, now)
    }

    /// Identity of the running countdown, if that is what is running.
    pub fn running_timer_identity(&self) -> Option<String> {
        self.active
            .as_ref()
            .filter(|session| session.kind == TimerKind::Timer)
            .map(ActiveSession::identity)
    }

    pub fn next_commit_token(&mut self) -> u64 {
        self.commit_token += 1;
        self.commit_token
    }
}

/// Snapshot published to subscribers after every state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerView {
    pub phase: TimerPhase,
    pub active: Option<ActiveSession>,
    pub selection: Selection,
    pub baseline: Option<Selection>,
    pub is_dirty: bool,
    pub show_switch: bool,
    pub clock: ClockReading,
    pub settings: ClockSettings,
}

impl Default for ControllerView {
    fn default() -> Self {
        Self {
            phase: TimerPhase::Idle,
            active: None,
            selection: Selection::default(),
            baseline: None,
            is_dirty: false,
            show_switch: false,
            clock: ClockReading::default(),
            settings: ClockSettings::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_write_skips_exactly_one_pass() {
        let mut guard = RestoreGuard::default();
        assert_eq!(guard.begin_pass(), None);
        guard.suppress_next();
        assert_eq!(guard.begin_pass(), Some(SkipReason::ExplicitWrite));
        assert_eq!(guard.begin_pass(), None);
    }

    #[test]
    fn launch_skips_one_pass_and_keeps_its_clear_policy() {
        let mut guard = RestoreGuard::default();
        guard.record_launch(Some(DescendantClear::Task));
        assert_eq!(guard.begin_pass(), Some(SkipReason::Launch));
        assert_eq!(guard.begin_pass(), None);
        assert_eq!(guard.clear_policy(), Some(DescendantClear::Task));
        guard.consume_clear_policy();
        assert_eq!(guard.clear_policy(), None);
        assert_eq!(guard.launch_generation(), 1);
    }

    #[test]
    fn generation_bump_alone_still_skips_once() {
        let mut guard = RestoreGuard::default();
        guard.record_launch(None);
        guard.cancel_suppression();
        assert_eq!(guard.begin_pass(), Some(SkipReason::Launch));
        assert_eq!(guard.begin_pass(), None);
    }

    #[test]
    fn phase_prefers_transient_states() {
        let mut state = ControllerState::new(ClockSettings::new(60));
        assert_eq!(state.phase(), TimerPhase::Idle);
        state.switches_in_flight = 1;
        assert_eq!(state.phase(), TimerPhase::Switching);
        state.completing = true;
        assert_eq!(state.phase(), TimerPhase::Completing);
    }
}
