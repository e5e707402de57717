use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::{ActiveSession, TimeEntry, TimerKind};

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

fn ceil_non_negative(seconds: f64) -> u64 {
    if seconds <= 0.0 {
        0
    } else {
        seconds.ceil() as u64
    }
}

/// Whole seconds left on a countdown at `now`.
///
/// A server-reported `remainingSeconds` is aged by the time since it was
/// fetched; without one the deadline is `endsAt`, then `startedAt + planned`.
/// `None` for stopwatches and for countdowns that carry no deadline at all.
pub fn remaining_seconds(
    session: &ActiveSession,
    fetched_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<u64> {
    if session.kind != TimerKind::Timer {
        return None;
    }
    if let Some(remaining) = session.remaining_seconds {
        return Some(ceil_non_negative(remaining - seconds_between(fetched_at, now)));
    }
    let ends_at = session.ends_at.or_else(|| {
        let planned = i64::try_from(session.planned_seconds?).ok()?;
        session
            .started_at
            .checked_add_signed(Duration::try_seconds(planned)?)
    })?;
    Some(ceil_non_negative(seconds_between(now, ends_at)))
}

/// Whole seconds since the session started, never negative.
pub fn elapsed_seconds(session: &ActiveSession, now: DateTime<Utc>) -> u64 {
    let elapsed = seconds_between(session.started_at, now);
    if elapsed <= 0.0 {
        0
    } else {
        elapsed.floor() as u64
    }
}

/// What a clock face should show for the running session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockReading {
    pub kind: Option<TimerKind>,
    pub elapsed_seconds: u64,
    pub remaining_seconds: Option<u64>,
}

impl ClockReading {
    pub fn read(session: Option<&ActiveSession>, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        match session {
            Some(session) => Self {
                kind: Some(session.kind),
                elapsed_seconds: elapsed_seconds(session, now),
                remaining_seconds: remaining_seconds(session, fetched_at, now),
            },
            None => Self::default(),
        }
    }
}

/// Fires at most once per running countdown, keyed on the session identity.
#[derive(Debug, Clone, Default)]
pub struct AutoStopLatch {
    fired_for: Option<String>,
}

impl AutoStopLatch {
    /// `true` exactly once when the countdown identified by `identity` reaches
    /// zero. Passing `None` (no running countdown) re-arms the latch.
    pub fn should_fire(&mut self, identity: Option<&str>, remaining: Option<u64>) -> bool {
        let Some(identity) = identity else {
            self.reset();
            return false;
        };
        if remaining != Some(0) || self.fired_for.as_deref() == Some(identity) {
            return false;
        }
        self.fired_for = Some(identity.to_string());
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired_for.is_some()
    }

    pub fn reset(&mut self) {
        self.fired_for = None;
    }
}

/// How a historical entry is restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePlan {
    pub kind: TimerKind,
    /// Countdown length; `None` for stopwatches.
    pub duration_secs: Option<u64>,
}

impl ResumePlan {
    /// Remaining time is the override when given, else the planned duration
    /// (the entry's own, then its task's) minus what the entry already logged.
    /// Anything left becomes a countdown; nothing left, or no plan at all,
    /// restarts as a stopwatch.
    pub fn for_entry(
        entry: &TimeEntry,
        task_planned_seconds: Option<u64>,
        remaining_override: Option<u64>,
    ) -> Self {
        let remaining = remaining_override.or_else(|| {
            entry
                .planned_seconds
                .or(task_planned_seconds)
                .map(|planned| planned.saturating_sub(entry.seconds))
        });
        match remaining {
            Some(secs) if secs > 0 => Self {
                kind: TimerKind::Timer,
                duration_secs: Some(secs),
            },
            _ => Self {
                kind: TimerKind::Stopwatch,
                duration_secs: None,
            },
        }
    }
}
