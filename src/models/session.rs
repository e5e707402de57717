use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{lenient_id, EntityId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimerKind {
    #[default]
    Stopwatch,
    Timer,
}

impl TimerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerKind::Stopwatch => "stopwatch",
            TimerKind::Timer => "timer",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Mode,
    Goal,
    Project,
    Milestone,
    Task,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Mode => "mode",
            EntityType::Goal => "goal",
            EntityType::Project => "project",
            EntityType::Milestone => "milestone",
            EntityType::Task => "task",
        }
    }
}

/// A typed pointer at one hierarchy record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: EntityType, id: EntityId) -> Self {
        Self { kind, id }
    }
}

/// Sparse ancestor reference for the thing being timed. Only the deepest
/// present field is authoritative; the rest are hints.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerPath {
    #[serde(default, deserialize_with = "lenient_id")]
    pub mode_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub goal_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub project_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub milestone_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub task_id: Option<EntityId>,
}

impl TimerPath {
    /// Most specific present field, task first.
    pub fn deepest(&self) -> Option<EntityRef> {
        if let Some(id) = self.task_id {
            return Some(EntityRef::new(EntityType::Task, id));
        }
        if let Some(id) = self.milestone_id {
            return Some(EntityRef::new(EntityType::Milestone, id));
        }
        if let Some(id) = self.project_id {
            return Some(EntityRef::new(EntityType::Project, id));
        }
        if let Some(id) = self.goal_id {
            return Some(EntityRef::new(EntityType::Goal, id));
        }
        self.mode_id.map(|id| EntityRef::new(EntityType::Mode, id))
    }
}

/// The server's view of the running session, as returned by `GET timer/active`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    #[serde(default)]
    pub session_id: Option<String>,
    pub kind: TimerKind,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub remaining_seconds: Option<f64>,
    #[serde(default)]
    pub planned_seconds: Option<u64>,
    #[serde(default)]
    pub path: TimerPath,
}

impl ActiveSession {
    /// Identity used to decide whether a polled snapshot is a new session.
    /// Falls back to the start instant for servers that omit `sessionId`.
    pub fn identity(&self) -> String {
        match &self.session_id {
            Some(id) => id.clone(),
            None => format!("started:{}", self.started_at.timestamp_millis()),
        }
    }
}

/// A closed burst of timed work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: EntityId,
    pub kind: TimerKind,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(default)]
    pub seconds: u64,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub path: TimerPath,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub planned_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompleteNextRequest {
    pub entity_type: EntityType,
    pub entity_id: EntityId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NextEntity {
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    #[serde(default)]
    pub path: TimerPath,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompleteNextResponse {
    #[serde(default)]
    pub stopped_entry: Option<TimeEntry>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub next: Option<NextEntity>,
    #[serde(default)]
    pub dropdown_empty: bool,
}
