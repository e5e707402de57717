use serde::{Deserialize, Serialize};

use crate::models::{EntityId, EntityType, Selection, TimerKind};

/// Exactly one path key, the deepest set field of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathTarget {
    TaskId(EntityId),
    MilestoneId(EntityId),
    ProjectId(EntityId),
    GoalId(EntityId),
    ModeId(EntityId),
}

impl PathTarget {
    pub fn from_selection(selection: &Selection) -> Option<Self> {
        let target = selection.to_path().deepest()?;
        Some(match target.kind {
            EntityType::Task => PathTarget::TaskId(target.id),
            EntityType::Milestone => PathTarget::MilestoneId(target.id),
            EntityType::Project => PathTarget::ProjectId(target.id),
            EntityType::Goal => PathTarget::GoalId(target.id),
            EntityType::Mode => PathTarget::ModeId(target.id),
        })
    }

    pub fn kind(&self) -> EntityType {
        match self {
            PathTarget::TaskId(_) => EntityType::Task,
            PathTarget::MilestoneId(_) => EntityType::Milestone,
            PathTarget::ProjectId(_) => EntityType::Project,
            PathTarget::GoalId(_) => EntityType::Goal,
            PathTarget::ModeId(_) => EntityType::Mode,
        }
    }

    pub fn id(&self) -> EntityId {
        match *self {
            PathTarget::TaskId(id)
            | PathTarget::MilestoneId(id)
            | PathTarget::ProjectId(id)
            | PathTarget::GoalId(id)
            | PathTarget::ModeId(id) => id,
        }
    }
}

/// Body of `POST timer/start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub kind: TimerKind,
    #[serde(flatten)]
    pub target: PathTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<u64>,
}

impl StartRequest {
    /// `None` when the selection points at nothing, not even a mode.
    /// `duration_sec` is only carried for countdowns.
    pub fn from_selection(selection: &Selection, kind: TimerKind, duration_sec: u64) -> Option<Self> {
        Some(Self {
            kind,
            target: PathTarget::from_selection(selection)?,
            duration_sec: match kind {
                TimerKind::Timer => Some(duration_sec),
                TimerKind::Stopwatch => None,
            },
        })
    }
}
