use serde::{Deserialize, Serialize};

use super::ids::EntityId;
use super::session::{EntityRef, EntityType, TimerPath};

/// The user's current pointer into the hierarchy. Not an entity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub mode_id: Option<EntityId>,
    pub goal_id: Option<EntityId>,
    pub project_id: Option<EntityId>,
    pub milestone_id: Option<EntityId>,
    pub task_id: Option<EntityId>,
}

impl Selection {
    pub fn for_mode(mode_id: EntityId) -> Self {
        Self {
            mode_id: Some(mode_id),
            ..Default::default()
        }
    }

    /// Copies the path verbatim; the mode falls back to `fallback_mode` when the
    /// path carries none.
    pub fn from_path(path: &TimerPath, fallback_mode: Option<EntityId>) -> Self {
        Self {
            mode_id: path.mode_id.or(fallback_mode),
            goal_id: path.goal_id,
            project_id: path.project_id,
            milestone_id: path.milestone_id,
            task_id: path.task_id,
        }
    }

    pub fn to_path(&self) -> TimerPath {
        TimerPath {
            mode_id: self.mode_id,
            goal_id: self.goal_id,
            project_id: self.project_id,
            milestone_id: self.milestone_id,
            task_id: self.task_id,
        }
    }

    /// Most specific non-null field below the mode, task first.
    pub fn deepest_entity(&self) -> Option<EntityRef> {
        self.to_path()
            .deepest()
            .filter(|entity| entity.kind != EntityType::Mode)
    }

    pub fn with_snapshot(mut self, snapshot: &Snapshot) -> Self {
        self.goal_id = snapshot.goal_id;
        self.project_id = snapshot.project_id;
        self.milestone_id = snapshot.milestone_id;
        self.task_id = snapshot.task_id;
        self
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            goal_id: self.goal_id,
            project_id: self.project_id,
            milestone_id: self.milestone_id,
            task_id: self.task_id,
        }
    }

    pub fn is_mode_only(&self) -> bool {
        self.snapshot() == Snapshot::default()
    }
}

/// Last-used pointer below a mode, cached per mode.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub goal_id: Option<EntityId>,
    pub project_id: Option<EntityId>,
    pub milestone_id: Option<EntityId>,
    pub task_id: Option<EntityId>,
}
