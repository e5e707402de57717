use serde::{Deserialize, Serialize};

use super::ids::{lenient_id, EntityId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mode {
    pub id: EntityId,
    pub title: String,
    pub color: String,
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: EntityId,
    pub mode_id: EntityId,
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub due_time: Option<String>,
}

/// A project hangs off another project (`parent_id`) or a goal (`goal_id`).
/// When `parent_id` is set the stored `goal_id` is not authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: EntityId,
    pub mode_id: EntityId,
    pub title: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub parent_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub goal_id: Option<EntityId>,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub is_completed: bool,
}

/// A milestone hangs off another milestone, a project, or a goal; the deepest link wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: EntityId,
    pub mode_id: EntityId,
    pub title: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub parent_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub project_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub goal_id: Option<EntityId>,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: EntityId,
    pub mode_id: EntityId,
    pub title: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub milestone_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub project_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub goal_id: Option<EntityId>,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub is_completed: bool,
    /// Countdown length the task was planned with, used when resuming from history.
    #[serde(default)]
    pub planned_seconds: Option<u64>,
}

/// Fields shared by every orderable hierarchy record.
pub trait HierarchyNode {
    fn id(&self) -> EntityId;
    fn mode_id(&self) -> EntityId;
    fn position(&self) -> i64;
    fn is_completed(&self) -> bool;
}

macro_rules! impl_hierarchy_node {
    ($($ty:ty),*) => {
        $(
            impl HierarchyNode for $ty {
                fn id(&self) -> EntityId {
                    self.id
                }
                fn mode_id(&self) -> EntityId {
                    self.mode_id
                }
                fn position(&self) -> i64 {
                    self.position
                }
                fn is_completed(&self) -> bool {
                    self.is_completed
                }
            }
        )*
    };
}

impl_hierarchy_node!(Goal, Project, Milestone, Task);

impl<T: HierarchyNode + ?Sized> HierarchyNode for &T {
    fn id(&self) -> EntityId {
        (**self).id()
    }
    fn mode_id(&self) -> EntityId {
        (**self).mode_id()
    }
    fn position(&self) -> i64 {
        (**self).position()
    }
    fn is_completed(&self) -> bool {
        (**self).is_completed()
    }
}

/// Every entity list the core reads, as supplied by the surrounding CRUD layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub modes: Vec<Mode>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Catalog {
    pub fn mode(&self, id: EntityId) -> Option<&Mode> {
        self.modes.iter().find(|m| m.id == id)
    }

    pub fn goal(&self, id: EntityId) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    pub fn project(&self, id: EntityId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn milestone(&self, id: EntityId) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }

    pub fn task(&self, id: EntityId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_of<T: HierarchyNode>(node: T) -> (EntityId, i64, bool) {
        (node.id(), node.position(), node.is_completed())
    }

    #[test]
    fn borrowed_records_read_like_owned_ones() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": 7, "modeId": 1, "title": "Draft", "position": 3, "isCompleted": true
        }))
        .unwrap();
        assert_eq!(position_of(&task), position_of(task.clone()));
        assert_eq!(position_of(&&task), (7, 3, true));
        assert_eq!((&task).mode_id(), 1);
    }
}
