use serde::{Deserialize, Serialize};

use crate::models::{Catalog, EntityId, Milestone, Project, Task};

/// Keeps only the deepest ancestor link on an outgoing project record.
pub fn normalize_project_links(mut project: Project) -> Project {
    if project.parent_id.is_some() {
        project.goal_id = None;
    }
    project
}

/// Keeps only the deepest ancestor link on an outgoing milestone record.
pub fn normalize_milestone_links(mut milestone: Milestone) -> Milestone {
    if milestone.parent_id.is_some() {
        milestone.project_id = None;
        milestone.goal_id = None;
    } else if milestone.project_id.is_some() {
        milestone.goal_id = None;
    }
    milestone
}

/// Keeps only the deepest ancestor link on an outgoing task record.
pub fn normalize_task_links(mut task: Task) -> Task {
    if task.milestone_id.is_some() {
        task.project_id = None;
        task.goal_id = None;
    } else if task.project_id.is_some() {
        task.goal_id = None;
    }
    task
}

/// Ancestor ids picked in a form, before they are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AncestorLinks {
    pub goal_id: Option<EntityId>,
    pub project_id: Option<EntityId>,
    /// Parent milestone.
    pub parent_id: Option<EntityId>,
    pub milestone_id: Option<EntityId>,
}

/// Drops every id that does not name a record of `mode_id`. Without a mode the
/// links are returned untouched.
pub fn cleanse_links_by_mode(
    mode_id: Option<EntityId>,
    links: AncestorLinks,
    catalog: &Catalog,
) -> AncestorLinks {
    let Some(mode_id) = mode_id else {
        return links;
    };

    let goal_ok = |id: &EntityId| catalog.goal(*id).is_some_and(|g| g.mode_id == mode_id);
    let project_ok = |id: &EntityId| catalog.project(*id).is_some_and(|p| p.mode_id == mode_id);
    let milestone_ok =
        |id: &EntityId| catalog.milestone(*id).is_some_and(|m| m.mode_id == mode_id);

    AncestorLinks {
        goal_id: links.goal_id.filter(goal_ok),
        project_id: links.project_id.filter(project_ok),
        parent_id: links.parent_id.filter(&milestone_ok),
        milestone_id: links.milestone_id.filter(&milestone_ok),
    }
}
