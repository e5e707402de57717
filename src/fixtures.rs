//! Record builders shared by the unit tests.

use crate::models::{Catalog, EntityId, Goal, Milestone, Mode, Project, Task};

pub fn mode(id: EntityId) -> Mode {
    Mode {
        id,
        title: format!("Mode {id}"),
        color: "#888888".into(),
        position: id,
    }
}

pub fn goal(id: EntityId, mode_id: EntityId) -> Goal {
    Goal {
        id,
        mode_id,
        title: format!("Goal {id}"),
        is_completed: false,
        position: 0,
        due_date: None,
        due_time: None,
    }
}

pub fn project(
    id: EntityId,
    mode_id: EntityId,
    parent_id: Option<EntityId>,
    goal_id: Option<EntityId>,
) -> Project {
    Project {
        id,
        mode_id,
        title: format!("Project {id}"),
        parent_id,
        goal_id,
        position: 0,
        is_completed: false,
    }
}

pub fn milestone(
    id: EntityId,
    mode_id: EntityId,
    parent_id: Option<EntityId>,
    project_id: Option<EntityId>,
    goal_id: Option<EntityId>,
) -> Milestone {
    Milestone {
        id,
        mode_id,
        title: format!("Milestone {id}"),
        parent_id,
        project_id,
        goal_id,
        position: 0,
        is_completed: false,
    }
}

pub fn task(
    id: EntityId,
    mode_id: EntityId,
    milestone_id: Option<EntityId>,
    project_id: Option<EntityId>,
    goal_id: Option<EntityId>,
) -> Task {
    Task {
        id,
        mode_id,
        title: format!("Task {id}"),
        milestone_id,
        project_id,
        goal_id,
        position: 0,
        is_completed: false,
        planned_seconds: None,
    }
}

/// Mode 1 with a small tree:
///
/// ```text
/// G1 ─ P5 ─ P6 (nested)
///    │    └ M9 ─ M10 (nested) ─ T42
///    └ T30
/// G2 ─ P7 ─ M11
/// P8 (flat)
/// ```
/// plus mode 2 holding G20 ─ P21.
pub fn sample_catalog() -> Catalog {
    Catalog {
        modes: vec![mode(1), mode(2)],
        goals: vec![goal(1, 1), goal(2, 1), goal(20, 2)],
        projects: vec![
            project(5, 1, None, Some(1)),
            project(6, 1, Some(5), None),
            project(7, 1, None, Some(2)),
            project(8, 1, None, None),
            project(21, 2, None, Some(20)),
        ],
        milestones: vec![
            milestone(9, 1, None, Some(5), None),
            milestone(10, 1, Some(9), None, None),
            milestone(11, 1, None, Some(7), None),
        ],
        tasks: vec![
            task(42, 1, Some(10), None, None),
            task(30, 1, None, None, Some(1)),
        ],
    }
}
