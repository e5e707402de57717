//! Deterministic sibling ordering and "next item" lookup.

use crate::models::{
    Catalog, EntityId, EntityRef, EntityType, Goal, HierarchyNode, Milestone, Project, Selection,
    Task,
};

/// Which lane of siblings to list. Only the deepest set ancestor is consulted;
/// with none set the lane is the mode's flat items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityScope {
    pub mode_id: EntityId,
    pub goal_id: Option<EntityId>,
    pub project_id: Option<EntityId>,
    pub milestone_id: Option<EntityId>,
}

impl EntityScope {
    pub fn flat(mode_id: EntityId) -> Self {
        Self {
            mode_id,
            ..Default::default()
        }
    }

    pub fn from_selection(mode_id: EntityId, selection: &Selection) -> Self {
        Self {
            mode_id,
            goal_id: selection.goal_id,
            project_id: selection.project_id,
            milestone_id: selection.milestone_id,
        }
    }
}

/// Stable sort by `(position, id)`.
pub fn sort_by_position<T: HierarchyNode>(mut items: Vec<T>) -> Vec<T> {
    items.sort_by_key(|item| (item.position(), item.id()));
    items
}

/// The element after `current_id`. A missing id yields the head of the list;
/// the last element yields `None`.
pub fn next_after<T: HierarchyNode>(ordered: &[T], current_id: EntityId) -> Option<&T> {
    match ordered.iter().position(|item| item.id() == current_id) {
        Some(index) => ordered.get(index + 1),
        None => ordered.first(),
    }
}

fn open_in_mode<T: HierarchyNode>(items: &[T], mode_id: EntityId) -> impl Iterator<Item = &T> {
    items
        .iter()
        .filter(move |item| item.mode_id() == mode_id && !item.is_completed())
}

pub fn scoped_goals_by_position(goals: &[Goal], mode_id: EntityId) -> Vec<&Goal> {
    sort_by_position(open_in_mode(goals, mode_id).collect())
}

pub fn scoped_projects_by_position<'a>(projects: &'a [Project], scope: &EntityScope) -> Vec<&'a Project> {
    let lane = open_in_mode(projects, scope.mode_id).filter(|p| {
        if let Some(parent) = scope.project_id {
            p.parent_id == Some(parent)
        } else if let Some(goal) = scope.goal_id {
            p.goal_id == Some(goal) && p.parent_id.is_none()
        } else {
            p.goal_id.is_none() && p.parent_id.is_none()
        }
    });
    sort_by_position(lane.collect())
}

pub fn scoped_milestones_by_position<'a>(
    milestones: &'a [Milestone],
    scope: &EntityScope,
) -> Vec<&'a Milestone> {
    let lane = open_in_mode(milestones, scope.mode_id).filter(|m| {
        if let Some(parent) = scope.milestone_id {
            m.parent_id == Some(parent)
        } else if let Some(project) = scope.project_id {
            m.project_id == Some(project) && m.parent_id.is_none()
        } else if let Some(goal) = scope.goal_id {
            m.goal_id == Some(goal) && m.project_id.is_none() && m.parent_id.is_none()
        } else {
            m.goal_id.is_none() && m.project_id.is_none() && m.parent_id.is_none()
        }
    });
    sort_by_position(lane.collect())
}

pub fn scoped_tasks_by_position<'a>(tasks: &'a [Task], scope: &EntityScope) -> Vec<&'a Task> {
    let lane = open_in_mode(tasks, scope.mode_id).filter(|t| {
        if let Some(milestone) = scope.milestone_id {
            t.milestone_id == Some(milestone)
        } else if let Some(project) = scope.project_id {
            t.project_id == Some(project) && t.milestone_id.is_none()
        } else if let Some(goal) = scope.goal_id {
            t.goal_id == Some(goal) && t.project_id.is_none() && t.milestone_id.is_none()
        } else {
            t.goal_id.is_none() && t.project_id.is_none() && t.milestone_id.is_none()
        }
    });
    sort_by_position(lane.collect())
}

/// Most specific non-null field, task first; `None` for a mode-only selection.
pub fn get_deepest_entity(selection: &Selection) -> Option<EntityRef> {
    selection.deepest_entity()
}

/// Lane holding `entity` and its siblings: the record's own direct link when
/// the record is known, otherwise the selection's ancestors above it.
fn sibling_scope(
    catalog: &Catalog,
    mode_id: EntityId,
    selection: &Selection,
    entity: EntityRef,
) -> EntityScope {
    let mut scope = EntityScope::flat(mode_id);
    match entity.kind {
        EntityType::Task => match catalog.task(entity.id) {
            Some(task) => {
                scope.milestone_id = task.milestone_id;
                scope.project_id = task.project_id;
                scope.goal_id = task.goal_id;
            }
            None => scope = EntityScope::from_selection(mode_id, selection),
        },
        EntityType::Milestone => match catalog.milestone(entity.id) {
            Some(milestone) => {
                scope.milestone_id = milestone.parent_id;
                scope.project_id = milestone.project_id;
                scope.goal_id = milestone.goal_id;
            }
            None => {
                scope.project_id = selection.project_id;
                scope.goal_id = selection.goal_id;
            }
        },
        EntityType::Project => match catalog.project(entity.id) {
            Some(project) => {
                scope.project_id = project.parent_id;
                scope.goal_id = project.goal_id;
            }
            None => scope.goal_id = selection.goal_id,
        },
        EntityType::Goal | EntityType::Mode => {}
    }
    scope
}

/// Next open sibling of the selection's deepest entity, in position order.
///
/// `None` when the selection is mode-only; `Some(None)` when the lane is exhausted.
pub fn next_sibling(catalog: &Catalog, selection: &Selection) -> Option<Option<EntityRef>> {
    let current = get_deepest_entity(selection)?;
    let mode_id = selection.mode_id?;
    let scope = sibling_scope(catalog, mode_id, selection, current);

    let next_id = match current.kind {
        EntityType::Task => {
            next_after(&scoped_tasks_by_position(&catalog.tasks, &scope), current.id).map(|t| t.id)
        }
        EntityType::Milestone => next_after(
            &scoped_milestones_by_position(&catalog.milestones, &scope),
            current.id,
        )
        .map(|m| m.id),
        EntityType::Project => next_after(
            &scoped_projects_by_position(&catalog.projects, &scope),
            current.id,
        )
        .map(|p| p.id),
        EntityType::Goal | EntityType::Mode => {
            next_after(&scoped_goals_by_position(&catalog.goals, mode_id), current.id).map(|g| g.id)
        }
    };
    Some(next_id.map(|id| EntityRef::new(current.kind, id)))
}
