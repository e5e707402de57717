use serde::{Deserialize, Serialize};

use crate::models::{Catalog, EntityId, Goal, Milestone, Project};

use super::effective::Lineage;

/// The editor-facing part of a selection: a mode plus optional ancestors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSelection {
    pub mode_id: EntityId,
    pub goal_id: Option<EntityId>,
    pub project_id: Option<EntityId>,
    pub milestone_id: Option<EntityId>,
}

impl ScopeSelection {
    pub fn new(mode_id: EntityId) -> Self {
        Self {
            mode_id,
            goal_id: None,
            project_id: None,
            milestone_id: None,
        }
    }
}

/// A single user edit to one field of a [`ScopeSelection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Mode(EntityId),
    Goal(Option<EntityId>),
    Project(Option<EntityId>),
    Milestone(Option<EntityId>),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilterOptions {
    /// Keep projects without a stored goal visible while a goal is selected.
    pub keep_flat_projects_when_goal_selected: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorOptions<'a> {
    pub goals: Vec<&'a Goal>,
    pub projects: Vec<&'a Project>,
    pub milestones: Vec<&'a Milestone>,
}

impl<'a> Lineage<'a> {
    pub fn is_project_compatible(&self, selection: &ScopeSelection, project: &Project) -> bool {
        if project.mode_id != selection.mode_id {
            return false;
        }
        match selection.goal_id {
            Some(goal_id) => self.project_goal_id(project.id) == Some(goal_id),
            None => true,
        }
    }

    /// With a project selected the milestone's effective project must be it or
    /// one of its descendants; otherwise a selected goal must match.
    pub fn is_milestone_compatible(&self, selection: &ScopeSelection, milestone: &Milestone) -> bool {
        if milestone.mode_id != selection.mode_id {
            return false;
        }
        if let Some(project_id) = selection.project_id {
            return match self.milestone_project_id(milestone.id) {
                Some(effective) => {
                    effective == project_id || self.project_belongs_under(effective, project_id)
                }
                None => false,
            };
        }
        match selection.goal_id {
            Some(goal_id) => self.milestone_goal_id(milestone.id) == Some(goal_id),
            None => true,
        }
    }

    fn reconcile(&self, prev: &ScopeSelection, change: SelectionChange) -> ScopeSelection {
        let mut next = *prev;

        match change {
            SelectionChange::Mode(mode_id) => {
                if mode_id != prev.mode_id {
                    next = ScopeSelection::new(mode_id);
                }
            }
            SelectionChange::Goal(goal_id) => {
                if goal_id == prev.goal_id {
                    return next;
                }
                next.goal_id = goal_id;
                if goal_id.is_none() {
                    next.project_id = None;
                    next.milestone_id = None;
                    return next;
                }
                self.drop_incompatible_project(&mut next);
                self.drop_incompatible_milestone(&mut next);
            }
            SelectionChange::Project(project_id) => {
                if project_id == prev.project_id {
                    return next;
                }
                next.project_id = project_id;
                let Some(project_id) = project_id else {
                    next.milestone_id = None;
                    return next;
                };
                next.goal_id = self.project_goal_id(project_id);
                self.drop_incompatible_milestone(&mut next);
            }
            SelectionChange::Milestone(milestone_id) => {
                if milestone_id == prev.milestone_id {
                    return next;
                }
                next.milestone_id = milestone_id;
                if let Some(milestone_id) = milestone_id {
                    next.project_id = self.milestone_project_id(milestone_id);
                    next.goal_id = self.milestone_goal_id(milestone_id);
                }
            }
        }
        next
    }

    fn drop_incompatible_project(&self, selection: &mut ScopeSelection) {
        if let Some(project_id) = selection.project_id {
            let compatible = self
                .project(project_id)
                .is_some_and(|p| self.is_project_compatible(selection, p));
            if !compatible {
                selection.project_id = None;
            }
        }
    }

    fn drop_incompatible_milestone(&self, selection: &mut ScopeSelection) {
        if let Some(milestone_id) = selection.milestone_id {
            let compatible = self
                .milestone(milestone_id)
                .is_some_and(|m| self.is_milestone_compatible(selection, m));
            if !compatible {
                selection.milestone_id = None;
            }
        }
    }
}

/// Goals, projects and milestones an editor may offer for `selection`.
pub fn filter_editor_options<'a>(
    selection: &ScopeSelection,
    catalog: &'a Catalog,
    options: FilterOptions,
) -> EditorOptions<'a> {
    let lineage = Lineage::new(catalog);

    let goals = catalog
        .goals
        .iter()
        .filter(|g| g.mode_id == selection.mode_id)
        .collect();

    let projects = catalog
        .projects
        .iter()
        .filter(|p| {
            if options.keep_flat_projects_when_goal_selected
                && selection.goal_id.is_some()
                && p.mode_id == selection.mode_id
                && p.goal_id.is_none()
            {
                return true;
            }
            lineage.is_project_compatible(selection, p)
        })
        .collect();

    let milestones = catalog
        .milestones
        .iter()
        .filter(|m| lineage.is_milestone_compatible(selection, m))
        .collect();

    EditorOptions {
        goals,
        projects,
        milestones,
    }
}

/// Applies one field edit and clears or re-derives the other fields so the
/// result stays consistent. Never fails; unresolvable fields become `None`.
///
/// Rules, evaluated against the already-updated selection:
/// a mode change resets everything below it; clearing the goal clears project
/// and milestone; a new goal drops a project or milestone that no longer fits;
/// clearing the project clears the milestone; a new project re-derives the goal
/// and drops a milestone that no longer fits; a new milestone re-derives both
/// project and goal. Setting a field to its current value changes nothing.
pub fn reconcile_after_change(
    prev: &ScopeSelection,
    change: SelectionChange,
    catalog: &Catalog,
) -> ScopeSelection {
    Lineage::new(catalog).reconcile(prev, change)
}

/// [`reconcile_after_change`] for many selections sharing one catalog.
pub fn reconcile_batch(
    items: &[ScopeSelection],
    change: SelectionChange,
    catalog: &Catalog,
) -> Vec<ScopeSelection> {
    let lineage = Lineage::new(catalog);
    items
        .iter()
        .map(|item| lineage.reconcile(item, change))
        .collect()
}
