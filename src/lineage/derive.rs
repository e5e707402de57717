use serde::Serialize;

use crate::models::{EntityId, EntityRef, EntityType, HierarchyNode, Selection, TimerPath};

use super::effective::Lineage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskLineage {
    pub milestone_id: Option<EntityId>,
    pub project_id: Option<EntityId>,
    pub goal_id: Option<EntityId>,
}

/// One breadcrumb segment, leaf first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub id: EntityId,
    pub title: String,
}

impl<'a> Lineage<'a> {
    /// Effective ancestry of a task. The deepest stored link decides; shallower
    /// stored links are ignored and recomputed from it.
    pub fn task_lineage(&self, task_id: EntityId) -> TaskLineage {
        let Some(task) = self.task(task_id) else {
            return TaskLineage::default();
        };

        if let Some(milestone_id) = task.milestone_id {
            return TaskLineage {
                milestone_id: Some(milestone_id),
                project_id: self.milestone_project_id(milestone_id),
                goal_id: self.milestone_goal_id(milestone_id),
            };
        }
        if let Some(project_id) = task.project_id {
            return TaskLineage {
                milestone_id: None,
                project_id: Some(project_id),
                goal_id: self.project_goal_id(project_id),
            };
        }
        TaskLineage {
            goal_id: task.goal_id,
            ..TaskLineage::default()
        }
    }

    fn mode_of(&self, entity: EntityRef) -> Option<EntityId> {
        match entity.kind {
            EntityType::Mode => self.mode(entity.id).map(|m| m.id),
            EntityType::Goal => self.goal(entity.id).map(|g| g.mode_id),
            EntityType::Project => self.project(entity.id).map(HierarchyNode::mode_id),
            EntityType::Milestone => self.milestone(entity.id).map(HierarchyNode::mode_id),
            EntityType::Task => self.task(entity.id).map(HierarchyNode::mode_id),
        }
    }

    fn is_known(&self, entity: EntityRef) -> bool {
        self.mode_of(entity).is_some()
    }

    /// Full selection pointing at `entity`, ancestors resolved.
    pub fn path_for_entity(&self, entity: EntityRef) -> Selection {
        let mode_id = match entity.kind {
            EntityType::Mode => Some(entity.id),
            _ => self.mode_of(entity),
        };
        let mut selection = Selection {
            mode_id,
            ..Selection::default()
        };

        match entity.kind {
            EntityType::Mode => {}
            EntityType::Goal => selection.goal_id = Some(entity.id),
            EntityType::Project => {
                selection.project_id = Some(entity.id);
                selection.goal_id = self.project_goal_id(entity.id);
            }
            EntityType::Milestone => {
                let lineage = self.milestone_lineage(entity.id);
                selection.milestone_id = Some(entity.id);
                selection.project_id = lineage.project_id;
                selection.goal_id = lineage.goal_id;
            }
            EntityType::Task => {
                let lineage = self.task_lineage(entity.id);
                selection.task_id = Some(entity.id);
                selection.milestone_id = lineage.milestone_id;
                selection.project_id = lineage.project_id;
                selection.goal_id = lineage.goal_id;
            }
        }
        selection
    }

    /// Deepest-wins normal form used for dirty checks.
    ///
    /// The deepest field naming a known record determines every shallower field
    /// (and the mode); inconsistent shallower values are dropped. A deepest field
    /// naming an unknown record is kept as-is and the remainder is normalised on
    /// its own. Applying it twice gives the same result as applying it once.
    pub fn canonicalize(&self, selection: &Selection) -> Selection {
        let Some(deepest) = selection.deepest_entity() else {
            return Selection {
                mode_id: selection.mode_id,
                ..Selection::default()
            };
        };

        if self.is_known(deepest) {
            return self.path_for_entity(deepest);
        }

        let mut rest = *selection;
        match deepest.kind {
            EntityType::Task => rest.task_id = None,
            EntityType::Milestone => rest.milestone_id = None,
            EntityType::Project => rest.project_id = None,
            EntityType::Goal => rest.goal_id = None,
            EntityType::Mode => {}
        }
        let mut canonical = self.canonicalize(&rest);
        match deepest.kind {
            EntityType::Task => canonical.task_id = Some(deepest.id),
            EntityType::Milestone => canonical.milestone_id = Some(deepest.id),
            EntityType::Project => canonical.project_id = Some(deepest.id),
            EntityType::Goal => canonical.goal_id = Some(deepest.id),
            EntityType::Mode => {}
        }
        canonical
    }

    /// Mode of the deepest path field that names a known record, else the
    /// path's own `mode_id`.
    pub fn resolve_session_mode_id(&self, path: &TimerPath) -> Option<EntityId> {
        let candidates = [
            path.task_id.map(|id| EntityRef::new(EntityType::Task, id)),
            path.milestone_id.map(|id| EntityRef::new(EntityType::Milestone, id)),
            path.project_id.map(|id| EntityRef::new(EntityType::Project, id)),
            path.goal_id.map(|id| EntityRef::new(EntityType::Goal, id)),
        ];
        candidates
            .into_iter()
            .flatten()
            .find_map(|entity| self.mode_of(entity))
            .or(path.mode_id)
    }

    /// Leaf-first crumbs (`task → milestone → project → goal → mode`) for a
    /// sparse path. Missing ancestors are resolved; unknown ids are skipped.
    pub fn breadcrumb(&self, path: &TimerPath) -> Vec<Crumb> {
        let resolved = self.canonicalize(&Selection::from_path(path, None));
        let mut crumbs = Vec::with_capacity(5);

        let mut push = |kind: EntityType, id: EntityId, title: Option<&str>| {
            if let Some(title) = title {
                crumbs.push(Crumb {
                    kind,
                    id,
                    title: title.to_string(),
                });
            }
        };

        if let Some(id) = resolved.task_id {
            push(EntityType::Task, id, self.task(id).map(|t| t.title.as_str()));
        }
        if let Some(id) = resolved.milestone_id {
            push(EntityType::Milestone, id, self.milestone(id).map(|m| m.title.as_str()));
        }
        if let Some(id) = resolved.project_id {
            push(EntityType::Project, id, self.project(id).map(|p| p.title.as_str()));
        }
        if let Some(id) = resolved.goal_id {
            push(EntityType::Goal, id, self.goal(id).map(|g| g.title.as_str()));
        }
        if let Some(id) = resolved.mode_id {
            push(EntityType::Mode, id, self.mode(id).map(|m| m.title.as_str()));
        }
        crumbs
    }
}

pub fn leaf_title(crumbs: &[Crumb]) -> Option<&str> {
    crumbs.first().map(|crumb| crumb.title.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{project, sample_catalog, task};
    use crate::models::Catalog;
    use pretty_assertions::assert_eq;

    fn sel(
        mode: Option<EntityId>,
        goal: Option<EntityId>,
        project: Option<EntityId>,
        milestone: Option<EntityId>,
        task: Option<EntityId>,
    ) -> Selection {
        Selection {
            mode_id: mode,
            goal_id: goal,
            project_id: project,
            milestone_id: milestone,
            task_id: task,
        }
    }

    #[test]
    fn task_under_nested_milestone_resolves_full_lineage() {
        let catalog = sample_catalog();
        let lineage = Lineage::new(&catalog);

        assert_eq!(
            lineage.task_lineage(42),
            TaskLineage {
                milestone_id: Some(10),
                project_id: Some(5),
                goal_id: Some(1),
            }
        );
        assert_eq!(
            lineage.path_for_entity(EntityRef::new(EntityType::Task, 42)),
            sel(Some(1), Some(1), Some(5), Some(10), Some(42))
        );
    }

    #[test]
    fn deepest_link_wins_over_inconsistent_stored_links() {
        let mut catalog = sample_catalog();
        catalog.tasks.push(task(50, 1, Some(11), Some(5), Some(1)));
        let lineage = Lineage::new(&catalog);

        assert_eq!(
            lineage.task_lineage(50),
            TaskLineage {
                milestone_id: Some(11),
                project_id: Some(7),
                goal_id: Some(2),
            }
        );
    }

    #[test]
    fn project_selection_and_derived_goal_compare_equal() {
        let catalog = Catalog {
            projects: vec![project(5, 1, None, Some(3))],
            ..Default::default()
        };
        let lineage = Lineage::new(&catalog);

        let current = sel(Some(1), None, Some(5), None, None);
        let baseline = sel(Some(1), Some(3), Some(5), None, None);
        assert_eq!(lineage.canonicalize(&current), lineage.canonicalize(&baseline));
    }

    #[test]
    fn canonicalize_discards_shallower_fields_that_disagree() {
        let catalog = sample_catalog();
        let lineage = Lineage::new(&catalog);

        let messy = sel(Some(2), Some(20), Some(21), Some(9), None);
        assert_eq!(
            lineage.canonicalize(&messy),
            sel(Some(1), Some(1), Some(5), Some(9), None)
        );
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let catalog = sample_catalog();
        let lineage = Lineage::new(&catalog);

        let inputs = [
            sel(Some(1), None, None, None, None),
            sel(None, None, None, None, Some(42)),
            sel(Some(1), Some(2), Some(5), Some(404), None),
            sel(Some(1), Some(1), Some(404), None, Some(505)),
            sel(Some(2), Some(20), Some(6), Some(11), Some(30)),
            sel(None, Some(999), None, None, None),
        ];
        for input in inputs {
            let once = lineage.canonicalize(&input);
            assert_eq!(lineage.canonicalize(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn unknown_deepest_is_kept_and_rest_normalised() {
        let catalog = sample_catalog();
        let lineage = Lineage::new(&catalog);

        let input = sel(Some(1), None, Some(6), Some(404), None);
        assert_eq!(
            lineage.canonicalize(&input),
            sel(Some(1), Some(1), Some(6), Some(404), None)
        );
    }

    #[test]
    fn session_mode_comes_from_deepest_known_record() {
        let catalog = sample_catalog();
        let lineage = Lineage::new(&catalog);

        let path = TimerPath {
            mode_id: Some(2),
            task_id: Some(404),
            project_id: Some(5),
            ..Default::default()
        };
        assert_eq!(lineage.resolve_session_mode_id(&path), Some(1));

        let orphan = TimerPath {
            mode_id: Some(2),
            task_id: Some(404),
            ..Default::default()
        };
        assert_eq!(lineage.resolve_session_mode_id(&orphan), Some(2));
    }

    #[test]
    fn breadcrumb_fills_missing_ancestors_leaf_first() {
        let catalog = sample_catalog();
        let lineage = Lineage::new(&catalog);

        let crumbs = lineage.breadcrumb(&TimerPath {
            milestone_id: Some(10),
            ..Default::default()
        });
        let kinds: Vec<_> = crumbs.iter().map(|c| (c.kind, c.id)).collect();
        assert_eq!(
            kinds,
            vec![
                (EntityType::Milestone, 10),
                (EntityType::Project, 5),
                (EntityType::Goal, 1),
                (EntityType::Mode, 1),
            ]
        );
        assert_eq!(leaf_title(&crumbs), Some("Milestone 10"));
        assert_eq!(leaf_title(&[]), None);
    }
}
