use std::collections::{HashMap, HashSet};

use crate::models::{Catalog, EntityId, Goal, HierarchyNode, Milestone, Mode, Project, Task};

/// Records that point at a parent of their own kind.
pub trait ParentLinked: HierarchyNode {
    fn parent_id(&self) -> Option<EntityId>;
}

impl ParentLinked for Project {
    fn parent_id(&self) -> Option<EntityId> {
        self.parent_id
    }
}

impl ParentLinked for Milestone {
    fn parent_id(&self) -> Option<EntityId> {
        self.parent_id
    }
}

/// A node the resolver can walk from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Project(EntityId),
    Milestone(EntityId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectLineage {
    pub parent_id: Option<EntityId>,
    pub goal_id: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MilestoneLineage {
    pub parent_id: Option<EntityId>,
    pub project_id: Option<EntityId>,
    pub goal_id: Option<EntityId>,
}

/// Id-indexed view over a [`Catalog`] answering effective-ancestry questions.
///
/// Every walk carries a visited set: a `parent_id` chain that comes back to a node
/// it has already seen resolves to `None` (or `false`) instead of looping.
pub struct Lineage<'a> {
    modes: HashMap<EntityId, &'a Mode>,
    goals: HashMap<EntityId, &'a Goal>,
    projects: HashMap<EntityId, &'a Project>,
    milestones: HashMap<EntityId, &'a Milestone>,
    tasks: HashMap<EntityId, &'a Task>,
}

impl<'a> Lineage<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            modes: catalog.modes.iter().map(|m| (m.id, m)).collect(),
            goals: index(&catalog.goals),
            projects: index(&catalog.projects),
            milestones: index(&catalog.milestones),
            tasks: index(&catalog.tasks),
        }
    }

    pub fn mode(&self, id: EntityId) -> Option<&'a Mode> {
        self.modes.get(&id).copied()
    }

    pub fn goal(&self, id: EntityId) -> Option<&'a Goal> {
        self.goals.get(&id).copied()
    }

    pub fn project(&self, id: EntityId) -> Option<&'a Project> {
        self.projects.get(&id).copied()
    }

    pub fn milestone(&self, id: EntityId) -> Option<&'a Milestone> {
        self.milestones.get(&id).copied()
    }

    pub fn task(&self, id: EntityId) -> Option<&'a Task> {
        self.tasks.get(&id).copied()
    }

    /// Direct parent, one hop.
    pub fn project_parent_id(&self, id: EntityId) -> Option<EntityId> {
        self.project(id).and_then(|p| p.parent_id)
    }

    /// First `goal_id` found walking the project's parent chain, start included.
    pub fn project_goal_id(&self, id: EntityId) -> Option<EntityId> {
        walk_chain(Some(id), &self.projects, |p| p.goal_id)
    }

    pub fn project_belongs_under(&self, candidate: EntityId, ancestor: EntityId) -> bool {
        chain_contains(candidate, ancestor, &self.projects)
    }

    pub fn project_lineage(&self, id: EntityId) -> ProjectLineage {
        ProjectLineage {
            parent_id: self.project_parent_id(id),
            goal_id: self.project_goal_id(id),
        }
    }

    /// Direct parent, one hop.
    pub fn milestone_parent_id(&self, id: EntityId) -> Option<EntityId> {
        self.milestone(id).and_then(|m| m.parent_id)
    }

    /// First `project_id` found walking the milestone's parent chain, start included.
    pub fn milestone_project_id(&self, id: EntityId) -> Option<EntityId> {
        walk_chain(Some(id), &self.milestones, |m| m.project_id)
    }

    /// The effective project's goal when the chain reaches a project; otherwise
    /// the first `goal_id` on the milestone chain itself.
    pub fn milestone_goal_id(&self, id: EntityId) -> Option<EntityId> {
        match self.milestone_project_id(id) {
            Some(project_id) => self.project_goal_id(project_id),
            None => walk_chain(Some(id), &self.milestones, |m| m.goal_id),
        }
    }

    pub fn milestone_belongs_under(&self, candidate: EntityId, ancestor: EntityId) -> bool {
        chain_contains(candidate, ancestor, &self.milestones)
    }

    pub fn milestone_lineage(&self, id: EntityId) -> MilestoneLineage {
        MilestoneLineage {
            parent_id: self.milestone_parent_id(id),
            project_id: self.milestone_project_id(id),
            goal_id: self.milestone_goal_id(id),
        }
    }

    pub fn effective_parent_id(&self, node: NodeRef) -> Option<EntityId> {
        match node {
            NodeRef::Project(id) => self.project_parent_id(id),
            NodeRef::Milestone(id) => self.milestone_parent_id(id),
        }
    }

    pub fn effective_goal_id(&self, node: NodeRef) -> Option<EntityId> {
        match node {
            NodeRef::Project(id) => self.project_goal_id(id),
            NodeRef::Milestone(id) => self.milestone_goal_id(id),
        }
    }

    /// Whether `ancestor` appears on the candidate's parent chain. Both ids are
    /// of the candidate's kind.
    pub fn belongs_under(&self, candidate: NodeRef, ancestor: EntityId) -> bool {
        match candidate {
            NodeRef::Project(id) => self.project_belongs_under(id, ancestor),
            NodeRef::Milestone(id) => self.milestone_belongs_under(id, ancestor),
        }
    }
}

fn index<T: HierarchyNode>(items: &[T]) -> HashMap<EntityId, &T> {
    items.iter().map(|item| (item.id(), item)).collect()
}

fn walk_chain<T, F>(
    start: Option<EntityId>,
    by_id: &HashMap<EntityId, &T>,
    pick: F,
) -> Option<EntityId>
where
    T: ParentLinked,
    F: Fn(&T) -> Option<EntityId>,
{
    let mut visited = HashSet::new();
    let mut current = by_id.get(&start?).copied();

    while let Some(node) = current {
        if !visited.insert(node.id()) {
            return None;
        }
        if let Some(found) = pick(node) {
            return Some(found);
        }
        current = by_id.get(&node.parent_id()?).copied();
    }
    None
}

fn chain_contains<T: ParentLinked>(
    candidate: EntityId,
    ancestor: EntityId,
    by_id: &HashMap<EntityId, &T>,
) -> bool {
    let mut visited = HashSet::from([candidate]);
    let mut current = by_id.get(&candidate).copied();

    while let Some(node) = current {
        let Some(parent) = node.parent_id() else {
            return false;
        };
        if parent == ancestor {
            return true;
        }
        if !visited.insert(parent) {
            return false;
        }
        current = by_id.get(&parent).copied();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{milestone, project, sample_catalog};

    #[test]
    fn nested_milestone_inherits_goal_through_project() {
        let catalog = Catalog {
            projects: vec![project(1, 1, None, Some(100))],
            milestones: vec![
                milestone(1, 1, None, Some(1), None),
                milestone(2, 1, Some(1), None, None),
            ],
            ..Default::default()
        };
        let lineage = Lineage::new(&catalog);

        assert_eq!(lineage.milestone_goal_id(2), Some(100));
        assert_eq!(lineage.milestone_project_id(2), Some(1));
        assert_eq!(
            lineage.milestone_lineage(2),
            MilestoneLineage {
                parent_id: Some(1),
                project_id: Some(1),
                goal_id: Some(100),
            }
        );
    }

    #[test]
    fn nested_project_walks_to_first_goal() {
        let catalog = sample_catalog();
        let lineage = Lineage::new(&catalog);

        assert_eq!(lineage.project_parent_id(6), Some(5));
        assert_eq!(lineage.project_goal_id(6), Some(1));
        assert_eq!(lineage.effective_goal_id(NodeRef::Project(8)), None);
        assert_eq!(lineage.project_goal_id(999), None);
    }

    #[test]
    fn cycles_terminate_unresolved() {
        let catalog = Catalog {
            projects: vec![
                project(1, 1, Some(2), None),
                project(2, 1, Some(3), None),
                project(3, 1, Some(1), None),
            ],
            milestones: vec![
                milestone(1, 1, Some(2), None, None),
                milestone(2, 1, Some(1), None, None),
                milestone(3, 1, Some(3), None, None),
            ],
            ..Default::default()
        };
        let lineage = Lineage::new(&catalog);

        assert_eq!(lineage.project_goal_id(1), None);
        assert!(!lineage.project_belongs_under(1, 99));
        assert_eq!(lineage.milestone_project_id(1), None);
        assert_eq!(lineage.milestone_goal_id(2), None);
        assert!(!lineage.milestone_belongs_under(1, 99));
        assert_eq!(lineage.milestone_goal_id(3), None);
        assert!(!lineage.milestone_belongs_under(3, 99));
    }

    #[test]
    fn value_found_before_the_cycle_is_returned() {
        let catalog = Catalog {
            projects: vec![
                project(1, 1, Some(2), None),
                project(2, 1, Some(1), Some(7)),
            ],
            ..Default::default()
        };
        let lineage = Lineage::new(&catalog);
        assert_eq!(lineage.project_goal_id(1), Some(7));
    }

    #[test]
    fn belongs_under_is_transitive_and_strict() {
        let catalog = sample_catalog();
        let lineage = Lineage::new(&catalog);

        assert!(lineage.belongs_under(NodeRef::Milestone(10), 9));
        assert!(lineage.belongs_under(NodeRef::Project(6), 5));
        assert!(!lineage.belongs_under(NodeRef::Project(5), 5));
        assert!(!lineage.belongs_under(NodeRef::Milestone(9), 10));
    }

    #[test]
    fn milestone_goal_matches_its_project_goal_or_own_chain() {
        let catalog = Catalog {
            projects: vec![project(1, 1, None, None), project(2, 1, None, Some(50))],
            milestones: vec![
                milestone(1, 1, None, Some(1), Some(60)),
                milestone(2, 1, Some(1), None, None),
                milestone(3, 1, None, None, Some(61)),
                milestone(4, 1, Some(3), None, None),
                milestone(5, 1, None, Some(2), None),
            ],
            ..Default::default()
        };
        let lineage = Lineage::new(&catalog);

        for m in &catalog.milestones {
            let expected = match lineage.milestone_project_id(m.id) {
                Some(p) => lineage.project_goal_id(p),
                None => walk_chain(Some(m.id), &lineage.milestones, |node| node.goal_id),
            };
            assert_eq!(lineage.milestone_goal_id(m.id), expected, "milestone {}", m.id);
        }
        assert_eq!(lineage.milestone_goal_id(2), None);
        assert_eq!(lineage.milestone_goal_id(4), Some(61));
        assert_eq!(lineage.milestone_goal_id(5), Some(50));
    }
}
