//! The restore pass: hydrating blank selection fields from the running
//! session's path or from the mode's snapshot.
//!
//! Planning is pure; the controller applies the plan to the store.

use crate::lineage::Lineage;
use crate::models::{ActiveSession, EntityId, Selection, Snapshot};

use super::launch::DescendantClear;

/// Everything the pass looks at, captured at one instant.
#[derive(Debug, Clone, Copy)]
pub struct RestoreInput<'a> {
    pub current: Selection,
    pub active: Option<&'a ActiveSession>,
    /// Mode the active session belongs to, resolved from its path.
    pub session_mode_id: Option<EntityId>,
    pub hydrated_session_id: Option<&'a str>,
    pub snapshot: Option<Snapshot>,
    pub clear_policy: Option<DescendantClear>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestorePlan {
    /// Nothing to write.
    Unchanged,
    Apply {
        selection: Selection,
        /// Session identity to record as hydrated.
        hydrate: Option<String>,
        /// The pending clear policy was used and must be dropped.
        clear_consumed: bool,
    },
}

pub fn plan_restore(input: &RestoreInput<'_>, lineage: &Lineage<'_>) -> RestorePlan {
    let current = input.current;
    let Some(mode_id) = current.mode_id else {
        return RestorePlan::Unchanged;
    };

    let session = input
        .active
        .filter(|_| input.session_mode_id == Some(mode_id));
    let identity = session.map(ActiveSession::identity);
    let hydrated = identity.is_some() && identity.as_deref() == input.hydrated_session_id;

    if session.is_some() && hydrated && input.clear_policy.is_none() {
        return RestorePlan::Unchanged;
    }

    let from_path = session.map(|s| Selection::from_path(&s.path, Some(mode_id)).snapshot());
    let (source, hydrate) = if session.is_some() && !hydrated {
        (from_path.or(input.snapshot), identity)
    } else {
        (input.snapshot.or(from_path), None)
    };
    let Some(source) = source else {
        return RestorePlan::Unchanged;
    };

    let mut source = Selection::for_mode(mode_id).with_snapshot(&source);
    let clear_consumed = input.clear_policy.is_some();
    if let Some(policy) = input.clear_policy {
        source = policy.apply(source);
    }
    let source = derive_task_parents(source, lineage);
    let selection = fill_blanks(current, source, lineage);

    if selection == current && hydrate.is_none() && !clear_consumed {
        return RestorePlan::Unchanged;
    }
    RestorePlan::Apply {
        selection,
        hydrate,
        clear_consumed,
    }
}

/// Fills missing milestone/project/goal of a task-bearing source from the
/// task's own lineage. Present fields are kept.
fn derive_task_parents(source: Selection, lineage: &Lineage<'_>) -> Selection {
    let Some(task_id) = source.task_id else {
        return source;
    };
    if lineage.task(task_id).is_none() {
        return source;
    }
    let derived = lineage.task_lineage(task_id);
    Selection {
        milestone_id: source.milestone_id.or(derived.milestone_id),
        project_id: source.project_id.or(derived.project_id),
        goal_id: source.goal_id.or(derived.goal_id),
        ..source
    }
}

/// Only blank fields of `current` take values from `source`. When the
/// resulting task sits directly under a project, the milestone stays blank.
fn fill_blanks(current: Selection, source: Selection, lineage: &Lineage<'_>) -> Selection {
    let task_id = current.task_id.or(source.task_id);
    let task_parents = task_id
        .filter(|id| lineage.task(*id).is_some())
        .map(|id| lineage.task_lineage(id));
    let flat_to_project = task_parents.is_some_and(|t| t.milestone_id.is_none());

    let milestone_id = match current.milestone_id {
        Some(id) => Some(id),
        None if flat_to_project => None,
        None => source.milestone_id,
    };
    let project_id = match current.project_id {
        Some(id) => Some(id),
        None if flat_to_project => task_parents
            .and_then(|t| t.project_id)
            .or(source.project_id),
        None => source.project_id,
    };
    let goal_id = current
        .goal_id
        .or(source.goal_id)
        .or_else(|| task_parents.and_then(|t| t.goal_id));

    Selection {
        mode_id: current.mode_id,
        goal_id,
        project_id,
        milestone_id,
        task_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_catalog;
    use crate::models::{TimerKind, TimerPath};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn session(path: TimerPath) -> ActiveSession {
        ActiveSession {
            session_id: Some("s-1".into()),
            kind: TimerKind::Stopwatch,
            started_at: Utc::now(),
            ends_at: None,
            remaining_seconds: None,
            planned_seconds: None,
            path,
        }
    }

    fn input(current: Selection) -> RestoreInput<'static> {
        RestoreInput {
            current,
            active: None,
            session_mode_id: None,
            hydrated_session_id: None,
            snapshot: None,
            clear_policy: None,
        }
    }

    #[test]
    fn unhydrated_session_path_fills_blanks_and_derives_parents() {
        let catalog = sample_catalog();
        let lineage = Lineage::new(&catalog);
        let active = session(TimerPath {
            task_id: Some(42),
            ..Default::default()
        });
        let plan = plan_restore(
            &RestoreInput {
                active: Some(&active),
                session_mode_id: Some(1),
                ..input(Selection::for_mode(1))
            },
            &lineage,
        );
        assert_eq!(
            plan,
            RestorePlan::Apply {
                selection: Selection {
                    mode_id: Some(1),
                    goal_id: Some(1),
                    project_id: Some(5),
                    milestone_id: Some(10),
                    task_id: Some(42),
                },
                hydrate: Some("s-1".into()),
                clear_consumed: false,
            }
        );
    }

    #[test]
    fn local_fields_win_over_the_source() {
        let catalog = sample_catalog();
        let lineage = Lineage::new(&catalog);
        let current = Selection {
            goal_id: Some(2),
            ..Selection::for_mode(1)
        };
        let snapshot = Snapshot {
            goal_id: Some(1),
            project_id: Some(7),
            ..Default::default()
        };
        let plan = plan_restore(
            &RestoreInput {
                snapshot: Some(snapshot),
                ..input(current)
            },
            &lineage,
        );
        let RestorePlan::Apply { selection, hydrate, .. } = plan else {
            panic!("expected a write");
        };
        assert_eq!(selection.goal_id, Some(2));
        assert_eq!(selection.project_id, Some(7));
        assert_eq!(hydrate, None);
    }

    #[test]
    fn hydrated_session_mode_stops_restoring() {
        let catalog = sample_catalog();
        let lineage = Lineage::new(&catalog);
        let active = session(TimerPath {
            project_id: Some(5),
            ..Default::default()
        });
        let plan = plan_restore(
            &RestoreInput {
                active: Some(&active),
                session_mode_id: Some(1),
                hydrated_session_id: Some("s-1"),
                snapshot: Some(Snapshot {
                    goal_id: Some(2),
                    ..Default::default()
                }),
                ..input(Selection::for_mode(1))
            },
            &lineage,
        );
        assert_eq!(plan, RestorePlan::Unchanged);
    }

    #[test]
    fn pending_clear_blanks_descendants_of_the_source() {
        let catalog = sample_catalog();
        let lineage = Lineage::new(&catalog);
        let active = session(TimerPath {
            task_id: Some(42),
            ..Default::default()
        });
        let current = Selection {
            goal_id: Some(1),
            project_id: Some(5),
            ..Selection::for_mode(1)
        };
        let plan = plan_restore(
            &RestoreInput {
                active: Some(&active),
                session_mode_id: Some(1),
                hydrated_session_id: Some("s-1"),
                snapshot: Some(Snapshot {
                    goal_id: Some(1),
                    project_id: Some(5),
                    milestone_id: Some(9),
                    task_id: Some(42),
                }),
                clear_policy: Some(DescendantClear::MilestoneAndTask),
                ..input(current)
            },
            &lineage,
        );
        assert_eq!(
            plan,
            RestorePlan::Apply {
                selection: current,
                hydrate: None,
                clear_consumed: true,
            }
        );
    }

    #[test]
    fn session_in_another_mode_uses_the_snapshot_only() {
        let catalog = sample_catalog();
        let lineage = Lineage::new(&catalog);
        let active = session(TimerPath {
            goal_id: Some(20),
            ..Default::default()
        });
        let plan = plan_restore(
            &RestoreInput {
                active: Some(&active),
                session_mode_id: Some(2),
                ..input(Selection::for_mode(1))
            },
            &lineage,
        );
        assert_eq!(plan, RestorePlan::Unchanged);

        let plan = plan_restore(
            &RestoreInput {
                active: Some(&active),
                session_mode_id: Some(2),
                snapshot: Some(Snapshot {
                    goal_id: Some(1),
                    ..Default::default()
                }),
                ..input(Selection::for_mode(1))
            },
            &lineage,
        );
        let RestorePlan::Apply { selection, hydrate, .. } = plan else {
            panic!("expected a write");
        };
        assert_eq!(selection.goal_id, Some(1));
        assert_eq!(hydrate, None);
    }

    #[test]
    fn flat_task_keeps_milestone_blank() {
        let catalog = sample_catalog();
        let lineage = Lineage::new(&catalog);
        let snapshot = Snapshot {
            milestone_id: Some(9),
            task_id: Some(30),
            ..Default::default()
        };
        let RestorePlan::Apply { selection, .. } = plan_restore(
            &RestoreInput {
                snapshot: Some(snapshot),
                ..input(Selection::for_mode(1))
            },
            &lineage,
        ) else {
            panic!("expected a write");
        };
        assert_eq!(selection.task_id, Some(30));
        assert_eq!(selection.milestone_id, None);
        assert_eq!(selection.goal_id, Some(1));
    }
}
