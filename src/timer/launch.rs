use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::models::{EntityRef, EntityType, Selection};

/// Request from elsewhere in the app to focus the timer on one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchIntent {
    pub target: EntityRef,
}

impl LaunchIntent {
    pub fn new(kind: EntityType, id: i64) -> Self {
        Self {
            target: EntityRef::new(kind, id),
        }
    }
}

/// Descendant fields a non-task launch forces blank on the next restore pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescendantClear {
    Task,
    MilestoneAndTask,
    ProjectAndBelow,
}

impl DescendantClear {
    /// `None` for task launches, which write the full lineage directly.
    pub fn for_launch(kind: EntityType) -> Option<Self> {
        match kind {
            EntityType::Task => None,
            EntityType::Milestone => Some(Self::Task),
            EntityType::Project => Some(Self::MilestoneAndTask),
            EntityType::Goal | EntityType::Mode => Some(Self::ProjectAndBelow),
        }
    }

    pub fn apply(self, selection: Selection) -> Selection {
        match self {
            Self::Task => Selection {
                task_id: None,
                ..selection
            },
            Self::MilestoneAndTask => Selection {
                milestone_id: None,
                task_id: None,
                ..selection
            },
            Self::ProjectAndBelow => Selection {
                project_id: None,
                milestone_id: None,
                task_id: None,
                ..selection
            },
        }
    }
}

/// Single-slot mailbox for launch intents. A newer post replaces an
/// unconsumed one.
#[derive(Debug, Default)]
pub struct LaunchIntentSlot {
    pending: Mutex<Option<LaunchIntent>>,
    notify: Notify,
}

impl LaunchIntentSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, intent: LaunchIntent) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(intent);
        self.notify.notify_one();
    }

    pub fn take(&self) -> Option<LaunchIntent> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Waits for the next posted intent and consumes it.
    pub async fn next(&self) -> LaunchIntent {
        loop {
            if let Some(intent) = self.take() {
                return intent;
            }
            self.notify.notified().await;
        }
    }
}
