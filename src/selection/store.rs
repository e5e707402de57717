use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock, RwLockWriteGuard},
};
use tokio::sync::watch;

use crate::models::{EntityId, Selection, Snapshot};
use crate::{log_debug, log_warn};

const ENABLE_LOGS: bool = true;

/// Partial write for [`SelectionStore::set_raw`]. An outer `Some` means the field
/// is part of the patch (possibly set to `None`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionPatch {
    pub mode_id: Option<EntityId>,
    pub goal_id: Option<Option<EntityId>>,
    pub project_id: Option<Option<EntityId>>,
    pub milestone_id: Option<Option<EntityId>>,
    pub task_id: Option<Option<EntityId>>,
}

impl SelectionPatch {
    /// Patch that writes every field of `selection`.
    pub fn full(selection: &Selection) -> Self {
        Self {
            mode_id: selection.mode_id,
            goal_id: Some(selection.goal_id),
            project_id: Some(selection.project_id),
            milestone_id: Some(selection.milestone_id),
            task_id: Some(selection.task_id),
        }
    }

    /// Patch that writes the four fields below the mode.
    pub fn lineage(selection: &Selection) -> Self {
        Self {
            mode_id: None,
            ..Self::full(selection)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreData {
    #[serde(default)]
    selection: Selection,
    #[serde(default)]
    snapshots_by_mode: BTreeMap<EntityId, Snapshot>,
    #[serde(default)]
    hydrated_session_id: Option<String>,
}

/// Holder of the current selection pointer and the per-mode snapshots.
///
/// Every selection write also records the snapshot for the current mode, except
/// a switch into a different mode with an empty lineage (the snapshot that mode
/// is about to be restored from must survive). State is written through to a JSON
/// file when a path is configured; write failures are logged and the in-memory
/// state stays authoritative.
pub struct SelectionStore {
    path: Option<PathBuf>,
    data: RwLock<StoreData>,
    updates: watch::Sender<Selection>,
}

impl SelectionStore {
    pub fn in_memory() -> Self {
        Self::from_data(None, StoreData::default())
    }

    /// Opens (or starts) a store persisted at `path`. An unreadable file is an
    /// error; a file that does not parse starts from an empty store.
    pub fn open(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read selection store from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!("Discarding unreadable selection store {}: {}", path.display(), err);
                StoreData::default()
            })
        } else {
            StoreData::default()
        };
        Ok(Self::from_data(Some(path), data))
    }

    fn from_data(path: Option<PathBuf>, data: StoreData) -> Self {
        let (updates, _) = watch::channel(data.selection);
        Self {
            path,
            data: RwLock::new(data),
            updates,
        }
    }

    pub fn selection(&self) -> Selection {
        self.data.read().unwrap_or_else(PoisonError::into_inner).selection
    }

    pub fn subscribe(&self) -> watch::Receiver<Selection> {
        self.updates.subscribe()
    }

    /// Controller write used by launch and restore. The shallowest lineage field
    /// present in the patch owns its descendants: any deeper field missing from
    /// the patch is cleared. A mode change clears the whole lineage first.
    pub fn set_raw(&self, patch: SelectionPatch) -> Selection {
        self.update("set_raw", |current| {
            let mut next = *current;
            if let Some(mode_id) = patch.mode_id {
                if current.mode_id != Some(mode_id) {
                    next = Selection::for_mode(mode_id);
                }
            }

            let owned = |field: Option<Option<EntityId>>| field.flatten();
            if let Some(goal_id) = patch.goal_id {
                next.goal_id = goal_id;
                next.project_id = owned(patch.project_id);
                next.milestone_id = owned(patch.milestone_id);
                next.task_id = owned(patch.task_id);
            } else if let Some(project_id) = patch.project_id {
                next.project_id = project_id;
                next.milestone_id = owned(patch.milestone_id);
                next.task_id = owned(patch.task_id);
            } else if let Some(milestone_id) = patch.milestone_id {
                next.milestone_id = milestone_id;
                next.task_id = owned(patch.task_id);
            } else if let Some(task_id) = patch.task_id {
                next.task_id = task_id;
            }
            next
        })
    }

    /// Replaces the whole selection.
    pub fn replace(&self, selection: Selection) -> Selection {
        self.update("replace", |_| selection)
    }

    pub fn set_mode_id(&self, mode_id: EntityId) -> Selection {
        self.update("set_mode_id", |current| {
            if current.mode_id == Some(mode_id) {
                *current
            } else {
                Selection::for_mode(mode_id)
            }
        })
    }

    pub fn set_goal_id(&self, goal_id: Option<EntityId>) -> Selection {
        self.update("set_goal_id", |current| Selection {
            mode_id: current.mode_id,
            goal_id,
            ..Selection::default()
        })
    }

    pub fn set_project_id(&self, project_id: Option<EntityId>) -> Selection {
        self.update("set_project_id", |current| Selection {
            project_id,
            milestone_id: None,
            task_id: None,
            ..*current
        })
    }

    pub fn set_milestone_id(&self, milestone_id: Option<EntityId>) -> Selection {
        self.update("set_milestone_id", |current| Selection {
            milestone_id,
            task_id: None,
            ..*current
        })
    }

    pub fn set_task_id(&self, task_id: Option<EntityId>) -> Selection {
        self.update("set_task_id", |current| Selection {
            task_id,
            ..*current
        })
    }

    /// Clears everything below the mode.
    pub fn clear_lineage(&self) -> Selection {
        self.update("clear_lineage", |current| Selection {
            mode_id: current.mode_id,
            ..Selection::default()
        })
    }

    pub fn snapshot_for_mode(&self, mode_id: EntityId) -> Option<Snapshot> {
        self.read(|data| data.snapshots_by_mode.get(&mode_id).copied())
    }

    pub fn save_snapshot_for_mode(&self, mode_id: EntityId, snapshot: Snapshot) {
        let mut guard = self.write();
        guard.snapshots_by_mode.insert(mode_id, snapshot);
        self.persist_logged(&guard);
    }

    pub fn hydrated_session_id(&self) -> Option<String> {
        self.read(|data| data.hydrated_session_id.clone())
    }

    pub fn mark_hydrated_session(&self, session_id: Option<String>) {
        let mut guard = self.write();
        if guard.hydrated_session_id != session_id {
            guard.hydrated_session_id = session_id;
            self.persist_logged(&guard);
        }
    }

    /// Drops the selection, every snapshot and the hydration marker.
    pub fn reset_all(&self) {
        let mut guard = self.write();
        *guard = StoreData::default();
        self.persist_logged(&guard);
        self.updates.send_replace(guard.selection);
    }

    /// Writes the current state to disk, surfacing any failure.
    pub fn flush(&self) -> Result<()> {
        self.read(|data| self.persist(data))
    }

    fn update<F>(&self, source: &str, apply: F) -> Selection
    where
        F: FnOnce(&Selection) -> Selection,
    {
        let mut guard = self.write();
        let prev = guard.selection;
        let next = apply(&prev);
        guard.selection = next;

        if let Some(mode_id) = next.mode_id {
            let entering_empty = prev.mode_id != next.mode_id && next.is_mode_only();
            if !entering_empty {
                guard.snapshots_by_mode.insert(mode_id, next.snapshot());
            }
        }

        if prev != next {
            log_debug!("selection {}: {:?} -> {:?}", source, prev, next);
        }
        self.persist_logged(&guard);
        drop(guard);

        self.updates.send_replace(next);
        next
    }

    fn read<T>(&self, f: impl FnOnce(&StoreData) -> T) -> T {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist_logged(&self, data: &StoreData) {
        if let Err(err) = self.persist(data) {
            log_warn!("Failed to persist selection store: {:#}", err);
        }
    }

    fn persist(&self, data: &StoreData) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write selection store to {}", path.display()))
    }
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
