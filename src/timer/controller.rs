use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{watch, Mutex};

use super::api::{HttpTimerApi, TimerApi};
use super::countdown::{ClockReading, ResumePlan};
use super::launch::{DescendantClear, LaunchIntent, LaunchIntentSlot};
use super::payload::{PathTarget, StartRequest};
use super::restore::{plan_restore, RestoreInput, RestorePlan};
use super::state::{Baseline, ClockSettings, ControllerState, ControllerView, TimerPhase};
use super::worker::TimerWorker;
use crate::config::TimerConfig;
use crate::lineage::Lineage;
use crate::models::{
    ActiveSession, Catalog, CompleteNextRequest, CompleteNextResponse, EntityId, EntityRef,
    EntityType, Selection, TimeEntry, TimerKind,
};
use crate::navigator;
use crate::selection::{SelectionPatch, SelectionStore};
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, PartialEq)]
pub enum StopOutcome {
    /// The server closed the session; carries the finished entry if any.
    Stopped(Option<TimeEntry>),
    IgnoredWhileCompleting,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwitchOutcome {
    Switched(ActiveSession),
    /// A newer switch took over before this one settled; its baseline stands.
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompleteOutcome {
    Completed(CompleteNextResponse),
    AlreadyCompleting,
    /// No active session, or its path names nothing below a mode.
    NoTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOutcome {
    Advanced(EntityRef),
    /// The lane was exhausted and the field was cleared.
    Cleared(EntityType),
    NothingSelected,
}

/// Reconciles the server's active session with the local selection.
///
/// Cheap to clone; every clone drives the same state. The state lock is never
/// held across a server call, so operations interleave the way a UI event loop
/// would interleave them, and stale results are dropped by the flag and token
/// checks in [`ControllerState`].
#[derive(Clone)]
pub struct TimerSessionController {
    state: Arc<Mutex<ControllerState>>,
    store: Arc<SelectionStore>,
    api: Arc<dyn TimerApi>,
    catalog: Arc<RwLock<Catalog>>,
    config: Arc<TimerConfig>,
    view: Arc<watch::Sender<ControllerView>>,
    visibility: Arc<watch::Sender<bool>>,
    launches: Arc<LaunchIntentSlot>,
    worker: Arc<Mutex<TimerWorker>>,
}

impl TimerSessionController {
    pub fn new(config: TimerConfig, api: Arc<dyn TimerApi>, store: Arc<SelectionStore>) -> Self {
        let clock = ClockSettings::new(config.default_countdown_secs);
        let (view, _) = watch::channel(ControllerView {
            selection: store.selection(),
            settings: clock,
            ..ControllerView::default()
        });
        let (visibility, _) = watch::channel(true);

        Self {
            state: Arc::new(Mutex::new(ControllerState::new(clock))),
            store,
            api,
            catalog: Arc::new(RwLock::new(Catalog::default())),
            config: Arc::new(config),
            view: Arc::new(view),
            visibility: Arc::new(visibility),
            launches: Arc::new(LaunchIntentSlot::new()),
            worker: Arc::new(Mutex::new(TimerWorker::new())),
        }
    }

    /// HTTP collaborator plus a store that is persisted when `store_path` is set.
    pub fn from_config(config: TimerConfig) -> Result<Self> {
        let api = Arc::new(HttpTimerApi::new(
            config.api_base_url.clone(),
            config.request_timeout,
        ));
        let store = match &config.store_path {
            Some(path) => SelectionStore::open(path.clone())?,
            None => SelectionStore::in_memory(),
        };
        Ok(Self::new(config, api, Arc::new(store)))
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn selection(&self) -> Selection {
        self.store.selection()
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> ControllerView {
        self.view.borrow().clone()
    }

    pub(crate) fn visibility_receiver(&self) -> watch::Receiver<bool> {
        self.visibility.subscribe()
    }

    pub(crate) fn launch_slot(&self) -> Arc<LaunchIntentSlot> {
        self.launches.clone()
    }

    pub async fn set_catalog(&self, catalog: Catalog) {
        *self.catalog.write().unwrap_or_else(PoisonError::into_inner) = catalog;
        let state = self.state.lock().await;
        self.publish(&state);
    }

    pub async fn phase(&self) -> TimerPhase {
        self.state.lock().await.phase()
    }

    pub async fn active(&self) -> Option<ActiveSession> {
        self.state.lock().await.active.clone()
    }

    pub async fn clock_settings(&self) -> ClockSettings {
        self.state.lock().await.clock
    }

    pub async fn set_clock_kind(&self, kind: TimerKind) {
        let mut state = self.state.lock().await;
        state.clock.kind = kind;
        self.publish(&state);
    }

    pub async fn set_countdown_secs(&self, secs: u64) {
        let mut state = self.state.lock().await;
        state.clock.countdown_secs = secs;
        self.publish(&state);
    }

    /// Starts the polling, tick and launch loops.
    pub async fn start_background(&self) -> Result<()> {
        self.worker.lock().await.start(self.clone())
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.worker.lock().await.stop().await
    }

    // ---- server snapshot -------------------------------------------------

    /// Fetches the active session and folds it in. The result is dropped while
    /// a completion or switch is in flight; those operations report the new
    /// session themselves.
    pub async fn refresh(&self) -> Result<Option<ActiveSession>> {
        let active = self
            .api
            .active()
            .await
            .context("failed to refresh active session")?;

        let mut state = self.state.lock().await;
        if state.completing || state.switches_in_flight > 0 {
            log_debug!("discarding active-session refresh during a transient phase");
            return Ok(active);
        }
        self.apply_active(&mut state, active.clone(), Utc::now());
        self.publish(&state);
        Ok(active)
    }

    /// Folds in an externally obtained active-session snapshot.
    pub async fn observe_active(&self, active: Option<ActiveSession>) {
        let mut state = self.state.lock().await;
        self.apply_active(&mut state, active, Utc::now());
        self.publish(&state);
    }

    pub async fn believes_active(&self) -> bool {
        self.state.lock().await.active.is_some()
    }

    pub async fn time_entries(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<TimeEntry>> {
        self.api.time_entries(from, to).await
    }

    /// Runs one restore pass now. Returns whether the pass acted.
    pub async fn run_restore_pass(&self) -> bool {
        let mut state = self.state.lock().await;
        let acted = self.restore_locked(&mut state);
        self.publish(&state);
        acted
    }

    // ---- selection writes --------------------------------------------------

    /// Changing the mode resets the lineage and restores it for the new mode.
    pub async fn select_mode(&self, mode_id: EntityId) -> Selection {
        let mut state = self.state.lock().await;
        let before = self.store.selection();
        self.store.set_mode_id(mode_id);
        if before.mode_id != Some(mode_id) {
            self.restore_locked(&mut state);
        }
        self.publish(&state);
        self.store.selection()
    }

    pub async fn select_goal(&self, goal_id: Option<EntityId>) -> Selection {
        self.write_selection(|store| store.set_goal_id(goal_id)).await
    }

    pub async fn select_project(&self, project_id: Option<EntityId>) -> Selection {
        self.write_selection(|store| store.set_project_id(project_id)).await
    }

    pub async fn select_milestone(&self, milestone_id: Option<EntityId>) -> Selection {
        self.write_selection(|store| store.set_milestone_id(milestone_id)).await
    }

    pub async fn select_task(&self, task_id: Option<EntityId>) -> Selection {
        self.write_selection(|store| store.set_task_id(task_id)).await
    }

    async fn write_selection<F>(&self, write: F) -> Selection
    where
        F: FnOnce(&SelectionStore) -> Selection,
    {
        let state = self.state.lock().await;
        let selection = write(&self.store);
        self.publish(&state);
        selection
    }

    /// Queues a launch for the background loop.
    pub fn post_launch(&self, intent: LaunchIntent) {
        self.launches.post(intent);
    }

    /// Points the selection at `intent.target` with its full lineage and makes
    /// the next restore pass stand down. Non-task launches leave a clear policy
    /// for the pass after that.
    pub async fn launch(&self, intent: LaunchIntent) -> Result<Selection> {
        let mut state = self.state.lock().await;
        let target = intent.target;
        let current_mode = self.store.selection().mode_id;
        let path = self.with_lineage(|lineage| lineage.path_for_entity(target));
        let mode_id = path.mode_id.or(current_mode).ok_or_else(|| {
            anyhow!(
                "cannot launch {} {}: no mode to place it in",
                target.kind.as_str(),
                target.id
            )
        })?;
        let path = Selection {
            mode_id: Some(mode_id),
            ..path
        };

        let clear_policy = DescendantClear::for_launch(target.kind);
        let written = match clear_policy {
            None => self.store.set_raw(SelectionPatch::full(&path)),
            Some(_) => self.store.set_raw(SelectionPatch::full(&Selection {
                task_id: None,
                ..path
            })),
        };

        if let Some(session) = state.active.clone() {
            let identity = session.identity();
            self.store.mark_hydrated_session(Some(identity.clone()));
            state.baseline = Some(Baseline {
                session: Some(identity),
                selection: self.session_selection(&session),
            });
            state.switch_armed = true;
        }
        state.restore.record_launch(clear_policy);

        log_info!(
            "launched {} {} (generation {})",
            target.kind.as_str(),
            target.id,
            state.restore.launch_generation()
        );
        self.publish(&state);
        Ok(written)
    }

    // ---- session actions -----------------------------------------------------

    /// Starts a session on the deepest selected entity with the current clock
    /// settings.
    pub async fn handle_start(&self) -> Result<ActiveSession> {
        let (settings, selection) = {
            let state = self.state.lock().await;
            if state.active.is_some() {
                bail!("timer already active");
            }
            (state.clock, self.store.selection())
        };

        let request = start_request(&selection, settings)?;
        let session = self.api.start(request).await?;
        log_info!(
            "started {} session {}",
            session.kind.as_str(),
            session.identity()
        );

        let mut state = self.state.lock().await;
        state.baseline = Some(Baseline {
            session: Some(session.identity()),
            selection,
        });
        self.apply_active(&mut state, Some(session.clone()), Utc::now());
        self.publish(&state);
        Ok(session)
    }

    /// Stops the running session. Refused while a completion holds the
    /// session-ending lock. The selection at stop time is re-applied once the
    /// session is gone.
    pub async fn handle_stop(&self) -> Result<StopOutcome> {
        let hydrated = {
            let mut state = self.state.lock().await;
            if state.completing {
                log_info!("stop ignored: completion in flight");
                return Ok(StopOutcome::IgnoredWhileCompleting);
            }
            let current = self.store.selection();
            if let Some(mode_id) = current.mode_id {
                self.store.save_snapshot_for_mode(mode_id, current.snapshot());
            }
            let hydrated = self.store.hydrated_session_id();
            self.store.mark_hydrated_session(None);
            state.last_stopped = Some(current);
            state.restore.suppress_next();
            hydrated
        };

        let stopped = match self.api.stop().await {
            Ok(entry) => entry,
            Err(err) => {
                let mut state = self.state.lock().await;
                state.last_stopped = None;
                state.restore.cancel_suppression();
                self.store.mark_hydrated_session(hydrated);
                return Err(err.context("failed to stop session"));
            }
        };
        log_info!(
            "stopped session{}",
            stopped
                .as_ref()
                .map(|entry| format!(" after {}s", entry.seconds))
                .unwrap_or_default()
        );

        let mut state = self.state.lock().await;
        if !self.apply_active(&mut state, None, Utc::now()) {
            state.restore.cancel_suppression();
        }
        self.publish(&state);
        Ok(StopOutcome::Stopped(stopped))
    }

    /// Moves timing onto the current selection.
    ///
    /// Idle starts a session; a stopwatch is stopped and restarted; a countdown
    /// is retargeted so its deadline survives. The committed selection becomes
    /// the baseline, and is re-read at two settle points afterwards unless a
    /// newer switch has been issued in the meantime.
    pub async fn handle_switch_to_selection(&self) -> Result<SwitchOutcome> {
        let (token, committed, running, settings, previous) = {
            let mut state = self.state.lock().await;
            let token = state.next_commit_token();
            let committed = self.store.selection();
            let previous = (state.baseline.clone(), state.switch_armed);
            state.baseline = Some(Baseline {
                session: None,
                selection: committed,
            });
            state.switches_in_flight += 1;
            self.publish(&state);
            (
                token,
                committed,
                state.active.as_ref().map(|session| session.kind),
                state.clock,
                previous,
            )
        };
        log_info!("switch {} committing {:?}", token, committed);

        let session = match self.commit_switch(&committed, running, settings).await {
            Ok(session) => session,
            Err(err) => {
                let mut state = self.state.lock().await;
                state.switches_in_flight = state.switches_in_flight.saturating_sub(1);
                if state.commit_token == token {
                    (state.baseline, state.switch_armed) = previous;
                }
                self.publish(&state);
                return Err(err);
            }
        };

        {
            let mut state = self.state.lock().await;
            if state.commit_token != token {
                state.switches_in_flight = state.switches_in_flight.saturating_sub(1);
                log_info!(
                    "switch {} answered after {} was issued, discarding",
                    token,
                    state.commit_token
                );
                self.publish(&state);
                return Ok(SwitchOutcome::Superseded);
            }
            state.baseline = Some(Baseline {
                session: Some(session.identity()),
                selection: committed,
            });
            self.apply_active(&mut state, Some(session.clone()), Utc::now());
            self.publish(&state);
        }

        let outcome = self.settle_switch(token, session).await;

        let mut state = self.state.lock().await;
        state.switches_in_flight = state.switches_in_flight.saturating_sub(1);
        self.publish(&state);
        Ok(outcome)
    }

    async fn commit_switch(
        &self,
        committed: &Selection,
        running: Option<TimerKind>,
        settings: ClockSettings,
    ) -> Result<ActiveSession> {
        match running {
            Some(TimerKind::Timer) => {
                let target = PathTarget::from_selection(committed)
                    .ok_or_else(|| anyhow!("nothing selected to switch to"))?;
                self.api.retarget(target).await
            }
            Some(TimerKind::Stopwatch) => {
                let request = start_request(
                    committed,
                    ClockSettings {
                        kind: TimerKind::Stopwatch,
                        ..settings
                    },
                )?;
                self.api.stop().await?;
                self.api.start(request).await
            }
            None => {
                let request = start_request(committed, settings)?;
                self.api.start(request).await
            }
        }
    }

    async fn settle_switch(&self, token: u64, session: ActiveSession) -> SwitchOutcome {
        for settle_point in 0..2 {
            if settle_point == 0 {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.config.settle_delay).await;
            }

            let mut state = self.state.lock().await;
            if state.commit_token != token {
                log_info!(
                    "switch {} superseded by {}, keeping newer baseline",
                    token,
                    state.commit_token
                );
                return SwitchOutcome::Superseded;
            }
            state.baseline = Some(Baseline {
                session: Some(session.identity()),
                selection: self.store.selection(),
            });
            self.publish(&state);
        }
        SwitchOutcome::Switched(session)
    }

    /// Completes the deepest entity of the running session's path.
    ///
    /// Holds the session-ending lock until the server answers. A completed task
    /// advances to the server's suggested next task, whose lineage is
    /// re-derived locally; anything else just clears the completed field.
    pub async fn handle_complete(&self) -> Result<CompleteOutcome> {
        let target = {
            let mut state = self.state.lock().await;
            if state.completing {
                return Ok(CompleteOutcome::AlreadyCompleting);
            }
            let Some(target) = state
                .active
                .as_ref()
                .and_then(|session| self.session_selection(session).deepest_entity())
            else {
                return Ok(CompleteOutcome::NoTarget);
            };
            state.completing = true;
            self.publish(&state);
            target
        };

        let response = self
            .api
            .complete_next(CompleteNextRequest {
                entity_type: target.kind,
                entity_id: target.id,
            })
            .await;

        let mut state = self.state.lock().await;
        state.completing = false;
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                self.publish(&state);
                return Err(err);
            }
        };
        log_info!(
            "completed {} {} (completed={}, next={:?})",
            target.kind.as_str(),
            target.id,
            response.completed,
            response.next.as_ref().map(|next| next.entity_id)
        );

        let mut advanced = false;
        if target.kind != EntityType::Task {
            self.clear_for_type(target.kind);
        } else if let Some(next) = response.next.as_ref().filter(|next| next.path.task_id.is_some()) {
            let current_mode = self.store.selection().mode_id;
            let next_path = next.path;
            let selection = self.with_lineage(|lineage| match next_path.task_id {
                Some(task_id) if lineage.task(task_id).is_some() => {
                    lineage.path_for_entity(EntityRef::new(EntityType::Task, task_id))
                }
                _ => Selection::from_path(&next_path, current_mode),
            });
            self.store.set_raw(SelectionPatch::full(&selection));
            advanced = true;
        } else {
            self.store.set_task_id(None);
        }

        if response.stopped_entry.is_some() {
            if advanced {
                state.restore.suppress_next();
            }
            if !self.apply_active(&mut state, None, Utc::now()) && advanced {
                state.restore.cancel_suppression();
            }
        }
        self.publish(&state);
        Ok(CompleteOutcome::Completed(response))
    }

    /// Advances the selection to the next open sibling of its deepest entity.
    /// Purely local.
    pub async fn handle_next(&self) -> NextOutcome {
        let state = self.state.lock().await;
        let selection = self.store.selection();
        let Some(current) = selection.deepest_entity() else {
            return NextOutcome::NothingSelected;
        };

        let step = {
            let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
            navigator::next_sibling(&catalog, &selection)
        };
        let outcome = match step {
            Some(Some(next)) => {
                self.select_entity(next);
                NextOutcome::Advanced(next)
            }
            Some(None) => {
                self.clear_for_type(current.kind);
                NextOutcome::Cleared(current.kind)
            }
            None => NextOutcome::NothingSelected,
        };
        log_info!("next from {:?}: {:?}", current, outcome);
        self.publish(&state);
        outcome
    }

    /// Restarts timing on a historical entry's path.
    ///
    /// Time left against the plan restarts a countdown for that long; otherwise
    /// a stopwatch starts.
    pub async fn handle_resume_from_entry(
        &self,
        entry: &TimeEntry,
        remaining_override: Option<u64>,
    ) -> Result<ActiveSession> {
        let fallback_mode = self.store.selection().mode_id;
        let (selection, task_planned) = self.with_lineage(|lineage| {
            let mode_id = lineage
                .resolve_session_mode_id(&entry.path)
                .or(fallback_mode);
            let selection = lineage.canonicalize(&Selection::from_path(&entry.path, mode_id));
            let selection = Selection {
                mode_id: selection.mode_id.or(mode_id),
                ..selection
            };
            let planned = entry
                .path
                .task_id
                .and_then(|id| lineage.task(id))
                .and_then(|task| task.planned_seconds);
            (selection, planned)
        });
        let plan = ResumePlan::for_entry(entry, task_planned, remaining_override);
        let request = StartRequest::from_selection(&selection, plan.kind, plan.duration_secs.unwrap_or(0))
            .ok_or_else(|| anyhow!("time entry {} has no path to resume", entry.id))?;

        {
            let mut state = self.state.lock().await;
            if state.active.is_some() {
                bail!("timer already active");
            }
            self.store.set_raw(SelectionPatch::full(&selection));
            state.restore.suppress_next();
            state.clock.kind = plan.kind;
            if let Some(secs) = plan.duration_secs {
                state.clock.countdown_secs = secs;
            }
            self.publish(&state);
        }

        let session = match self.api.start(request).await {
            Ok(session) => session,
            Err(err) => {
                self.state.lock().await.restore.cancel_suppression();
                return Err(err.context(format!("failed to resume time entry {}", entry.id)));
            }
        };
        log_info!(
            "resumed entry {} as {} session {}",
            entry.id,
            plan.kind.as_str(),
            session.identity()
        );

        let mut state = self.state.lock().await;
        state.baseline = Some(Baseline {
            session: Some(session.identity()),
            selection,
        });
        if !self.apply_active(&mut state, Some(session.clone()), Utc::now()) {
            state.restore.cancel_suppression();
        }
        self.publish(&state);
        Ok(session)
    }

    // ---- derived state -------------------------------------------------------

    /// The canonical selection differs from the canonical baseline of the
    /// running session.
    pub async fn is_dirty(&self) -> bool {
        let state = self.state.lock().await;
        self.dirty_against(&state, &self.store.selection())
    }

    pub async fn show_switch(&self) -> bool {
        let state = self.state.lock().await;
        state.switch_armed && self.dirty_against(&state, &self.store.selection())
    }

    pub async fn tick(&self) -> Result<ClockReading> {
        self.tick_at(Utc::now()).await
    }

    /// Recomputes the clock at `now` and stops a countdown that reached zero,
    /// once per countdown.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<ClockReading> {
        let (reading, fire) = {
            let mut state = self.state.lock().await;
            let reading = state.clock_reading(now);
            let identity = state.running_timer_identity();
            let fire = !state.completing
                && state
                    .auto_stop
                    .should_fire(identity.as_deref(), reading.remaining_seconds);
            self.publish_at(&state, now);
            (reading, fire)
        };

        if fire {
            log_info!("countdown reached zero, stopping session");
            if self.handle_stop().await? == StopOutcome::IgnoredWhileCompleting {
                self.state.lock().await.auto_stop.reset();
            }
        }
        Ok(reading)
    }

    pub async fn set_visibility(&self, visible: bool) {
        let mut state = self.state.lock().await;
        if state.visible != visible {
            state.visible = visible;
            self.visibility.send_replace(visible);
        }
    }

    // ---- internals -----------------------------------------------------------

    fn with_lineage<T>(&self, f: impl FnOnce(&Lineage<'_>) -> T) -> T {
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        let lineage = Lineage::new(&catalog);
        f(&lineage)
    }

    /// The session's path as a selection in the session's own mode.
    fn session_selection(&self, session: &ActiveSession) -> Selection {
        let fallback_mode = self.store.selection().mode_id;
        self.with_lineage(|lineage| {
            let mode_id = lineage
                .resolve_session_mode_id(&session.path)
                .or(fallback_mode);
            Selection::from_path(&session.path, mode_id)
        })
    }

    /// Folds a session snapshot into the state. Returns whether a restore pass
    /// was started, which consumes any pending suppression.
    fn apply_active(
        &self,
        state: &mut ControllerState,
        active: Option<ActiveSession>,
        now: DateTime<Utc>,
    ) -> bool {
        let changed = state.active_identity() != active.as_ref().map(ActiveSession::identity)
            || state.active.as_ref().map(|s| s.path) != active.as_ref().map(|s| s.path);
        state.active = active;
        state.fetched_at = now;

        match state.active.clone() {
            Some(session) => {
                state.switch_armed = true;
                let identity = session.identity();
                let needs_baseline = match &mut state.baseline {
                    Some(baseline) if baseline.session.is_none() => {
                        baseline.session = Some(identity.clone());
                        false
                    }
                    Some(baseline) => baseline.session.as_deref() != Some(identity.as_str()),
                    None => true,
                };
                if needs_baseline {
                    state.baseline = Some(Baseline {
                        session: Some(identity),
                        selection: self.session_selection(&session),
                    });
                }
            }
            None => {
                state.switch_armed = false;
                state.baseline = None;
            }
        }
        if state.running_timer_identity().is_none() {
            state.auto_stop.reset();
        }

        if changed {
            self.restore_locked(state);
        }

        if state.active.is_none() {
            if let Some(stopped) = state.last_stopped.take() {
                log_debug!("re-applying selection captured at stop: {:?}", stopped);
                self.store.set_raw(SelectionPatch::full(&stopped));
            }
        }
        changed
    }

    fn restore_locked(&self, state: &mut ControllerState) -> bool {
        if let Some(reason) = state.restore.begin_pass() {
            log_debug!("restore pass skipped ({:?})", reason);
            return false;
        }

        let current = self.store.selection();
        let hydrated = self.store.hydrated_session_id();
        let snapshot = current
            .mode_id
            .and_then(|mode_id| self.store.snapshot_for_mode(mode_id));
        let plan = self.with_lineage(|lineage| {
            let session_mode_id = state
                .active
                .as_ref()
                .and_then(|session| lineage.resolve_session_mode_id(&session.path));
            plan_restore(
                &RestoreInput {
                    current,
                    active: state.active.as_ref(),
                    session_mode_id,
                    hydrated_session_id: hydrated.as_deref(),
                    snapshot,
                    clear_policy: state.restore.clear_policy(),
                },
                lineage,
            )
        });

        let RestorePlan::Apply {
            selection,
            hydrate,
            clear_consumed,
        } = plan
        else {
            return false;
        };
        if clear_consumed {
            state.restore.consume_clear_policy();
        }
        if let Some(identity) = hydrate {
            self.store.mark_hydrated_session(Some(identity));
        }
        if selection != current {
            log_debug!("restore pass: {:?} -> {:?}", current, selection);
            self.store.replace(selection);
        }
        true
    }

    fn clear_for_type(&self, kind: EntityType) -> Selection {
        match kind {
            EntityType::Task => self.store.set_task_id(None),
            EntityType::Milestone => self.store.set_milestone_id(None),
            EntityType::Project => self.store.set_project_id(None),
            EntityType::Goal => self.store.set_goal_id(None),
            EntityType::Mode => self.store.clear_lineage(),
        }
    }

    fn select_entity(&self, entity: EntityRef) -> Selection {
        match entity.kind {
            EntityType::Task => self.store.set_task_id(Some(entity.id)),
            EntityType::Milestone => self.store.set_milestone_id(Some(entity.id)),
            EntityType::Project => self.store.set_project_id(Some(entity.id)),
            EntityType::Goal => self.store.set_goal_id(Some(entity.id)),
            EntityType::Mode => self.store.set_mode_id(entity.id),
        }
    }

    fn dirty_against(&self, state: &ControllerState, selection: &Selection) -> bool {
        let (Some(_), Some(baseline)) = (&state.active, &state.baseline) else {
            return false;
        };
        self.with_lineage(|lineage| {
            lineage.canonicalize(selection) != lineage.canonicalize(&baseline.selection)
        })
    }

    fn publish(&self, state: &ControllerState) {
        self.publish_at(state, Utc::now());
    }

    fn publish_at(&self, state: &ControllerState, now: DateTime<Utc>) {
        let selection = self.store.selection();
        let is_dirty = self.dirty_against(state, &selection);
        self.view.send_replace(ControllerView {
            phase: state.phase(),
            active: state.active.clone(),
            selection,
            baseline: state.baseline.as_ref().map(|baseline| baseline.selection),
            is_dirty,
            show_switch: state.switch_armed && is_dirty,
            clock: state.clock_reading(now),
            settings: state.clock,
        });
    }
}

fn start_request(selection: &Selection, settings: ClockSettings) -> Result<StartRequest> {
    if settings.kind == TimerKind::Timer && settings.countdown_secs == 0 {
        bail!("countdown duration must be greater than zero");
    }
    StartRequest::from_selection(selection, settings.kind, settings.countdown_secs)
        .ok_or_else(|| anyhow!("nothing selected to time"))
}
