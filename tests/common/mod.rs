#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tokio::sync::{oneshot, Notify};
use uuid::Uuid;

use focustree::models::{CompleteNextRequest, CompleteNextResponse};
use focustree::timer::{PathTarget, StartRequest};
use focustree::{
    ActiveSession, Catalog, SelectionStore, TimeEntry, TimerApi, TimerConfig, TimerKind,
    TimerPath, TimerSessionController,
};

/// In-process stand-in for the timer server. Calls can be held open with
/// one-shot gates to interleave controller operations deterministically.
#[derive(Default)]
pub struct FakeApi {
    active: Mutex<Option<ActiveSession>>,
    starts: Mutex<Vec<Value>>,
    retargets: Mutex<Vec<PathTarget>>,
    completes: Mutex<Vec<CompleteNextRequest>>,
    complete_response: Mutex<Option<CompleteNextResponse>>,
    start_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    complete_gate: Mutex<Option<oneshot::Receiver<()>>>,
    stop_calls: AtomicUsize,
    fail_stops: AtomicBool,
    fail_retargets: AtomicBool,
    complete_keeps_session: AtomicBool,
    pub start_entered: Notify,
    pub complete_entered: Notify,
}

impl FakeApi {
    pub fn seed_active(&self, session: ActiveSession) -> ActiveSession {
        *self.active.lock().unwrap() = Some(session.clone());
        session
    }

    pub fn starts(&self) -> Vec<Value> {
        self.starts.lock().unwrap().clone()
    }

    pub fn retargets(&self) -> Vec<PathTarget> {
        self.retargets.lock().unwrap().clone()
    }

    pub fn completes(&self) -> Vec<CompleteNextRequest> {
        self.completes.lock().unwrap().clone()
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn fail_stops(&self, fail: bool) {
        self.fail_stops.store(fail, Ordering::SeqCst);
    }

    pub fn fail_retargets(&self, fail: bool) {
        self.fail_retargets.store(fail, Ordering::SeqCst);
    }

    /// Completion leaves the running session alone instead of closing it.
    pub fn keep_session_on_complete(&self, keep: bool) {
        self.complete_keeps_session.store(keep, Ordering::SeqCst);
    }

    pub fn respond_to_complete(&self, response: CompleteNextResponse) {
        *self.complete_response.lock().unwrap() = Some(response);
    }

    /// Holds the next `start` call until the returned sender fires.
    pub fn gate_next_start(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.start_gates.lock().unwrap().push_back(rx);
        tx
    }

    pub fn gate_complete(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.complete_gate.lock().unwrap() = Some(rx);
        tx
    }

    fn close_active(&self) -> Option<TimeEntry> {
        let session = self.active.lock().unwrap().take()?;
        let ended_at = Utc::now();
        Some(TimeEntry {
            id: 1,
            kind: session.kind,
            started_at: session.started_at,
            ended_at,
            seconds: (ended_at - session.started_at).num_seconds().max(0) as u64,
            note: String::new(),
            path: session.path,
            session_id: session.session_id,
            planned_seconds: session.planned_seconds,
        })
    }
}

pub fn path_of(target: PathTarget) -> TimerPath {
    let mut path = TimerPath::default();
    match target {
        PathTarget::TaskId(id) => path.task_id = Some(id),
        PathTarget::MilestoneId(id) => path.milestone_id = Some(id),
        PathTarget::ProjectId(id) => path.project_id = Some(id),
        PathTarget::GoalId(id) => path.goal_id = Some(id),
        PathTarget::ModeId(id) => path.mode_id = Some(id),
    }
    path
}

pub fn session(kind: TimerKind, path: TimerPath, duration_secs: Option<u64>) -> ActiveSession {
    let started_at = Utc::now();
    ActiveSession {
        session_id: Some(Uuid::new_v4().to_string()),
        kind,
        started_at,
        ends_at: duration_secs.map(|secs| started_at + chrono::Duration::seconds(secs as i64)),
        remaining_seconds: None,
        planned_seconds: duration_secs,
        path,
    }
}

pub fn stopwatch(path: TimerPath) -> ActiveSession {
    session(TimerKind::Stopwatch, path, None)
}

pub fn countdown(path: TimerPath, secs: u64) -> ActiveSession {
    session(TimerKind::Timer, path, Some(secs))
}

#[async_trait]
impl TimerApi for FakeApi {
    async fn active(&self) -> Result<Option<ActiveSession>> {
        Ok(self.active.lock().unwrap().clone())
    }

    async fn start(&self, request: StartRequest) -> Result<ActiveSession> {
        self.starts
            .lock()
            .unwrap()
            .push(serde_json::to_value(request)?);
        self.start_entered.notify_one();
        let gate = self.start_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let started = session(request.kind, path_of(request.target), request.duration_sec);
        Ok(self.seed_active(started))
    }

    async fn stop(&self) -> Result<Option<TimeEntry>> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_stops.load(Ordering::SeqCst) {
            bail!("server unavailable");
        }
        Ok(self.close_active())
    }

    async fn complete_next(&self, request: CompleteNextRequest) -> Result<CompleteNextResponse> {
        self.completes.lock().unwrap().push(request);
        self.complete_entered.notify_one();
        let gate = self.complete_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let stopped_entry = if self.complete_keeps_session.load(Ordering::SeqCst) {
            None
        } else {
            self.close_active()
        };
        let mut response = self
            .complete_response
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow!("no completion response prepared"))?;
        response.stopped_entry = stopped_entry;
        Ok(response)
    }

    async fn retarget(&self, target: PathTarget) -> Result<ActiveSession> {
        self.retargets.lock().unwrap().push(target);
        if self.fail_retargets.load(Ordering::SeqCst) {
            bail!("retarget rejected");
        }
        let mut active = self.active.lock().unwrap();
        let session = active.as_mut().ok_or_else(|| anyhow!("no active session"))?;
        session.path = path_of(target);
        Ok(session.clone())
    }

    async fn time_entries(&self, _from: NaiveDate, _to: NaiveDate) -> Result<Vec<TimeEntry>> {
        Ok(Vec::new())
    }
}

/// Mode 1 holds goals 1-3; project 5 under goal 1 with milestone 10 and its
/// child milestone 11 (tasks 42, 43); project 7 under goal 2 (task 44);
/// project 8 is flat; project 9 sits under goal 3.
pub fn catalog() -> Catalog {
    serde_json::from_value(serde_json::json!({
        "modes": [
            {"id": 1, "title": "Work", "color": "#336699"},
            {"id": 2, "title": "Home", "color": "#993366"}
        ],
        "goals": [
            {"id": 1, "modeId": 1, "title": "Ship"},
            {"id": 2, "modeId": 1, "title": "Hire"},
            {"id": 3, "modeId": 1, "title": "Learn"}
        ],
        "projects": [
            {"id": 5, "modeId": 1, "title": "Core", "goalId": 1},
            {"id": 6, "modeId": 1, "title": "Core / API", "parentId": 5},
            {"id": 7, "modeId": 1, "title": "Pipeline", "goalId": "2"},
            {"id": 8, "modeId": 1, "title": "Loose ends"},
            {"id": 9, "modeId": 1, "title": "Reading", "goalId": 3}
        ],
        "milestones": [
            {"id": 10, "modeId": 1, "title": "Beta", "projectId": 5},
            {"id": 11, "modeId": 1, "title": "Beta / polish", "parentId": 10}
        ],
        "tasks": [
            {"id": 42, "modeId": 1, "title": "Fix sync", "milestoneId": 11, "position": 0, "plannedSeconds": 1500},
            {"id": 43, "modeId": 1, "title": "Write docs", "milestoneId": 11, "position": 1},
            {"id": 44, "modeId": 1, "title": "Screen CVs", "projectId": 7, "milestoneId": 0}
        ]
    }))
    .expect("catalog fixture decodes")
}

pub async fn controller() -> (Arc<FakeApi>, TimerSessionController) {
    let api = Arc::new(FakeApi::default());
    let config = TimerConfig {
        settle_delay: Duration::from_millis(1),
        poll_interval: Duration::from_millis(20),
        foreground_tick: Duration::from_millis(20),
        ..TimerConfig::default()
    };
    let controller =
        TimerSessionController::new(config, api.clone(), Arc::new(SelectionStore::in_memory()));
    controller.set_catalog(catalog()).await;
    (api, controller)
}
