use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};

use super::payload::{PathTarget, StartRequest};
use crate::log_error;
use crate::models::{ActiveSession, CompleteNextRequest, CompleteNextResponse, TimeEntry};

const ENABLE_LOGS: bool = true;

/// Server collaborator that owns the authoritative session.
#[async_trait]
pub trait TimerApi: Send + Sync {
    /// `None` when nothing is running.
    async fn active(&self) -> Result<Option<ActiveSession>>;
    async fn start(&self, request: StartRequest) -> Result<ActiveSession>;
    /// The closed entry, if a session was running.
    async fn stop(&self) -> Result<Option<TimeEntry>>;
    async fn complete_next(&self, request: CompleteNextRequest) -> Result<CompleteNextResponse>;
    /// Moves the running session onto another entity without restarting it.
    async fn retarget(&self, target: PathTarget) -> Result<ActiveSession>;
    async fn time_entries(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<TimeEntry>>;
}

/// Blocking `ureq` client driven from the tokio blocking pool.
#[derive(Clone)]
pub struct HttpTimerApi {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpTimerApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn execute<F, T>(&self, label: &'static str, task: F) -> Result<T>
    where
        F: FnOnce(&ureq::Agent) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let agent = self.agent.clone();
        let result = tokio::task::spawn_blocking(move || task(&agent))
            .await
            .map_err(|err| anyhow!("{label} request task failed to join: {err}"))?;
        if let Err(err) = &result {
            log_error!("{} request failed: {:#}", label, err);
        }
        result
    }
}

/// Decodes a JSON body; an empty body, `null` or a 204 is `None`.
fn read_optional<T: DeserializeOwned>(response: ureq::Response) -> Result<Option<T>> {
    if response.status() == 204 {
        return Ok(None);
    }
    let body = response
        .into_string()
        .context("failed to read response body")?;
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&body).context("failed to decode response body")
}

fn read_required<T: DeserializeOwned>(response: ureq::Response, what: &str) -> Result<T> {
    read_optional(response)?.ok_or_else(|| anyhow!("server returned an empty {what}"))
}

fn send_json<B: Serialize>(request: ureq::Request, body: &B) -> Result<ureq::Response> {
    let value = serde_json::to_value(body).context("failed to encode request body")?;
    Ok(request.send_json(value)?)
}

#[async_trait]
impl TimerApi for HttpTimerApi {
    async fn active(&self) -> Result<Option<ActiveSession>> {
        let url = self.url("timer/active");
        self.execute("timer/active", move |agent| {
            let response = agent
                .get(&url)
                .call()
                .context("failed to fetch active session")?;
            read_optional(response)
        })
        .await
    }

    async fn start(&self, request: StartRequest) -> Result<ActiveSession> {
        let url = self.url("timer/start");
        self.execute("timer/start", move |agent| {
            let response =
                send_json(agent.post(&url), &request).context("failed to start session")?;
            read_required(response, "started session")
        })
        .await
    }

    async fn stop(&self) -> Result<Option<TimeEntry>> {
        let url = self.url("timer/stop");
        self.execute("timer/stop", move |agent| {
            let response = agent
                .post(&url)
                .call()
                .context("failed to stop session")?;
            read_optional(response)
        })
        .await
    }

    async fn complete_next(&self, request: CompleteNextRequest) -> Result<CompleteNextResponse> {
        let url = self.url("timer/complete-next");
        self.execute("timer/complete-next", move |agent| {
            let response = send_json(agent.post(&url), &request)
                .with_context(|| {
                    format!(
                        "failed to complete {} {}",
                        request.entity_type.as_str(),
                        request.entity_id
                    )
                })?;
            read_required(response, "completion result")
        })
        .await
    }

    async fn retarget(&self, target: PathTarget) -> Result<ActiveSession> {
        let url = self.url("timer/active");
        self.execute("timer/retarget", move |agent| {
            let response = send_json(agent.request("PATCH", &url), &target)
                .context("failed to retarget active session")?;
            read_required(response, "retargeted session")
        })
        .await
    }

    async fn time_entries(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<TimeEntry>> {
        let url = self.url("time-entries");
        self.execute("time-entries", move |agent| {
            let from = from.format("%Y-%m-%d").to_string();
            let to = to.format("%Y-%m-%d").to_string();
            let response = agent
                .get(&url)
                .query("from", &from)
                .query("to", &to)
                .call()
                .with_context(|| format!("failed to list time entries {from}..{to}"))?;
            Ok(read_optional(response)?.unwrap_or_default())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_joined_without_double_slashes() {
        let api = HttpTimerApi::new("http://localhost:8000/api/", Duration::from_secs(1));
        assert_eq!(api.url("timer/active"), "http://localhost:8000/api/timer/active");
    }

    #[tokio::test]
    async fn unreachable_server_surfaces_an_error() {
        let api = HttpTimerApi::new("http://127.0.0.1:9", Duration::from_millis(200));
        assert!(api.active().await.is_err());
    }
}
