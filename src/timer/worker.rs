use anyhow::{bail, Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::controller::TimerSessionController;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Background loops of a controller: active-session polling, the clock tick
/// and the launch-intent mailbox.
pub struct TimerWorker {
    handles: Vec<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl TimerWorker {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.cancel_token.is_some()
    }

    pub fn start(&mut self, controller: TimerSessionController) -> Result<()> {
        if self.cancel_token.is_some() {
            bail!("timer worker already active");
        }

        let cancel_token = CancellationToken::new();
        self.handles = vec![
            tokio::spawn(poll_loop(controller.clone(), cancel_token.clone())),
            tokio::spawn(tick_loop(controller.clone(), cancel_token.clone())),
            tokio::spawn(launch_loop(controller, cancel_token.clone())),
        ];
        self.cancel_token = Some(cancel_token);
        log_info!("timer worker started");
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        for handle in self.handles.drain(..) {
            handle.await.context("timer worker task failed to join")?;
        }
        Ok(())
    }
}

impl Default for TimerWorker {
    fn default() -> Self {
        Self::new()
    }
}

fn interval(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Refreshes the active session while one is believed to be running. One
/// refresh happens up front so a session started elsewhere is picked up.
pub async fn poll_loop(controller: TimerSessionController, cancel_token: CancellationToken) {
    let mut ticker = interval(controller.config().poll_interval);
    let mut first = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !first && !controller.believes_active().await {
                    continue;
                }
                first = false;
                if let Err(err) = controller.refresh().await {
                    log_warn!("active-session poll failed: {err:#}");
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("poll loop shutting down");
                break;
            }
        }
    }
}

/// Drives the clock at the foreground cadence while visible and the
/// background cadence while hidden. Becoming visible refetches once.
pub async fn tick_loop(controller: TimerSessionController, cancel_token: CancellationToken) {
    let mut visibility: watch::Receiver<bool> = controller.visibility_receiver();
    let cadence = |visible: bool| {
        if visible {
            controller.config().foreground_tick
        } else {
            controller.config().background_tick
        }
    };
    let mut ticker = interval(cadence(*visibility.borrow_and_update()));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = controller.tick().await {
                    log_error!("clock tick failed: {err:#}");
                }
            }
            changed = visibility.changed() => {
                if changed.is_err() {
                    break;
                }
                let visible = *visibility.borrow_and_update();
                log_debug!("visibility changed, visible={}", visible);
                ticker = interval(cadence(visible));
                if visible {
                    if let Err(err) = controller.refresh().await {
                        log_warn!("refresh on focus failed: {err:#}");
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("tick loop shutting down");
                break;
            }
        }
    }
}

/// Applies posted launch intents in arrival order.
pub async fn launch_loop(controller: TimerSessionController, cancel_token: CancellationToken) {
    let slot = controller.launch_slot();

    loop {
        tokio::select! {
            intent = slot.next() => {
                if let Err(err) = controller.launch(intent).await {
                    log_warn!("launch intent dropped: {err:#}");
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("launch loop shutting down");
                break;
            }
        }
    }
}
