//! Lineage resolution and timer-session reconciliation for the focustree
//! planner hierarchy (Mode → Goal → Project → Milestone → Task).

pub mod config;
pub mod lineage;
pub mod models;
pub mod navigator;
pub mod selection;
pub mod timer;
mod utils;

#[cfg(test)]
mod fixtures;

pub use config::TimerConfig;
pub use lineage::Lineage;
pub use models::{
    ActiveSession, Catalog, EntityId, EntityRef, EntityType, Selection, Snapshot, TimeEntry,
    TimerKind, TimerPath,
};
pub use selection::{SelectionPatch, SelectionStore};
pub use timer::{
    CompleteOutcome, ControllerView, LaunchIntent, NextOutcome, StopOutcome, SwitchOutcome,
    TimerApi, TimerPhase, TimerSessionController,
};

/// Installs `env_logger` with an `Info` default, overridable through
/// `RUST_LOG`. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

/// Builds a controller from the environment, loads the catalog, fetches the
/// active session once and starts the background loops.
pub async fn start(catalog: Catalog) -> anyhow::Result<TimerSessionController> {
    init_logging();
    log::info!("focustree starting up...");

    let controller = TimerSessionController::from_config(TimerConfig::from_env())?;
    controller.set_catalog(catalog).await;
    if let Err(err) = controller.refresh().await {
        log::warn!("initial active-session fetch failed: {err:#}");
    }
    controller.start_background().await?;
    Ok(controller)
}
