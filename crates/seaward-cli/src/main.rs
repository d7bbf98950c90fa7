//! `seaward` – hazard-survey participant process.
//!
//! This binary wires the stack together and runs it:
//!
//! 1. Initialises tracing (set `OTEL_EXPORTER_OTLP_ENDPOINT` for span
//!    export, `SEAWARD_LOG_FORMAT=json` for JSON logs).
//! 2. Loads the mission file named by the first argument, or
//!    `mission.toml`, falling back to defaults when absent.
//! 3. Builds the [`MailBus`] and the [`HazardManager`] on top of it.
//! 4. Connects the WebSocket backplane bridge when the mission names a
//!    gateway.
//! 5. Runs the fixed-rate survey loop until **Ctrl-C**.

mod config;

use seaward_manager::{telemetry, HazardManager};
use seaward_middleware::{Backplane, MailBus, WsBackplane};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Hold the guard for the entire lifetime of the process.
    let _guard = telemetry::init_tracing("seaward");

    // ── Mission configuration ─────────────────────────────────────────────
    let path = config::mission_path();
    let mission = match config::load_from(&path) {
        Ok(Some(cfg)) => {
            info!(path = %path.display(), "mission configuration loaded");
            cfg
        }
        Ok(None) => {
            warn!(path = %path.display(), "mission file not found; using defaults");
            config::MissionConfig::default()
        }
        Err(e) => {
            error!(error = %e, "mission configuration unreadable; using defaults");
            config::MissionConfig::default()
        }
    };

    // ── Bus and manager ───────────────────────────────────────────────────
    let bus = MailBus::default();
    let mut manager = HazardManager::new(mission.to_manager_config(), bus.clone());

    // ── Backplane bridge ──────────────────────────────────────────────────
    match mission.backplane_url.clone() {
        Some(url) => {
            let bridge_bus = bus.clone();
            let community = mission.community.clone();
            tokio::spawn(async move {
                let backplane = WsBackplane::new(url, community);
                if let Err(e) = backplane.run(bridge_bus).await {
                    error!(error = %e, "backplane bridge exited");
                }
            });
        }
        None => warn!("no backplane configured; running bus-only"),
    }

    // ── Survey loop ───────────────────────────────────────────────────────
    let mut tick = tokio::time::interval(mission.tick_period());
    let mut status = tokio::time::interval(mission.report_period());

    info!(
        community = %mission.community,
        tick_hz = mission.tick_hz,
        "survey loop started"
    );

    loop {
        tokio::select! {
            _ = tick.tick() => manager.tick(),
            _ = status.tick() => {
                let report = manager.report();
                if let Ok(json) = serde_json::to_string(&report) {
                    info!(status = %json, "survey status");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
        }
    }
}
