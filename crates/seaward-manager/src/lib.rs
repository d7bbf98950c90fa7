//! `seaward-manager` – The Survey Brain (Reconciliation Engine)
//!
//! The process core of a hazard-survey participant: it reconciles
//! detections, classifier verdicts, and fleet reports into one hazard
//! picture and drives the sensor handshake, relay, and route upkeep
//! from a fixed-rate tick.
//!
//! # Modules
//!
//! - [`manager`] – [`HazardManager`][manager::HazardManager]:
//!   the reconciliation engine that owns the live, staged, and relay
//!   hazard sets plus the visit route, drains the
//!   [`MailBus`][seaward_middleware::MailBus] every tick, and answers
//!   the fleet with postings.
//! - [`negotiation`] – [`SensorNegotiation`][negotiation::SensorNegotiation]:
//!   sensor handshake bookkeeping; re-requests an unanswered
//!   configuration every
//!   [`CONFIG_RETRY_INTERVAL`][negotiation::CONFIG_RETRY_INTERVAL]
//!   and switches to per-tick info requests once granted.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP
//!   span exporter. Set `OTEL_EXPORTER_OTLP_ENDPOINT` to export spans
//!   to any OTLP-compatible collector.

pub mod manager;
pub mod negotiation;
pub mod telemetry;

pub use manager::{HazardManager, ManagerConfig};
pub use negotiation::{SensorNegotiation, CONFIG_RETRY_INTERVAL};
pub use telemetry::{init_tracing, TelemetryGuard};
