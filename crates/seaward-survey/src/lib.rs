//! `seaward-survey` – Hazard bookkeeping & route maintenance.
//!
//! The containers that hold what a vehicle believes about the survey
//! region, and the algorithms that keep them tidy. Nothing here touches
//! the wire; encoding and decoding live in `seaward-middleware`.
//!
//! # Modules
//!
//! - [`hazard_set`] – [`HazardSet`][hazard_set::HazardSet]: ordered,
//!   label-unique collection of tracked hazards with set-level metadata
//!   (source, name, region) and a single insertion gate.
//! - [`route`] – [`WaypointRoute`][route::WaypointRoute]: the visit route
//!   grown from detections, with nearest-vertex queries, greedy
//!   nearest-neighbor re-sorting, and proximity pruning.
//! - [`min_path`] – [`MinPathPlanner`][min_path::MinPathPlanner]: strategy
//!   seam for shortening a hazard set to a transit-time budget before it
//!   leaves the vehicle.

pub mod hazard_set;
pub mod min_path;
pub mod route;

pub use hazard_set::HazardSet;
pub use min_path::{GreedyTourPlanner, MinPathPlanner};
pub use route::WaypointRoute;
