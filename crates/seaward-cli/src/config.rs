//! Mission configuration – reads the mission TOML file.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use seaward_manager::ManagerConfig;
use seaward_middleware::codec;
use serde::Deserialize;
use tracing::warn;

/// One vehicle's mission parameters.
///
/// Every field has a default so a partial file, or no file at all, still
/// yields a runnable process.
#[derive(Debug, Clone, Deserialize)]
pub struct MissionConfig {
    /// Community (vehicle) name used in sensor requests.
    #[serde(default = "default_community")]
    pub community: String,

    /// Identity stamped on published hazard sets and waypoint updates.
    /// Defaults to the community name.
    #[serde(default)]
    pub report_name: Option<String>,

    /// Peer vehicle to route hazard relays to; the whole fleet when
    /// absent.
    #[serde(default)]
    pub other_vehicle: Option<String>,

    /// Sensor swath width to request.
    #[serde(default = "default_swath_width")]
    pub swath_width: f64,

    /// Sensor probability of detection to request.
    #[serde(default = "default_pd")]
    pub pd: f64,

    /// Survey region boundary in `pts={x,y:x,y:…}` form. Non-convex
    /// regions are rejected at load time.
    #[serde(default)]
    pub region: Option<String>,

    /// Ask the sensor to classify every freshly detected label.
    #[serde(default)]
    pub request_classification: bool,

    /// A route vertex closer than this to the vehicle counts as visited.
    #[serde(default = "default_prune_radius")]
    pub prune_radius: f64,

    /// Survey cycle rate.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f64,

    /// Seconds between status log lines.
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,

    /// WebSocket URL of the fleet gateway. Absent runs the process
    /// bus-only, which is how the tests drive it.
    #[serde(default)]
    pub backplane_url: Option<String>,

    /// Keys nobody recognises, kept so they can be warned about instead
    /// of silently swallowed.
    #[serde(flatten)]
    pub unknown: BTreeMap<String, toml::Value>,
}

fn default_community() -> String {
    "alpha".to_string()
}
fn default_swath_width() -> f64 {
    25.0
}
fn default_pd() -> f64 {
    0.9
}
fn default_prune_radius() -> f64 {
    10.0
}
fn default_tick_hz() -> f64 {
    4.0
}
fn default_report_interval_secs() -> u64 {
    15
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            community: default_community(),
            report_name: None,
            other_vehicle: None,
            swath_width: default_swath_width(),
            pd: default_pd(),
            region: None,
            request_classification: false,
            prune_radius: default_prune_radius(),
            tick_hz: default_tick_hz(),
            report_interval_secs: default_report_interval_secs(),
            backplane_url: None,
            unknown: BTreeMap::new(),
        }
    }
}

impl MissionConfig {
    /// Period of the survey cycle. `tick_hz` is sanitised at load time
    /// so this cannot divide by zero.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz)
    }

    /// Interval between status log lines.
    pub fn report_period(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    /// Lower this mission file into the manager's own configuration.
    ///
    /// The region string is parsed here; an unparseable or non-convex
    /// region is warned about and dropped rather than failing the
    /// mission.
    pub fn to_manager_config(&self) -> ManagerConfig {
        let region = self.region.as_deref().and_then(|spec| match codec::decode_polygon(spec) {
            Ok(poly) if poly.is_convex() => Some(poly),
            Ok(_) => {
                warn!(region = %spec, "survey region is not convex; ignoring it");
                None
            }
            Err(e) => {
                warn!(region = %spec, error = %e, "unparseable survey region ignored");
                None
            }
        });

        ManagerConfig {
            community: self.community.clone(),
            report_name: self
                .report_name
                .clone()
                .unwrap_or_else(|| self.community.clone()),
            other_vehicle: self.other_vehicle.as_deref().map(str::to_uppercase),
            swath_width_desired: self.swath_width,
            pd_desired: self.pd,
            region,
            request_classification: self.request_classification,
            prune_radius: self.prune_radius,
        }
    }
}

/// Path of the mission file: first CLI argument, else `mission.toml` in
/// the working directory.
pub fn mission_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("mission.toml"))
}

/// Load the mission file.  Returns `None` if the file does not exist.
pub fn load_from(path: &PathBuf) -> Result<Option<MissionConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read mission file at {}: {}", path.display(), e))?;
    let mut cfg: MissionConfig = toml::from_str(&raw)
        .map_err(|e| format!("Failed to parse mission file: {}", e))?;

    for key in cfg.unknown.keys() {
        warn!(key = %key, "unrecognised mission parameter ignored");
    }

    apply_env_overrides(&mut cfg);
    sanitise(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `SEAWARD_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `SEAWARD_BACKPLANE_URL` | `backplane_url` |
/// | `SEAWARD_COMMUNITY` | `community` |
/// | `SEAWARD_REPORT_NAME` | `report_name` |
/// | `SEAWARD_TICK_HZ` | `tick_hz` |
pub fn apply_env_overrides(cfg: &mut MissionConfig) {
    if let Ok(v) = std::env::var("SEAWARD_BACKPLANE_URL") {
        cfg.backplane_url = Some(v);
    }
    if let Ok(v) = std::env::var("SEAWARD_COMMUNITY") {
        cfg.community = v;
    }
    if let Ok(v) = std::env::var("SEAWARD_REPORT_NAME") {
        cfg.report_name = Some(v);
    }
    if let Ok(v) = std::env::var("SEAWARD_TICK_HZ")
        && let Ok(hz) = v.parse::<f64>() {
            cfg.tick_hz = hz;
        }
}

/// Replace out-of-range numeric parameters with their defaults, warning
/// about each one.
pub fn sanitise(cfg: &mut MissionConfig) {
    if !(cfg.tick_hz.is_finite() && cfg.tick_hz > 0.0) {
        warn!(tick_hz = cfg.tick_hz, "invalid tick rate; using the default");
        cfg.tick_hz = default_tick_hz();
    }
    if !(cfg.swath_width.is_finite() && cfg.swath_width > 0.0) {
        warn!(swath_width = cfg.swath_width, "invalid swath width; using the default");
        cfg.swath_width = default_swath_width();
    }
    if !(cfg.pd.is_finite() && cfg.pd > 0.0 && cfg.pd <= 1.0) {
        warn!(pd = cfg.pd, "invalid detection probability; using the default");
        cfg.pd = default_pd();
    }
    if !(cfg.prune_radius.is_finite() && cfg.prune_radius >= 0.0) {
        warn!(prune_radius = cfg.prune_radius, "invalid prune radius; using the default");
        cfg.prune_radius = default_prune_radius();
    }
}
