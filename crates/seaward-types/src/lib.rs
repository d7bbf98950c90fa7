use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Source tag applied when a classification report arrives for a label no
/// detection has introduced yet. Downstream consumers treat it as
/// "position unverified by any detector".
pub const UNVERIFIED_SOURCE: &str = "unverified";

/// Compact decimal formatting shared by every wire encoding: fixed
/// precision with trailing zeros (and a dangling point) trimmed, so
/// `51.00` renders as `51` and `11.30` as `11.3`.
pub fn format_compact(value: f64, precision: usize) -> String {
    let rendered = format!("{value:.precision$}");
    if !rendered.contains('.') {
        return rendered;
    }
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

/// Classification state of a tracked object.
///
/// Wire encoding uses the lowercase names; an absent or empty `type`
/// field decodes as [`HazardClass::Unclassified`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardClass {
    /// Confirmed or assumed dangerous object.
    Hazard,
    /// Classified as harmless (a rock, debris, a wreck outside the lanes).
    Benign,
    /// Detected but not yet classified either way.
    #[default]
    Unclassified,
}

impl HazardClass {
    /// Infallible parse of the wire `type` field.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "hazard" => HazardClass::Hazard,
            "benign" => HazardClass::Benign,
            _ => HazardClass::Unclassified,
        }
    }

    /// Name used in the `type=` wire field. Unclassified encodes as empty.
    pub fn wire_name(&self) -> &'static str {
        match self {
            HazardClass::Hazard => "hazard",
            HazardClass::Benign => "benign",
            HazardClass::Unclassified => "",
        }
    }
}

impl fmt::Display for HazardClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// A single labeled object tracked in the survey region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    /// Fleet-wide identity. Never empty inside a `HazardSet`.
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub class: HazardClass,
    /// Vehicle that first reported this object, when known.
    pub source: Option<String>,
}

impl Hazard {
    pub fn new(label: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            label: label.into(),
            x,
            y,
            class: HazardClass::Unclassified,
            source: None,
        }
    }

    pub fn with_class(mut self, class: HazardClass) -> Self {
        self.class = class;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Euclidean distance from this object to a point.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}

/// A 2D position in local mission coordinates (meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Minimal polygon for survey-region validation.
///
/// Only the convexity gate lives here; producing and editing regions is
/// the concern of the mission-planning tools upstream of this process.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// True when every turn along the boundary bends the same way.
    ///
    /// Collinear runs are tolerated. Fewer than three vertices, or a
    /// fully collinear vertex list, never count as convex.
    pub fn is_convex(&self) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut sign = 0.0f64;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let c = self.vertices[(i + 2) % n];
            let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
            if cross.abs() < 1e-9 {
                continue;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        sign != 0.0
    }
}

/// Decoded detection report from a vehicle's hazard sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Vehicle that made the detection.
    pub vname: String,
    pub x: f64,
    pub y: f64,
    /// May be empty on the wire; unlabeled detections are rejected
    /// before they can touch any hazard set.
    pub label: String,
}

/// Sensor-manager acknowledgment of a configuration request. All five
/// fields are mandatory on the wire; a partial ack is discarded whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfigAck {
    pub vname: String,
    pub width: f64,
    pub pd: f64,
    pub pfa: f64,
    pub pclass: f64,
}

/// Scoring constants pushed by the mission controller. Fields arrive
/// independently; `None` means never received.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MissionPenalties {
    pub false_alarm: Option<f64>,
    pub missed_hazard: Option<f64>,
    pub max_time: Option<f64>,
}

/// Periodic snapshot of negotiation, counter, and container state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub community: String,
    pub report_name: String,
    pub swath_width_desired: f64,
    pub pd_desired: f64,
    pub swath_width_granted: Option<f64>,
    pub pd_granted: Option<f64>,
    pub config_confirmed: bool,
    pub config_requests: u32,
    pub config_acks: u32,
    pub sensor_requests: u32,
    pub detection_reports: u32,
    pub summary_reports: u32,
    pub hazards_tracked: usize,
    pub queued_for_relay: usize,
    pub staged_for_report: usize,
    pub route_length: usize,
    pub fleet_activity_age_secs: Option<f64>,
}

/// Global error type spanning channel, transport, and configuration failures.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum SeawardError {
    #[error("Channel Error: {0}")]
    Channel(String),

    #[error("Transport Error: {0}")]
    Transport(String),

    #[error("Config Error: {0}")]
    Config(String),

    #[error("Wire Codec Error: {0}")]
    Codec(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_compact_trims_trailing_zeros() {
        assert_eq!(format_compact(51.0, 2), "51");
        assert_eq!(format_compact(11.3, 2), "11.3");
        assert_eq!(format_compact(-20.5, 2), "-20.5");
        assert_eq!(format_compact(0.0, 2), "0");
        assert_eq!(format_compact(1.005, 2), "1");
        assert_eq!(format_compact(25.0, 0), "25");
    }

    #[test]
    fn hazard_class_wire_names_roundtrip() {
        assert_eq!(HazardClass::parse("hazard"), HazardClass::Hazard);
        assert_eq!(HazardClass::parse("benign"), HazardClass::Benign);
        assert_eq!(HazardClass::parse(""), HazardClass::Unclassified);
        assert_eq!(HazardClass::parse("wreck"), HazardClass::Unclassified);
        assert_eq!(HazardClass::Hazard.wire_name(), "hazard");
        assert_eq!(HazardClass::Unclassified.wire_name(), "");
    }

    #[test]
    fn hazard_builder_and_distance() {
        let h = Hazard::new("04", 3.0, 4.0)
            .with_class(HazardClass::Hazard)
            .with_source("alpha");
        assert_eq!(h.label, "04");
        assert_eq!(h.class, HazardClass::Hazard);
        assert_eq!(h.source.as_deref(), Some("alpha"));
        assert!((h.distance_to(0.0, 0.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn hazard_serialization_roundtrip() {
        let h = Hazard::new("12", 51.0, 11.3).with_class(HazardClass::Benign);
        let json = serde_json::to_string(&h).unwrap();
        let back: Hazard = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }

    #[test]
    fn square_is_convex() {
        let poly = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        assert!(poly.is_convex());
    }

    #[test]
    fn chevron_is_not_convex() {
        let poly = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(5.0, 2.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        assert!(!poly.is_convex());
    }

    #[test]
    fn degenerate_polygons_are_not_convex() {
        assert!(!Polygon::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]).is_convex());
        let collinear = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
        ]);
        assert!(!collinear.is_convex());
    }

    #[test]
    fn seaward_error_display() {
        let err = SeawardError::Transport("socket closed".to_string());
        assert!(err.to_string().contains("Transport Error"));

        let err2 = SeawardError::Config("region is not convex".to_string());
        assert!(err2.to_string().contains("region is not convex"));
    }
}
