//! Closed mail model: everything the process can hear or say.
//!
//! Inbound traffic decodes into [`Mail`] at the transport boundary, so
//! the manager matches exhaustively over a closed enum and an unknown
//! key can only ever be a decode-time warning, never a silent branch.
//! Outbound traffic is a [`Posting`], encoded into a [`WireFrame`] at the
//! same boundary on its way out.

use serde::{Deserialize, Serialize};

use seaward_survey::{HazardSet, WaypointRoute};
use seaward_types::{DetectionReport, Hazard, MissionPenalties, SensorConfigAck};

use crate::codec::{self, CodecError, NodeMessage};

/// Wire keys this process subscribes to or publishes. Pinned verbatim
/// for compatibility with the rest of the fleet.
pub mod keys {
    pub const CONFIG_ACK: &str = "UHZ_CONFIG_ACK";
    pub const OPTIONS_SUMMARY: &str = "UHZ_OPTIONS_SUMMARY";
    pub const DETECTION_REPORT: &str = "UHZ_DETECTION_REPORT";
    pub const HAZARDSET_REQUEST: &str = "HAZARDSET_REQUEST";
    pub const MISSION_PARAMS: &str = "UHZ_MISSION_PARAMS";
    pub const NAV_X: &str = "NAV_X";
    pub const NAV_Y: &str = "NAV_Y";
    pub const NODE_REPORT: &str = "NODE_REPORT";
    pub const HAZARD_REPORT: &str = "UHZ_HAZARD_REPORT";
    pub const ROUTE_REGENERATE: &str = "GENPATH_REGENERATE";
    pub const HAZARDSET_OTHER: &str = "HAZARDSET_OTHER";

    pub const CONFIG_REQUEST: &str = "UHZ_CONFIG_REQUEST";
    pub const SENSOR_REQUEST: &str = "UHZ_SENSOR_REQUEST";
    pub const NODE_MESSAGE_LOCAL: &str = "NODE_MESSAGE_LOCAL";
    pub const HAZARDSET_REPORT: &str = "HAZARDSET_REPORT";
    pub const CLASSIFY_REQUEST: &str = "UHZ_CLASSIFY_REQUEST";
    pub const WAYPOINT_UPDATE_PREFIX: &str = "WAYPOINT_UPDATE_";
}

/// One backplane frame: a key plus a string or numeric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFrame {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dval: Option<f64>,
    /// Community (vehicle) the frame originated from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Inbound mail
// ────────────────────────────────────────────────────────────────────────────

/// Every inbound message the manager understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Mail {
    SensorConfigAck(SensorConfigAck),
    SensorOptionsSummary(String),
    Detection(DetectionReport),
    HazardSetRequest,
    MissionParams(MissionPenalties),
    NavX(f64),
    NavY(f64),
    NodeReport(String),
    /// Classification verdict for one labeled object.
    HazardReport(Hazard),
    RouteRegenerate,
    /// Another vehicle's full hazard set, relayed over the fleet.
    RemoteHazardSet(HazardSet),
}

impl Mail {
    /// Decode one frame into typed mail.
    ///
    /// Unsubscribed keys come back as [`CodecError::UnrecognizedKey`] so
    /// the bridge can log and drop them; the manager itself never sees an
    /// open set of variants.
    pub fn decode(frame: &WireFrame) -> Result<Mail, CodecError> {
        let sval = frame.sval.as_deref().unwrap_or("");
        match frame.key.as_str() {
            keys::CONFIG_ACK => Ok(Mail::SensorConfigAck(codec::decode_config_ack(sval)?)),
            keys::OPTIONS_SUMMARY => Ok(Mail::SensorOptionsSummary(sval.to_string())),
            keys::DETECTION_REPORT => Ok(Mail::Detection(codec::decode_detection(sval)?)),
            keys::HAZARDSET_REQUEST => Ok(Mail::HazardSetRequest),
            keys::MISSION_PARAMS => Ok(Mail::MissionParams(codec::decode_mission_params(sval)?)),
            keys::NAV_X => Ok(Mail::NavX(Self::numeric(frame, "NAV_X")?)),
            keys::NAV_Y => Ok(Mail::NavY(Self::numeric(frame, "NAV_Y")?)),
            keys::NODE_REPORT => Ok(Mail::NodeReport(sval.to_string())),
            keys::HAZARD_REPORT => Ok(Mail::HazardReport(codec::decode_hazard(sval)?)),
            keys::ROUTE_REGENERATE => Ok(Mail::RouteRegenerate),
            keys::HAZARDSET_OTHER => Ok(Mail::RemoteHazardSet(codec::decode_hazard_set(sval))),
            other => Err(CodecError::UnrecognizedKey(other.to_string())),
        }
    }

    /// Numeric frames normally arrive in `dval`; a numeric `sval` is
    /// accepted as a fallback for gateways that stringify everything.
    fn numeric(frame: &WireFrame, field: &'static str) -> Result<f64, CodecError> {
        if let Some(d) = frame.dval {
            return Ok(d);
        }
        let sval = frame.sval.as_deref().unwrap_or("").trim();
        if sval.is_empty() {
            return Err(CodecError::MissingField(field));
        }
        sval.parse::<f64>().map_err(|_| CodecError::BadNumber {
            field,
            value: sval.to_string(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outbound postings
// ────────────────────────────────────────────────────────────────────────────

/// Color hint attached to waypoint updates for downstream displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteColor {
    Red,
    Yellow,
}

impl RouteColor {
    pub fn wire_name(&self) -> &'static str {
        match self {
            RouteColor::Red => "red",
            RouteColor::Yellow => "yellow",
        }
    }
}

/// Every outbound message the manager can post.
#[derive(Debug, Clone, PartialEq)]
pub enum Posting {
    SensorConfigRequest { vname: String, width: f64, pd: f64 },
    SensorInfoRequest { vname: String },
    /// Routed copy of the outgoing queue for the rest of the fleet.
    NodeMessage(NodeMessage),
    HazardSetReport(HazardSet),
    WaypointUpdate { name: String, route: WaypointRoute, color: RouteColor },
    ClassifyRequest { vname: String, label: String },
}

impl Posting {
    /// Backplane key this posting publishes under.
    pub fn key(&self) -> String {
        match self {
            Posting::SensorConfigRequest { .. } => keys::CONFIG_REQUEST.to_string(),
            Posting::SensorInfoRequest { .. } => keys::SENSOR_REQUEST.to_string(),
            Posting::NodeMessage(_) => keys::NODE_MESSAGE_LOCAL.to_string(),
            Posting::HazardSetReport(_) => keys::HAZARDSET_REPORT.to_string(),
            Posting::WaypointUpdate { name, .. } => {
                format!("{}{name}", keys::WAYPOINT_UPDATE_PREFIX)
            }
            Posting::ClassifyRequest { .. } => keys::CLASSIFY_REQUEST.to_string(),
        }
    }

    /// Encoded string value for the frame body.
    pub fn encode(&self) -> String {
        match self {
            Posting::SensorConfigRequest { vname, width, pd } => {
                codec::encode_config_request(vname, *width, *pd)
            }
            Posting::SensorInfoRequest { vname } => codec::encode_sensor_request(vname),
            Posting::NodeMessage(msg) => codec::encode_node_message(msg),
            Posting::HazardSetReport(set) => codec::encode_hazard_set(set),
            Posting::WaypointUpdate { route, color, .. } => {
                codec::encode_waypoint_update(&route.to_spec(), color.wire_name())
            }
            Posting::ClassifyRequest { vname, label } => {
                codec::encode_classify_request(vname, label)
            }
        }
    }

    /// Frame ready for the backplane, stamped with our community.
    pub fn to_frame(&self, community: &str) -> WireFrame {
        WireFrame {
            key: self.key(),
            sval: Some(self.encode()),
            dval: None,
            community: Some(community.to_string()),
        }
    }
}
