//! Comma-separated `key=value` wire codec.
//!
//! Everything the process says or hears on the backplane is one flat
//! string of `key=value` pairs. Values may embed `{…}` groups (polygon
//! point lists) or double-quoted runs (routed message bodies), so the
//! splitter tracks brace depth and quote state instead of splitting on
//! every comma it sees.
//!
//! Decoding is the strict inverse of encoding for the handshake messages
//! (acks, requests) and tolerant for fleet-wide reports: an unknown field
//! inside a hazard is a soft note, a malformed chunk inside a hazard set
//! is skipped with a warning so a partly-garbled report still merges.

use seaward_survey::HazardSet;
use seaward_types::{
    DetectionReport, Hazard, HazardClass, MissionPenalties, Point, Polygon, SensorConfigAck,
    format_compact,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Decode failure for one wire message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unexpected field `{0}`")]
    UnexpectedField(String),

    #[error("field `{field}` is not a number: `{value}`")]
    BadNumber { field: &'static str, value: String },

    #[error("unrecognized mail key `{0}`")]
    UnrecognizedKey(String),

    #[error("malformed message: {0}")]
    Malformed(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Tokenizing
// ────────────────────────────────────────────────────────────────────────────

/// Split `input` on `sep`, ignoring separators inside `{…}` groups and
/// double-quoted runs. Empty chunks are dropped.
pub fn split_outside_groups(input: &str, sep: char) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut start = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '{' if !in_quotes => depth += 1,
            '}' if !in_quotes => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 && !in_quotes => {
                if start < i {
                    chunks.push(&input[start..i]);
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < input.len() {
        chunks.push(&input[start..]);
    }
    chunks
}

/// Split one `key=value` pair on the first `=`. Both sides are trimmed
/// and surrounding quotes are stripped from the value. `None` when there
/// is no `=` or the key is blank.
pub fn parse_kv(chunk: &str) -> Option<(&str, &str)> {
    let eq = chunk.find('=')?;
    let key = chunk[..eq].trim();
    let value = chunk[eq + 1..].trim().trim_matches('"');
    if key.is_empty() { None } else { Some((key, value)) }
}

fn parse_f64(field: &'static str, value: &str) -> Result<f64, CodecError> {
    value.trim().parse::<f64>().map_err(|_| CodecError::BadNumber {
        field,
        value: value.to_string(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Hazards
// ────────────────────────────────────────────────────────────────────────────

/// Encode one hazard: `x=…,y=…,label=…` plus `type=` and `source=` when
/// they carry information.
pub fn encode_hazard(h: &Hazard) -> String {
    let mut out = format!(
        "x={},y={},label={}",
        format_compact(h.x, 2),
        format_compact(h.y, 2),
        h.label
    );
    if h.class != HazardClass::Unclassified {
        out.push_str(",type=");
        out.push_str(h.class.wire_name());
    }
    if let Some(source) = &h.source {
        out.push_str(",source=");
        out.push_str(source);
    }
    out
}

/// Decode one hazard chunk. `x` and `y` are required; `label`, `type`,
/// and `source` are optional; unknown fields get a debug note.
pub fn decode_hazard(input: &str) -> Result<Hazard, CodecError> {
    let mut x = None;
    let mut y = None;
    let mut label = String::new();
    let mut class = HazardClass::Unclassified;
    let mut source = None;
    for chunk in split_outside_groups(input, ',') {
        let Some((key, value)) = parse_kv(chunk) else {
            return Err(CodecError::Malformed(format!(
                "not a key=value pair: `{}`",
                chunk.trim()
            )));
        };
        match key {
            "x" => x = Some(parse_f64("x", value)?),
            "y" => y = Some(parse_f64("y", value)?),
            "label" => label = value.to_string(),
            "type" => class = HazardClass::parse(value),
            "source" => source = Some(value.to_string()),
            other => debug!(field = other, "ignoring unknown hazard field"),
        }
    }
    Ok(Hazard {
        label,
        x: x.ok_or(CodecError::MissingField("x"))?,
        y: y.ok_or(CodecError::MissingField("y"))?,
        class,
        source,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Hazard sets
// ────────────────────────────────────────────────────────────────────────────

/// Encode a whole set: `source=…#name=…#region=…` prefix fields (present
/// only when non-empty) followed by one chunk per hazard, `#`-joined.
pub fn encode_hazard_set(set: &HazardSet) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !set.source().is_empty() {
        parts.push(format!("source={}", set.source()));
    }
    if !set.name().is_empty() {
        parts.push(format!("name={}", set.name()));
    }
    if let Some(region) = set.region() {
        parts.push(format!("region={}", encode_polygon(region)));
    }
    for h in set.iter() {
        parts.push(encode_hazard(h));
    }
    parts.join("#")
}

/// Decode a set encoding. Malformed hazard chunks are skipped with a
/// warning so a partly-garbled report still merges what it can, and
/// duplicate labels keep the first occurrence. A fully unusable payload
/// degrades to an empty set, which merges as a no-op.
pub fn decode_hazard_set(input: &str) -> HazardSet {
    let mut set = HazardSet::new();
    for chunk in split_outside_groups(input, '#') {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        // Set-level prefix chunks are single pairs keyed source/name/region.
        if let Some((key, value)) = parse_kv(chunk) {
            match key {
                "source" if !chunk.contains(',') => {
                    set.set_source(value);
                    continue;
                }
                "name" if !chunk.contains(',') => {
                    set.set_name(value);
                    continue;
                }
                "region" => {
                    match decode_polygon(value) {
                        Ok(poly) => set.set_region(poly),
                        Err(e) => warn!(error = %e, "ignoring bad region in hazard set"),
                    }
                    continue;
                }
                _ => {}
            }
        }
        match decode_hazard(chunk) {
            Ok(h) => {
                if !set.insert_if_absent(h) {
                    debug!(chunk, "dropped duplicate or unlabeled hazard chunk");
                }
            }
            Err(e) => warn!(error = %e, chunk, "skipping malformed hazard chunk"),
        }
    }
    set
}

// ────────────────────────────────────────────────────────────────────────────
// Polygons
// ────────────────────────────────────────────────────────────────────────────

/// Encode a polygon point list: `pts={x,y:x,y:…}`.
pub fn encode_polygon(poly: &Polygon) -> String {
    let body: Vec<String> = poly
        .vertices
        .iter()
        .map(|p| format!("{},{}", format_compact(p.x, 2), format_compact(p.y, 2)))
        .collect();
    format!("pts={{{}}}", body.join(":"))
}

/// Decode `pts={x,y:x,y:…}`. Trailing `label=`-style fields after the
/// point group are tolerated and ignored.
pub fn decode_polygon(input: &str) -> Result<Polygon, CodecError> {
    let mut pts_body: Option<&str> = None;
    for chunk in split_outside_groups(input, ',') {
        if let Some((key, value)) = parse_kv(chunk)
            && key == "pts"
        {
            pts_body = Some(value);
        }
    }
    let body = pts_body.ok_or(CodecError::MissingField("pts"))?;
    let body = body
        .trim()
        .strip_prefix('{')
        .and_then(|b| b.strip_suffix('}'))
        .ok_or_else(|| CodecError::Malformed("pts group must be brace-delimited".to_string()))?;
    let mut vertices = Vec::new();
    for pair in body.split(':') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let Some((xs, ys)) = pair.split_once(',') else {
            return Err(CodecError::Malformed(format!("bad polygon vertex `{pair}`")));
        };
        let x = xs.trim().parse::<f64>().map_err(|_| CodecError::BadNumber {
            field: "pts.x",
            value: xs.to_string(),
        })?;
        let y = ys.trim().parse::<f64>().map_err(|_| CodecError::BadNumber {
            field: "pts.y",
            value: ys.to_string(),
        })?;
        vertices.push(Point::new(x, y));
    }
    Ok(Polygon::new(vertices))
}

// ────────────────────────────────────────────────────────────────────────────
// Detection reports and sensor handshake
// ────────────────────────────────────────────────────────────────────────────

/// Decode a detection report: `vname=…,x=…,y=…,label=…`.
///
/// `vname`, `x`, and `y` are required. A missing label decodes as empty;
/// the manager owns the empty-label rejection so the run warning happens
/// where the detection counter lives.
pub fn decode_detection(input: &str) -> Result<DetectionReport, CodecError> {
    let mut vname = None;
    let mut x = None;
    let mut y = None;
    let mut label = String::new();
    for chunk in split_outside_groups(input, ',') {
        let Some((key, value)) = parse_kv(chunk) else {
            return Err(CodecError::Malformed(format!(
                "not a key=value pair: `{}`",
                chunk.trim()
            )));
        };
        match key {
            "vname" => vname = Some(value.to_string()),
            "x" => x = Some(parse_f64("x", value)?),
            "y" => y = Some(parse_f64("y", value)?),
            "label" => label = value.to_string(),
            other => debug!(field = other, "ignoring unknown detection field"),
        }
    }
    Ok(DetectionReport {
        vname: vname.ok_or(CodecError::MissingField("vname"))?,
        x: x.ok_or(CodecError::MissingField("x"))?,
        y: y.ok_or(CodecError::MissingField("y"))?,
        label,
    })
}

/// Decode a sensor config ack. All five fields must appear; a missing or
/// unexpected field invalidates the whole ack.
pub fn decode_config_ack(input: &str) -> Result<SensorConfigAck, CodecError> {
    let mut vname = None;
    let mut width = None;
    let mut pd = None;
    let mut pfa = None;
    let mut pclass = None;
    for chunk in split_outside_groups(input, ',') {
        let Some((key, value)) = parse_kv(chunk) else {
            return Err(CodecError::Malformed(format!(
                "not a key=value pair: `{}`",
                chunk.trim()
            )));
        };
        match key {
            "vname" => vname = Some(value.to_string()),
            "width" => width = Some(parse_f64("width", value)?),
            "pd" => pd = Some(parse_f64("pd", value)?),
            "pfa" => pfa = Some(parse_f64("pfa", value)?),
            "pclass" => pclass = Some(parse_f64("pclass", value)?),
            other => return Err(CodecError::UnexpectedField(other.to_string())),
        }
    }
    Ok(SensorConfigAck {
        vname: vname.ok_or(CodecError::MissingField("vname"))?,
        width: width.ok_or(CodecError::MissingField("width"))?,
        pd: pd.ok_or(CodecError::MissingField("pd"))?,
        pfa: pfa.ok_or(CodecError::MissingField("pfa"))?,
        pclass: pclass.ok_or(CodecError::MissingField("pclass"))?,
    })
}

/// Decode mission scoring parameters. No field is required, but a known
/// field that fails to parse rejects the whole message so a partial
/// update never lands. Unknown fields are ignored.
pub fn decode_mission_params(input: &str) -> Result<MissionPenalties, CodecError> {
    let mut penalties = MissionPenalties::default();
    for chunk in split_outside_groups(input, ',') {
        let Some((key, value)) = parse_kv(chunk) else {
            continue;
        };
        match key {
            "penalty_false_alarm" => {
                penalties.false_alarm = Some(parse_f64("penalty_false_alarm", value)?);
            }
            "penalty_missed_hazard" => {
                penalties.missed_hazard = Some(parse_f64("penalty_missed_hazard", value)?);
            }
            "max_time" => penalties.max_time = Some(parse_f64("max_time", value)?),
            other => debug!(field = other, "ignoring mission param"),
        }
    }
    Ok(penalties)
}

pub fn encode_config_request(vname: &str, width: f64, pd: f64) -> String {
    format!(
        "vname={vname},width={},pd={}",
        format_compact(width, 2),
        format_compact(pd, 2)
    )
}

pub fn encode_sensor_request(vname: &str) -> String {
    format!("vname={vname}")
}

pub fn encode_classify_request(vname: &str, label: &str) -> String {
    format!("vname={vname},label={label}")
}

// ────────────────────────────────────────────────────────────────────────────
// Routed node messages
// ────────────────────────────────────────────────────────────────────────────

/// Routed fleet message: who it is from, where it goes, and the variable
/// to republish at the destination.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMessage {
    pub src_node: String,
    pub dest_node: String,
    pub var_name: String,
    pub string_val: String,
}

/// Encode a routed message. The body is quoted because hazard-set
/// encodings embed commas and `#`.
pub fn encode_node_message(msg: &NodeMessage) -> String {
    format!(
        "src_node={},dest_node={},var_name={},string_val=\"{}\"",
        msg.src_node, msg.dest_node, msg.var_name, msg.string_val
    )
}

/// Inverse of [`encode_node_message`]. The four standard fields are
/// required; extra fields other senders attach are ignored.
pub fn decode_node_message(input: &str) -> Result<NodeMessage, CodecError> {
    let mut src_node = None;
    let mut dest_node = None;
    let mut var_name = None;
    let mut string_val = None;
    for chunk in split_outside_groups(input, ',') {
        let Some((key, value)) = parse_kv(chunk) else {
            continue;
        };
        match key {
            "src_node" => src_node = Some(value.to_string()),
            "dest_node" => dest_node = Some(value.to_string()),
            "var_name" => var_name = Some(value.to_string()),
            "string_val" => string_val = Some(value.to_string()),
            other => debug!(field = other, "ignoring node message field"),
        }
    }
    Ok(NodeMessage {
        src_node: src_node.ok_or(CodecError::MissingField("src_node"))?,
        dest_node: dest_node.ok_or(CodecError::MissingField("dest_node"))?,
        var_name: var_name.ok_or(CodecError::MissingField("var_name"))?,
        string_val: string_val.ok_or(CodecError::MissingField("string_val"))?,
    })
}

/// Body of a `WAYPOINT_UPDATE_<name>` posting: the polyline plus the
/// visual hints block downstream displays read.
pub fn encode_waypoint_update(points_spec: &str, color: &str) -> String {
    format!("points = {points_spec} # visual_hints = edge_color = {color}, vertex_color = {color}")
}
