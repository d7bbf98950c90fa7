//! [`HazardManager`] – the hazard-survey reconciliation engine.
//!
//! One instance of this type is the whole survey participant: it owns
//! the live hazard set, the outgoing relay queue, the staged summary
//! set, the visit route, and the sensor handshake. Each call to
//! [`HazardManager::tick`]:
//!
//! 1. **Drain** – pull every piece of mail already waiting on the bus
//!    and apply it in arrival order.
//! 2. **Negotiate** – request a sensor configuration until one is
//!    granted, then trigger the sensor with an info request each cycle.
//! 3. **Relay** – broadcast locally-new hazards to the rest of the
//!    fleet as a routed node message, then clear the queue whether or
//!    not anything was listening.
//! 4. **Scrub & prune** – drop non-hazard tracks from the outward-facing
//!    set, re-stamp its source, and delete the nearest route vertex once
//!    the vehicle has passed close enough to count it as visited.
//!
//! # Precedence rules
//!
//! Hazard knowledge only ever accretes. The first detection of a label
//! owns it: repeat detections and remote reports never overwrite an
//! existing track. A classification report may upgrade a `benign` track
//! to the reported class, and nothing may change a track's class after
//! that; the first non-benign verdict is final.
//!
//! # Example
//!
//! ```rust,no_run
//! use seaward_manager::{HazardManager, ManagerConfig};
//! use seaward_middleware::MailBus;
//!
//! let bus = MailBus::default();
//! let mut manager = HazardManager::new(ManagerConfig::default(), bus.clone());
//! // manager.tick() drains pending mail and runs one survey cycle.
//! ```

use std::time::Instant;

use seaward_middleware::codec;
use seaward_middleware::mail::keys;
use seaward_middleware::{Mail, MailBus, MailReceiver, NodeMessage, Posting, RouteColor};
use seaward_survey::{GreedyTourPlanner, HazardSet, MinPathPlanner, WaypointRoute};
use seaward_types::{
    DetectionReport, Hazard, HazardClass, MissionPenalties, Polygon, SensorConfigAck,
    StatusReport, UNVERIFIED_SOURCE,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::negotiation::SensorNegotiation;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Transit-time budget handed to the min-path planner when a summary
/// report is requested.
const REPORT_TIME_BUDGET_SECS: f64 = 20.0;

/// Easting beyond which a re-sorted route ends in the caution zone and
/// the waypoint update is colored red instead of yellow.
const ROUTE_ALERT_X: f64 = 88.0;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`HazardManager`].
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// This vehicle's community name, used as `vname` in every sensor
    /// message.
    pub community: String,
    /// Identity stamped on hazard sets and waypoint updates we publish.
    pub report_name: String,
    /// Peer vehicle to route hazard relays to. `None` broadcasts to the
    /// whole fleet.
    pub other_vehicle: Option<String>,
    /// Sensor swath width to ask for.
    pub swath_width_desired: f64,
    /// Sensor probability of detection to ask for.
    pub pd_desired: f64,
    /// Survey region boundary, when the mission defines one.
    pub region: Option<Polygon>,
    /// When `true` this vehicle plays the classifier role and asks the
    /// sensor to classify every freshly detected label.
    pub request_classification: bool,
    /// A route vertex closer than this to the vehicle counts as visited.
    pub prune_radius: f64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            community: "alpha".to_string(),
            report_name: "alpha".to_string(),
            other_vehicle: None,
            swath_width_desired: 25.0,
            pd_desired: 0.9,
            region: None,
            request_classification: false,
            prune_radius: 10.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HazardManager
// ─────────────────────────────────────────────────────────────────────────────

/// The reconciliation engine.
///
/// Owns every piece of survey state and the bus handles needed to hear
/// the fleet and answer it. Call [`HazardManager::tick`] from the
/// process's scheduler loop to advance one cycle.
pub struct HazardManager {
    config: ManagerConfig,
    bus: MailBus,
    /// Subscription opened at construction so no mail published after
    /// the manager exists can be missed.
    mail_rx: MailReceiver,
    negotiation: SensorNegotiation,
    // ── Survey containers ─────────────────────────────────────────────────────
    /// Everything this vehicle knows about, from its own sensor and from
    /// fleet reports. Scrubbed to hazard-class tracks every tick.
    hazards: HazardSet,
    /// Classifier verdicts staged for the next summary report.
    staged: HazardSet,
    /// Locally-new detections awaiting relay. Cleared every tick.
    relay_queue: HazardSet,
    route: WaypointRoute,
    planner: Box<dyn MinPathPlanner>,
    // ── Vehicle state ─────────────────────────────────────────────────────────
    nav_x: f64,
    nav_y: f64,
    penalties: MissionPenalties,
    // ── Bookkeeping ───────────────────────────────────────────────────────────
    detection_reports: u32,
    summary_reports: u32,
    last_fleet_report: Option<Instant>,
    last_options_summary: Option<String>,
}

impl HazardManager {
    /// Construct a manager wired to `bus`.
    pub fn new(config: ManagerConfig, bus: MailBus) -> Self {
        let mail_rx = bus.subscribe_mail();

        let mut hazards = HazardSet::new();
        hazards.set_source(&config.community);
        hazards.set_name(&config.report_name);
        if let Some(region) = &config.region {
            hazards.set_region(region.clone());
        }

        let negotiation =
            SensorNegotiation::new(config.swath_width_desired, config.pd_desired);

        Self {
            config,
            bus,
            mail_rx,
            negotiation,
            hazards,
            staged: HazardSet::new(),
            relay_queue: HazardSet::new(),
            route: WaypointRoute::new(),
            planner: Box::new(GreedyTourPlanner::default()),
            nav_x: 0.0,
            nav_y: 0.0,
            penalties: MissionPenalties::default(),
            detection_reports: 0,
            summary_reports: 0,
            last_fleet_report: None,
            last_options_summary: None,
        }
    }

    /// Return a clone of the bus so callers can publish mail or watch
    /// postings.
    pub fn bus(&self) -> MailBus {
        self.bus.clone()
    }

    // -------------------------------------------------------------------------
    // Mail handling
    // -------------------------------------------------------------------------

    /// Apply one piece of inbound mail.
    ///
    /// [`tick`][Self::tick] drains the bus through here in arrival
    /// order; tests call it directly.
    pub fn handle_mail(&mut self, mail: Mail) {
        match mail {
            Mail::SensorConfigAck(ack) => self.handle_config_ack(ack),
            Mail::SensorOptionsSummary(summary) => {
                debug!(summary = %summary, "sensor options summary noted");
                self.last_options_summary = Some(summary);
            }
            Mail::Detection(report) => self.handle_detection(report),
            Mail::HazardSetRequest => self.handle_report_request(),
            Mail::MissionParams(update) => self.handle_mission_params(update),
            Mail::NavX(x) => self.nav_x = x,
            Mail::NavY(y) => self.nav_y = y,
            Mail::NodeReport(_) => self.last_fleet_report = Some(Instant::now()),
            Mail::HazardReport(report) => self.handle_classification(report),
            Mail::RouteRegenerate => self.handle_route_regenerate(),
            Mail::RemoteHazardSet(set) => self.handle_remote_set(set),
        }
    }

    fn handle_config_ack(&mut self, ack: SensorConfigAck) {
        self.negotiation.apply_ack(&ack);
        info!(width = ack.width, pd = ack.pd, "sensor configuration granted");
    }

    /// A detection from this vehicle's own sensor. The first detection
    /// of a label owns it; repeats are ignored.
    fn handle_detection(&mut self, report: DetectionReport) {
        self.detection_reports += 1;

        if report.label.is_empty() {
            warn!(vname = %report.vname, "detection report without a label dropped");
            return;
        }

        let hazard = Hazard::new(&report.label, report.x, report.y)
            .with_class(HazardClass::Hazard)
            .with_source(&report.vname);

        if !self.hazards.insert_if_absent(hazard.clone()) {
            debug!(label = %report.label, "repeat detection ignored");
            return;
        }

        self.relay_queue.insert_if_absent(hazard);
        self.route.add_vertex(report.x, report.y);
        info!(
            label = %report.label,
            x = report.x,
            y = report.y,
            vname = %report.vname,
            "new detection tracked"
        );

        if self.config.request_classification {
            let _ = self.bus.post(Posting::ClassifyRequest {
                vname: self.config.community.clone(),
                label: report.label.clone(),
            });
        }
    }

    /// Merge another vehicle's hazard set. Only genuinely new labels
    /// land; everything already known is skipped untouched.
    fn handle_remote_set(&mut self, incoming: HazardSet) {
        for hazard in incoming.iter() {
            if self.hazards.insert_if_absent(hazard.clone()) {
                self.route.add_vertex(hazard.x, hazard.y);
                info!(
                    label = %hazard.label,
                    x = hazard.x,
                    y = hazard.y,
                    from = %incoming.source(),
                    "hazard learned from fleet report"
                );
            }
        }
    }

    /// A classifier verdict for one label.
    ///
    /// Hazard verdicts are staged for the summary report. A verdict for
    /// an unseen label starts a track tagged with the unverified source;
    /// a verdict for a known `benign` track upgrades it. Any other
    /// existing track keeps its class.
    fn handle_classification(&mut self, report: Hazard) {
        if report.label.is_empty() {
            warn!("classification report without a label dropped");
            return;
        }
        if report.class == HazardClass::Unclassified {
            warn!(label = %report.label, "classification report without a type dropped");
            return;
        }

        let mut report = report;
        report.source = Some(self.config.report_name.clone());

        if report.class == HazardClass::Hazard {
            self.staged.insert_if_absent(report.clone());
        }

        match self.hazards.position(&report.label) {
            None => {
                // Classification outran detection; nobody has verified
                // this position yet.
                let mut fresh = report.clone();
                fresh.source = Some(UNVERIFIED_SOURCE.to_string());
                self.hazards.insert_if_absent(fresh);
                debug!(label = %report.label, class = %report.class, "classified before detected");
            }
            Some(index) => {
                let current = self.hazards.get(index).cloned();
                if let Some(current) = current
                    && current.class == HazardClass::Benign
                {
                    let upgraded = Hazard { class: report.class, ..current };
                    self.hazards.replace(index, upgraded);
                    info!(label = %report.label, class = %report.class, "benign track reclassified");
                }
            }
        }
    }

    /// Shoreside asked for a summary: shorten both sets to the report
    /// budget and post the staged verdicts.
    fn handle_report_request(&mut self) {
        self.summary_reports += 1;

        self.hazards.shorten(self.planner.as_ref(), REPORT_TIME_BUDGET_SECS);
        self.staged.shorten(self.planner.as_ref(), REPORT_TIME_BUDGET_SECS);
        self.staged.set_source(&self.config.report_name);

        let _ = self.bus.post(Posting::HazardSetReport(self.staged.clone()));
        info!(staged = self.staged.len(), "hazard summary posted");
    }

    fn handle_mission_params(&mut self, update: MissionPenalties) {
        if let Some(v) = update.false_alarm {
            self.penalties.false_alarm = Some(v);
        }
        if let Some(v) = update.missed_hazard {
            self.penalties.missed_hazard = Some(v);
        }
        if let Some(v) = update.max_time {
            self.penalties.max_time = Some(v);
        }
        debug!(?update, "mission penalties updated");
    }

    /// Re-sort the route as a nearest-neighbor tour from the vehicle's
    /// position, adopt the sorted order, and publish it with a color
    /// hint for downstream displays.
    fn handle_route_regenerate(&mut self) {
        if self.route.is_empty() {
            debug!("route regeneration requested with no waypoints");
            return;
        }

        let sorted = self.route.regenerate_sorted(self.nav_x, self.nav_y);
        let color = match sorted.points().last() {
            Some(p) if p.x > ROUTE_ALERT_X => RouteColor::Red,
            _ => RouteColor::Yellow,
        };
        self.route = sorted.clone();

        let _ = self.bus.post(Posting::WaypointUpdate {
            name: self.config.report_name.clone(),
            route: sorted,
            color,
        });
        info!(
            waypoints = self.route.len(),
            color = color.wire_name(),
            "route re-sorted from current position"
        );
    }

    // -------------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------------

    /// Run one survey cycle: drain mail, then negotiate, relay, scrub,
    /// and prune in that order.
    pub fn tick(&mut self) {
        // ── Drain pending mail ─────────────────────────────────────────────────
        self.drain_mail();

        // ── Sensor negotiation ─────────────────────────────────────────────────
        if self.negotiation.wants_request() {
            self.negotiation.note_request();
            let _ = self.bus.post(Posting::SensorConfigRequest {
                vname: self.config.community.clone(),
                width: self.negotiation.swath_width_desired(),
                pd: self.negotiation.pd_desired(),
            });
        }
        if self.negotiation.is_confirmed() {
            self.negotiation.note_info_request();
            let _ = self.bus.post(Posting::SensorInfoRequest {
                vname: self.config.community.clone(),
            });
        }

        // ── Relay locally-new hazards ──────────────────────────────────────────
        if !self.relay_queue.is_empty() {
            self.relay_queue.set_source(&self.config.report_name);
            let dest_node = self
                .config
                .other_vehicle
                .clone()
                .unwrap_or_else(|| "all".to_string());
            let message = NodeMessage {
                src_node: self.config.report_name.clone(),
                dest_node,
                var_name: keys::HAZARDSET_OTHER.to_string(),
                string_val: codec::encode_hazard_set(&self.relay_queue),
            };
            info!(relayed = self.relay_queue.len(), "relaying new hazards to the fleet");
            let _ = self.bus.post(Posting::NodeMessage(message));
        }
        // At-most-once: the queue empties whether or not anyone heard.
        self.relay_queue.clear();

        // ── Scrub the live set ─────────────────────────────────────────────────
        self.hazards.retain(|h| h.class == HazardClass::Hazard);
        self.hazards.set_source(&self.config.report_name);

        // ── Prune the visited waypoint ─────────────────────────────────────────
        if let Some(visited) =
            self.route.prune_within(self.nav_x, self.nav_y, self.config.prune_radius)
        {
            debug!(x = visited.x, y = visited.y, "waypoint reached and removed");
        }
    }

    /// Non-blocking drain of everything waiting on the mail lane,
    /// applied in arrival order.
    fn drain_mail(&mut self) {
        loop {
            match self.mail_rx.try_recv() {
                Ok(envelope) => self.handle_mail(envelope.mail),
                Err(broadcast::error::TryRecvError::Empty) => break,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(dropped = n, "mail lane lagged; oldest mail lost");
                }
                Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }
    }

    // -------------------------------------------------------------------------
    // Status
    // -------------------------------------------------------------------------

    /// Snapshot of negotiation, counter, and container state for the
    /// periodic status log.
    pub fn report(&self) -> StatusReport {
        StatusReport {
            community: self.config.community.clone(),
            report_name: self.config.report_name.clone(),
            swath_width_desired: self.negotiation.swath_width_desired(),
            pd_desired: self.negotiation.pd_desired(),
            swath_width_granted: self.negotiation.swath_width_granted(),
            pd_granted: self.negotiation.pd_granted(),
            config_confirmed: self.negotiation.is_confirmed(),
            config_requests: self.negotiation.config_requests(),
            config_acks: self.negotiation.config_acks(),
            sensor_requests: self.negotiation.info_requests(),
            detection_reports: self.detection_reports,
            summary_reports: self.summary_reports,
            hazards_tracked: self.hazards.len(),
            queued_for_relay: self.relay_queue.len(),
            staged_for_report: self.staged.len(),
            route_length: self.route.len(),
            fleet_activity_age_secs: self.last_fleet_report.map(|t| t.elapsed().as_secs_f64()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use seaward_middleware::PostingReceiver;
    use seaward_types::Point;

    fn test_manager() -> HazardManager {
        HazardManager::new(ManagerConfig::default(), MailBus::default())
    }

    fn named_manager(community: &str, report_name: &str) -> HazardManager {
        let config = ManagerConfig {
            community: community.to_string(),
            report_name: report_name.to_string(),
            ..ManagerConfig::default()
        };
        HazardManager::new(config, MailBus::default())
    }

    fn detection(label: &str, x: f64, y: f64) -> Mail {
        Mail::Detection(DetectionReport {
            vname: "betty".to_string(),
            x,
            y,
            label: label.to_string(),
        })
    }

    fn classification(label: &str, x: f64, y: f64, class: HazardClass) -> Mail {
        Mail::HazardReport(Hazard::new(label, x, y).with_class(class))
    }

    fn ack() -> Mail {
        Mail::SensorConfigAck(SensorConfigAck {
            vname: "alpha".to_string(),
            width: 25.0,
            pd: 0.9,
            pfa: 0.53,
            pclass: 0.91,
        })
    }

    fn drain_postings(rx: &mut PostingReceiver) -> Vec<Posting> {
        let mut out = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            out.push(envelope.posting);
        }
        out
    }

    // ── Detection tests ───────────────────────────────────────────────────────

    #[test]
    fn detection_tracks_queues_and_extends_route() {
        let mut mgr = test_manager();
        mgr.handle_mail(detection("12", 51.0, 11.3));

        assert_eq!(mgr.detection_reports, 1);
        assert_eq!(mgr.hazards.len(), 1);
        let h = mgr.hazards.get(0).unwrap();
        assert_eq!(h.class, HazardClass::Hazard);
        assert_eq!(h.source.as_deref(), Some("betty"));
        assert_eq!(mgr.relay_queue.len(), 1);
        assert_eq!(mgr.route.len(), 1);
        assert_eq!(mgr.route.points()[0], Point::new(51.0, 11.3));
    }

    #[test]
    fn detection_without_label_mutates_nothing() {
        let mut mgr = test_manager();
        mgr.handle_mail(detection("", 51.0, 11.3));

        // Counted, but no container moved.
        assert_eq!(mgr.detection_reports, 1);
        assert!(mgr.hazards.is_empty());
        assert!(mgr.relay_queue.is_empty());
        assert!(mgr.route.is_empty());
    }

    #[test]
    fn first_detection_of_a_label_wins() {
        let mut mgr = test_manager();
        mgr.handle_mail(detection("05", 10.0, 20.0));
        mgr.handle_mail(detection("05", 99.0, 99.0));

        assert_eq!(mgr.detection_reports, 2);
        assert_eq!(mgr.hazards.len(), 1);
        assert_eq!(mgr.hazards.get(0).unwrap().x, 10.0);
        assert_eq!(mgr.relay_queue.len(), 1);
        assert_eq!(mgr.route.len(), 1);
    }

    #[test]
    fn classifier_role_requests_classification_of_fresh_labels() {
        let config = ManagerConfig {
            request_classification: true,
            ..ManagerConfig::default()
        };
        let mut mgr = HazardManager::new(config, MailBus::default());
        let mut rx = mgr.bus().subscribe_postings();

        mgr.handle_mail(detection("12", 51.0, 11.3));
        let postings = drain_postings(&mut rx);
        assert!(
            postings.iter().any(|p| matches!(
                p,
                Posting::ClassifyRequest { vname, label } if vname == "alpha" && label == "12"
            )),
            "expected a classify request, got: {postings:?}"
        );

        // A repeat of the same label asks nothing further.
        mgr.handle_mail(detection("12", 99.0, 99.0));
        assert!(drain_postings(&mut rx).is_empty());
    }

    #[test]
    fn surveyor_role_never_requests_classification() {
        let mut mgr = test_manager();
        let mut rx = mgr.bus().subscribe_postings();
        mgr.handle_mail(detection("12", 51.0, 11.3));
        assert!(drain_postings(&mut rx).is_empty());
    }

    // ── Remote merge tests ────────────────────────────────────────────────────

    #[test]
    fn remote_merge_adds_only_new_labels() {
        let mut mgr = test_manager();
        mgr.handle_mail(detection("01", 10.0, 10.0));

        let mut remote = HazardSet::new();
        remote.set_source("betty");
        remote.insert_if_absent(Hazard::new("01", 99.0, 99.0).with_class(HazardClass::Hazard));
        remote.insert_if_absent(Hazard::new("02", 20.0, 20.0).with_class(HazardClass::Hazard));
        mgr.handle_mail(Mail::RemoteHazardSet(remote));

        assert_eq!(mgr.hazards.len(), 2);
        // The locally-known label keeps its own coordinates.
        let idx = mgr.hazards.position("01").unwrap();
        assert_eq!(mgr.hazards.get(idx).unwrap().x, 10.0);
        // One vertex from the local detection, one from the merge.
        assert_eq!(mgr.route.len(), 2);
        assert_eq!(mgr.route.points()[1], Point::new(20.0, 20.0));
    }

    #[test]
    fn remote_merge_does_not_queue_for_re_relay() {
        let mut mgr = test_manager();
        let mut remote = HazardSet::new();
        remote.insert_if_absent(Hazard::new("31", 5.0, 5.0).with_class(HazardClass::Hazard));
        mgr.handle_mail(Mail::RemoteHazardSet(remote));

        assert_eq!(mgr.hazards.len(), 1);
        assert!(mgr.relay_queue.is_empty());
    }

    // ── Classification tests ──────────────────────────────────────────────────

    #[test]
    fn classification_for_unseen_label_is_tracked_unverified() {
        let mut mgr = test_manager();
        mgr.handle_mail(classification("21", 7.0, 8.0, HazardClass::Hazard));

        let idx = mgr.hazards.position("21").unwrap();
        assert_eq!(
            mgr.hazards.get(idx).unwrap().source.as_deref(),
            Some(UNVERIFIED_SOURCE)
        );
        // The staged copy carries our own report identity.
        let idx = mgr.staged.position("21").unwrap();
        assert_eq!(mgr.staged.get(idx).unwrap().source.as_deref(), Some("alpha"));
    }

    #[test]
    fn benign_verdicts_are_not_staged() {
        let mut mgr = test_manager();
        mgr.handle_mail(classification("22", 7.0, 8.0, HazardClass::Benign));
        assert!(mgr.staged.is_empty());
        assert!(mgr.hazards.contains("22"));
    }

    #[test]
    fn classification_upgrades_benign_tracks_only() {
        let mut mgr = test_manager();
        mgr.hazards
            .insert_if_absent(Hazard::new("30", 1.0, 2.0).with_class(HazardClass::Benign));

        mgr.handle_mail(classification("30", 7.0, 8.0, HazardClass::Hazard));
        let h = mgr.hazards.get(0).unwrap();
        assert_eq!(h.class, HazardClass::Hazard);
        // The upgrade keeps the track, not the report: position is unchanged.
        assert_eq!(h.x, 1.0);

        // A later benign verdict cannot demote a settled track.
        mgr.handle_mail(classification("30", 7.0, 8.0, HazardClass::Benign));
        assert_eq!(mgr.hazards.get(0).unwrap().class, HazardClass::Hazard);
    }

    #[test]
    fn first_hazard_verdict_per_label_is_staged() {
        let mut mgr = test_manager();
        mgr.handle_mail(classification("40", 1.0, 1.0, HazardClass::Hazard));
        mgr.handle_mail(classification("40", 9.0, 9.0, HazardClass::Hazard));

        assert_eq!(mgr.staged.len(), 1);
        assert_eq!(mgr.staged.get(0).unwrap().x, 1.0);
    }

    #[test]
    fn classification_without_label_or_type_is_dropped() {
        let mut mgr = test_manager();
        mgr.handle_mail(classification("", 1.0, 1.0, HazardClass::Hazard));
        mgr.handle_mail(classification("50", 1.0, 1.0, HazardClass::Unclassified));

        assert!(mgr.hazards.is_empty());
        assert!(mgr.staged.is_empty());
    }

    // ── Summary report tests ──────────────────────────────────────────────────

    #[test]
    fn report_request_posts_the_staged_set() {
        let mut mgr = test_manager();
        mgr.handle_mail(classification("21", 7.0, 8.0, HazardClass::Hazard));

        let mut rx = mgr.bus().subscribe_postings();
        mgr.handle_mail(Mail::HazardSetRequest);

        let postings = drain_postings(&mut rx);
        let set = postings
            .iter()
            .find_map(|p| match p {
                Posting::HazardSetReport(set) => Some(set.clone()),
                _ => None,
            })
            .expect("summary should be posted");
        assert_eq!(set.source(), "alpha");
        assert!(set.contains("21"));
        assert_eq!(mgr.summary_reports, 1);
    }

    #[test]
    fn report_request_with_nothing_staged_posts_empty_summary() {
        let mut mgr = test_manager();
        let mut rx = mgr.bus().subscribe_postings();
        mgr.handle_mail(Mail::HazardSetRequest);

        let postings = drain_postings(&mut rx);
        assert!(postings
            .iter()
            .any(|p| matches!(p, Posting::HazardSetReport(set) if set.is_empty())));
    }

    // ── Route regeneration tests ──────────────────────────────────────────────

    #[test]
    fn regenerate_adopts_the_sorted_tour_and_posts_it() {
        let mut mgr = test_manager();
        mgr.route.add_vertex(5.0, 0.0);
        mgr.route.add_vertex(1.0, 0.0);
        mgr.route.add_vertex(9.0, 9.0);

        let mut rx = mgr.bus().subscribe_postings();
        mgr.handle_mail(Mail::RouteRegenerate);

        assert_eq!(
            mgr.route.points(),
            &[
                Point::new(1.0, 0.0),
                Point::new(5.0, 0.0),
                Point::new(9.0, 9.0)
            ]
        );

        let postings = drain_postings(&mut rx);
        match postings.first() {
            Some(Posting::WaypointUpdate { name, route, color }) => {
                assert_eq!(name, "alpha");
                assert_eq!(route.points()[0], Point::new(1.0, 0.0));
                assert_eq!(*color, RouteColor::Yellow);
            }
            other => panic!("expected a waypoint update, got: {other:?}"),
        }
    }

    #[test]
    fn regenerate_colors_red_past_the_alert_easting() {
        let mut mgr = test_manager();
        mgr.route.add_vertex(90.0, 0.0);

        let mut rx = mgr.bus().subscribe_postings();
        mgr.handle_mail(Mail::RouteRegenerate);

        let postings = drain_postings(&mut rx);
        assert!(postings
            .iter()
            .any(|p| matches!(p, Posting::WaypointUpdate { color, .. } if *color == RouteColor::Red)));
    }

    #[test]
    fn regenerate_with_empty_route_posts_nothing() {
        let mut mgr = test_manager();
        let mut rx = mgr.bus().subscribe_postings();
        mgr.handle_mail(Mail::RouteRegenerate);
        assert!(drain_postings(&mut rx).is_empty());
    }

    // ── Tick tests ────────────────────────────────────────────────────────────

    #[test]
    fn tick_relays_queued_hazards_then_clears_the_queue() {
        let mut mgr = test_manager();
        let mut rx = mgr.bus().subscribe_postings();
        mgr.handle_mail(detection("12", 51.0, 11.3));

        mgr.tick();
        let postings = drain_postings(&mut rx);
        let relay = postings
            .iter()
            .find_map(|p| match p {
                Posting::NodeMessage(msg) => Some(msg.clone()),
                _ => None,
            })
            .expect("queued hazard should be relayed");
        assert_eq!(relay.src_node, "alpha");
        assert_eq!(relay.dest_node, "all");
        assert_eq!(relay.var_name, "HAZARDSET_OTHER");
        assert!(relay.string_val.contains("label=12"));
        assert!(mgr.relay_queue.is_empty());

        // Nothing new since: the next tick relays nothing.
        mgr.tick();
        let postings = drain_postings(&mut rx);
        assert!(postings.iter().all(|p| !matches!(p, Posting::NodeMessage(_))));
    }

    #[test]
    fn tick_routes_relay_to_the_configured_peer() {
        let config = ManagerConfig {
            other_vehicle: Some("BETTY".to_string()),
            ..ManagerConfig::default()
        };
        let mut mgr = HazardManager::new(config, MailBus::default());
        let mut rx = mgr.bus().subscribe_postings();
        mgr.handle_mail(detection("12", 51.0, 11.3));

        mgr.tick();
        let postings = drain_postings(&mut rx);
        assert!(postings.iter().any(|p| matches!(
            p,
            Posting::NodeMessage(msg) if msg.dest_node == "BETTY"
        )));
    }

    #[test]
    fn tick_scrubs_non_hazard_tracks_and_restamps_source() {
        let mut mgr = named_manager("alpha", "alpha_hm");
        assert_eq!(mgr.hazards.source(), "alpha");

        mgr.hazards
            .insert_if_absent(Hazard::new("01", 0.0, 0.0).with_class(HazardClass::Hazard));
        mgr.hazards
            .insert_if_absent(Hazard::new("02", 1.0, 0.0).with_class(HazardClass::Benign));
        mgr.hazards
            .insert_if_absent(Hazard::new("03", 2.0, 0.0));

        mgr.tick();
        assert_eq!(mgr.hazards.len(), 1);
        assert!(mgr.hazards.contains("01"));
        assert_eq!(mgr.hazards.source(), "alpha_hm");
    }

    #[test]
    fn tick_prunes_the_vertex_the_vehicle_reached() {
        let mut mgr = test_manager();
        mgr.route.add_vertex(3.0, 4.0);
        mgr.route.add_vertex(50.0, 50.0);

        // Vehicle at the origin: (3,4) is 5 away, inside the 10 radius.
        mgr.tick();
        assert_eq!(mgr.route.len(), 1);
        assert_eq!(mgr.route.points()[0], Point::new(50.0, 50.0));

        // The survivor is 70+ away and stays.
        mgr.tick();
        assert_eq!(mgr.route.len(), 1);
    }

    #[test]
    fn tick_respects_a_tighter_prune_radius() {
        let config = ManagerConfig {
            prune_radius: 4.0,
            ..ManagerConfig::default()
        };
        let mut mgr = HazardManager::new(config, MailBus::default());
        mgr.route.add_vertex(3.0, 4.0);

        mgr.tick();
        assert_eq!(mgr.route.len(), 1, "distance 5 must survive a radius of 4");
    }

    #[test]
    fn tick_negotiates_until_granted_then_triggers_the_sensor() {
        let mut mgr = test_manager();
        let mut rx = mgr.bus().subscribe_postings();

        mgr.tick();
        let postings = drain_postings(&mut rx);
        assert!(postings.iter().any(|p| matches!(
            p,
            Posting::SensorConfigRequest { vname, width, pd }
                if vname == "alpha" && *width == 25.0 && *pd == 0.9
        )));
        assert!(postings.iter().all(|p| !matches!(p, Posting::SensorInfoRequest { .. })));

        // Still unanswered but inside the retry window: no repeat yet.
        mgr.tick();
        let postings = drain_postings(&mut rx);
        assert!(postings.iter().all(|p| !matches!(p, Posting::SensorConfigRequest { .. })));

        // A grant flips the loop over to per-tick info requests.
        mgr.handle_mail(ack());
        mgr.tick();
        let postings = drain_postings(&mut rx);
        assert!(postings.iter().any(|p| matches!(p, Posting::SensorInfoRequest { .. })));
        assert!(postings.iter().all(|p| !matches!(p, Posting::SensorConfigRequest { .. })));
        assert_eq!(mgr.negotiation.config_requests(), 1);
        assert_eq!(mgr.negotiation.info_requests(), 1);
    }

    #[test]
    fn tick_drains_bus_mail_in_arrival_order() {
        let bus = MailBus::default();
        let mut mgr = HazardManager::new(ManagerConfig::default(), bus.clone());

        bus.publish_mail(detection("05", 10.0, 20.0)).unwrap();
        bus.publish_mail(detection("05", 99.0, 99.0)).unwrap();
        mgr.tick();

        assert_eq!(mgr.detection_reports, 2);
        assert_eq!(mgr.hazards.len(), 1);
        assert_eq!(mgr.hazards.get(0).unwrap().x, 10.0);
    }

    // ── State mail and status tests ───────────────────────────────────────────

    #[test]
    fn nav_mail_moves_the_vehicle() {
        let mut mgr = test_manager();
        mgr.handle_mail(Mail::NavX(12.5));
        mgr.handle_mail(Mail::NavY(-3.0));
        assert_eq!(mgr.nav_x, 12.5);
        assert_eq!(mgr.nav_y, -3.0);
    }

    #[test]
    fn mission_params_merge_field_wise() {
        let mut mgr = test_manager();
        mgr.handle_mail(Mail::MissionParams(MissionPenalties {
            false_alarm: Some(35.0),
            ..MissionPenalties::default()
        }));
        mgr.handle_mail(Mail::MissionParams(MissionPenalties {
            max_time: Some(2400.0),
            ..MissionPenalties::default()
        }));

        assert_eq!(mgr.penalties.false_alarm, Some(35.0));
        assert_eq!(mgr.penalties.missed_hazard, None);
        assert_eq!(mgr.penalties.max_time, Some(2400.0));
    }

    #[test]
    fn node_reports_feed_the_fleet_activity_age() {
        let mut mgr = test_manager();
        assert_eq!(mgr.report().fleet_activity_age_secs, None);

        mgr.handle_mail(Mail::NodeReport("NAME=betty,X=1,Y=2".to_string()));
        let age = mgr.report().fleet_activity_age_secs;
        assert!(age.is_some());
        assert!(age.unwrap() < 1.0);
    }

    #[test]
    fn status_report_reflects_the_survey_state() {
        let mut mgr = test_manager();
        mgr.handle_mail(detection("12", 51.0, 11.3));
        mgr.handle_mail(classification("21", 7.0, 8.0, HazardClass::Hazard));
        mgr.handle_mail(Mail::SensorOptionsSummary("width=10,exp=6".to_string()));

        let report = mgr.report();
        assert_eq!(report.community, "alpha");
        assert!(!report.config_confirmed);
        assert_eq!(report.detection_reports, 1);
        assert_eq!(report.hazards_tracked, 2);
        assert_eq!(report.queued_for_relay, 1);
        assert_eq!(report.staged_for_report, 1);
        assert_eq!(report.route_length, 1);
        assert_eq!(mgr.last_options_summary.as_deref(), Some("width=10,exp=6"));
    }
}
