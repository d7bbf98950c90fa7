//! [`SensorNegotiation`] – sensor handshake bookkeeping.
//!
//! The survey sensor is a shared fleet asset: before it will answer
//! detection queries for this vehicle, the vehicle must request a
//! configuration (swath width and probability of detection) and receive
//! an acknowledgment granting one. This type tracks that two-phase
//! handshake plus the counters the status report surfaces.
//!
//! A request that goes unanswered is re-issued after
//! [`CONFIG_RETRY_INTERVAL`]; a malformed ack never reaches this type
//! (it is dropped at the codec boundary), so an unanswered or garbled
//! handshake simply retries until a clean grant arrives.

use std::time::{Duration, Instant};

use seaward_types::SensorConfigAck;

/// How long to wait for an ack before re-issuing the config request.
pub const CONFIG_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Desired vs. granted sensor configuration, with request/ack counters.
#[derive(Debug, Clone)]
pub struct SensorNegotiation {
    swath_width_desired: f64,
    pd_desired: f64,
    swath_width_granted: Option<f64>,
    pd_granted: Option<f64>,
    confirmed: bool,
    config_requests: u32,
    config_acks: u32,
    info_requests: u32,
    last_request: Option<Instant>,
}

impl SensorNegotiation {
    pub fn new(swath_width_desired: f64, pd_desired: f64) -> Self {
        Self {
            swath_width_desired,
            pd_desired,
            swath_width_granted: None,
            pd_granted: None,
            confirmed: false,
            config_requests: 0,
            config_acks: 0,
            info_requests: 0,
            last_request: None,
        }
    }

    /// `true` when a config request should go out this tick: nothing has
    /// been granted yet and either no request was ever sent or the last
    /// one has aged past the retry interval.
    pub fn wants_request(&self) -> bool {
        if self.confirmed {
            return false;
        }
        match self.last_request {
            None => true,
            Some(at) => at.elapsed() >= CONFIG_RETRY_INTERVAL,
        }
    }

    /// Record that a config request was posted.
    pub fn note_request(&mut self) {
        self.last_request = Some(Instant::now());
        self.config_requests += 1;
    }

    /// Accept a granted configuration. Only structurally complete acks
    /// make it this far, so a grant always confirms the handshake.
    pub fn apply_ack(&mut self, ack: &SensorConfigAck) {
        self.swath_width_granted = Some(ack.width);
        self.pd_granted = Some(ack.pd);
        self.confirmed = true;
        self.config_acks += 1;
    }

    /// Record that a detection-trigger info request was posted.
    pub fn note_info_request(&mut self) {
        self.info_requests += 1;
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn swath_width_desired(&self) -> f64 {
        self.swath_width_desired
    }

    pub fn pd_desired(&self) -> f64 {
        self.pd_desired
    }

    pub fn swath_width_granted(&self) -> Option<f64> {
        self.swath_width_granted
    }

    pub fn pd_granted(&self) -> Option<f64> {
        self.pd_granted
    }

    pub fn config_requests(&self) -> u32 {
        self.config_requests
    }

    pub fn config_acks(&self) -> u32 {
        self.config_acks
    }

    pub fn info_requests(&self) -> u32 {
        self.info_requests
    }
}
