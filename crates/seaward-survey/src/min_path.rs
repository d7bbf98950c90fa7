//! [`MinPathPlanner`] – report-shortening strategy.
//!
//! Before a hazard set leaves the vehicle it is cut down to what a
//! surveyor could plausibly visit in the remaining mission time. The
//! planner is a seam: the default greedy tour serves scoring runs, and a
//! trial can swap in something smarter without touching the manager.

use seaward_types::Hazard;

// ────────────────────────────────────────────────────────────────────────────
// MinPathPlanner trait
// ────────────────────────────────────────────────────────────────────────────

/// Visiting-order strategy over a slice of hazards.
pub trait MinPathPlanner: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Return the hazards to keep, in visiting order, such that transit
    /// along the returned chain fits `time_budget` seconds.
    fn plan(&self, hazards: &[Hazard], time_budget: f64) -> Vec<Hazard>;
}

// ────────────────────────────────────────────────────────────────────────────
// GreedyTourPlanner
// ────────────────────────────────────────────────────────────────────────────

const DEFAULT_TRANSIT_SPEED: f64 = 2.0; // m/s, typical survey speed

/// Greedy nearest-neighbor tour anchored at the centroid of the input.
///
/// The first kept hazard is the one nearest the centroid; each further
/// hop takes the nearest remaining hazard until the accumulated transit
/// time would exceed the budget. The first hazard is always kept, so the
/// budget only gates the hops after it.
pub struct GreedyTourPlanner {
    /// Assumed transit speed in meters per second.
    pub transit_speed: f64,
}

impl Default for GreedyTourPlanner {
    fn default() -> Self {
        Self {
            transit_speed: DEFAULT_TRANSIT_SPEED,
        }
    }
}

impl MinPathPlanner for GreedyTourPlanner {
    fn name(&self) -> &str {
        "greedy_tour"
    }

    fn plan(&self, hazards: &[Hazard], time_budget: f64) -> Vec<Hazard> {
        if hazards.is_empty() {
            return Vec::new();
        }
        let n = hazards.len() as f64;
        let cx = hazards.iter().map(|h| h.x).sum::<f64>() / n;
        let cy = hazards.iter().map(|h| h.y).sum::<f64>() / n;

        let mut remaining: Vec<Hazard> = hazards.to_vec();
        let mut ordered = Vec::with_capacity(remaining.len());

        let first = nearest(&remaining, cx, cy);
        let picked = remaining.remove(first);
        let (mut px, mut py) = (picked.x, picked.y);
        ordered.push(picked);

        let mut spent = 0.0f64;
        while !remaining.is_empty() {
            let idx = nearest(&remaining, px, py);
            let hop = remaining[idx].distance_to(px, py) / self.transit_speed;
            if spent + hop > time_budget {
                break;
            }
            spent += hop;
            let picked = remaining.remove(idx);
            (px, py) = (picked.x, picked.y);
            ordered.push(picked);
        }
        ordered
    }
}

/// Index of the hazard nearest to `(x, y)`, ties to the lowest index.
fn nearest(hazards: &[Hazard], x: f64, y: f64) -> usize {
    let mut best = 0usize;
    let mut best_d = hazards[0].distance_to(x, y);
    for (i, h) in hazards.iter().enumerate().skip(1) {
        let d = h.distance_to(x, y);
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}
