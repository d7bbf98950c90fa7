//! [`HazardSet`] – ordered, label-unique hazard collection.
//!
//! Every path that could add a hazard goes through
//! [`HazardSet::insert_if_absent`]; there is deliberately no other way in.
//! That single gate enforces the two invariants the rest of the system
//! leans on: labels are unique within a set, and no stored hazard has an
//! empty label.

use seaward_types::{Hazard, Polygon};
use tracing::debug;

use crate::min_path::MinPathPlanner;

// ────────────────────────────────────────────────────────────────────────────
// HazardSet
// ────────────────────────────────────────────────────────────────────────────

/// Ordered collection of [`Hazard`]s unique by label, plus the set-level
/// metadata (source, name, region) that travels with it on the wire.
///
/// # Example
///
/// ```
/// use seaward_survey::HazardSet;
/// use seaward_types::Hazard;
///
/// let mut set = HazardSet::new();
/// assert!(set.insert_if_absent(Hazard::new("01", 10.0, -20.0)));
/// assert!(!set.insert_if_absent(Hazard::new("01", 99.0, 99.0)));
/// assert_eq!(set.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HazardSet {
    hazards: Vec<Hazard>,
    source: String,
    name: String,
    region: Option<Polygon>,
}

impl HazardSet {
    /// Create an empty set with no metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `hazard` unless its label is empty or already present.
    ///
    /// Returns `true` when the hazard was actually stored. Duplicate
    /// labels are ignored outright; whoever got a label in first keeps
    /// its position and classification.
    pub fn insert_if_absent(&mut self, hazard: Hazard) -> bool {
        if hazard.label.is_empty() {
            debug!("refusing hazard with empty label");
            return false;
        }
        if self.contains(&hazard.label) {
            return false;
        }
        self.hazards.push(hazard);
        true
    }

    pub fn contains(&self, label: &str) -> bool {
        self.hazards.iter().any(|h| h.label == label)
    }

    /// Index of the hazard carrying `label`, if present.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.hazards.iter().position(|h| h.label == label)
    }

    pub fn get(&self, index: usize) -> Option<&Hazard> {
        self.hazards.get(index)
    }

    /// Replace the hazard at `index` wholesale.
    ///
    /// The replacement must carry the same label, otherwise the set is
    /// left untouched and `false` is returned. Label-preserving
    /// replacement keeps the uniqueness invariant without re-scanning.
    pub fn replace(&mut self, index: usize, hazard: Hazard) -> bool {
        match self.hazards.get_mut(index) {
            Some(slot) if slot.label == hazard.label => {
                *slot = hazard;
                true
            }
            _ => false,
        }
    }

    /// Drop every hazard failing the predicate, preserving order.
    pub fn retain<F: FnMut(&Hazard) -> bool>(&mut self, f: F) {
        self.hazards.retain(f);
    }

    /// Remove all hazards. Set-level metadata is kept.
    pub fn clear(&mut self) {
        self.hazards.clear();
    }

    pub fn len(&self) -> usize {
        self.hazards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hazards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hazard> {
        self.hazards.iter()
    }

    pub fn hazards(&self) -> &[Hazard] {
        &self.hazards
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn set_source(&mut self, source: &str) {
        self.source = source.to_string();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn region(&self) -> Option<&Polygon> {
        self.region.as_ref()
    }

    pub fn set_region(&mut self, region: Polygon) {
        self.region = Some(region);
    }

    /// Reorder and truncate the set to the planner's visiting order under
    /// `time_budget` seconds of transit.
    pub fn shorten(&mut self, planner: &dyn MinPathPlanner, time_budget: f64) {
        self.hazards = planner.plan(&self.hazards, time_budget);
    }
}
