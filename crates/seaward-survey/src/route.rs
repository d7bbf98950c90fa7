//! [`WaypointRoute`] – incremental visit route over detected hazards.
//!
//! The route grows by one vertex per fresh detection, is re-sorted into a
//! greedy nearest-neighbor tour on demand, and loses its nearest vertex
//! whenever the vehicle passes close enough to count it as visited.

use seaward_types::{Point, format_compact};

/// Ordered open polyline of visit points.
///
/// # Example
///
/// ```
/// use seaward_survey::WaypointRoute;
///
/// let mut route = WaypointRoute::new();
/// route.add_vertex(5.0, 0.0);
/// route.add_vertex(1.0, 0.0);
/// let sorted = route.regenerate_sorted(0.0, 0.0);
/// assert_eq!(sorted.to_spec(), "pts={1,0:5,0}");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointRoute {
    points: Vec<Point>,
}

impl WaypointRoute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, x: f64, y: f64) {
        self.points.push(Point::new(x, y));
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Index of the vertex nearest to `(x, y)` by Euclidean distance.
    ///
    /// Ties resolve to the lowest index. `None` on an empty route.
    pub fn closest_vertex(&self, x: f64, y: f64) -> Option<usize> {
        let probe = Point::new(x, y);
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in self.points.iter().enumerate() {
            let d = p.distance_to(&probe);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((i, d)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Remove and return the vertex at `index`, shifting the tail left.
    pub fn delete_vertex(&mut self, index: usize) -> Option<Point> {
        if index < self.points.len() {
            Some(self.points.remove(index))
        } else {
            None
        }
    }

    /// Remove the vertex nearest to `(x, y)` when it lies strictly within
    /// `radius`. Returns the removed point, `None` when nothing was close
    /// enough.
    pub fn prune_within(&mut self, x: f64, y: f64, radius: f64) -> Option<Point> {
        let idx = self.closest_vertex(x, y)?;
        let probe = Point::new(x, y);
        if self.points[idx].distance_to(&probe) < radius {
            Some(self.points.remove(idx))
        } else {
            None
        }
    }

    /// Rebuild the route as a greedy nearest-neighbor tour anchored at
    /// `(start_x, start_y)`. O(n²), fine at survey scale. Ties at each
    /// hop resolve to the earliest remaining vertex.
    pub fn regenerate_sorted(&self, start_x: f64, start_y: f64) -> WaypointRoute {
        let mut remaining = self.points.clone();
        let mut ordered = Vec::with_capacity(remaining.len());
        let mut cursor = Point::new(start_x, start_y);
        while !remaining.is_empty() {
            let mut best = 0usize;
            let mut best_d = remaining[0].distance_to(&cursor);
            for (i, p) in remaining.iter().enumerate().skip(1) {
                let d = p.distance_to(&cursor);
                if d < best_d {
                    best = i;
                    best_d = d;
                }
            }
            cursor = remaining.remove(best);
            ordered.push(cursor);
        }
        WaypointRoute { points: ordered }
    }

    /// Wire form of the polyline: `pts={x,y:x,y:…}`.
    pub fn to_spec(&self) -> String {
        let body: Vec<String> = self
            .points
            .iter()
            .map(|p| format!("{},{}", format_compact(p.x, 2), format_compact(p.y, 2)))
            .collect();
        format!("pts={{{}}}", body.join(":"))
    }
}
