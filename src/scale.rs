//! Visual encodings derived from station traffic.
//!
//! Circle radius grows with the square root of total traffic so that circle
//! area tracks volume. Flow is the departure share of a station's traffic,
//! quantized into [`FLOW_BUCKETS`].

use serde::Serialize;

use crate::model::StationTraffic;

/// Radius range used when every trip is shown.
pub const UNFILTERED_RADIUS: (f64, f64) = (0.0, 25.0);

/// Radius range used while a time filter is active.
pub const FILTERED_RADIUS: (f64, f64) = (3.0, 50.0);

/// Bucket values for the departure share: mostly arrivals, balanced, mostly departures.
pub const FLOW_BUCKETS: [f64; 3] = [0.0, 0.5, 1.0];

/// Square-root scale from `[0, max_traffic]` onto a radius range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RadiusScale {
    pub max_traffic: u64,
    pub min_radius: f64,
    pub max_radius: f64,
}

impl RadiusScale {
    pub fn new(max_traffic: u64, (min_radius, max_radius): (f64, f64)) -> Self {
        Self {
            max_traffic,
            min_radius,
            max_radius,
        }
    }

    /// Builds a scale whose domain ends at the busiest station's traffic.
    pub fn for_traffic(traffic: &[StationTraffic], filtered: bool) -> Self {
        let max_traffic = traffic.iter().map(|t| t.total_traffic).max().unwrap_or(0);
        let range = if filtered {
            FILTERED_RADIUS
        } else {
            UNFILTERED_RADIUS
        };
        Self::new(max_traffic, range)
    }

    /// Maps a traffic count to a radius. Counts beyond the domain are clamped.
    /// An empty domain maps everything to the minimum radius.
    pub fn radius(&self, total_traffic: u64) -> f64 {
        if self.max_traffic == 0 {
            return self.min_radius;
        }
        let t = (total_traffic.min(self.max_traffic) as f64 / self.max_traffic as f64).sqrt();
        self.min_radius + t * (self.max_radius - self.min_radius)
    }
}

/// Quantizes a departure share in `[0, 1]` into one of [`FLOW_BUCKETS`].
///
/// Buckets split `[0, 1]` evenly; out-of-range inputs fall into the nearest
/// end bucket and NaN into the first.
pub fn flow_bucket(ratio: f64) -> f64 {
    let n = FLOW_BUCKETS.len();
    let index = (1..n).take_while(|&i| ratio >= i as f64 / n as f64).count();
    FLOW_BUCKETS[index]
}
