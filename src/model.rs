//! Station and trip records shared by the loaders and the traffic pipeline.

use chrono::NaiveDateTime;
use serde::Serialize;

/// A bike-share dock location. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub code: String,
    pub name: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
}

impl Station {
    pub fn new(code: &str, longitude: f64, latitude: f64) -> Self {
        Self {
            code: code.to_string(),
            name: None,
            longitude,
            latitude,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

/// A single rental, from undocking at one station to docking at another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trip {
    pub ride_id: Option<String>,
    pub rideable_type: Option<String>,
    pub start_station_id: String,
    pub end_station_id: String,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub member_casual: Option<String>,
}

impl Trip {
    pub fn new(
        start_station_id: &str,
        end_station_id: &str,
        started_at: NaiveDateTime,
        ended_at: NaiveDateTime,
    ) -> Self {
        Self {
            ride_id: None,
            rideable_type: None,
            start_station_id: start_station_id.to_string(),
            end_station_id: end_station_id.to_string(),
            started_at,
            ended_at,
            member_casual: None,
        }
    }
}

/// Per-station counters produced by one aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationTraffic {
    pub station: Station,
    pub arrivals: u64,
    pub departures: u64,
    pub total_traffic: u64,
}

impl StationTraffic {
    pub fn code(&self) -> &str {
        &self.station.code
    }

    /// Share of this station's traffic that departs from it, `0.0` for idle stations.
    pub fn departure_ratio(&self) -> f64 {
        if self.total_traffic == 0 {
            0.0
        } else {
            self.departures as f64 / self.total_traffic as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traffic(arrivals: u64, departures: u64) -> StationTraffic {
        StationTraffic {
            station: Station::new("A32000", -71.09, 42.36),
            arrivals,
            departures,
            total_traffic: arrivals + departures,
        }
    }

    #[test]
    fn test_departure_ratio_idle_station_is_zero() {
        let ratio = traffic(0, 0).departure_ratio();
        assert_eq!(ratio, 0.0);
        assert!(!ratio.is_nan());
    }

    #[test]
    fn test_departure_ratio() {
        assert_eq!(traffic(1, 3).departure_ratio(), 0.75);
        assert_eq!(traffic(4, 0).departure_ratio(), 0.0);
    }

    #[test]
    fn test_station_with_name() {
        let station = Station::new("A32000", -71.09, 42.36).with_name("MIT at Mass Ave");
        assert_eq!(station.name.as_deref(), Some("MIT at Mass Ave"));
        assert_eq!(station.code, "A32000");
    }
}
