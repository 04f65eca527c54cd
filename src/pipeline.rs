//! Filter → aggregate → scale, bundled behind an explicit context.

use serde::Serialize;
use tracing::debug;

use crate::filter::{TimeFilter, filter_trips_by_time};
use crate::model::{Station, StationTraffic, Trip};
use crate::scale::{RadiusScale, flow_bucket};
use crate::traffic::compute_station_traffic;

/// Loaded stations and trips for one session.
#[derive(Debug, Clone, Default)]
pub struct TrafficContext {
    stations: Vec<Station>,
    trips: Vec<Trip>,
}

/// A station as drawn on the map: counters plus the encodings derived from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationView {
    pub code: String,
    pub name: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
    pub arrivals: u64,
    pub departures: u64,
    pub total_traffic: u64,
    pub radius: f64,
    pub departure_ratio: f64,
    pub flow: f64,
}

impl StationView {
    fn new(traffic: StationTraffic, scale: &RadiusScale) -> Self {
        let departure_ratio = traffic.departure_ratio();
        Self {
            radius: scale.radius(traffic.total_traffic),
            flow: flow_bucket(departure_ratio),
            departure_ratio,
            arrivals: traffic.arrivals,
            departures: traffic.departures,
            total_traffic: traffic.total_traffic,
            code: traffic.station.code,
            name: traffic.station.name,
            longitude: traffic.station.longitude,
            latitude: traffic.station.latitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficView {
    /// Raw slider value, `-1` for no filter.
    pub time_filter: i32,
    pub label: String,
    pub trip_count: usize,
    pub scale: RadiusScale,
    pub stations: Vec<StationView>,
}

impl TrafficView {
    /// Station with the most traffic; the earliest one wins ties.
    pub fn busiest(&self) -> Option<&StationView> {
        self.stations
            .iter()
            .reduce(|best, s| if s.total_traffic > best.total_traffic { s } else { best })
    }

    /// Number of stations with at least one arrival or departure.
    pub fn active_stations(&self) -> usize {
        self.stations.iter().filter(|s| s.total_traffic > 0).count()
    }
}

impl TrafficContext {
    pub fn new(stations: Vec<Station>, trips: Vec<Trip>) -> Self {
        Self { stations, trips }
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    /// Runs the pipeline for one slider position.
    pub fn view(&self, time_filter: TimeFilter) -> TrafficView {
        let trips = filter_trips_by_time(&self.trips, time_filter);
        let traffic = compute_station_traffic(&self.stations, trips.iter().copied());
        let scale = RadiusScale::for_traffic(&traffic, time_filter.is_active());

        debug!(
            time_filter = time_filter.as_minutes(),
            trips = trips.len(),
            max_traffic = scale.max_traffic,
            "Computed traffic view"
        );

        TrafficView {
            time_filter: time_filter.as_minutes(),
            label: time_filter.to_string(),
            trip_count: trips.len(),
            scale,
            stations: traffic
                .into_iter()
                .map(|t| StationView::new(t, &scale))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn context() -> TrafficContext {
        let stations = vec![
            Station::new("A", -71.09, 42.36),
            Station::new("B", -71.10, 42.37),
            Station::new("C", -71.11, 42.38),
        ];
        let trips = vec![
            Trip::new("A", "B", at(8, 0), at(8, 20)),
            Trip::new("A", "A", at(8, 30), at(8, 45)),
            Trip::new("B", "A", at(17, 0), at(17, 30)),
            Trip::new("Z", "B", at(17, 10), at(17, 40)),
        ];
        TrafficContext::new(stations, trips)
    }

    #[test]
    fn test_unfiltered_view() {
        let view = context().view(TimeFilter::Any);

        assert_eq!(view.time_filter, -1);
        assert_eq!(view.label, "any time");
        assert_eq!(view.trip_count, 4);
        assert_eq!(view.scale.max_traffic, 4);
        assert_eq!(view.scale.max_radius, 25.0);

        let a = &view.stations[0];
        assert_eq!((a.arrivals, a.departures, a.total_traffic), (2, 2, 4));
        assert_eq!(a.radius, 25.0);
        assert_eq!(a.flow, 0.5);

        let c = &view.stations[2];
        assert_eq!(c.total_traffic, 0);
        assert_eq!(c.radius, 0.0);
        assert_eq!(c.departure_ratio, 0.0);
        assert_eq!(c.flow, 0.0);
    }

    #[test]
    fn test_filtered_view() {
        let view = context().view(TimeFilter::At(8 * 60));

        assert_eq!(view.label, "8:00 AM");
        assert_eq!(view.trip_count, 2);
        assert_eq!(view.scale.min_radius, 3.0);

        let a = &view.stations[0];
        assert_eq!((a.arrivals, a.departures), (1, 2));
        assert_eq!(a.flow, 1.0);
        assert_eq!(view.stations[2].radius, 3.0);
    }

    #[test]
    fn test_views_do_not_leak_between_calls() {
        let ctx = context();
        let evening = ctx.view(TimeFilter::At(17 * 60));
        let all = ctx.view(TimeFilter::Any);
        let evening_again = ctx.view(TimeFilter::At(17 * 60));

        assert_eq!(evening, evening_again);
        assert_eq!(all.stations[1].total_traffic, 3);
        assert_eq!(evening.stations[1].total_traffic, 2);
    }

    #[test]
    fn test_busiest_and_active() {
        let ctx = context();
        let view = ctx.view(TimeFilter::Any);
        assert_eq!(view.busiest().map(|s| s.code.as_str()), Some("A"));
        assert_eq!(view.active_stations(), 2);

        let empty = TrafficContext::new(vec![], ctx.trips().to_vec()).view(TimeFilter::Any);
        assert!(empty.busiest().is_none());
    }

    #[test]
    fn test_busiest_tie_prefers_first() {
        let stations = vec![Station::new("X", 0.0, 0.0), Station::new("Y", 0.0, 0.0)];
        let trips = vec![Trip::new("X", "Y", at(9, 0), at(9, 10))];
        let view = TrafficContext::new(stations, trips).view(TimeFilter::Any);
        assert_eq!(view.busiest().map(|s| s.code.as_str()), Some("X"));
    }
}
