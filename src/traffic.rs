use std::collections::HashMap;

use crate::model::{Station, StationTraffic, Trip};

/// Counts trips per key, e.g. departures per start station.
pub fn rollup<'a, I, F>(trips: I, key: F) -> HashMap<&'a str, u64>
where
    I: IntoIterator<Item = &'a Trip>,
    F: Fn(&'a Trip) -> &'a str,
{
    let mut counts = HashMap::new();
    for trip in trips {
        *counts.entry(key(trip)).or_insert(0) += 1;
    }
    counts
}

/// Computes arrivals, departures and total traffic for every station.
///
/// The output has one entry per input station, in input order. Counters are
/// rebuilt from `trips` on every call. Trips naming an unknown station are
/// ignored.
pub fn compute_station_traffic<'a, I>(stations: &[Station], trips: I) -> Vec<StationTraffic>
where
    I: IntoIterator<Item = &'a Trip>,
    I::IntoIter: Clone,
{
    let trips = trips.into_iter();
    let departures = rollup(trips.clone(), |t| t.start_station_id.as_str());
    let arrivals = rollup(trips, |t| t.end_station_id.as_str());

    stations
        .iter()
        .map(|station| {
            let arrivals = arrivals.get(station.code.as_str()).copied().unwrap_or(0);
            let departures = departures.get(station.code.as_str()).copied().unwrap_or(0);
            StationTraffic {
                station: station.clone(),
                arrivals,
                departures,
                total_traffic: arrivals + departures,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn trip(start: &str, end: &str) -> Trip {
        Trip::new(start, end, noon(), noon())
    }

    fn stations(codes: &[&str]) -> Vec<Station> {
        codes
            .iter()
            .map(|code| Station::new(code, -71.0, 42.0))
            .collect()
    }

    #[test]
    fn test_counts_departures_and_arrivals() {
        let trips = vec![trip("A", "B"), trip("A", "A")];
        let traffic = compute_station_traffic(&stations(&["A", "B"]), &trips);

        assert_eq!(traffic.len(), 2);
        assert_eq!(traffic[0].code(), "A");
        assert_eq!(traffic[0].departures, 2);
        assert_eq!(traffic[0].arrivals, 1);
        assert_eq!(traffic[0].total_traffic, 3);
        assert_eq!(traffic[1].code(), "B");
        assert_eq!(traffic[1].departures, 0);
        assert_eq!(traffic[1].arrivals, 1);
        assert_eq!(traffic[1].total_traffic, 1);
    }

    #[test]
    fn test_station_without_trips_is_zeroed() {
        let trips = vec![trip("A", "B")];
        let traffic = compute_station_traffic(&stations(&["C"]), &trips);

        assert_eq!(traffic[0].arrivals, 0);
        assert_eq!(traffic[0].departures, 0);
        assert_eq!(traffic[0].total_traffic, 0);
        assert_eq!(traffic[0].departure_ratio(), 0.0);
    }

    #[test]
    fn test_unknown_stations_are_ignored() {
        let trips = vec![trip("X", "Y"), trip("A", "Z")];
        let traffic = compute_station_traffic(&stations(&["A", "B"]), &trips);

        assert_eq!(traffic.len(), 2);
        assert_eq!(traffic[0].total_traffic, 1);
        assert_eq!(traffic[1].total_traffic, 0);
    }

    #[test]
    fn test_preserves_station_order_and_cardinality() {
        let input = stations(&["C", "A", "B", "A2"]);
        let trips = vec![trip("A", "C"), trip("B", "A2")];
        let traffic = compute_station_traffic(&input, &trips);

        let codes: Vec<&str> = traffic.iter().map(|t| t.code()).collect();
        assert_eq!(codes, vec!["C", "A", "B", "A2"]);
        for t in &traffic {
            assert_eq!(t.total_traffic, t.arrivals + t.departures);
        }
    }

    #[test]
    fn test_recomputes_instead_of_accumulating() {
        let input = stations(&["A", "B"]);
        let trips = vec![trip("A", "B"), trip("B", "A"), trip("A", "A")];

        let first = compute_station_traffic(&input, &trips);
        let annotated: Vec<Station> = first.iter().map(|t| t.station.clone()).collect();
        let second = compute_station_traffic(&annotated, &trips);
        assert_eq!(first, second);

        let fewer = compute_station_traffic(&input, &trips[..1]);
        assert_eq!(fewer[0].total_traffic, 1);
        assert_eq!(fewer[1].total_traffic, 1);
    }

    #[test]
    fn test_accepts_filtered_references() {
        let trips = vec![trip("A", "B"), trip("B", "B")];
        let subset: Vec<&Trip> = trips.iter().filter(|t| t.start_station_id == "B").collect();
        let traffic = compute_station_traffic(&stations(&["A", "B"]), subset.iter().copied());

        assert_eq!(traffic[0].total_traffic, 0);
        assert_eq!(traffic[1].arrivals, 1);
        assert_eq!(traffic[1].departures, 1);
    }

    #[test]
    fn test_rollup_counts_keys() {
        let trips = vec![trip("A", "B"), trip("A", "C"), trip("B", "C")];
        let counts = rollup(&trips, |t| t.start_station_id.as_str());

        assert_eq!(counts.get("A"), Some(&2));
        assert_eq!(counts.get("B"), Some(&1));
        assert_eq!(counts.get("C"), None);
    }
}
