use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Station, Traffic, Trip};

/// Per-station traffic for one trip set, in station-list order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    entries: Vec<(String, Traffic)>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl AggregateResult {
    /// Counts for `station_id`, or `None` if it is not part of the station set.
    pub fn get(&self, station_id: &str) -> Option<Traffic> {
        self.index.get(station_id).map(|&i| self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Traffic)> {
        self.entries.iter().map(|(id, t)| (id.as_str(), t))
    }

    pub fn max_total(&self) -> u32 {
        self.entries
            .iter()
            .map(|(_, t)| t.total_traffic)
            .max()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Joins `trips` onto `stations`, counting departures by start station and
/// arrivals by end station.
///
/// Every station appears in the result; stations without matching trips get
/// zero counts, and trips whose endpoints match no station contribute nothing.
pub fn aggregate(stations: &[Station], trips: &[Trip]) -> AggregateResult {
    let mut departures: HashMap<&str, u32> = HashMap::new();
    let mut arrivals: HashMap<&str, u32> = HashMap::new();

    for trip in trips {
        *departures.entry(trip.start_station_id.as_str()).or_default() += 1;
        *arrivals.entry(trip.end_station_id.as_str()).or_default() += 1;
    }

    let mut result = AggregateResult {
        entries: Vec::with_capacity(stations.len()),
        index: HashMap::with_capacity(stations.len()),
    };

    for station in stations {
        let id = station.id.as_str();
        let traffic = Traffic::new(
            arrivals.get(id).copied().unwrap_or(0),
            departures.get(id).copied().unwrap_or(0),
        );
        result.index.insert(station.id.clone(), result.entries.len());
        result.entries.push((station.id.clone(), traffic));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn station(id: &str) -> Station {
        Station::new(id, id, -71.0, 42.0)
    }

    fn trip(start: &str, end: &str) -> Trip {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        Trip {
            start_station_id: start.to_string(),
            end_station_id: end.to_string(),
            started_at: ts,
            ended_at: ts,
        }
    }

    #[test]
    fn test_aggregate_two_station_scenario() {
        let stations = vec![station("A"), station("B")];
        let mut trips = vec![trip("A", "B"); 3];
        trips.push(trip("B", "A"));

        let result = aggregate(&stations, &trips);

        assert_eq!(result.get("A"), Some(Traffic::new(1, 3)));
        assert_eq!(result.get("B"), Some(Traffic::new(3, 1)));
        assert_eq!(result.get("A").unwrap().total_traffic, 4);
        assert_eq!(result.get("B").unwrap().total_traffic, 4);
    }

    #[test]
    fn test_aggregate_empty_trips_yields_zeros() {
        let stations = vec![station("A"), station("B"), station("C")];
        let result = aggregate(&stations, &[]);

        assert_eq!(result.len(), 3);
        for (_, traffic) in result.iter() {
            assert_eq!(*traffic, Traffic::default());
        }
        assert_eq!(result.max_total(), 0);
    }

    #[test]
    fn test_aggregate_unmatched_endpoints_ignored() {
        let stations = vec![station("A")];
        let trips = vec![trip("A", "ZZZ"), trip("ZZZ", "YYY"), trip("YYY", "A")];

        let result = aggregate(&stations, &trips);

        assert_eq!(result.get("A"), Some(Traffic::new(1, 1)));
        assert_eq!(result.get("ZZZ"), None);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_aggregate_is_pure() {
        let stations = vec![station("A"), station("B")];
        let trips = vec![trip("A", "B"), trip("A", "A")];

        let first = aggregate(&stations, &trips);
        let second = aggregate(&stations, &trips);

        assert_eq!(first, second);
        assert_eq!(first.get("A"), Some(Traffic::new(1, 2)));
    }

    #[test]
    fn test_aggregate_preserves_station_order() {
        let stations = vec![station("C"), station("A"), station("B")];
        let result = aggregate(&stations, &[trip("A", "B")]);

        let ids: Vec<&str> = result.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
        assert_eq!(result.max_total(), 1);
    }
}
