//! Time-of-day filtering of trips.
//!
//! A trip matches a filter minute `f` when its start or its end falls within
//! [`WINDOW_MINUTES`] of `f`. Minutes are counted from midnight and the window
//! does not wrap: a filter at 00:10 does not match a trip at 23:50.

use std::fmt;

use chrono::{NaiveDateTime, Timelike};

use crate::error::{Result, TrafficError};
use crate::model::Trip;

/// Half-width of the matching window, in minutes.
pub const WINDOW_MINUTES: i32 = 60;

/// Slider value meaning "any time".
pub const ANY_TIME: i32 = -1;

pub const LAST_MINUTE: u16 = 24 * 60 - 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeFilter {
    #[default]
    Any,
    /// Minute of day in `0..=1439`.
    Minute(u16),
}

impl TimeFilter {
    /// Interprets a slider value: `-1` is [`TimeFilter::Any`], `0..=1439` a minute.
    pub fn from_slider(value: i32) -> Result<Self> {
        match value {
            ANY_TIME => Ok(TimeFilter::Any),
            v if (0..=LAST_MINUTE as i32).contains(&v) => Ok(TimeFilter::Minute(v as u16)),
            v => Err(TrafficError::InvalidFilter(v)),
        }
    }

    pub fn slider_value(self) -> i32 {
        match self {
            TimeFilter::Any => ANY_TIME,
            TimeFilter::Minute(m) => m as i32,
        }
    }

    pub fn is_filtered(self) -> bool {
        matches!(self, TimeFilter::Minute(_))
    }

    /// Whether a single trip passes this filter.
    pub fn matches(self, trip: &Trip) -> bool {
        match self {
            TimeFilter::Any => true,
            TimeFilter::Minute(m) => {
                let m = m as i32;
                (minutes_since_midnight(&trip.started_at) - m).abs() <= WINDOW_MINUTES
                    || (minutes_since_midnight(&trip.ended_at) - m).abs() <= WINDOW_MINUTES
            }
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeFilter::Any => write!(f, "any time"),
            TimeFilter::Minute(m) => write!(f, "{:02}:{:02}", m / 60, m % 60),
        }
    }
}

/// Hour * 60 + minute, ignoring date and seconds.
pub fn minutes_since_midnight(ts: &NaiveDateTime) -> i32 {
    (ts.hour() * 60 + ts.minute()) as i32
}

/// Returns the trips passing `filter`, in their original order.
pub fn filter_by_time(trips: &[Trip], filter: TimeFilter) -> Vec<Trip> {
    match filter {
        TimeFilter::Any => trips.to_vec(),
        TimeFilter::Minute(_) => trips.iter().filter(|t| filter.matches(t)).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 30)
            .unwrap()
    }

    fn trip(id: &str, start: (u32, u32), end: (u32, u32)) -> Trip {
        Trip {
            start_station_id: id.to_string(),
            end_station_id: id.to_string(),
            started_at: at(start.0, start.1),
            ended_at: at(end.0, end.1),
        }
    }

    #[test]
    fn test_from_slider() {
        assert_eq!(TimeFilter::from_slider(-1).unwrap(), TimeFilter::Any);
        assert_eq!(TimeFilter::from_slider(0).unwrap(), TimeFilter::Minute(0));
        assert_eq!(TimeFilter::from_slider(1439).unwrap(), TimeFilter::Minute(1439));
        assert!(matches!(
            TimeFilter::from_slider(1440),
            Err(TrafficError::InvalidFilter(1440))
        ));
        assert!(TimeFilter::from_slider(-2).is_err());
    }

    #[test]
    fn test_slider_value_round_trip() {
        for v in [-1, 0, 480, 1439] {
            assert_eq!(TimeFilter::from_slider(v).unwrap().slider_value(), v);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(TimeFilter::Any.to_string(), "any time");
        assert_eq!(TimeFilter::Minute(485).to_string(), "08:05");
    }

    #[test]
    fn test_minutes_since_midnight_ignores_seconds() {
        assert_eq!(minutes_since_midnight(&at(8, 45)), 525);
        assert_eq!(minutes_since_midnight(&at(0, 0)), 0);
    }

    #[test]
    fn test_unfiltered_is_identity() {
        let trips = vec![trip("A", (1, 0), (1, 10)), trip("B", (13, 0), (14, 0))];
        assert_eq!(filter_by_time(&trips, TimeFilter::Any), trips);
    }

    #[test]
    fn test_window_around_filter() {
        let t = trip("A", (8, 0), (8, 45));

        assert_eq!(filter_by_time(&[t.clone()], TimeFilter::Minute(480)).len(), 1);
        // 10:00: start is 120 away, end is 75 away
        assert!(filter_by_time(&[t], TimeFilter::Minute(600)).is_empty());
    }

    #[test]
    fn test_either_endpoint_matches() {
        let long_ride = trip("A", (6, 0), (9, 30));

        // only the end is near 10:00
        assert!(TimeFilter::Minute(600).matches(&long_ride));
        // only the start is near 05:00
        assert!(TimeFilter::Minute(300).matches(&long_ride));
        // neither endpoint is near 07:45
        assert!(!TimeFilter::Minute(465).matches(&long_ride));
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let t = trip("A", (9, 0), (9, 0));
        assert!(TimeFilter::Minute(480).matches(&t));
        assert!(TimeFilter::Minute(600).matches(&t));
        assert!(!TimeFilter::Minute(479).matches(&t));
        assert!(!TimeFilter::Minute(601).matches(&t));
    }

    #[test]
    fn test_no_wrap_across_midnight() {
        let late = trip("A", (23, 50), (23, 55));
        assert!(!TimeFilter::Minute(10).matches(&late));
        assert!(TimeFilter::Minute(1439).matches(&late));
    }

    #[test]
    fn test_filter_preserves_order() {
        let trips = vec![
            trip("A", (8, 0), (8, 5)),
            trip("B", (15, 0), (15, 5)),
            trip("C", (8, 30), (8, 40)),
        ];
        let kept = filter_by_time(&trips, TimeFilter::Minute(500));

        let ids: Vec<&str> = kept.iter().map(|t| t.start_station_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
        assert_eq!(trips.len(), 3);
    }
}
