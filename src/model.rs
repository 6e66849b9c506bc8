//! Data types shared by the aggregation pipeline.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A bike-share dock, identified by its `short_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    #[serde(rename = "short_name")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub lon: f64,
    pub lat: f64,
}

impl Station {
    pub fn new(id: &str, name: &str, lon: f64, lat: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            lon,
            lat,
        }
    }
}

/// A trip row as it appears in the trip log, before timestamps are parsed.
///
/// Extra columns (`ride_id`, `rideable_type`, `member_casual`, ...) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTrip {
    #[serde(default)]
    pub start_station_id: String,
    #[serde(default)]
    pub end_station_id: String,
    #[serde(default)]
    pub started_at: String,
    #[serde(default)]
    pub ended_at: String,
}

/// A normalized rental event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub start_station_id: String,
    pub end_station_id: String,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
}

/// Derived per-station counts under the current filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Traffic {
    pub arrivals: u32,
    pub departures: u32,
    pub total_traffic: u32,
}

impl Traffic {
    pub fn new(arrivals: u32, departures: u32) -> Self {
        Self {
            arrivals,
            departures,
            total_traffic: arrivals + departures,
        }
    }
}

/// Screen-space position in pixels, origin at the viewport's top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// Visual attributes for one station marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub radius: f64,
    pub flow_ratio: f64,
}
