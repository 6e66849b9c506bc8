//! Parsers for the station list (JSON) and trip log (CSV, optionally gzipped).

use std::collections::HashSet;
use std::io::Read;

use chrono::{DateTime, NaiveDateTime};
use flate2::read::GzDecoder;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Result, TrafficError};
use crate::model::{RawTrip, Station, Trip};

/// Timestamp layouts seen in bike-share trip exports, tried in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Only the first few bad rows are logged individually.
const MAX_LOGGED_SKIPS: usize = 5;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Columns a trip log must carry; any others are ignored.
pub const REQUIRED_COLUMNS: [&str; 4] = [
    "start_station_id",
    "end_station_id",
    "started_at",
    "ended_at",
];

/// Result of normalizing a trip log.
#[derive(Debug, Default)]
pub struct TripBatch {
    pub trips: Vec<Trip>,
    /// Rows excluded because they could not be decoded or had bad timestamps.
    pub skipped: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StationDocument {
    Envelope { data: StationList },
    Bare(Vec<Station>),
}

#[derive(Deserialize)]
struct StationList {
    stations: Vec<Station>,
}

/// Parses a timestamp into wall-clock time. Offsets are dropped, keeping local time.
///
/// # Errors
///
/// Returns [`TrafficError::Timestamp`] if no known layout matches.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    for format in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(ts);
        }
    }
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.naive_local())
        .map_err(|_| TrafficError::Timestamp {
            value: value.to_string(),
        })
}

/// Converts one raw row into a [`Trip`].
pub fn normalize_trip(raw: RawTrip) -> Result<Trip> {
    if raw.started_at.trim().is_empty() {
        return Err(TrafficError::MissingField("started_at"));
    }
    if raw.ended_at.trim().is_empty() {
        return Err(TrafficError::MissingField("ended_at"));
    }
    Ok(Trip {
        started_at: parse_timestamp(&raw.started_at)?,
        ended_at: parse_timestamp(&raw.ended_at)?,
        start_station_id: raw.start_station_id.trim().to_string(),
        end_station_id: raw.end_station_id.trim().to_string(),
    })
}

/// Reads a comma-delimited trip log.
///
/// Rows that fail to decode or normalize are skipped and counted.
///
/// # Errors
///
/// The whole log is rejected when the underlying reader fails (e.g. a corrupt
/// gzip stream), when the header lacks one of [`REQUIRED_COLUMNS`], or when
/// rows were present but none of them could be used.
pub fn read_trips<R: Read>(reader: R) -> Result<TripBatch> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h.trim() == column) {
            return Err(TrafficError::MissingField(column));
        }
    }

    let mut batch = TripBatch::default();
    for (index, result) in rdr.deserialize::<RawTrip>().enumerate() {
        // +2: one for the header row, one for 1-based line numbers
        let line = index + 2;
        let row = match result {
            Err(e) if e.is_io_error() => return Err(e.into()),
            other => other.map_err(TrafficError::from).and_then(normalize_trip),
        };
        match row {
            Ok(trip) => batch.trips.push(trip),
            Err(e) => {
                if batch.skipped < MAX_LOGGED_SKIPS {
                    warn!(line, error = %e, "Skipping trip row");
                }
                batch.skipped += 1;
            }
        }
    }

    if batch.trips.is_empty() && batch.skipped > 0 {
        return Err(TrafficError::NoUsableRows {
            skipped: batch.skipped,
        });
    }

    debug!(
        trips = batch.trips.len(),
        skipped = batch.skipped,
        "Trip log normalized"
    );
    Ok(batch)
}

/// Reads a trip log from raw bytes, decompressing gzip input when detected.
pub fn read_trip_bytes(bytes: &[u8]) -> Result<TripBatch> {
    if bytes.starts_with(&GZIP_MAGIC) {
        read_trips(GzDecoder::new(bytes))
    } else {
        read_trips(bytes)
    }
}

/// Parses the station dataset.
///
/// Accepts a bare array of station objects or a `{"data": {"stations": [...]}}`
/// envelope. Duplicate `short_name`s keep their first occurrence.
///
/// # Errors
///
/// Returns an error if the bytes are not a JSON document of either shape.
pub fn read_stations(bytes: &[u8]) -> Result<Vec<Station>> {
    let stations = match serde_json::from_slice::<StationDocument>(bytes)? {
        StationDocument::Envelope { data } => data.stations,
        StationDocument::Bare(stations) => stations,
    };

    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(stations.len());
    for mut station in stations {
        station.id = station.id.trim().to_string();
        if !seen.insert(station.id.clone()) {
            warn!(station_id = %station.id, "Duplicate station id, keeping first");
            continue;
        }
        unique.push(station);
    }

    Ok(unique)
}
