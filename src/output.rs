//! Visual sinks and export of station traffic.
//!
//! Supports debug logging, JSON-lines streaming, in-memory recording, and CSV export.

use std::io::Write;

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, error};

use crate::aggregate::AggregateResult;
use crate::controller::{PositionUpdate, VisualSink, VisualUpdate};
use crate::model::Station;
use crate::scale::ScaleSet;

/// Logs update sizes at debug level; useful when nothing renders.
#[derive(Debug, Default)]
pub struct LogSink;

impl VisualSink for LogSink {
    fn update_attributes(&mut self, update: &VisualUpdate) {
        debug!(
            filter = update.filter,
            markers = update.markers.len(),
            "Marker attributes updated"
        );
    }

    fn update_positions(&mut self, update: &PositionUpdate) {
        debug!(positions = update.positions.len(), "Marker positions updated");
    }
}

/// Keeps every update it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub attributes: Vec<VisualUpdate>,
    pub positions: Vec<PositionUpdate>,
}

impl VisualSink for RecordingSink {
    fn update_attributes(&mut self, update: &VisualUpdate) {
        self.attributes.push(update.clone());
    }

    fn update_positions(&mut self, update: &PositionUpdate) {
        self.positions.push(update.clone());
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Line<'a> {
    Attributes(&'a VisualUpdate),
    Positions(&'a PositionUpdate),
}

/// Writes each update as one JSON object per line, tagged with `kind`.
///
/// The first write failure is kept and returned by [`JsonLinesSink::into_inner`];
/// later updates are dropped.
pub struct JsonLinesSink<W> {
    writer: W,
    error: Option<anyhow::Error>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
        }
    }

    /// Returns the writer, or the first error hit while writing to it.
    pub fn into_inner(self) -> Result<W> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.writer),
        }
    }

    fn write_line(&mut self, line: &Line<'_>) {
        if self.error.is_some() {
            return;
        }
        let result = serde_json::to_writer(&mut self.writer, line)
            .map_err(anyhow::Error::from)
            .and_then(|_| Ok(self.writer.write_all(b"\n")?));
        if let Err(e) = result {
            error!(error = %e, "Failed to write update");
            self.error = Some(e);
        }
    }
}

impl<W: Write> VisualSink for JsonLinesSink<W> {
    fn update_attributes(&mut self, update: &VisualUpdate) {
        self.write_line(&Line::Attributes(update));
    }

    fn update_positions(&mut self, update: &PositionUpdate) {
        self.write_line(&Line::Positions(update));
    }
}

/// One exported row per station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficRecord {
    pub short_name: String,
    pub name: String,
    pub lon: f64,
    pub lat: f64,
    pub arrivals: u32,
    pub departures: u32,
    pub total_traffic: u32,
    pub radius: f64,
    pub flow_ratio: f64,
}

/// Joins station metadata with the current aggregate and scales.
pub fn traffic_records(
    stations: &[Station],
    aggregate: &AggregateResult,
    scales: &ScaleSet,
) -> Vec<TrafficRecord> {
    stations
        .iter()
        .map(|station| {
            let traffic = aggregate.get(&station.id).unwrap_or_default();
            let style = scales.style(&traffic);
            TrafficRecord {
                short_name: station.id.clone(),
                name: station.name.clone(),
                lon: station.lon,
                lat: station.lat,
                arrivals: traffic.arrivals,
                departures: traffic.departures,
                total_traffic: traffic.total_traffic,
                radius: style.radius,
                flow_ratio: style.flow_ratio,
            }
        })
        .collect()
}

/// Writes `records` as CSV with a header row, replacing any existing file.
pub fn write_traffic_csv<W: Write>(writer: W, records: &[TrafficRecord]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    debug!(rows = records.len(), "Traffic CSV written");
    Ok(())
}
