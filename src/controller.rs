//! Live update controller.
//!
//! Owns the station and trip datasets for the session, the current
//! [`TimeFilter`], and the most recent aggregate. Two triggers drive it:
//!
//! - [`LiveController::filter_changed`] re-filters, re-aggregates and refits the
//!   scales, then pushes marker styles to the [`VisualSink`].
//! - [`LiveController::view_changed`] re-projects stations through the
//!   [`Projector`] and pushes positions; aggregate state is untouched.
//!
//! Nothing is computed until both datasets have been delivered. A failed load
//! leaves the controller in its pre-load state and every trigger reports the
//! failure instead of running.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::aggregate::{AggregateResult, aggregate};
use crate::error::{Result, TrafficError};
use crate::filter::{TimeFilter, filter_by_time};
use crate::model::{MarkerStyle, ScreenPoint, Station, Trip};
use crate::scale::{RadiusPresets, ScaleSet};

/// Converts geographic coordinates to screen coordinates.
pub trait Projector {
    fn project(&self, lon: f64, lat: f64) -> ScreenPoint;
}

/// Receives marker updates. Entries are keyed by station id and only ever
/// update existing markers.
pub trait VisualSink {
    fn update_attributes(&mut self, update: &VisualUpdate);
    fn update_positions(&mut self, update: &PositionUpdate);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationMarker {
    pub station_id: String,
    #[serde(flatten)]
    pub style: MarkerStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationPosition {
    pub station_id: String,
    #[serde(flatten)]
    pub point: ScreenPoint,
}

/// Marker styles for every station under one filter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualUpdate {
    /// Slider value the update was computed for (`-1` = any time).
    pub filter: i32,
    pub markers: Vec<StationMarker>,
}

impl VisualUpdate {
    pub fn get(&self, station_id: &str) -> Option<MarkerStyle> {
        self.markers
            .iter()
            .find(|m| m.station_id == station_id)
            .map(|m| m.style)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionUpdate {
    pub positions: Vec<StationPosition>,
}

impl PositionUpdate {
    pub fn get(&self, station_id: &str) -> Option<ScreenPoint> {
        self.positions
            .iter()
            .find(|p| p.station_id == station_id)
            .map(|p| p.point)
    }
}

struct Session {
    stations: Vec<Station>,
    trips: Vec<Trip>,
    filter: TimeFilter,
    aggregate: AggregateResult,
    scales: ScaleSet,
}

enum LoadState {
    Loading {
        stations: Option<Vec<Station>>,
        trips: Option<Vec<Trip>>,
    },
    Ready(Session),
    Failed(String),
}

pub struct LiveController<P, S> {
    presets: RadiusPresets,
    projector: P,
    sink: S,
    state: LoadState,
}

impl<P: Projector, S: VisualSink> LiveController<P, S> {
    pub fn new(presets: RadiusPresets, projector: P, sink: S) -> Self {
        Self {
            presets,
            projector,
            sink,
            state: LoadState::Loading {
                stations: None,
                trips: None,
            },
        }
    }

    /// Delivers the station dataset (or its load failure).
    pub fn stations_loaded(&mut self, stations: Result<Vec<Station>>) -> Result<()> {
        self.deliver("stations", stations, |slot, s| slot.0 = Some(s))
    }

    /// Delivers the normalized trip set (or its load failure).
    pub fn trips_loaded(&mut self, trips: Result<Vec<Trip>>) -> Result<()> {
        self.deliver("trips", trips, |slot, t| slot.1 = Some(t))
    }

    fn deliver<T>(
        &mut self,
        dataset: &str,
        data: Result<T>,
        store: impl FnOnce(&mut (Option<Vec<Station>>, Option<Vec<Trip>>), T),
    ) -> Result<()> {
        let mut slots = match &mut self.state {
            LoadState::Loading { stations, trips } => (stations.take(), trips.take()),
            LoadState::Failed(reason) => return Err(TrafficError::LoadFailed(reason.clone())),
            LoadState::Ready(_) => {
                warn!(dataset, "Dataset already loaded, ignoring");
                return Ok(());
            }
        };

        let data = match data {
            Ok(data) => data,
            Err(e) => {
                let reason = format!("{dataset}: {e}");
                error!(dataset, error = %e, "Dataset load failed");
                self.state = LoadState::Failed(reason.clone());
                return Err(TrafficError::LoadFailed(reason));
            }
        };

        store(&mut slots, data);

        match slots {
            (Some(stations), Some(trips)) => {
                self.initial_load(stations, trips);
                Ok(())
            }
            (stations, trips) => {
                debug!(dataset, "Dataset loaded, waiting for the other");
                self.state = LoadState::Loading { stations, trips };
                Ok(())
            }
        }
    }

    fn initial_load(&mut self, stations: Vec<Station>, trips: Vec<Trip>) {
        info!(
            stations = stations.len(),
            trips = trips.len(),
            "Datasets loaded"
        );
        let filter = TimeFilter::Any;
        let aggregate = aggregate(&stations, &trips);
        let scales = ScaleSet::fit(&aggregate, filter, &self.presets);
        let update = styles(&aggregate, &scales, filter);

        let session = Session {
            stations,
            trips,
            filter,
            aggregate,
            scales,
        };
        let placed = positions(&self.projector, &session);
        self.state = LoadState::Ready(session);

        self.sink.update_attributes(&update);
        self.sink.update_positions(&placed);
    }

    fn session(&self) -> Result<&Session> {
        match &self.state {
            LoadState::Ready(session) => Ok(session),
            LoadState::Loading { .. } => Err(TrafficError::NotReady),
            LoadState::Failed(reason) => Err(TrafficError::LoadFailed(reason.clone())),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, LoadState::Ready(_))
    }

    /// Handles a slider input. The filter state is replaced only when `value`
    /// is a valid slider value.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn filter_changed(&mut self, value: i32) -> Result<VisualUpdate> {
        if let Err(e) = self.session() {
            warn!(error = %e, "Filter change before datasets loaded");
            return Err(e);
        }
        let filter = TimeFilter::from_slider(value)?;

        let LoadState::Ready(session) = &mut self.state else {
            return Err(TrafficError::NotReady);
        };

        let filtered = filter_by_time(&session.trips, filter);
        session.aggregate = aggregate(&session.stations, &filtered);
        session.scales = ScaleSet::fit(&session.aggregate, filter, &self.presets);
        session.filter = filter;

        debug!(
            filter = %filter,
            trips = filtered.len(),
            max_total = session.aggregate.max_total(),
            "Aggregate recomputed"
        );

        let update = styles(&session.aggregate, &session.scales, filter);
        self.sink.update_attributes(&update);
        Ok(update)
    }

    /// Re-projects every station through the current projector.
    pub fn view_changed(&mut self) -> Result<PositionUpdate> {
        let update = positions(&self.projector, self.session()?);
        self.sink.update_positions(&update);
        Ok(update)
    }

    /// Mutates the projector (pan, zoom, resize) and fires a view change.
    pub fn update_view(&mut self, change: impl FnOnce(&mut P)) -> Result<PositionUpdate> {
        change(&mut self.projector);
        self.view_changed()
    }

    pub fn projector(&self) -> &P {
        &self.projector
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn stations(&self) -> Option<&[Station]> {
        self.session().ok().map(|s| s.stations.as_slice())
    }

    pub fn filter(&self) -> Option<TimeFilter> {
        self.session().ok().map(|s| s.filter)
    }

    pub fn current_aggregate(&self) -> Option<&AggregateResult> {
        self.session().ok().map(|s| &s.aggregate)
    }

    pub fn current_scales(&self) -> Option<&ScaleSet> {
        self.session().ok().map(|s| &s.scales)
    }
}

fn positions<P: Projector>(projector: &P, session: &Session) -> PositionUpdate {
    PositionUpdate {
        positions: session
            .stations
            .iter()
            .map(|s| StationPosition {
                station_id: s.id.clone(),
                point: projector.project(s.lon, s.lat),
            })
            .collect(),
    }
}

fn styles(aggregate: &AggregateResult, scales: &ScaleSet, filter: TimeFilter) -> VisualUpdate {
    VisualUpdate {
        filter: filter.slider_value(),
        markers: aggregate
            .iter()
            .map(|(id, traffic)| StationMarker {
                station_id: id.to_string(),
                style: scales.style(traffic),
            })
            .collect(),
    }
}
