//! Web-Mercator map view used as the station projector.
//!
//! Coordinates follow the 512-px tile convention: at zoom `z` the world is
//! `512 * 2^z` pixels wide. Screen positions are relative to the viewport's
//! top-left corner, with the view center at the viewport midpoint.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::controller::Projector;
use crate::model::ScreenPoint;

const TILE_SIZE: f64 = 512.0;
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapViewConfig {
    /// `[longitude, latitude]`
    #[serde(default = "MapViewConfig::default_center")]
    pub center: (f64, f64),
    #[serde(default = "MapViewConfig::default_zoom")]
    pub zoom: f64,
    #[serde(default = "MapViewConfig::default_min_zoom")]
    pub min_zoom: f64,
    #[serde(default = "MapViewConfig::default_max_zoom")]
    pub max_zoom: f64,
    #[serde(default = "MapViewConfig::default_viewport")]
    pub viewport: (f64, f64),
}

impl Default for MapViewConfig {
    fn default() -> Self {
        Self {
            center: Self::default_center(),
            zoom: Self::default_zoom(),
            min_zoom: Self::default_min_zoom(),
            max_zoom: Self::default_max_zoom(),
            viewport: Self::default_viewport(),
        }
    }
}

impl MapViewConfig {
    fn default_center() -> (f64, f64) {
        (-71.09415, 42.36027)
    }
    fn default_zoom() -> f64 {
        12.0
    }
    fn default_min_zoom() -> f64 {
        5.0
    }
    fn default_max_zoom() -> f64 {
        18.0
    }
    fn default_viewport() -> (f64, f64) {
        (1024.0, 768.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    center: (f64, f64),
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    width: f64,
    height: f64,
}

impl MapView {
    pub fn new(config: &MapViewConfig) -> Self {
        let mut view = Self {
            center: config.center,
            zoom: config.zoom,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            width: config.viewport.0,
            height: config.viewport.1,
        };
        view.zoom_to(config.zoom);
        view
    }

    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    fn world_size(&self) -> f64 {
        TILE_SIZE * self.zoom.exp2()
    }

    fn to_world(&self, lon: f64, lat: f64) -> (f64, f64) {
        let size = self.world_size();
        let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = (lon + 180.0) / 360.0 * size;
        let y = (1.0 - (PI / 4.0 + lat / 2.0).tan().ln() / PI) / 2.0 * size;
        (x, y)
    }

    fn from_world(&self, x: f64, y: f64) -> (f64, f64) {
        let size = self.world_size();
        let lon = x / size * 360.0 - 180.0;
        let lat = (2.0 * (PI * (1.0 - 2.0 * y / size)).exp().atan() - PI / 2.0).to_degrees();
        (lon, lat)
    }

    /// Shifts the view by a screen-space offset; positive `dx` moves the view east.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let (cx, cy) = self.to_world(self.center.0, self.center.1);
        self.center = self.from_world(cx + dx, cy + dy);
    }

    /// Sets the zoom level, clamped to the configured bounds.
    pub fn zoom_to(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }
}

impl Default for MapView {
    fn default() -> Self {
        Self::new(&MapViewConfig::default())
    }
}

impl Projector for MapView {
    fn project(&self, lon: f64, lat: f64) -> ScreenPoint {
        let (x, y) = self.to_world(lon, lat);
        let (cx, cy) = self.to_world(self.center.0, self.center.1);
        ScreenPoint {
            x: x - cx + self.width / 2.0,
            y: y - cy + self.height / 2.0,
        }
    }
}
