//! State the map widget renders from.
//!
//! Rendering, tiles and gestures belong to the embedding map widget. This
//! module only tracks what the widget is told: where the camera looks, where
//! the marker sits and which way the zoom switch points.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::location::{Coordinate, CoordinateSink};

/// Bald Head Island Marina.
pub const MARINA: Coordinate = Coordinate::new(33.875_771, -78.001_839);

/// Lowest zoom level the camera accepts.
pub const MIN_ZOOM: f32 = 0.0;
/// Highest zoom level the camera accepts.
pub const MAX_ZOOM: f32 = 25.0;

/// Base map imagery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapType {
    /// Road map.
    Normal,
    /// Satellite imagery.
    #[default]
    Satellite,
    /// Topographic relief.
    Terrain,
    /// Satellite imagery with roads and labels.
    Hybrid,
}

/// The camera's viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPosition {
    /// Center of the viewport.
    pub target: Coordinate,
    /// Zoom level.
    pub zoom: f32,
    /// Rotation in degrees clockwise from north.
    pub bearing: f32,
    /// Angle from nadir in degrees.
    pub tilt: f32,
}

impl CameraPosition {
    /// A north-up, top-down camera.
    #[must_use]
    pub const fn from_target_zoom(target: Coordinate, zoom: f32) -> Self {
        Self {
            target,
            zoom,
            bearing: 0.0,
            tilt: 0.0,
        }
    }
}

/// A change applied to the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraUpdate {
    /// One zoom step closer.
    ZoomIn,
    /// One zoom step further.
    ZoomOut,
    /// Move the center, keeping zoom, bearing and tilt.
    NewTarget(Coordinate),
}

/// The labeled pin on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Where the pin sits.
    pub position: Coordinate,
    /// Headline shown in the info window.
    pub title: String,
    /// Secondary text shown in the info window.
    pub snippet: String,
}

/// Widget chrome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapUiSettings {
    /// Show the +/- zoom buttons.
    pub zoom_controls_enabled: bool,
}

/// Everything the map widget needs to draw the screen.
#[derive(Debug, Clone, PartialEq)]
pub struct MapState {
    camera: CameraPosition,
    map_type: MapType,
    ui_settings: MapUiSettings,
    marker: Marker,
    zoom_checked: bool,
    revision: u64,
}

impl MapState {
    /// Initial state: camera and marker on the configured marina.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        let marina = &config.marina;
        Self {
            camera: CameraPosition::from_target_zoom(marina.position, config.map.zoom),
            map_type: config.map.map_type,
            ui_settings: MapUiSettings {
                zoom_controls_enabled: config.map.zoom_controls,
            },
            marker: Marker {
                position: marina.position,
                title: marina.title.clone(),
                snippet: marina.snippet.clone(),
            },
            zoom_checked: true,
            revision: 0,
        }
    }

    /// Current camera.
    #[must_use]
    pub const fn camera(&self) -> &CameraPosition {
        &self.camera
    }

    /// Base imagery.
    #[must_use]
    pub const fn map_type(&self) -> MapType {
        self.map_type
    }

    /// Widget chrome.
    #[must_use]
    pub const fn ui_settings(&self) -> MapUiSettings {
        self.ui_settings
    }

    /// The pin.
    #[must_use]
    pub const fn marker(&self) -> &Marker {
        &self.marker
    }

    /// Position of the zoom switch.
    #[must_use]
    pub const fn zoom_checked(&self) -> bool {
        self.zoom_checked
    }

    /// Bumped on every visible change, for hosts that poll.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a camera change.
    pub fn move_camera(&mut self, update: CameraUpdate) {
        match update {
            CameraUpdate::ZoomIn => {
                self.camera.zoom = (self.camera.zoom + 1.0).clamp(MIN_ZOOM, MAX_ZOOM);
            }
            CameraUpdate::ZoomOut => {
                self.camera.zoom = (self.camera.zoom - 1.0).clamp(MIN_ZOOM, MAX_ZOOM);
            }
            CameraUpdate::NewTarget(target) => self.camera.target = target,
        }
        self.revision += 1;
    }

    /// Center the camera and the marker on `coordinate`.
    pub fn recenter(&mut self, coordinate: Coordinate) {
        self.marker.position = coordinate;
        self.move_camera(CameraUpdate::NewTarget(coordinate));
    }

    /// Flip the zoom switch. Checked zooms in, unchecked zooms out.
    ///
    /// Returns `false` when the switch already had that position.
    pub fn set_zoom_toggle(&mut self, checked: bool) -> bool {
        if self.zoom_checked == checked {
            return false;
        }
        self.zoom_checked = checked;
        self.move_camera(if checked {
            CameraUpdate::ZoomIn
        } else {
            CameraUpdate::ZoomOut
        });
        debug!("zoom switch {checked}, zoom now {}", self.camera.zoom);
        true
    }
}

impl Default for MapState {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

impl CoordinateSink for MapState {
    fn publish(&mut self, coordinate: Coordinate) {
        self.recenter(coordinate);
    }
}
