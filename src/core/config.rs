//! Viewer configuration.

use crate::core::geo::LatLng;
use crate::render::surface::StyleDescription;
use crate::session::identity::CameraPose;
use std::time::Duration;

/// Tuning knobs for a viewer session
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    /// Base URL of the backend API
    pub api_base: String,
    /// Camera used when the identity has no usable persisted pose
    pub default_camera: CameraPose,
    /// Quiet period before a view-state snapshot is persisted
    pub save_debounce: Duration,
    /// Basemap style the surface is mounted with
    pub base_style: StyleDescription,
}

impl MapConfig {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..Self::default()
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".to_string(),
            // Metropolitan France at country scale
            default_camera: CameraPose::new(LatLng::new(46.2276, 2.2137), 6.0),
            save_debounce: Duration::from_millis(1000),
            base_style: StyleDescription::carto_positron(),
        }
    }
}
