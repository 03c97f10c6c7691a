//! Authenticated identity and the persisted view-state blob.

use crate::core::geo::{LatLng, LatLngBounds};
use crate::layers::descriptor::LayerId;
use crate::layers::model::LayerVisibility;
use crate::prelude::HashMap;
use serde::{Deserialize, Serialize};

/// Full camera pose of the rendering surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub center: LatLng,
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
}

impl CameraPose {
    /// Level camera looking straight down at `center`
    pub fn new(center: LatLng, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            bearing: 0.0,
            pitch: 0.0,
        }
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::new(LatLng::default(), 0.0)
    }
}

/// The persisted per-user view state: camera pose (or a bounds-fit request)
/// plus the layer enabled/visible snapshot.
///
/// Every field is optional so that blobs written by older clients, or written
/// before the user ever moved the camera, round-trip untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    pub center: Option<LatLng>,
    pub zoom: Option<f64>,
    pub bearing: Option<f64>,
    pub pitch: Option<f64>,
    pub bounds: Option<LatLngBounds>,
    pub layers: HashMap<LayerId, LayerVisibility>,
}

impl ViewState {
    /// The explicit camera pose, when both center and zoom were recorded.
    /// A persisted bounds-fit takes precedence over this at hydration.
    pub fn camera(&self) -> Option<CameraPose> {
        match (self.center, self.zoom) {
            (Some(center), Some(zoom)) if center.is_valid() => Some(CameraPose {
                center,
                zoom,
                bearing: self.bearing.unwrap_or(0.0),
                pitch: self.pitch.unwrap_or(0.0),
            }),
            _ => None,
        }
    }

    pub fn from_camera(camera: CameraPose) -> Self {
        Self {
            center: Some(camera.center),
            zoom: Some(camera.zoom),
            bearing: Some(camera.bearing),
            pitch: Some(camera.pitch),
            bounds: None,
            layers: HashMap::default(),
        }
    }
}

/// The authenticated user, as resolved once at session start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: u64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub map_state: Option<ViewState>,
}

impl Identity {
    /// Label shown for the signed-in user; prefers email over username
    pub fn display_handle(&self) -> Option<&str> {
        self.email.as_deref().or(self.username.as_deref())
    }
}
