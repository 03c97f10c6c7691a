//! Prelude module for common mapcore types and traits
//!
//! Re-exports the most commonly used types, traits, and functions for easy
//! importing with `use mapcore::prelude::*;`

pub use crate::core::{
    config::MapConfig,
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    geodesic,
};

pub use crate::layers::{
    adapter::LayerRenderAdapter,
    descriptor::{LayerDescriptor, LayerId},
    model::{LayerModel, LayerVisibility},
    style::{color_for, LayerColor},
};

pub use crate::measure::session::{
    format_area, format_length, MeasureMode, MeasureState, MeasurementSession,
};

pub use crate::render::{
    recording::RecordingSurface,
    surface::{
        LayerPrimitive, OverlayData, PaintSpec, QueriedFeature, RenderSurface, StyleDescription,
    },
};

pub use crate::backend::{client::BackendClient, http::HttpBackend};

pub use crate::session::{
    coordinator::{MountDirective, SessionCoordinator, SessionPhase, SurfaceStage},
    identity::{CameraPose, Identity, ViewState},
    recorder::ViewStateRecorder,
};

pub use crate::{Error, Result};

pub use std::{sync::Arc, time::Duration};

pub use instant::Instant;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
