//! # Mapcore
//!
//! A client-side slippy-map viewer core, inspired by the reconciliation
//! problem every interactive map client has: keeping a declarative layer and
//! view model consistent with an imperative, stateful rendering surface
//! while authentication, style loading, tile mutation and user input all
//! resolve in their own time.
//!
//! The crate provides the session state machine, layer-state synchronization,
//! debounced view-state persistence and geodesic measurement tooling; the
//! renderer and HTTP backend stay behind the [`RenderSurface`] and
//! [`BackendClient`] traits.

pub mod backend;
pub mod core;
pub mod layers;
pub mod measure;
pub mod prelude;
pub mod render;
pub mod session;

// Re-export public API
pub use crate::core::{
    config::MapConfig,
    geo::{LatLng, LatLngBounds, Point, TileCoord},
};

pub use crate::layers::{
    adapter::LayerRenderAdapter,
    descriptor::{LayerDescriptor, LayerId},
    model::{LayerModel, LayerVisibility},
};

pub use crate::measure::session::{MeasureMode, MeasurementSession};

pub use crate::render::{recording::RecordingSurface, surface::RenderSurface};

pub use crate::backend::{client::BackendClient, http::HttpBackend};

pub use crate::session::{
    coordinator::{MountDirective, SessionCoordinator, SessionPhase, SurfaceStage},
    identity::{CameraPose, Identity, ViewState},
    recorder::ViewStateRecorder,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("authentication required")]
    Unauthorized,

    #[error("credentials rejected: {0}")]
    CredentialsRejected(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("render surface error: {0}")]
    Surface(String),

    #[error("session error: {0}")]
    Session(String),
}
