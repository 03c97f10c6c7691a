//! The rendering-surface contract.
//!
//! The actual renderer is a host-provided, stateful object graph (sources and
//! layers keyed by string id). The core only ever talks to it through the
//! [`RenderSurface`] capability trait, so every piece of reconciliation logic
//! can be exercised against the in-memory [`RecordingSurface`]
//! (`crate::render::recording`) instead of a real map widget.

use crate::{
    core::geo::{LatLngBounds, Point},
    session::identity::CameraPose,
    Result,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// A raster basemap source in the mount style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterSourceSpec {
    pub id: String,
    pub tiles: Vec<String>,
    pub tile_size: u32,
    #[serde(default)]
    pub attribution: Option<String>,
}

/// A basemap layer referencing one of the style's raster sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseLayerSpec {
    pub id: String,
    pub source: String,
}

/// The style description the surface is mounted with: basemap raster sources
/// and the layers drawing them, bottom to top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDescription {
    pub sources: Vec<RasterSourceSpec>,
    pub layers: Vec<BaseLayerSpec>,
}

static CARTO_POSITRON: Lazy<StyleDescription> = Lazy::new(|| {
    let subdomains = ["a", "b", "c", "d"];
    let tiles_for = |variant: &str| {
        subdomains
            .iter()
            .map(|s| {
                format!(
                    "https://{}.basemaps.cartocdn.com/{}/{{z}}/{{x}}/{{y}}.png",
                    s, variant
                )
            })
            .collect::<Vec<_>>()
    };

    StyleDescription {
        sources: vec![
            RasterSourceSpec {
                id: "carto-positron-base".to_string(),
                tiles: tiles_for("light_nolabels"),
                tile_size: 256,
                attribution: Some("© OpenStreetMap contributors © CARTO".to_string()),
            },
            RasterSourceSpec {
                id: "carto-positron-labels".to_string(),
                tiles: tiles_for("light_only_labels"),
                tile_size: 256,
                attribution: None,
            },
        ],
        layers: vec![
            BaseLayerSpec {
                id: "base".to_string(),
                source: "carto-positron-base".to_string(),
            },
            BaseLayerSpec {
                id: "labels".to_string(),
                source: "carto-positron-labels".to_string(),
            },
        ],
    }
});

impl StyleDescription {
    /// The default basemap: Carto Positron, labels drawn as the topmost layer
    /// so data primitives can slot in underneath them.
    pub fn carto_positron() -> StyleDescription {
        CARTO_POSITRON.clone()
    }
}

/// A vector-tile source registered for an enabled data layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSourceSpec {
    pub tiles: Vec<String>,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

/// Geometry class a primitive is filtered to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
}

/// The kind of drawing primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Fill,
    Line,
    Circle,
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimitiveKind::Fill => write!(f, "fill"),
            PrimitiveKind::Line => write!(f, "line"),
            PrimitiveKind::Circle => write!(f, "circle"),
        }
    }
}

/// Paint parameters, one variant per primitive kind
#[derive(Debug, Clone, PartialEq)]
pub enum PaintSpec {
    Fill {
        color: String,
        opacity: f64,
    },
    Line {
        color: String,
        width: f64,
    },
    Circle {
        color: String,
        radius: f64,
        stroke_color: String,
        stroke_width: f64,
    },
}

impl PaintSpec {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            PaintSpec::Fill { .. } => PrimitiveKind::Fill,
            PaintSpec::Line { .. } => PrimitiveKind::Line,
            PaintSpec::Circle { .. } => PrimitiveKind::Circle,
        }
    }
}

/// A style layer to be registered on the surface
#[derive(Debug, Clone, PartialEq)]
pub struct LayerPrimitive {
    pub id: String,
    pub source: String,
    /// Named layer inside a vector-tile source; None for overlay sources
    pub source_layer: Option<String>,
    pub paint: PaintSpec,
    /// Restrict the primitive to one geometry class; None draws everything
    pub geometry_filter: Option<GeometryKind>,
}

/// GeoJSON geometry for the live overlay source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OverlayGeometry {
    Point { coordinates: [f64; 2] },
    LineString { coordinates: Vec<[f64; 2]> },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

/// GeoJSON feature for the live overlay source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct OverlayFeature {
    pub geometry: OverlayGeometry,
    #[serde(default)]
    pub properties: serde_json::Value,
}

impl OverlayFeature {
    pub fn new(geometry: OverlayGeometry) -> Self {
        Self {
            geometry,
            properties: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// GeoJSON feature collection pushed into a live overlay source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct OverlayData {
    pub features: Vec<OverlayFeature>,
}

impl OverlayData {
    pub fn empty() -> Self {
        Self { features: Vec::new() }
    }
}

/// A rendered feature returned by a screen-point query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueriedFeature {
    /// Id of the primitive the feature was rendered by
    pub primitive_id: String,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Capability interface over the mounted rendering surface.
///
/// All mutations assume the style has finished loading; the coordinator does
/// not touch the surface before the style-loaded signal. Style-loaded,
/// render-idle, camera-settle and click signals travel the other way, as
/// host-invoked coordinator events.
pub trait RenderSurface: Send {
    fn add_vector_source(&mut self, id: &str, spec: &VectorSourceSpec) -> Result<()>;
    /// Registers an empty live GeoJSON source for overlay drawing
    fn add_overlay_source(&mut self, id: &str) -> Result<()>;
    fn remove_source(&mut self, id: &str) -> Result<()>;
    fn has_source(&self, id: &str) -> bool;

    /// Registers a style layer, optionally inserted before an existing one
    fn add_layer_primitive(&mut self, primitive: &LayerPrimitive, before: Option<&str>)
        -> Result<()>;
    fn remove_layer_primitive(&mut self, id: &str) -> Result<()>;
    fn has_layer_primitive(&self, id: &str) -> bool;
    fn set_visibility(&mut self, id: &str, visible: bool) -> Result<()>;

    /// Replaces the contents of a live overlay source
    fn set_overlay_data(&mut self, source_id: &str, data: &OverlayData) -> Result<()>;

    fn jump_to(&mut self, camera: &CameraPose);
    fn fit_bounds(&mut self, bounds: &LatLngBounds);

    /// Rendered features at a screen point, restricted to the given primitives
    fn query_features(&self, point: Point, primitive_ids: &[String]) -> Vec<QueriedFeature>;

    /// Downcast support for hosts that need the concrete surface back
    fn as_any(&self) -> &dyn std::any::Any;
}
