//! Translation of the logical layer model into rendering-surface mutations.
//!
//! Every enabled layer owns one vector source and three primitives (fill,
//! line, circle), all with ids derived deterministically from the layer id so
//! that instantiation is idempotent and teardown needs no bookkeeping.

use crate::{
    layers::{descriptor::LayerId, style},
    render::surface::{
        GeometryKind, LayerPrimitive, PaintSpec, PrimitiveKind, RenderSurface, VectorSourceSpec,
    },
    Result,
};

/// Basemap labels primitive; data primitives are inserted beneath it
pub const LABELS_PRIMITIVE: &str = "labels";

/// Named layer inside each vector tile, as served by the backend
const VECTOR_SOURCE_LAYER: &str = "layer";

const KINDS: [PrimitiveKind; 3] = [
    PrimitiveKind::Fill,
    PrimitiveKind::Line,
    PrimitiveKind::Circle,
];

pub struct LayerRenderAdapter {
    /// Tile URL template with `{layer}`, `{z}`, `{x}`, `{y}` placeholders
    tile_template: String,
}

impl LayerRenderAdapter {
    pub fn new(tile_template: impl Into<String>) -> Self {
        Self {
            tile_template: tile_template.into(),
        }
    }

    /// Source id for a layer
    pub fn source_id(id: LayerId) -> String {
        format!("src-{}", id)
    }

    /// Primitive id for a layer and kind
    pub fn primitive_id(id: LayerId, kind: PrimitiveKind) -> String {
        format!("lyr-{}-{}", id, kind)
    }

    /// All primitive ids belonging to a layer, e.g. for feature queries
    pub fn primitive_ids(id: LayerId) -> Vec<String> {
        KINDS.iter().map(|k| Self::primitive_id(id, *k)).collect()
    }

    fn tiles_for(&self, id: LayerId) -> Vec<String> {
        vec![self.tile_template.replace("{layer}", &id.to_string())]
    }

    /// Ensures source and primitives for `id` exist and carry `visible`.
    /// Re-instantiating an already-present layer converges to the same state.
    /// A partial failure tears the layer back down before returning.
    pub fn instantiate(
        &self,
        surface: &mut dyn RenderSurface,
        id: LayerId,
        visible: bool,
    ) -> Result<()> {
        if let Err(e) = self.instantiate_inner(surface, id, visible) {
            let _ = self.tear_down(surface, id);
            return Err(e);
        }
        Ok(())
    }

    fn instantiate_inner(
        &self,
        surface: &mut dyn RenderSurface,
        id: LayerId,
        visible: bool,
    ) -> Result<()> {
        let source = Self::source_id(id);
        if !surface.has_source(&source) {
            surface.add_vector_source(
                &source,
                &VectorSourceSpec {
                    tiles: self.tiles_for(id),
                    min_zoom: 0,
                    max_zoom: 22,
                },
            )?;
        }

        let before = if surface.has_layer_primitive(LABELS_PRIMITIVE) {
            Some(LABELS_PRIMITIVE)
        } else {
            None
        };

        for kind in KINDS {
            let primitive_id = Self::primitive_id(id, kind);
            if !surface.has_layer_primitive(&primitive_id) {
                surface.add_layer_primitive(&self.primitive_for(id, kind), before)?;
            }
            surface.set_visibility(&primitive_id, visible)?;
        }
        Ok(())
    }

    /// Removes every primitive and the source for `id`; absent pieces are
    /// skipped, so tearing down a never-instantiated layer is a no-op.
    pub fn tear_down(&self, surface: &mut dyn RenderSurface, id: LayerId) -> Result<()> {
        for kind in KINDS {
            let primitive_id = Self::primitive_id(id, kind);
            if surface.has_layer_primitive(&primitive_id) {
                surface.remove_layer_primitive(&primitive_id)?;
            }
        }
        let source = Self::source_id(id);
        if surface.has_source(&source) {
            surface.remove_source(&source)?;
        }
        Ok(())
    }

    /// Flips visibility of existing primitives, never re-creates them
    pub fn set_visibility(
        &self,
        surface: &mut dyn RenderSurface,
        id: LayerId,
        visible: bool,
    ) -> Result<()> {
        for kind in KINDS {
            let primitive_id = Self::primitive_id(id, kind);
            if surface.has_layer_primitive(&primitive_id) {
                surface.set_visibility(&primitive_id, visible)?;
            }
        }
        Ok(())
    }

    fn primitive_for(&self, id: LayerId, kind: PrimitiveKind) -> LayerPrimitive {
        let color = style::color_for(id).css();
        let (paint, filter) = match kind {
            PrimitiveKind::Fill => (
                PaintSpec::Fill {
                    color,
                    opacity: 0.35,
                },
                GeometryKind::Polygon,
            ),
            PrimitiveKind::Line => (
                PaintSpec::Line { color, width: 1.0 },
                GeometryKind::LineString,
            ),
            PrimitiveKind::Circle => (
                PaintSpec::Circle {
                    color,
                    radius: 5.0,
                    stroke_color: "#000".to_string(),
                    stroke_width: 1.0,
                },
                GeometryKind::Point,
            ),
        };

        LayerPrimitive {
            id: Self::primitive_id(id, kind),
            source: Self::source_id(id),
            source_layer: Some(VECTOR_SOURCE_LAYER.to_string()),
            paint,
            geometry_filter: Some(filter),
        }
    }
}
