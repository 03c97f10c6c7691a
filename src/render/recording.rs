//! An in-memory rendering surface.
//!
//! Tracks sources, primitive draw order, visibility and overlay contents, and
//! records every mutating call. It is deliberately strict: duplicate adds and
//! removes of missing ids are errors, so reconciliation bugs show up in tests
//! instead of being absorbed the way a real renderer might absorb them. Also
//! usable as the surface of a headless session.

use crate::{
    core::geo::{LatLngBounds, Point},
    render::surface::{
        LayerPrimitive, OverlayData, QueriedFeature, RenderSurface, StyleDescription,
        VectorSourceSpec,
    },
    session::identity::CameraPose,
    Error, Result,
};
use fxhash::FxHashMap as HashMap;

/// One recorded mutation
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    AddSource(String),
    RemoveSource(String),
    AddPrimitive {
        id: String,
        before: Option<String>,
    },
    RemovePrimitive(String),
    SetVisibility(String, bool),
    SetOverlayData(String),
    JumpTo(CameraPose),
    FitBounds(LatLngBounds),
}

#[derive(Debug, Clone)]
enum SourceRecord {
    Raster,
    Vector(VectorSourceSpec),
    Overlay(OverlayData),
}

#[derive(Debug, Clone)]
struct PrimitiveRecord {
    id: String,
    spec: Option<LayerPrimitive>,
    visible: bool,
}

#[derive(Default)]
pub struct RecordingSurface {
    sources: HashMap<String, SourceRecord>,
    /// Primitives in draw order, bottom to top
    primitives: Vec<PrimitiveRecord>,
    calls: Vec<SurfaceCall>,
    staged_features: Vec<QueriedFeature>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface mounted with the given style: basemap sources and layers
    /// pre-registered, as a real renderer would have after style-load.
    pub fn with_style(style: &StyleDescription) -> Self {
        let mut surface = Self::new();
        for source in &style.sources {
            surface
                .sources
                .insert(source.id.clone(), SourceRecord::Raster);
        }
        for layer in &style.layers {
            surface.primitives.push(PrimitiveRecord {
                id: layer.id.clone(),
                spec: None,
                visible: true,
            });
        }
        surface
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.primitives.iter().position(|p| p.id == id)
    }

    /// Everything recorded so far, in call order
    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Primitive ids in draw order
    pub fn primitive_order(&self) -> Vec<String> {
        self.primitives.iter().map(|p| p.id.clone()).collect()
    }

    pub fn is_visible(&self, id: &str) -> Option<bool> {
        self.position(id).map(|i| self.primitives[i].visible)
    }

    pub fn primitive_spec(&self, id: &str) -> Option<&LayerPrimitive> {
        self.position(id)
            .and_then(|i| self.primitives[i].spec.as_ref())
    }

    /// Current contents of an overlay source
    pub fn overlay_data(&self, source_id: &str) -> Option<&OverlayData> {
        match self.sources.get(source_id) {
            Some(SourceRecord::Overlay(data)) => Some(data),
            _ => None,
        }
    }

    pub fn last_jump(&self) -> Option<CameraPose> {
        self.calls.iter().rev().find_map(|c| match c {
            SurfaceCall::JumpTo(pose) => Some(*pose),
            _ => None,
        })
    }

    pub fn last_fit(&self) -> Option<LatLngBounds> {
        self.calls.iter().rev().find_map(|c| match c {
            SurfaceCall::FitBounds(bounds) => Some(bounds.clone()),
            _ => None,
        })
    }

    /// Stages a rendered feature for subsequent query_features calls
    pub fn stage_feature(
        &mut self,
        primitive_id: impl Into<String>,
        properties: serde_json::Map<String, serde_json::Value>,
    ) {
        self.staged_features.push(QueriedFeature {
            primitive_id: primitive_id.into(),
            properties,
        });
    }
}

impl RenderSurface for RecordingSurface {
    fn add_vector_source(&mut self, id: &str, spec: &VectorSourceSpec) -> Result<()> {
        if self.sources.contains_key(id) {
            return Err(Error::Surface(format!("source already present: {}", id)));
        }
        self.sources
            .insert(id.to_string(), SourceRecord::Vector(spec.clone()));
        self.calls.push(SurfaceCall::AddSource(id.to_string()));
        Ok(())
    }

    fn add_overlay_source(&mut self, id: &str) -> Result<()> {
        if self.sources.contains_key(id) {
            return Err(Error::Surface(format!("source already present: {}", id)));
        }
        self.sources
            .insert(id.to_string(), SourceRecord::Overlay(OverlayData::empty()));
        self.calls.push(SurfaceCall::AddSource(id.to_string()));
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<()> {
        if self.sources.remove(id).is_none() {
            return Err(Error::Surface(format!("no such source: {}", id)));
        }
        self.calls.push(SurfaceCall::RemoveSource(id.to_string()));
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn add_layer_primitive(
        &mut self,
        primitive: &LayerPrimitive,
        before: Option<&str>,
    ) -> Result<()> {
        if self.position(&primitive.id).is_some() {
            return Err(Error::Surface(format!(
                "primitive already present: {}",
                primitive.id
            )));
        }
        if !self.sources.contains_key(&primitive.source) {
            return Err(Error::Surface(format!(
                "primitive {} references missing source {}",
                primitive.id, primitive.source
            )));
        }

        let record = PrimitiveRecord {
            id: primitive.id.clone(),
            spec: Some(primitive.clone()),
            visible: true,
        };
        match before {
            Some(anchor) => {
                let index = self
                    .position(anchor)
                    .ok_or_else(|| Error::Surface(format!("no such primitive: {}", anchor)))?;
                self.primitives.insert(index, record);
            }
            None => self.primitives.push(record),
        }
        self.calls.push(SurfaceCall::AddPrimitive {
            id: primitive.id.clone(),
            before: before.map(|s| s.to_string()),
        });
        Ok(())
    }

    fn remove_layer_primitive(&mut self, id: &str) -> Result<()> {
        let index = self
            .position(id)
            .ok_or_else(|| Error::Surface(format!("no such primitive: {}", id)))?;
        self.primitives.remove(index);
        self.calls.push(SurfaceCall::RemovePrimitive(id.to_string()));
        Ok(())
    }

    fn has_layer_primitive(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    fn set_visibility(&mut self, id: &str, visible: bool) -> Result<()> {
        let index = self
            .position(id)
            .ok_or_else(|| Error::Surface(format!("no such primitive: {}", id)))?;
        self.primitives[index].visible = visible;
        self.calls
            .push(SurfaceCall::SetVisibility(id.to_string(), visible));
        Ok(())
    }

    fn set_overlay_data(&mut self, source_id: &str, data: &OverlayData) -> Result<()> {
        match self.sources.get_mut(source_id) {
            Some(SourceRecord::Overlay(current)) => {
                *current = data.clone();
                self.calls
                    .push(SurfaceCall::SetOverlayData(source_id.to_string()));
                Ok(())
            }
            Some(_) => Err(Error::Surface(format!(
                "source is not an overlay: {}",
                source_id
            ))),
            None => Err(Error::Surface(format!("no such source: {}", source_id))),
        }
    }

    fn jump_to(&mut self, camera: &CameraPose) {
        self.calls.push(SurfaceCall::JumpTo(*camera));
    }

    fn fit_bounds(&mut self, bounds: &LatLngBounds) {
        self.calls.push(SurfaceCall::FitBounds(bounds.clone()));
    }

    fn query_features(&self, _point: Point, primitive_ids: &[String]) -> Vec<QueriedFeature> {
        self.staged_features
            .iter()
            .filter(|f| {
                primitive_ids.contains(&f.primitive_id)
                    && self.is_visible(&f.primitive_id) == Some(true)
            })
            .cloned()
            .collect()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
