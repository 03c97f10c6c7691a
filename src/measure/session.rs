//! The measurement tool: a small state machine over clicked points.
//!
//! Every transition resynchronizes the overlay source on the rendering
//! surface in the same logical step; a stale overlay is a correctness bug,
//! not cosmetics.

use crate::{
    core::{geo::LatLng, geodesic},
    measure::overlay,
    render::surface::{LayerPrimitive, OverlayData, PaintSpec, RenderSurface},
    Result,
};

/// Live overlay source fed by the measurement tool
pub const OVERLAY_SOURCE: &str = "measure-src";
pub const OVERLAY_FILL: &str = "measure-fill";
pub const OVERLAY_LINE: &str = "measure-line";
pub const OVERLAY_POINTS: &str = "measure-pts";

const MEASURE_COLOR: &str = "#2d6cdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureMode {
    Length,
    Area,
}

/// Measurement state
#[derive(Debug, Clone, PartialEq)]
pub enum MeasureState {
    /// No tool armed
    Idle,
    /// Accumulating clicked points
    Drawing {
        mode: MeasureMode,
        points: Vec<LatLng>,
        finished: bool,
    },
}

pub struct MeasurementSession {
    state: MeasureState,
}

impl MeasurementSession {
    pub fn new() -> Self {
        Self {
            state: MeasureState::Idle,
        }
    }

    /// Registers the overlay source and its primitives. Idempotent; call once
    /// the surface style is loaded, before any drawing happens.
    pub fn install(&self, surface: &mut dyn RenderSurface) -> Result<()> {
        if surface.has_source(OVERLAY_SOURCE) {
            return Ok(());
        }
        surface.add_overlay_source(OVERLAY_SOURCE)?;

        let before = if surface.has_layer_primitive(crate::layers::adapter::LABELS_PRIMITIVE) {
            Some(crate::layers::adapter::LABELS_PRIMITIVE)
        } else {
            None
        };

        let primitives = [
            LayerPrimitive {
                id: OVERLAY_FILL.to_string(),
                source: OVERLAY_SOURCE.to_string(),
                source_layer: None,
                paint: PaintSpec::Fill {
                    color: MEASURE_COLOR.to_string(),
                    opacity: 0.2,
                },
                geometry_filter: None,
            },
            LayerPrimitive {
                id: OVERLAY_LINE.to_string(),
                source: OVERLAY_SOURCE.to_string(),
                source_layer: None,
                paint: PaintSpec::Line {
                    color: MEASURE_COLOR.to_string(),
                    width: 2.0,
                },
                geometry_filter: None,
            },
            LayerPrimitive {
                id: OVERLAY_POINTS.to_string(),
                source: OVERLAY_SOURCE.to_string(),
                source_layer: None,
                paint: PaintSpec::Circle {
                    color: MEASURE_COLOR.to_string(),
                    radius: 4.0,
                    stroke_color: "#fff".to_string(),
                    stroke_width: 1.0,
                },
                geometry_filter: None,
            },
        ];
        for primitive in &primitives {
            surface.add_layer_primitive(primitive, before)?;
        }
        Ok(())
    }

    /// Arms a tool. Always a hard reset, never additive: any prior drawing
    /// is discarded regardless of its mode.
    pub fn start(&mut self, mode: MeasureMode, surface: &mut dyn RenderSurface) -> Result<()> {
        self.state = MeasureState::Drawing {
            mode,
            points: Vec::new(),
            finished: false,
        };
        self.sync(surface)
    }

    /// Appends a clicked point. Coincident points are legal and contribute
    /// zero-length segments. Returns whether the point was accepted (no-op
    /// when idle or finished).
    pub fn add_point(&mut self, p: LatLng, surface: &mut dyn RenderSurface) -> Result<bool> {
        let accepted = match &mut self.state {
            MeasureState::Drawing {
                points, finished, ..
            } if !*finished => {
                points.push(p);
                true
            }
            _ => false,
        };
        if accepted {
            self.sync(surface)?;
        }
        Ok(accepted)
    }

    /// Freezes the drawing; points stay on screen, further clicks are no-ops
    pub fn finish(&mut self, surface: &mut dyn RenderSurface) -> Result<()> {
        let changed = match &mut self.state {
            MeasureState::Drawing { finished, .. } => {
                *finished = true;
                true
            }
            MeasureState::Idle => false,
        };
        if changed {
            self.sync(surface)?;
        }
        Ok(())
    }

    /// Disarms the tool and wipes the overlay
    pub fn clear(&mut self, surface: &mut dyn RenderSurface) -> Result<()> {
        self.state = MeasureState::Idle;
        self.sync(surface)
    }

    pub fn state(&self) -> &MeasureState {
        &self.state
    }

    pub fn mode(&self) -> Option<MeasureMode> {
        match &self.state {
            MeasureState::Drawing { mode, .. } => Some(*mode),
            MeasureState::Idle => None,
        }
    }

    pub fn points(&self) -> &[LatLng] {
        match &self.state {
            MeasureState::Drawing { points, .. } => points,
            MeasureState::Idle => &[],
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, MeasureState::Drawing { finished: true, .. })
    }

    /// True while clicks should feed the drawing
    pub fn is_capturing(&self) -> bool {
        matches!(self.state, MeasureState::Drawing { finished: false, .. })
    }

    /// Live length of the drawing, meters; zero outside length mode
    pub fn current_length(&self) -> f64 {
        match &self.state {
            MeasureState::Drawing {
                mode: MeasureMode::Length,
                points,
                ..
            } => geodesic::length(points),
            _ => 0.0,
        }
    }

    /// Live area of the drawing, square meters; zero outside area mode
    pub fn current_area(&self) -> f64 {
        match &self.state {
            MeasureState::Drawing {
                mode: MeasureMode::Area,
                points,
                ..
            } => geodesic::area(points),
            _ => 0.0,
        }
    }

    fn sync(&self, surface: &mut dyn RenderSurface) -> Result<()> {
        let data = match &self.state {
            MeasureState::Idle => OverlayData::empty(),
            MeasureState::Drawing { mode, points, .. } => overlay::collection(*mode, points),
        };
        surface.set_overlay_data(OVERLAY_SOURCE, &data)
    }
}

impl Default for MeasurementSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats a length for display, switching to kilometers at 1000 m
pub fn format_length(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{:.1} m", meters)
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}

/// Formats an area for display, switching to square kilometers at 1 km²
pub fn format_area(square_meters: f64) -> String {
    if square_meters < 1e6 {
        format!("{:.0} m²", square_meters)
    } else {
        format!("{:.2} km²", square_meters / 1e6)
    }
}
