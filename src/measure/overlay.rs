//! Builds the live overlay feature collection for a measurement in progress.

use crate::core::geo::LatLng;
use crate::measure::session::MeasureMode;
use crate::render::surface::{OverlayData, OverlayFeature, OverlayGeometry};

fn coord(p: &LatLng) -> [f64; 2] {
    [p.lng, p.lat]
}

/// Feature collection for the current drawing: the measured line or polygon
/// plus one point feature per clicked vertex.
pub(crate) fn collection(mode: MeasureMode, points: &[LatLng]) -> OverlayData {
    let mut features = Vec::with_capacity(points.len() + 1);

    match mode {
        MeasureMode::Length if points.len() >= 2 => {
            features.push(OverlayFeature::new(OverlayGeometry::LineString {
                coordinates: points.iter().map(coord).collect(),
            }));
        }
        MeasureMode::Area if points.len() >= 3 => {
            // Closed ring: repeat the first vertex
            let mut ring: Vec<[f64; 2]> = points.iter().map(coord).collect();
            ring.push(coord(&points[0]));
            features.push(OverlayFeature::new(OverlayGeometry::Polygon {
                coordinates: vec![ring],
            }));
        }
        _ => {}
    }

    for p in points {
        features.push(OverlayFeature::new(OverlayGeometry::Point {
            coordinates: coord(p),
        }));
    }

    OverlayData { features }
}
