//! Great-circle length and planar polygon area over geographic points.
//!
//! Both functions are pure and deterministic. Degenerate inputs are not
//! errors: fewer than two points measure zero length, fewer than three
//! measure zero area.

use crate::core::geo::LatLng;
use std::f64::consts::PI;

/// Mean Earth radius in meters, shared by the haversine distance and the
/// spherical-Mercator projection below.
pub const MEAN_EARTH_RADIUS: f64 = 6_371_008.8;

/// Great-circle distance between two coordinates via the haversine formula,
/// in meters.
pub fn distance(a: &LatLng, b: &LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * MEAN_EARTH_RADIUS * h.sqrt().asin()
}

/// Total great-circle length of a polyline, in meters.
pub fn length(points: &[LatLng]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .windows(2)
        .map(|pair| distance(&pair[0], &pair[1]))
        .sum()
}

/// Polygon area in square meters, computed with the shoelace formula on
/// spherical-Mercator projected coordinates.
///
/// This is a conformal planar approximation, not an ellipsoidal area: good
/// enough for on-screen estimation, not survey-grade, and the bias grows
/// with latitude and polygon extent.
pub fn area(points: &[LatLng]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let projected: Vec<(f64, f64)> = points.iter().map(to_planar).collect();
    let mut sum = 0.0;
    for i in 0..projected.len() {
        let (x1, y1) = projected[i];
        let (x2, y2) = projected[(i + 1) % projected.len()];
        sum += x1 * y2 - x2 * y1;
    }
    sum.abs() / 2.0
}

/// Spherical-Mercator projection to planar meters
fn to_planar(p: &LatLng) -> (f64, f64) {
    let x = MEAN_EARTH_RADIUS * p.lng.to_radians();
    let y = MEAN_EARTH_RADIUS * (PI / 4.0 + p.lat.to_radians() / 2.0).tan().ln();
    (x, y)
}
