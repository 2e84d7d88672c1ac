use serde::Serialize;

use crate::track_types::TrailPoint;

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters between two lat/lon pairs given in degrees.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Sum of segment lengths along a point sequence. Zero for fewer than 2 points.
pub fn track_distance(points: &[TrailPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| distance_meters(w[0].lat, w[0].lon, w[1].lat, w[1].lon))
        .sum()
}

/// Lat/lon bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

/// Bounding box of a point sequence, `None` when empty.
pub fn bounds(points: &[TrailPoint]) -> Option<Bounds> {
    let first = points.first()?;
    let init = Bounds {
        min_lat: first.lat,
        min_lon: first.lon,
        max_lat: first.lat,
        max_lon: first.lon,
    };
    Some(points.iter().skip(1).fold(init, |b, p| Bounds {
        min_lat: b.min_lat.min(p.lat),
        min_lon: b.min_lon.min(p.lon),
        max_lat: b.max_lat.max(p.lat),
        max_lon: b.max_lon.max(p.lon),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pt(lat: f64, lon: f64) -> TrailPoint {
        TrailPoint::new(lat, lon, Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap())
    }

    #[test]
    fn test_distance_is_symmetric() {
        let ab = distance_meters(46.5, 7.9, 46.6, 8.1);
        let ba = distance_meters(46.6, 8.1, 46.5, 7.9);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance_meters(46.5, 7.9, 46.5, 7.9), 0.0);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // pi * R / 180
        let d = distance_meters(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_194.93).abs() < 0.01);
    }

    #[test]
    fn test_nan_propagates() {
        assert!(distance_meters(f64::NAN, 0.0, 1.0, 1.0).is_nan());
    }

    #[test]
    fn test_track_distance_short_inputs() {
        assert_eq!(track_distance(&[]), 0.0);
        assert_eq!(track_distance(&[pt(10.0, 20.0)]), 0.0);
    }

    #[test]
    fn test_track_distance_is_additive() {
        let points = vec![
            pt(46.50, 7.90),
            pt(46.51, 7.92),
            pt(46.53, 7.93),
            pt(46.54, 7.95),
            pt(46.55, 7.99),
        ];
        let whole = track_distance(&points);
        let head = track_distance(&points[..=2]);
        let tail = track_distance(&points[2..]);
        assert!((whole - (head + tail)).abs() < 1e-6);
    }

    #[test]
    fn test_bounds() {
        assert!(bounds(&[]).is_none());
        let b = bounds(&[pt(10.0, 20.0), pt(12.0, 18.0), pt(11.0, 22.0)]).unwrap();
        assert_eq!(b.min_lat, 10.0);
        assert_eq!(b.max_lat, 12.0);
        assert_eq!(b.min_lon, 18.0);
        assert_eq!(b.max_lon, 22.0);
    }
}
