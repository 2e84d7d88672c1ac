use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::error::ParseError;
use crate::geodesy::track_distance;
use crate::track_types::{TrackFormat, Trail, TrailId, TrailPoint, TrailProvenance};
use crate::xml::{Element, parse_document};

type Result<T> = std::result::Result<T, ParseError>;

/// Parse a GPX or KML document into an imported trail.
///
/// Points without a usable timestamp are stamped with the current time, so two
/// parses of the same file can differ in their timestamps.
pub fn parse_trail(content: &str, file_name: &str, format: TrackFormat) -> Result<Trail> {
    parse_trail_at(content, file_name, format, Utc::now())
}

/// Same as [`parse_trail`] with an explicit "now" for timestamp fallbacks.
pub fn parse_trail_at(
    content: &str,
    file_name: &str,
    format: TrackFormat,
    now: DateTime<Utc>,
) -> Result<Trail> {
    let root = parse_document(content)?;
    let points = match format {
        TrackFormat::Gpx => gpx_points(&root, now),
        TrackFormat::Kml => kml_points(&root, now),
    };

    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(ParseError::NoValidPoints { format });
    };
    let start_time = first.timestamp;
    let end_time = last.timestamp;

    log::debug!("parsed {} points from {format} file '{file_name}'", points.len());

    Ok(Trail {
        id: TrailId(now.timestamp_millis().max(0) as u64),
        name: format.strip_extension(file_name).to_string(),
        provenance: TrailProvenance::Imported,
        distance: Some(track_distance(&points)),
        points,
        start_time,
        end_time: Some(end_time),
    })
}

/// (0, 0)-style fixes are treated as invalid: a coordinate that is exactly
/// zero is dropped. Genuine points on the equator or prime meridian are lost.
fn usable(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && lat != 0.0 && lon != 0.0
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

/// RFC 3339, or a local date-time without offset read as UTC.
fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|t| t.and_utc())
}

fn gpx_points(root: &Element, now: DateTime<Utc>) -> Vec<TrailPoint> {
    let mut points = Vec::new();
    for trkpt in root.descendants("trkpt") {
        let lat = trkpt.attribute("lat").and_then(parse_number);
        let lon = trkpt.attribute("lon").and_then(parse_number);
        let (Some(lat), Some(lon)) = (lat, lon) else {
            continue;
        };
        if !usable(lat, lon) {
            continue;
        }
        let time = trkpt
            .find("time")
            .and_then(|t| parse_time(t.text()))
            .unwrap_or(now);
        points.push(TrailPoint::new(lat, lon, time));
    }
    points
}

fn kml_points(root: &Element, now: DateTime<Utc>) -> Vec<TrailPoint> {
    let points = kml_line_strings(root, now);
    if !points.is_empty() {
        return points;
    }
    log::debug!("no LineString points, falling back to Placemarks");

    let points = kml_placemarks(root, now);
    if !points.is_empty() {
        return points;
    }
    log::debug!("no Placemark points, falling back to gx:Track");

    kml_tracks(root, now)
}

/// Parse a "lon,lat[,alt]" tuple into (lat, lon).
fn parse_kml_tuple(tuple: &str) -> Option<(f64, f64)> {
    let mut parts = tuple.split(',');
    let lon = parse_number(parts.next()?)?;
    let lat = parse_number(parts.next()?)?;
    usable(lat, lon).then_some((lat, lon))
}

fn kml_line_strings(root: &Element, now: DateTime<Utc>) -> Vec<TrailPoint> {
    root.descendants("LineString")
        .into_iter()
        .flat_map(|line| line.descendants("coordinates"))
        .flat_map(|coords| coords.text().split_whitespace())
        .filter_map(parse_kml_tuple)
        .map(|(lat, lon)| TrailPoint::new(lat, lon, now))
        .collect()
}

/// One point per Placemark. Real times are not available, so points are
/// spaced one second apart to keep them ordered.
fn kml_placemarks(root: &Element, now: DateTime<Utc>) -> Vec<TrailPoint> {
    let mut points: Vec<TrailPoint> = Vec::new();
    for placemark in root.descendants("Placemark") {
        let Some(coords) = placemark.find("coordinates") else {
            continue;
        };
        let Some((lat, lon)) = coords
            .text()
            .split_whitespace()
            .next()
            .and_then(parse_kml_tuple)
        else {
            continue;
        };
        let time = now + Duration::seconds(points.len() as i64);
        points.push(TrailPoint::new(lat, lon, time));
    }
    points
}

/// `gx:Track` samples: "lon lat[ alt]" in `gx:coord`, paired by index with
/// the track's `when` elements when present.
fn kml_tracks(root: &Element, now: DateTime<Utc>) -> Vec<TrailPoint> {
    let mut points = Vec::new();
    for track in root.descendants("Track") {
        let whens: Vec<Option<DateTime<Utc>>> = track
            .children_named("when")
            .map(|w| parse_time(w.text()))
            .collect();

        for (i, coord) in track.children_named("coord").enumerate() {
            let mut parts = coord.text().split_whitespace();
            let lon = parts.next().and_then(parse_number);
            let lat = parts.next().and_then(parse_number);
            let (Some(lat), Some(lon)) = (lat, lon) else {
                continue;
            };
            if !usable(lat, lon) {
                continue;
            }
            let time = whens.get(i).copied().flatten().unwrap_or(now);
            points.push(TrailPoint::new(lat, lon, time));
        }
    }
    points
}
