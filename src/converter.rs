use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::track_types::*;

/// Convert waypoints and trails to a GeoJSON FeatureCollection for map sources.
pub fn to_feature_collection<'a>(
    waypoints: &[Waypoint],
    trails: impl IntoIterator<Item = &'a Trail>,
) -> FeatureCollection {
    let mut features: Vec<Feature> = waypoints.iter().map(waypoint_to_feature).collect();
    features.extend(trails.into_iter().filter_map(trail_to_feature));

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// GeoJSON positions are `[lon, lat]`.
fn point_coords(lat: f64, lon: f64) -> Vec<f64> {
    vec![lon, lat]
}

/// Path geometry for a trail: a LineString, or a Point for a single sample.
pub fn path_geometry(points: &[TrailPoint]) -> Option<Geometry> {
    match points {
        [] => None,
        [only] => Some(Geometry::new(Value::Point(point_coords(only.lat, only.lon)))),
        _ => Some(Geometry::new(Value::LineString(
            points.iter().map(|pt| point_coords(pt.lat, pt.lon)).collect(),
        ))),
    }
}

pub fn waypoint_to_feature(wpt: &Waypoint) -> Feature {
    let geometry = Geometry::new(Value::Point(point_coords(wpt.lat, wpt.lon)));

    let mut props = Map::new();
    props.insert("kind".to_string(), JsonValue::String("waypoint".to_string()));
    props.insert("id".to_string(), JsonValue::Number(wpt.id.0.into()));
    props.insert("name".to_string(), JsonValue::String(wpt.name.clone()));
    props.insert(
        "time".to_string(),
        JsonValue::String(wpt.created_at.to_rfc3339()),
    );

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

pub fn trail_to_feature(trail: &Trail) -> Option<Feature> {
    let geometry = path_geometry(&trail.points)?;

    let mut props = Map::new();
    props.insert("kind".to_string(), JsonValue::String("trail".to_string()));
    props.insert("id".to_string(), JsonValue::Number(trail.id.0.into()));
    props.insert("name".to_string(), JsonValue::String(trail.name.clone()));
    props.insert(
        "provenance".to_string(),
        JsonValue::String(trail.provenance.as_str().to_string()),
    );
    props.insert(
        "startTime".to_string(),
        JsonValue::String(trail.start_time.to_rfc3339()),
    );
    if let Some(end) = &trail.end_time {
        props.insert("endTime".to_string(), JsonValue::String(end.to_rfc3339()));
    }
    if let Some(n) = trail.distance.and_then(serde_json::Number::from_f64) {
        props.insert("distance".to_string(), JsonValue::Number(n));
    }
    insert_coordinate_times(&mut props, &trail.points);

    Some(Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(props),
        foreign_members: None,
    })
}

fn insert_coordinate_times(props: &mut Map<String, JsonValue>, points: &[TrailPoint]) {
    let times: Vec<JsonValue> = points
        .iter()
        .map(|pt| JsonValue::String(pt.timestamp.to_rfc3339()))
        .collect();
    let mut coord_props = Map::new();
    coord_props.insert("times".to_string(), JsonValue::Array(times));
    props.insert(
        "coordinateProperties".to_string(),
        JsonValue::Object(coord_props),
    );
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn trail(points: Vec<TrailPoint>) -> Trail {
        Trail {
            id: TrailId(42),
            name: "Ridge".to_string(),
            provenance: TrailProvenance::Imported,
            start_time: points[0].timestamp,
            end_time: None,
            distance: Some(1234.5),
            points,
        }
    }

    #[test]
    fn test_trail_feature_is_lon_lat_line() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let f = trail_to_feature(&trail(vec![
            TrailPoint::new(46.5, 7.9, t),
            TrailPoint::new(46.6, 8.0, t),
        ]))
        .unwrap();

        let geom = f.geometry.as_ref().unwrap();
        if let Value::LineString(coords) = &geom.value {
            assert_eq!(coords.len(), 2);
            assert_eq!(coords[0], vec![7.9, 46.5]);
        } else {
            panic!("Expected LineString");
        }

        let props = f.properties.as_ref().unwrap();
        assert_eq!(props["provenance"], "imported");
        assert_eq!(props["distance"], 1234.5);
        assert!(props.get("endTime").is_none());
        assert_eq!(
            props["coordinateProperties"]["times"].as_array().unwrap().len(),
            2
        );
    }

    #[test]
    fn test_single_point_trail_is_point() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let f = trail_to_feature(&trail(vec![TrailPoint::new(46.5, 7.9, t)])).unwrap();
        assert!(matches!(f.geometry.unwrap().value, Value::Point(_)));
    }

    #[test]
    fn test_collection_orders_waypoints_first() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let wpt = Waypoint {
            id: WaypointId(1),
            name: "Hut".to_string(),
            lat: 46.5,
            lon: 7.9,
            created_at: t,
        };
        let tr = trail(vec![TrailPoint::new(46.5, 7.9, t), TrailPoint::new(46.6, 8.0, t)]);
        let fc = to_feature_collection(&[wpt], [&tr]);
        let kinds: Vec<&str> = fc
            .features
            .iter()
            .map(|f| f.properties.as_ref().unwrap()["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["waypoint", "trail"]);
    }
}
