//! JS surface tests. Run with `wasm-pack test --headless --firefox`.
#![cfg(target_arch = "wasm32")]

use hike_tracker_wasm::geolocation::{error_message, position_from_js, position_options};
use hike_tracker_wasm::options::GeolocationOptions;
use hike_tracker_wasm::{HikeTracker, parse_track_file};
use js_sys::{Array, Object, Reflect};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const GPX: &str = r#"<gpx><trk><trkseg>
  <trkpt lat="46.5" lon="7.9"><time>2025-01-01T06:00:00Z</time></trkpt>
  <trkpt lat="46.6" lon="8.0"><time>2025-01-01T06:01:00Z</time></trkpt>
</trkseg></trk></gpx>"#;

fn get(obj: &JsValue, key: &str) -> JsValue {
    Reflect::get(obj, &JsValue::from_str(key)).unwrap()
}

fn object(fields: &[(&str, JsValue)]) -> JsValue {
    let obj = Object::new();
    for (key, value) in fields {
        Reflect::set(&obj, &JsValue::from_str(key), value).unwrap();
    }
    obj.into()
}

#[wasm_bindgen_test]
fn parse_track_file_returns_trail_object() {
    let trail = parse_track_file(GPX, "Lake.gpx").unwrap();
    assert_eq!(get(&trail, "name").as_string().as_deref(), Some("Lake"));
    assert_eq!(get(&trail, "provenance").as_string().as_deref(), Some("imported"));
    assert_eq!(Array::from(&get(&trail, "points")).length(), 2);
}

#[wasm_bindgen_test]
fn parse_track_file_rejects_other_extensions() {
    let err = parse_track_file(GPX, "Lake.txt").unwrap_err();
    assert!(err.as_string().unwrap().contains("unsupported file type"));
}

#[wasm_bindgen_test]
fn import_then_export_trail() {
    let tracker = HikeTracker::new(JsValue::UNDEFINED).unwrap();
    let trail = tracker.import_trail(GPX, "Lake.gpx").unwrap();
    let id = get(&trail, "id").as_f64().unwrap();

    let file = tracker.export_trail(id, "imported").unwrap();
    assert_eq!(
        get(&file, "fileName").as_string().as_deref(),
        Some("Lake-2025-01-01.gpx")
    );

    let commands = Array::from(&tracker.drain_render_commands().unwrap());
    assert!(commands.length() >= 2);
    assert_eq!(
        get(&commands.get(0), "type").as_string().as_deref(),
        Some("setPath")
    );
}

#[wasm_bindgen_test]
fn waypoint_without_position_is_rejected() {
    let tracker = HikeTracker::new(JsValue::NULL).unwrap();
    let err = tracker.add_waypoint().unwrap_err();
    assert_eq!(err.as_string().as_deref(), Some("location unavailable"));

    let err = tracker.export_waypoints().unwrap_err();
    assert_eq!(err.as_string().as_deref(), Some("nothing to export"));
}

#[wasm_bindgen_test]
fn stop_without_recording_reports_outcome() {
    let tracker = HikeTracker::new(JsValue::UNDEFINED).unwrap();
    let outcome = tracker.stop_recording().unwrap();
    assert_eq!(
        get(&outcome, "outcome").as_string().as_deref(),
        Some("notRecording")
    );
}

#[wasm_bindgen_test]
fn position_is_read_from_geolocation_payload() {
    let coords = object(&[
        ("latitude", JsValue::from_f64(46.5)),
        ("longitude", JsValue::from_f64(7.9)),
        ("accuracy", JsValue::from_f64(12.0)),
        ("heading", JsValue::NULL),
    ]);
    let payload = object(&[
        ("coords", coords),
        ("timestamp", JsValue::from_f64(1_735_711_200_000.0)),
    ]);

    let position = position_from_js(&payload).unwrap();
    assert_eq!(position.lat, 46.5);
    assert_eq!(position.lon, 7.9);
    assert_eq!(position.accuracy, Some(12.0));
    assert_eq!(position.heading, None);
    assert_eq!(position.timestamp.timestamp_millis(), 1_735_711_200_000);
}

#[wasm_bindgen_test]
fn nan_heading_is_dropped_and_missing_coords_rejected() {
    let coords = object(&[
        ("latitude", JsValue::from_f64(46.5)),
        ("longitude", JsValue::from_f64(7.9)),
        ("heading", JsValue::from_f64(f64::NAN)),
    ]);
    let payload = object(&[("coords", coords), ("timestamp", JsValue::from_f64(0.0))]);
    assert_eq!(position_from_js(&payload).unwrap().heading, None);

    assert!(position_from_js(&object(&[])).is_none());
}

#[wasm_bindgen_test]
fn error_message_reads_message_field() {
    let err = object(&[
        ("code", JsValue::from_f64(1.0)),
        ("message", JsValue::from_str("User denied Geolocation")),
    ]);
    assert_eq!(error_message(&err), "User denied Geolocation");
}

#[wasm_bindgen_test]
fn geolocation_options_are_forwarded() {
    let js = JsValue::from(position_options(&GeolocationOptions::default()));
    assert_eq!(get(&js, "enableHighAccuracy").as_bool(), Some(true));
    assert_eq!(get(&js, "timeout").as_f64(), Some(10_000.0));
    assert_eq!(get(&js, "maximumAge").as_f64(), Some(1_000.0));
}

#[wasm_bindgen_test]
fn stop_tracking_cancels_the_watch() {
    let tracker = HikeTracker::new(JsValue::UNDEFINED).unwrap();
    tracker.start_tracking(None).unwrap();
    assert!(tracker.is_tracking());

    tracker.stop_tracking();
    assert!(!tracker.is_tracking());

    tracker.start_tracking(None).unwrap();
    tracker.teardown();
    assert!(!tracker.is_tracking());
}
