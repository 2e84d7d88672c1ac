pub mod converter;
pub mod error;
pub mod export;
pub mod geodesy;
pub mod geolocation;
pub mod options;
pub mod parser;
pub mod position;
pub mod render;
pub mod session;
pub mod track_types;
pub mod tracker;
pub mod xml;

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise};

use crate::error::HikeError;
use crate::geolocation::BrowserGeolocation;
use crate::options::TrackerOptions;
use crate::position::PositionEvent;
use crate::render::CommandQueue;
use crate::session::Session;
use crate::track_types::{TrackFormat, TrailId, TrailProvenance, WaypointId};
use crate::tracker::Tracker;

type SharedTracker = Rc<RefCell<Tracker<CommandQueue>>>;

/// Parse a GPX or KML file into a trail without adding it to any session.
#[wasm_bindgen(js_name = parseTrackFile)]
pub fn parse_track_file(content: &str, file_name: &str) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let format = TrackFormat::from_file_name(file_name).ok_or_else(|| HikeError::UnsupportedFileType {
        file_name: file_name.to_string(),
    })?;
    let trail = parser::parse_trail(content, file_name, format).map_err(HikeError::from)?;
    to_js(&trail)
}

/// Session state plus map command queue, driven from JS.
#[wasm_bindgen]
pub struct HikeTracker {
    inner: SharedTracker,
}

#[wasm_bindgen]
impl HikeTracker {
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<HikeTracker, JsValue> {
        console_error_panic_hook::set_once();

        let opts = parse_options(options)?;
        // A second tracker on the page finds the logger already installed.
        let _ = console_log::init_with_level(opts.log_level());

        let tracker = Tracker::new(Session::new(), CommandQueue::new(), opts);
        Ok(HikeTracker {
            inner: Rc::new(RefCell::new(tracker)),
        })
    }

    /// Start watching the browser position. `on_error` receives the message
    /// when the position source fails; tracking is inactive afterwards.
    #[wasm_bindgen(js_name = startTracking)]
    pub fn start_tracking(&self, on_error: Option<js_sys::Function>) -> Result<(), JsValue> {
        let source = BrowserGeolocation::from_window()?;
        let weak = Rc::downgrade(&self.inner);
        let sink = Box::new(move |event: PositionEvent| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let result = inner.borrow_mut().handle_event(event);
            if let (Err(e), Some(callback)) = (result, &on_error) {
                notify(callback, &e.to_string());
            }
        });
        self.inner.borrow_mut().start_tracking(&source, sink)?;
        Ok(())
    }

    #[wasm_bindgen(js_name = stopTracking)]
    pub fn stop_tracking(&self) {
        self.inner.borrow_mut().stop_tracking();
    }

    #[wasm_bindgen(js_name = isTracking)]
    pub fn is_tracking(&self) -> bool {
        self.inner.borrow().is_tracking()
    }

    #[wasm_bindgen(js_name = setTrackUp)]
    pub fn set_track_up(&self, enabled: bool) {
        self.inner.borrow_mut().set_track_up(enabled);
    }

    #[wasm_bindgen(js_name = addWaypoint)]
    pub fn add_waypoint(&self) -> Result<JsValue, JsValue> {
        let waypoint = self.inner.borrow_mut().add_waypoint()?;
        to_js(&waypoint)
    }

    #[wasm_bindgen(js_name = deleteWaypoint)]
    pub fn delete_waypoint(&self, id: f64) -> bool {
        self.inner
            .borrow_mut()
            .delete_waypoint(WaypointId(id as u64))
            .is_some()
    }

    #[wasm_bindgen(js_name = selectWaypoint)]
    pub fn select_waypoint(&self, id: f64) -> bool {
        self.inner.borrow_mut().select_waypoint(WaypointId(id as u64))
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&self) {
        self.inner.borrow_mut().clear_selection();
    }

    #[wasm_bindgen(js_name = startRecording)]
    pub fn start_recording(&self) -> Result<(), JsValue> {
        self.inner.borrow_mut().start_recording()?;
        Ok(())
    }

    /// Returns `{outcome: "saved", id}`, `{outcome: "tooShort", points}` or
    /// `{outcome: "notRecording"}`.
    #[wasm_bindgen(js_name = stopRecording)]
    pub fn stop_recording(&self) -> Result<JsValue, JsValue> {
        let outcome = self.inner.borrow_mut().stop_recording();
        to_js(&outcome)
    }

    #[wasm_bindgen(js_name = isRecording)]
    pub fn is_recording(&self) -> bool {
        self.inner.borrow().session().is_recording()
    }

    /// Import already-read file text. The extension selects GPX or KML.
    #[wasm_bindgen(js_name = importTrail)]
    pub fn import_trail(&self, content: &str, file_name: &str) -> Result<JsValue, JsValue> {
        let trail = self.inner.borrow_mut().import_file(content, file_name)?;
        to_js(&trail)
    }

    /// Read a `File` from an `<input type="file">` and import it.
    #[wasm_bindgen(js_name = importFile)]
    pub fn import_file(&self, file: web_sys::File) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let file_name = file.name();
            if TrackFormat::from_file_name(&file_name).is_none() {
                let err: JsValue = HikeError::UnsupportedFileType { file_name }.into();
                return Err(err);
            }
            let text = JsFuture::from(file.text())
                .await?
                .as_string()
                .ok_or_else(|| JsValue::from_str("file contents are not text"))?;
            let trail = inner.borrow_mut().import_file(&text, &file_name)?;
            to_js(&trail)
        })
    }

    #[wasm_bindgen(js_name = selectTrail)]
    pub fn select_trail(&self, id: f64, provenance: &str) -> Result<bool, JsValue> {
        let provenance = parse_provenance(provenance)?;
        Ok(self
            .inner
            .borrow_mut()
            .select_trail(provenance, TrailId(id as u64)))
    }

    #[wasm_bindgen(js_name = deleteTrail)]
    pub fn delete_trail(&self, id: f64, provenance: &str) -> Result<bool, JsValue> {
        let provenance = parse_provenance(provenance)?;
        Ok(self
            .inner
            .borrow_mut()
            .delete_trail(provenance, TrailId(id as u64))
            .is_some())
    }

    /// `{fileName, mimeType, contents}` for a GPX download.
    #[wasm_bindgen(js_name = exportWaypoints)]
    pub fn export_waypoints(&self) -> Result<JsValue, JsValue> {
        let file = self.inner.borrow().export_waypoints()?;
        to_js(&file)
    }

    #[wasm_bindgen(js_name = exportTrail)]
    pub fn export_trail(&self, id: f64, provenance: &str) -> Result<JsValue, JsValue> {
        let provenance = parse_provenance(provenance)?;
        let file = self
            .inner
            .borrow()
            .export_trail(provenance, TrailId(id as u64))?;
        to_js(&file)
    }

    pub fn waypoints(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.borrow().session().waypoints())
    }

    pub fn trails(&self, provenance: &str) -> Result<JsValue, JsValue> {
        let provenance = parse_provenance(provenance)?;
        to_js(self.inner.borrow().session().trails(provenance))
    }

    #[wasm_bindgen(js_name = currentPosition)]
    pub fn current_position(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.borrow().session().current_position())
    }

    /// All waypoints and trails as a GeoJSON FeatureCollection string.
    #[wasm_bindgen(js_name = toGeoJson)]
    pub fn to_geojson(&self) -> Result<String, JsValue> {
        let tracker = self.inner.borrow();
        let session = tracker.session();
        let fc = converter::to_feature_collection(session.waypoints(), session.all_trails());
        serde_json::to_string(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Map commands issued since the last call, oldest first.
    #[wasm_bindgen(js_name = drainRenderCommands)]
    pub fn drain_render_commands(&self) -> Result<JsValue, JsValue> {
        let commands = self.inner.borrow_mut().view_mut().drain();
        to_js(&commands)
    }

    /// Cancel the position watch and queue removal of every marker and path.
    pub fn teardown(&self) {
        self.inner.borrow_mut().teardown();
    }
}

/// Hand `message` to a JS callback. A throwing callback is logged, not rethrown.
fn notify(callback: &js_sys::Function, message: &str) {
    if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(message)) {
        log::warn!("position error callback threw: {e:?}");
    }
}

fn parse_options(options: JsValue) -> Result<TrackerOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(TrackerOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| HikeError::InvalidOptions(e.to_string()).into())
    }
}

fn parse_provenance(s: &str) -> Result<TrailProvenance, JsValue> {
    s.parse::<TrailProvenance>()
        .map_err(|e| JsValue::from_str(&e))
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value
        .serialize(&serializer)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
