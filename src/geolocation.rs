//! `navigator.geolocation` as a [`PositionSource`].
//!
//! Positions and errors arrive as plain `JsValue`s and are read field by field,
//! so only the stable `Geolocation` and `PositionOptions` bindings are needed.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use js_sys::Reflect;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Geolocation, PositionOptions};

use crate::error::HikeError;
use crate::options::GeolocationOptions;
use crate::position::{PositionEvent, PositionSink, PositionSource, Subscription};
use crate::track_types::Position;

pub struct BrowserGeolocation {
    geolocation: Geolocation,
}

impl BrowserGeolocation {
    pub fn from_window() -> Result<Self, HikeError> {
        let window = web_sys::window()
            .ok_or_else(|| HikeError::PositionSource("no global `window` exists".into()))?;
        let geolocation = window
            .navigator()
            .geolocation()
            .map_err(|e| HikeError::PositionSource(format!("geolocation unavailable: {e:?}")))?;
        Ok(Self { geolocation })
    }
}

fn field(value: &JsValue, key: &str) -> JsValue {
    Reflect::get(value, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
}

fn finite(value: JsValue) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

/// Read a `GeolocationPosition`-shaped value.
///
/// Returns `None` when latitude or longitude is missing. A missing or
/// non-finite heading or accuracy becomes `None`, and a missing timestamp
/// falls back to the current time.
pub fn position_from_js(value: &JsValue) -> Option<Position> {
    let coords = field(value, "coords");
    let lat = finite(field(&coords, "latitude"))?;
    let lon = finite(field(&coords, "longitude"))?;
    let timestamp = finite(field(value, "timestamp"))
        .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
        .unwrap_or_else(Utc::now);
    Some(Position {
        lat,
        lon,
        accuracy: finite(field(&coords, "accuracy")),
        heading: finite(field(&coords, "heading")),
        timestamp,
    })
}

/// `message` of a `GeolocationPositionError`, or the debug form of anything else.
pub fn error_message(value: &JsValue) -> String {
    match field(value, "message").as_string() {
        Some(message) if !message.is_empty() => message,
        _ => format!("{value:?}"),
    }
}

pub fn position_options(options: &GeolocationOptions) -> PositionOptions {
    let js_options = PositionOptions::new();
    js_options.set_enable_high_accuracy(options.enable_high_accuracy);
    js_options.set_timeout(options.timeout_ms);
    js_options.set_maximum_age(options.maximum_age_ms);
    js_options
}

impl PositionSource for BrowserGeolocation {
    fn watch(&self, options: &GeolocationOptions, sink: PositionSink) -> Result<Subscription, HikeError> {
        let sink = Rc::new(RefCell::new(sink));

        let fix_sink = sink.clone();
        let on_fix = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            match position_from_js(&value) {
                Some(position) => (*fix_sink.borrow_mut())(PositionEvent::Fix(position)),
                None => log::warn!("unexpected geolocation payload: {value:?}"),
            }
        });
        let on_error = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            (*sink.borrow_mut())(PositionEvent::Error(error_message(&value)));
        });

        let watch_id = self
            .geolocation
            .watch_position_with_error_callback_and_options(
                on_fix.as_ref().unchecked_ref(),
                Some(on_error.as_ref().unchecked_ref()),
                &position_options(options),
            )
            .map_err(|e| HikeError::PositionSource(error_message(&e)))?;
        log::debug!("geolocation watch {watch_id} started");

        let geolocation = self.geolocation.clone();
        Ok(Subscription::new(move || {
            geolocation.clear_watch(watch_id);
            log::debug!("geolocation watch {watch_id} cleared");
            // Cancelling can happen from inside one of these callbacks, so the
            // closures are released on a later tick.
            wasm_bindgen_futures::spawn_local(async move {
                drop(on_fix);
                drop(on_error);
            });
        }))
    }
}
