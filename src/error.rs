use thiserror::Error;
use wasm_bindgen::JsValue;

use crate::track_types::TrackFormat;

/// Why a track file could not be turned into a trail.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed XML: {0}")]
    Malformed(String),
    #[error("no valid points found in {format} file")]
    NoValidPoints { format: TrackFormat },
}

#[derive(Debug, Error)]
pub enum HikeError {
    #[error("location unavailable")]
    LocationUnavailable,
    #[error("already recording")]
    AlreadyRecording,
    #[error("nothing to export")]
    NothingToExport,
    #[error("unsupported file type: {file_name}")]
    UnsupportedFileType { file_name: String },
    #[error("could not parse file")]
    Parse(#[from] ParseError),
    #[error("position source error: {0}")]
    PositionSource(String),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

impl From<HikeError> for JsValue {
    fn from(e: HikeError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}
