use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single GPS fix as delivered by the position source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    /// Meters, >= 0
    pub accuracy: Option<f64>,
    /// Degrees clockwise from north, [0, 360)
    pub heading: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn new(lat: f64, lon: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            lat,
            lon,
            accuracy: None,
            heading: None,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaypointId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrailId(pub u64);

/// A user-marked point of interest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub id: WaypointId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub created_at: DateTime<Utc>,
}

/// One sample of a trail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailPoint {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
    pub accuracy: Option<f64>,
}

impl TrailPoint {
    pub fn new(lat: f64, lon: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            lat,
            lon,
            timestamp,
            accuracy: None,
        }
    }
}

impl From<&Position> for TrailPoint {
    fn from(pos: &Position) -> Self {
        Self {
            lat: pos.lat,
            lon: pos.lon,
            timestamp: pos.timestamp,
            accuracy: pos.accuracy,
        }
    }
}

/// Where a trail came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailProvenance {
    Recorded,
    Imported,
}

impl TrailProvenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recorded => "recorded",
            Self::Imported => "imported",
        }
    }
}

impl fmt::Display for TrailProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrailProvenance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recorded" => Ok(Self::Recorded),
            "imported" => Ok(Self::Imported),
            other => Err(format!("unknown trail provenance '{other}'")),
        }
    }
}

/// A named, ordered sequence of trail points.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trail {
    pub id: TrailId,
    pub name: String,
    pub provenance: TrailProvenance,
    pub points: Vec<TrailPoint>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Total length in meters
    pub distance: Option<f64>,
}

/// Track file formats accepted for import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFormat {
    Gpx,
    Kml,
}

impl TrackFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gpx => "gpx",
            Self::Kml => "kml",
        }
    }

    /// Format implied by a file name's extension, matched case-insensitively.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        if ext.eq_ignore_ascii_case("gpx") {
            Some(Self::Gpx)
        } else if ext.eq_ignore_ascii_case("kml") {
            Some(Self::Kml)
        } else {
            None
        }
    }

    /// File name without this format's extension.
    pub fn strip_extension<'a>(&self, file_name: &'a str) -> &'a str {
        let ext = self.extension();
        match file_name.len().checked_sub(ext.len() + 1) {
            Some(cut)
                if file_name.is_char_boundary(cut)
                    && file_name[cut..].starts_with('.')
                    && file_name[cut + 1..].eq_ignore_ascii_case(ext) =>
            {
                &file_name[..cut]
            }
            _ => file_name,
        }
    }
}

impl fmt::Display for TrackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gpx => "GPX",
            Self::Kml => "KML",
        })
    }
}
