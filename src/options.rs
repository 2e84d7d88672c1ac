use serde::Deserialize;

/// Options for the hike tracker.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerOptions {
    /// Position source configuration
    #[serde(default)]
    pub geolocation: GeolocationOptions,

    /// Zoom level used when following the current position (default: 16)
    #[serde(default = "default_follow_zoom")]
    pub follow_zoom: f64,

    /// Rotate the map to the direction of travel (default: false)
    #[serde(default)]
    pub track_up: bool,

    /// Browser console log level (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            geolocation: GeolocationOptions::default(),
            follow_zoom: default_follow_zoom(),
            track_up: false,
            log_level: default_log_level(),
        }
    }
}

impl TrackerOptions {
    pub fn log_level(&self) -> log::Level {
        self.log_level.parse().unwrap_or(log::Level::Info)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeolocationOptions {
    #[serde(default = "default_true")]
    pub enable_high_accuracy: bool,

    /// Maximum wait for a fix, in milliseconds (default: 10000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u32,

    /// Maximum age of a cached fix, in milliseconds (default: 1000)
    #[serde(default = "default_maximum_age_ms")]
    pub maximum_age_ms: u32,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: default_timeout_ms(),
            maximum_age_ms: default_maximum_age_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u32 {
    10_000
}

fn default_maximum_age_ms() -> u32 {
    1_000
}

fn default_follow_zoom() -> f64 {
    16.0
}

fn default_log_level() -> String {
    "info".to_string()
}
