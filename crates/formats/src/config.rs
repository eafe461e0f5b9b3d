use foundation::CameraPose;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAP_STYLE: &str =
    "https://basemaps.cartocdn.com/gl/positron-nolabels-gl-style/style.json";
pub const DEFAULT_TILE_URL_TEMPLATE: &str =
    "https://basemaps.cartocdn.com/light_nolabels/{z}/{x}/{y}.png";

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewStateConfig {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
}

impl Default for ViewStateConfig {
    fn default() -> Self {
        Self {
            longitude: -74.75,
            latitude: 40.52,
            zoom: 9.0,
            bearing: 0.0,
            pitch: 0.0,
        }
    }
}

impl From<ViewStateConfig> for CameraPose {
    fn from(v: ViewStateConfig) -> Self {
        CameraPose {
            longitude: v.longitude,
            latitude: v.latitude,
            zoom: v.zoom,
            bearing: v.bearing,
            pitch: v.pitch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Tick periods offered by the speed buttons, in display order.
    pub speeds_ms: Vec<u32>,
    pub initial_speed_ms: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speeds_ms: vec![1000, 250],
            initial_speed_ms: 1000,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub radius_px: f64,
    pub intensity: f64,
    /// Fraction of the peak density below which nothing is drawn.
    pub threshold: f64,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            radius_px: 30.0,
            intensity: 1.0,
            threshold: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub data_url: String,
    pub initial_view: ViewStateConfig,
    pub map_style: String,
    pub tile_url_template: String,
    pub playback: PlaybackConfig,
    pub heatmap: HeatmapConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            data_url: "./data.json".to_string(),
            initial_view: ViewStateConfig::default(),
            map_style: DEFAULT_MAP_STYLE.to_string(),
            tile_url_template: DEFAULT_TILE_URL_TEMPLATE.to_string(),
            playback: PlaybackConfig::default(),
            heatmap: HeatmapConfig::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Json(serde_json::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Json(e) => write!(f, "invalid config json: {e}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ViewerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = serde_json::from_str(json).map_err(ConfigError::Json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let playback = &self.playback;
        if playback.speeds_ms.is_empty() {
            return Err(ConfigError::Invalid("playback.speeds_ms is empty".to_string()));
        }
        if playback.speeds_ms.contains(&0) {
            return Err(ConfigError::Invalid(
                "playback.speeds_ms must be positive".to_string(),
            ));
        }
        if !playback.speeds_ms.contains(&playback.initial_speed_ms) {
            return Err(ConfigError::Invalid(format!(
                "playback.initial_speed_ms {} is not one of {:?}",
                playback.initial_speed_ms, playback.speeds_ms
            )));
        }
        if !(self.heatmap.radius_px.is_finite() && self.heatmap.radius_px > 0.0) {
            return Err(ConfigError::Invalid(
                "heatmap.radius_px must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn initial_pose(&self) -> CameraPose {
        CameraPose::from(self.initial_view).normalized()
    }
}
