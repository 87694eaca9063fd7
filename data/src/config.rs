use std::path::Path;
use std::time::Duration;
use std::{fs, io};

use serde::{Deserialize, Serialize};

use crate::interaction::{DEFAULT_MIN_BRUSH_PX, DEFAULT_ZOOM_STEP};
use crate::metric::MetricTag;

pub const MIN_BRIGHTNESS: f64 = 0.01;
pub const MAX_BRIGHTNESS: f64 = 100.0;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub brightness: f64,
    pub metric: MetricTag,
    /// Drags smaller than this on both axes count as clicks.
    pub min_brush_px: f32,
    /// Zoom factor per wheel line.
    pub zoom_step: f64,
    pub min_visible_cols: f64,
    pub min_visible_rows: f64,
    pub scheme_cache_capacity: usize,
    pub scheme_cache_ttl_secs: u64,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        HeatmapConfig {
            brightness: 1.0,
            metric: MetricTag::default(),
            min_brush_px: DEFAULT_MIN_BRUSH_PX,
            zoom_step: DEFAULT_ZOOM_STEP,
            min_visible_cols: 2.0,
            min_visible_rows: 2.0,
            scheme_cache_capacity: 16,
            scheme_cache_ttl_secs: 600,
        }
    }
}

impl HeatmapConfig {
    pub fn with_brightness(mut self, brightness: f64) -> Self {
        self.brightness = clamp_brightness(brightness);
        self
    }

    pub fn scheme_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.scheme_cache_ttl_secs)
    }
}

pub fn clamp_brightness(brightness: f64) -> f64 {
    if brightness.is_nan() {
        return 1.0;
    }
    brightness.clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS)
}

/// Reads a config file, falling back to defaults when it does not exist.
pub fn load(path: &Path) -> Result<HeatmapConfig, Error> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(HeatmapConfig::default());
        }
        Err(err) => return Err(err.into()),
    };

    Ok(serde_json::from_str(&contents)?)
}

pub fn save(path: &Path, config: &HeatmapConfig) -> Result<(), Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: HeatmapConfig =
            serde_json::from_str(r#"{ "brightness": 2.5, "metric": "read_keys" }"#).unwrap();
        assert_eq!(cfg.brightness, 2.5);
        assert_eq!(cfg.metric, MetricTag::ReadKeys);
        assert_eq!(cfg.min_brush_px, DEFAULT_MIN_BRUSH_PX);
    }

    #[test]
    fn brightness_is_clamped() {
        assert_eq!(HeatmapConfig::default().with_brightness(0.0).brightness, MIN_BRIGHTNESS);
        assert_eq!(HeatmapConfig::default().with_brightness(1e9).brightness, MAX_BRIGHTNESS);
        assert_eq!(HeatmapConfig::default().with_brightness(f64::NAN).brightness, 1.0);
    }

    #[test]
    fn missing_file_is_default() {
        let path = std::env::temp_dir().join("keyviz-missing-config-does-not-exist.json");
        assert_eq!(load(&path).unwrap(), HeatmapConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("keyviz-config-{}", std::process::id()));
        let path = dir.join("heatmap.json");
        let cfg = HeatmapConfig {
            metric: MetricTag::Integration,
            ..HeatmapConfig::default().with_brightness(3.0)
        };

        save(&path, &cfg).unwrap();
        assert_eq!(load(&path).unwrap(), cfg);
        let _ = fs::remove_dir_all(dir);
    }
}
