use std::{fs, path::Path, path::PathBuf};

use serde::Deserialize;

use crate::curve::SensitivityCurve;
use crate::output::OutputRange;

pub const DEFAULT_ACTIVE_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_TOUCH_SLOP_PX: f32 = 10.0;
pub const DEFAULT_FLICK_THRESHOLD: f32 = 2.0;
pub const DEFAULT_SPEED_WINDOW_MS: u64 = 300;
pub const DEFAULT_SPEED_NORMALIZE_FACTOR: f32 = 2.0;
pub const DEFAULT_CONFIRM_INTERVAL_MS: u64 = 150;

const MIN_SPEED_WINDOW_MS: u64 = 8;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse gesture config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid gesture config: `{field}` {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// What to do with a gesture that starts while the output is in automatic
/// mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomaticModePolicy {
    /// Abort the session at check-start.
    Abort,
    /// Track as usual but drop horizontal adjustments; a vertical flick can
    /// still switch back to manual.
    #[default]
    TrackWithoutAdjust,
    /// Route horizontal adjustments to the temporary-override channel.
    TemporaryOverride,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeedConfig {
    pub window_ms: u64,
    pub normalize_factor: f32,
    pub horizontal_min: f32,
    pub horizontal_max: f32,
    pub vertical_min: f32,
    pub vertical_max: f32,
}

impl SpeedConfig {
    pub fn clamp_horizontal(&self, scale: f32) -> f32 {
        scale.clamp(self.horizontal_min, self.horizontal_max)
    }

    pub fn clamp_vertical(&self, scale: f32) -> f32 {
        scale.clamp(self.vertical_min, self.vertical_max)
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_SPEED_WINDOW_MS,
            normalize_factor: DEFAULT_SPEED_NORMALIZE_FACTOR,
            horizontal_min: 0.2,
            horizontal_max: 5.0,
            vertical_min: 0.2,
            vertical_max: 10.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HapticConfig {
    /// Spacing of the confirmation pulses after a mode toggle.
    pub confirm_interval_ms: u64,
}

impl Default for HapticConfig {
    fn default() -> Self {
        Self {
            confirm_interval_ms: DEFAULT_CONFIRM_INTERVAL_MS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GestureConfig {
    /// Hold time before a press may turn into a brightness drag.
    pub active_timeout_ms: u64,
    pub touch_slop_px: f32,
    /// Normalized vertical speed at which release toggles the mode.
    pub flick_threshold: f32,
    pub sensitivity: SensitivityCurve,
    pub automatic_mode: AutomaticModePolicy,
    pub output: OutputRange,
    pub speed: SpeedConfig,
    pub haptics: HapticConfig,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            active_timeout_ms: DEFAULT_ACTIVE_TIMEOUT_MS,
            touch_slop_px: DEFAULT_TOUCH_SLOP_PX,
            flick_threshold: DEFAULT_FLICK_THRESHOLD,
            sensitivity: SensitivityCurve::default(),
            automatic_mode: AutomaticModePolicy::default(),
            output: OutputRange::default(),
            speed: SpeedConfig::default(),
            haptics: HapticConfig::default(),
        }
    }
}

impl GestureConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.min >= self.output.max {
            return Err(invalid("output.min", "must be below output.max"));
        }
        if !(self.touch_slop_px >= 0.0) {
            return Err(invalid("touch_slop_px", "must not be negative"));
        }
        if !(self.flick_threshold > 0.0) {
            return Err(invalid("flick_threshold", "must be positive"));
        }
        if self.speed.window_ms < MIN_SPEED_WINDOW_MS {
            return Err(invalid("speed.window_ms", "must be at least 8 ms"));
        }
        if !(self.speed.normalize_factor > 0.0) {
            return Err(invalid("speed.normalize_factor", "must be positive"));
        }
        check_scale_range(
            "speed.horizontal_min",
            self.speed.horizontal_min,
            self.speed.horizontal_max,
        )?;
        check_scale_range(
            "speed.vertical_min",
            self.speed.vertical_min,
            self.speed.vertical_max,
        )?;
        Ok(())
    }
}

fn check_scale_range(field: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    if !(min > 0.0) {
        return Err(invalid(field, "must be positive"));
    }
    if !(min <= max) {
        return Err(invalid(field, "must not exceed its max"));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKED_IN: &str = include_str!("../config/gesture.toml");

    #[test]
    fn checked_in_config_matches_defaults() {
        let config = GestureConfig::from_toml_str(CHECKED_IN).expect("default config should load");
        assert_eq!(config, GestureConfig::default());
    }

    #[test]
    fn empty_document_is_default() {
        let config = GestureConfig::from_toml_str("").expect("empty config should load");
        assert_eq!(config, GestureConfig::default());
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let config = GestureConfig::from_toml_str(
            r#"
            sensitivity = "quadratic"
            automatic_mode = "temporary_override"

            [speed]
            window_ms = 160

            [output]
            max = 255
            "#,
        )
        .expect("partial config should load");

        assert_eq!(config.sensitivity, SensitivityCurve::Quadratic);
        assert_eq!(config.automatic_mode, AutomaticModePolicy::TemporaryOverride);
        assert_eq!(config.speed.window_ms, 160);
        assert_eq!(config.speed.normalize_factor, DEFAULT_SPEED_NORMALIZE_FACTOR);
        assert_eq!(config.output, OutputRange::new(1, 255));
        assert_eq!(config.active_timeout_ms, DEFAULT_ACTIVE_TIMEOUT_MS);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = GestureConfig::from_toml_str("hold_ms = 300").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err}");
    }

    #[test]
    fn inverted_output_range_is_rejected() {
        let err = GestureConfig::from_toml_str("[output]\nmin = 10\nmax = 10").unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { field: "output.min", .. }),
            "{err}"
        );
    }

    #[test]
    fn degenerate_speed_settings_are_rejected() {
        for (raw, field) in [
            ("[speed]\nwindow_ms = 4", "speed.window_ms"),
            ("[speed]\nnormalize_factor = 0.0", "speed.normalize_factor"),
            ("[speed]\nhorizontal_min = 6.0", "speed.horizontal_min"),
            ("[speed]\nvertical_min = 0.0", "speed.vertical_min"),
        ] {
            let err = GestureConfig::from_toml_str(raw).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { field: f, .. } if f == field),
                "{raw}: {err}"
            );
        }
    }

    #[test]
    fn missing_file_reports_path() {
        let err = GestureConfig::from_path(Path::new("/nonexistent/gesture.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/gesture.toml"), "{err}");
    }
}
