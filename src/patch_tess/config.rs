//! Scene configuration.
//!
//! Every field has a default, so an empty TOML file (or no file at all)
//! reproduces the stock scene: 65 degree FOV, near 0.1, far 20, a camera
//! orbiting at radius 6 from azimuth pi/2 and elevation pi/6, and a 4x
//! multisampled target.
//!
//! ```toml
//! [camera]
//! fov_y_degrees = 50.0
//! orbit_radius = 8.0
//!
//! [tessellation]
//! edge_factor = 24.0
//! ```

use super::error::ConfigError;
use super::metal_types::{MAX_TESSELLATION_FACTOR, MIN_TESSELLATION_FACTOR};
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_6};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub model: ModelConfig,
    pub tessellation: TessellationConfig,
    pub target: TargetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub orbit_radius: f32,
    /// Radians.
    pub initial_azimuth: f32,
    /// Radians, clamped to [-pi/2, pi/2] by the camera.
    pub initial_elevation: f32,
    /// Radians per point of drag.
    pub drag_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 65.0,
            near: 0.1,
            far: 20.0,
            orbit_radius: 6.0,
            initial_azimuth: FRAC_PI_2,
            initial_elevation: FRAC_PI_6,
            drag_sensitivity: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Vertical translation applied after the up-axis remap.
    pub vertical_offset: f32,
    /// Treat the authored surface as Z-up and remap it to Y-up.
    pub z_up: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            vertical_offset: -1.0,
            z_up: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationConfig {
    pub edge_factor: f32,
    pub inside_factor: f32,
}

impl Default for TessellationConfig {
    fn default() -> Self {
        Self {
            edge_factor: 16.0,
            inside_factor: 16.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub sample_count: u64,
    pub clear_color: [f64; 4],
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            sample_count: 4,
            clear_color: [0.05, 0.05, 0.08, 1.0],
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl SceneConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SceneConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::from_toml_str(&content)?;
        info!("loaded scene config from {}", path.display());
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check every range, collecting all failures.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let camera = &self.camera;

        for (name, value) in [
            ("camera.fov_y_degrees", camera.fov_y_degrees),
            ("camera.near", camera.near),
            ("camera.far", camera.far),
            ("camera.orbit_radius", camera.orbit_radius),
            ("camera.initial_azimuth", camera.initial_azimuth),
            ("camera.initial_elevation", camera.initial_elevation),
            ("camera.drag_sensitivity", camera.drag_sensitivity),
            ("model.vertical_offset", self.model.vertical_offset),
        ] {
            if !value.is_finite() {
                errors.push(format!("{name} must be finite, got {value}"));
            }
        }
        if self.target.clear_color.iter().any(|c| !c.is_finite()) {
            errors.push(format!(
                "target.clear_color must be finite, got {:?}",
                self.target.clear_color
            ));
        }

        let fov = camera.fov_y_degrees;
        if fov.is_finite() && !(fov > 0.0 && fov < 180.0) {
            errors.push(format!(
                "camera.fov_y_degrees must be in (0, 180), got {}",
                camera.fov_y_degrees
            ));
        }
        if camera.near.is_finite() && !(camera.near > 0.0) {
            errors.push(format!("camera.near must be positive, got {}", camera.near));
        }
        if camera.far.is_finite() && !(camera.far > camera.near) {
            errors.push(format!(
                "camera.far ({}) must be greater than camera.near ({})",
                camera.far, camera.near
            ));
        }
        if camera.orbit_radius.is_finite() && !(camera.orbit_radius > 0.0) {
            errors.push(format!(
                "camera.orbit_radius must be positive, got {}",
                camera.orbit_radius
            ));
        }
        if camera.drag_sensitivity.is_finite() && !(camera.drag_sensitivity > 0.0) {
            errors.push(format!(
                "camera.drag_sensitivity must be positive, got {}",
                camera.drag_sensitivity
            ));
        }

        validate_factor(&mut errors, "tessellation.edge_factor", self.tessellation.edge_factor);
        validate_factor(&mut errors, "tessellation.inside_factor", self.tessellation.inside_factor);

        if ![1, 2, 4, 8].contains(&self.target.sample_count) {
            errors.push(format!(
                "target.sample_count must be 1, 2, 4 or 8, got {}",
                self.target.sample_count
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

fn validate_factor(errors: &mut Vec<String>, name: &str, value: f32) {
    if !(MIN_TESSELLATION_FACTOR..=MAX_TESSELLATION_FACTOR).contains(&value) {
        errors.push(format!(
            "{name} must be in [{MIN_TESSELLATION_FACTOR}, {MAX_TESSELLATION_FACTOR}], got {value}"
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SceneConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = SceneConfig::from_toml_str("").unwrap();
        assert_eq!(config, SceneConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = SceneConfig::from_toml_str("[camera]\norbit_radius = 9.0\n").unwrap();
        assert_eq!(config.camera.orbit_radius, 9.0);
        assert_eq!(config.camera.fov_y_degrees, 65.0);
        assert_eq!(config.target.sample_count, 4);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = SceneConfig::default();
        config.camera.near = 30.0;
        config.tessellation.edge_factor = 0.5;
        config.target.sample_count = 3;
        match config.validate() {
            Err(ConfigError::Invalid(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let mut config = SceneConfig::default();
        config.camera.far = f32::INFINITY;
        config.camera.initial_elevation = f32::NAN;
        config.model.vertical_offset = f32::NEG_INFINITY;
        match config.validate() {
            Err(ConfigError::Invalid(errors)) => {
                assert_eq!(errors.len(), 3, "{:?}", errors);
                assert!(errors.iter().all(|e| e.contains("finite")));
            }
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = SceneConfig::from_toml_str("[camera\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = SceneConfig::default();
        config.tessellation.inside_factor = 8.0;
        let text = config.to_toml_string().unwrap();
        assert_eq!(SceneConfig::from_toml_str(&text).unwrap(), config);
    }
}
