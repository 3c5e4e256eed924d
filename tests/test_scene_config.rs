// Tests for scene configuration loading
//
// Run with: cargo test --test test_scene_config

use bezier_tess::patch_tess::config::SceneConfig;
use bezier_tess::patch_tess::error::ConfigError;
use bezier_tess::patch_tess::frame::FrameSettings;
use bezier_tess::patch_tess::math::rad_from_deg;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_load_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scene.toml");
    fs::write(
        &path,
        "[camera]\nfov_y_degrees = 50.0\nfar = 40.0\n\n[tessellation]\nedge_factor = 24.0\n",
    )
    .unwrap();

    let config = SceneConfig::load(&path).unwrap();
    assert_eq!(config.camera.fov_y_degrees, 50.0);
    assert_eq!(config.camera.far, 40.0);
    assert_eq!(config.camera.near, 0.1);
    assert_eq!(config.tessellation.edge_factor, 24.0);
    assert_eq!(config.tessellation.inside_factor, 16.0);
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.toml");
    match SceneConfig::load(&path) {
        Err(ConfigError::FileNotFound(p)) => assert_eq!(p, path),
        other => panic!("expected FileNotFound, got {:?}", other),
    }
}

#[test]
fn test_invalid_values_are_rejected_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[tessellation]\ninside_factor = 128.0\n").unwrap();
    assert!(matches!(
        SceneConfig::load(&path),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_non_finite_values_are_rejected_on_parse() {
    let result = SceneConfig::from_toml_str("[camera]\nfar = inf\ninitial_elevation = nan\n");
    match result {
        Err(ConfigError::Invalid(errors)) => {
            assert!(errors.iter().any(|e| e.starts_with("camera.far")));
            assert!(errors.iter().any(|e| e.starts_with("camera.initial_elevation")));
        }
        other => panic!("expected Invalid, got {:?}", other),
    }
}

#[test]
fn test_default_settings_match_stock_scene() {
    let settings = FrameSettings::default();
    assert_eq!(settings.fov_y, rad_from_deg(65.0));
    assert_eq!(settings.near, 0.1);
    assert_eq!(settings.far, 20.0);
    assert_eq!(settings.tess_params.edge, 16.0);
    assert_eq!(settings.tess_params.inside, 16.0);
}
