//! Orbit camera driven by press/drag input.
//!
//! Points are in the target's local coordinate space with Y pointing up.
//! Dragging right increases azimuth; dragging up decreases elevation.
//! Elevation is clamped to [-pi/2, pi/2]; azimuth is left unbounded.

use super::config::CameraConfig;
use super::math::{self, Mat4, Vec3};
use std::f32::consts::FRAC_PI_2;

pub const WORLD_UP: Vec3 = [0.0, 1.0, 0.0];
pub const ORBIT_TARGET: Vec3 = [0.0, 0.0, 0.0];

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    azimuth: f32,
    elevation: f32,
    radius: f32,
    sensitivity: f32,
    last_point: Option<[f32; 2]>,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl OrbitCamera {
    pub fn new(azimuth: f32, elevation: f32, radius: f32, sensitivity: f32) -> Self {
        Self {
            azimuth,
            elevation: clamp_elevation(elevation),
            radius,
            sensitivity,
            last_point: None,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(
            config.initial_azimuth,
            config.initial_elevation,
            config.orbit_radius,
            config.drag_sensitivity,
        )
    }

    /// Record the anchor for the next drag.
    pub fn press(&mut self, x: f32, y: f32) {
        self.last_point = Some([x, y]);
    }

    /// Rotate by the movement since the last recorded point.
    ///
    /// A drag with no preceding press only records the anchor.
    pub fn drag(&mut self, x: f32, y: f32) {
        if let Some([last_x, last_y]) = self.last_point {
            let dx = (x - last_x) * self.sensitivity;
            let dy = (y - last_y) * self.sensitivity;
            self.azimuth += dx;
            self.elevation = clamp_elevation(self.elevation - dy);
        }
        self.last_point = Some([x, y]);
    }

    /// Forget the anchor (button released).
    pub fn release(&mut self) {
        self.last_point = None;
    }

    pub fn azimuth(&self) -> f32 {
        self.azimuth
    }

    pub fn elevation(&self) -> f32 {
        self.elevation
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn position(&self) -> Vec3 {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let (sin_el, cos_el) = self.elevation.sin_cos();
        math::scale([cos_az * cos_el, sin_el, sin_az * cos_el], self.radius)
    }

    /// Camera-to-world transform looking at the origin.
    pub fn world_transform(&self) -> Mat4 {
        math::look_at(ORBIT_TARGET, self.position(), WORLD_UP)
    }
}

/// Convert a window cursor position in physical pixels (Y down) into the
/// point space the camera expects: logical points with Y up.
pub fn window_to_view_point(
    physical: (f64, f64),
    scale_factor: f64,
    physical_height: f64,
) -> (f32, f32) {
    let scale = if scale_factor > 0.0 { scale_factor } else { 1.0 };
    let x = physical.0 / scale;
    let y = (physical_height - physical.1) / scale;
    (x as f32, y as f32)
}

fn clamp_elevation(elevation: f32) -> f32 {
    // f32::clamp passes NaN through
    if elevation.is_nan() {
        return 0.0;
    }
    elevation.clamp(-FRAC_PI_2, FRAC_PI_2)
}
