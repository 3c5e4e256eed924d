//! Patch indexing and a CPU reference of the surface the kernels produce.
//!
//! The surface is a closed jar: a surface of revolution whose profile is a
//! C1 cubic Bezier spline of four spans, swept around the Z axis in eight
//! 45 degree arcs. Each (span, arc) pair is one bicubic patch, giving
//! `4 * 8 = 32` patches.
//!
//! Grid convention, shared by `compute_control_points` and `patch_vertex`:
//! local index `l = row * 4 + col`; `row` walks the profile (parameter `v`),
//! `col` walks the arc (parameter `u`). The arc runs clockwise seen from +Z so
//! that, after the Z-up to Y-up reflection in the model matrix, counter-
//! clockwise triangles face outward.

use super::math::{cross, Vec3};
use super::metal_types::{ControlPoint, CONTROL_POINTS_PER_PATCH, CONTROL_POINT_COUNT, PATCH_COUNT};
use std::f32::consts::FRAC_PI_4;
use std::ops::Range;

pub const PROFILE_SPANS: usize = 4;
pub const ARC_SEGMENTS: usize = 8;
pub const GRID_SIZE: usize = 4;

/// Profile control polygon as (radius, height), Z-up. Span `s` uses points
/// `3s..=3s+3`; both ends sit on the axis so the jar is closed.
pub const PROFILE: [[f32; 2]; 3 * PROFILE_SPANS + 1] = [
    [0.00, 0.00],
    [0.55, 0.00],
    [0.90, 0.00],
    [0.95, 0.20],
    [1.00, 0.40],
    [1.40, 0.70],
    [1.30, 1.10],
    [1.20, 1.50],
    [0.55, 1.50],
    [0.55, 1.80],
    [0.55, 2.10],
    [0.35, 2.10],
    [0.00, 2.10],
];

/// Signed angle covered by one arc segment.
pub const ARC_SWEEP: f32 = -FRAC_PI_4;

// ============================================================================
// Indexing
// ============================================================================

pub fn patch_of(index: usize) -> usize {
    index / CONTROL_POINTS_PER_PATCH
}

pub fn local_index(index: usize) -> usize {
    index % CONTROL_POINTS_PER_PATCH
}

/// Buffer indices owned by `patch`.
pub fn patch_range(patch: usize) -> Range<usize> {
    let start = patch * CONTROL_POINTS_PER_PATCH;
    start..start + CONTROL_POINTS_PER_PATCH
}

/// (row, col) of a local control-point index.
pub fn grid_position(local: usize) -> (usize, usize) {
    (local / GRID_SIZE, local % GRID_SIZE)
}

/// (profile span, arc segment) of a patch.
pub fn patch_cell(patch: usize) -> (usize, usize) {
    (patch / ARC_SEGMENTS, patch % ARC_SEGMENTS)
}

// ============================================================================
// Control points
// ============================================================================

/// Unit-radius Bezier control point `col` of arc segment `arc`.
pub fn arc_control_point(arc: usize, col: usize) -> [f32; 2] {
    let start = (arc + 1) as f32 * FRAC_PI_4;
    let end = start + ARC_SWEEP;
    let k = (4.0 / 3.0) * (ARC_SWEEP / 4.0).tan();
    let a0 = [start.cos(), start.sin()];
    let a3 = [end.cos(), end.sin()];

    match col {
        0 => a0,
        1 => [a0[0] - k * a0[1], a0[1] + k * a0[0]],
        2 => [a3[0] + k * a3[1], a3[1] - k * a3[0]],
        _ => a3,
    }
}

/// Position the control-point kernel writes at buffer `index`.
pub fn control_point(index: usize) -> Vec3 {
    let (span, arc) = patch_cell(patch_of(index));
    let (row, col) = grid_position(local_index(index));
    let [radius, height] = PROFILE[span * 3 + row];
    let [cx, cy] = arc_control_point(arc, col);
    [cx * radius, cy * radius, height]
}

pub fn reference_control_points() -> Vec<ControlPoint> {
    (0..CONTROL_POINT_COUNT)
        .map(|i| ControlPoint::new(control_point(i)))
        .collect()
}

/// The 16 control points of one patch, in grid order.
pub fn patch_control_points(patch: usize) -> [Vec3; CONTROL_POINTS_PER_PATCH] {
    debug_assert!(patch < PATCH_COUNT);
    let mut out = [[0.0; 3]; CONTROL_POINTS_PER_PATCH];
    for (slot, index) in out.iter_mut().zip(patch_range(patch)) {
        *slot = control_point(index);
    }
    out
}

// ============================================================================
// Bicubic evaluation
// ============================================================================

pub fn bernstein(t: f32) -> [f32; 4] {
    let s = 1.0 - t;
    [s * s * s, 3.0 * t * s * s, 3.0 * t * t * s, t * t * t]
}

pub fn bernstein_derivative(t: f32) -> [f32; 4] {
    let s = 1.0 - t;
    [-3.0 * s * s, 3.0 * s * s - 6.0 * t * s, 6.0 * t * s - 3.0 * t * t, 3.0 * t * t]
}

fn accumulate(points: &[Vec3; CONTROL_POINTS_PER_PATCH], bu: [f32; 4], bv: [f32; 4]) -> Vec3 {
    let mut p = [0.0f32; 3];
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            let w = bv[row] * bu[col];
            let cp = points[row * GRID_SIZE + col];
            p[0] += w * cp[0];
            p[1] += w * cp[1];
            p[2] += w * cp[2];
        }
    }
    p
}

/// Surface point at (u, v), matching `patch_vertex`.
pub fn evaluate_patch(points: &[Vec3; CONTROL_POINTS_PER_PATCH], u: f32, v: f32) -> Vec3 {
    accumulate(points, bernstein(u), bernstein(v))
}

/// Unnormalized surface normal `dP/du x dP/dv` at (u, v).
pub fn patch_normal(points: &[Vec3; CONTROL_POINTS_PER_PATCH], u: f32, v: f32) -> Vec3 {
    let dpdu = accumulate(points, bernstein_derivative(u), bernstein(v));
    let dpdv = accumulate(points, bernstein(u), bernstein_derivative(v));
    cross(dpdu, dpdv)
}
