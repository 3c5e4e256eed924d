//! Matrix math for the camera and projection transforms.
//!
//! Matrices are column-major `[[f32; 4]; 4]` (`m[col][row]`), which is the
//! in-memory layout of Metal's `float4x4`, so they can be handed to
//! `set_vertex_bytes` without transposing.
//!
//! Conventions:
//! - right-handed view space, camera looks down -Z
//! - clip-space depth in [0, 1] (near plane -> 0, far plane -> 1)
//!
//! No function here guards against degenerate input (zero axes, parallel
//! look-at vectors, singular matrices); callers keep the scene well-formed.

use std::f32::consts::PI;

/// 4x4 column-major matrix.
pub type Mat4 = [[f32; 4]; 4];

/// 3-component vector.
pub type Vec3 = [f32; 3];

pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Swaps the Y and Z axes so content authored Z-up stands upright in a Y-up
/// world. Note this is a reflection (determinant -1).
pub const Z_UP_TO_Y_UP: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

// ============================================================================
// Angles
// ============================================================================

pub fn rad_from_deg(degrees: f32) -> f32 {
    degrees * PI / 180.0
}

// ============================================================================
// Vector helpers
// ============================================================================

pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn scale(v: Vec3, s: f32) -> Vec3 {
    [v[0] * s, v[1] * s, v[2] * s]
}

pub fn dot(a: Vec3, b: Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn length(v: Vec3) -> f32 {
    dot(v, v).sqrt()
}

pub fn normalize(v: Vec3) -> Vec3 {
    scale(v, 1.0 / length(v))
}

// ============================================================================
// Matrix construction
// ============================================================================

/// Rotation of `angle` radians about `axis` (Rodrigues). The axis is
/// normalized here but must not be zero.
pub fn rotation(axis: Vec3, angle: f32) -> Mat4 {
    let [x, y, z] = normalize(axis);
    let ct = angle.cos();
    let st = angle.sin();
    let ci = 1.0 - ct;

    [
        [ct + x * x * ci, y * x * ci + z * st, z * x * ci - y * st, 0.0],
        [x * y * ci - z * st, ct + y * y * ci, z * y * ci + x * st, 0.0],
        [x * z * ci + y * st, y * z * ci - x * st, ct + z * z * ci, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

pub fn translation(t: Vec3) -> Mat4 {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [t[0], t[1], t[2], 1.0],
    ]
}

/// Right-handed perspective projection with [0, 1] clip depth.
///
/// View-space `z = -near` lands on depth 0 and `z = -far` on depth 1.
/// Degenerate when `aspect <= 0` or `near == far`.
pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let ys = 1.0 / (fov_y * 0.5).tan();
    let xs = ys / aspect;
    let zs = far / (near - far);

    [
        [xs, 0.0, 0.0, 0.0],
        [0.0, ys, 0.0, 0.0],
        [0.0, 0.0, zs, -1.0],
        [0.0, 0.0, zs * near, 0.0],
    ]
}

/// Camera-to-world transform for a camera at `eye` looking at `target`.
///
/// This is NOT a view matrix: invert it to get world-to-view. Undefined when
/// `up` is parallel to the viewing direction.
pub fn look_at(target: Vec3, eye: Vec3, up: Vec3) -> Mat4 {
    let forward = normalize(sub(target, eye));
    let right = normalize(cross(forward, up));
    let true_up = normalize(cross(right, forward));

    [
        [right[0], right[1], right[2], 0.0],
        [true_up[0], true_up[1], true_up[2], 0.0],
        [-forward[0], -forward[1], -forward[2], 0.0],
        [eye[0], eye[1], eye[2], 1.0],
    ]
}

// ============================================================================
// Matrix operations
// ============================================================================

/// `a * b` (applies `b` first).
pub fn mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0f32; 4]; 4];
    for col in 0..4 {
        for row in 0..4 {
            let mut sum = 0.0;
            for k in 0..4 {
                sum += a[k][row] * b[col][k];
            }
            out[col][row] = sum;
        }
    }
    out
}

/// `m * v` for a homogeneous column vector.
pub fn transform(m: &Mat4, v: [f32; 4]) -> [f32; 4] {
    let mut out = [0.0f32; 4];
    for (row, value) in out.iter_mut().enumerate() {
        *value = m[0][row] * v[0] + m[1][row] * v[1] + m[2][row] * v[2] + m[3][row] * v[3];
    }
    out
}

pub fn transform_point(m: &Mat4, p: Vec3) -> [f32; 4] {
    transform(m, [p[0], p[1], p[2], 1.0])
}

pub fn transpose(m: &Mat4) -> Mat4 {
    let mut out = [[0.0f32; 4]; 4];
    for col in 0..4 {
        for row in 0..4 {
            out[row][col] = m[col][row];
        }
    }
    out
}

/// General inverse by Gauss-Jordan elimination with partial pivoting.
///
/// A singular input produces non-finite entries rather than an error.
pub fn inverse(m: &Mat4) -> Mat4 {
    // Work row-major: a[row][col]
    let mut a = transpose(m);
    let mut inv = IDENTITY;

    for col in 0..4 {
        let mut pivot = col;
        for row in (col + 1)..4 {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);

        let p = a[col][col];
        for k in 0..4 {
            a[col][k] /= p;
            inv[col][k] /= p;
        }

        for row in 0..4 {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for k in 0..4 {
                a[row][k] -= factor * a[col][k];
                inv[row][k] -= factor * inv[col][k];
            }
        }
    }

    transpose(&inv)
}

/// Upper-left 3x3 column `index` of `m`.
pub fn basis_column(m: &Mat4, index: usize) -> Vec3 {
    [m[index][0], m[index][1], m[index][2]]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &Mat4, b: &Mat4, eps: f32) -> bool {
        a.iter()
            .flatten()
            .zip(b.iter().flatten())
            .all(|(x, y)| (x - y).abs() < eps)
    }

    #[test]
    fn rad_from_deg_known_values() {
        assert!((rad_from_deg(180.0) - PI).abs() < 1e-6);
        assert!((rad_from_deg(65.0) - 1.134_464).abs() < 1e-5);
        assert_eq!(rad_from_deg(0.0), 0.0);
    }

    #[test]
    fn rotation_by_zero_is_identity() {
        let r = rotation([0.3, -1.0, 2.0], 0.0);
        assert!(approx_eq(&r, &IDENTITY, 1e-6));
    }

    #[test]
    fn rotation_about_y_moves_x_to_minus_z() {
        let r = rotation([0.0, 1.0, 0.0], std::f32::consts::FRAC_PI_2);
        let p = transform_point(&r, [1.0, 0.0, 0.0]);
        assert!(p[0].abs() < 1e-6);
        assert!((p[2] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn translation_moves_points_not_directions() {
        let t = translation([1.0, 2.0, 3.0]);
        assert_eq!(transform_point(&t, [0.0, 0.0, 0.0]), [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(transform(&t, [1.0, 0.0, 0.0, 0.0]), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn mul_applies_right_operand_first() {
        let t = translation([0.0, -1.0, 0.0]);
        let m = mul(&t, &Z_UP_TO_Y_UP);
        // z-up (0,0,1) becomes y-up, then drops by one
        let p = transform_point(&m, [0.0, 0.0, 1.0]);
        assert!((p[1] - 0.0).abs() < 1e-6);
        let q = transform_point(&m, [0.0, 0.0, 2.0]);
        assert!((q[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn inverse_of_translation() {
        let t = translation([4.0, -2.0, 0.5]);
        let expected = translation([-4.0, 2.0, -0.5]);
        assert!(approx_eq(&inverse(&t), &expected, 1e-6));
    }

    #[test]
    fn inverse_of_general_matrix() {
        let m = mul(
            &translation([1.0, 2.0, 3.0]),
            &rotation([1.0, 1.0, 0.0], 0.7),
        );
        let m = mul(&m, &Z_UP_TO_Y_UP);
        assert!(approx_eq(&mul(&m, &inverse(&m)), &IDENTITY, 1e-5));
        assert!(approx_eq(&mul(&inverse(&m), &m), &IDENTITY, 1e-5));
    }

    #[test]
    fn perspective_diagonal_terms() {
        let p = perspective(rad_from_deg(90.0), 2.0, 0.1, 20.0);
        assert!((p[1][1] - 1.0).abs() < 1e-6);
        assert!((p[0][0] - 0.5).abs() < 1e-6);
        assert_eq!(p[2][3], -1.0);
        assert_eq!(p[3][3], 0.0);
    }
}
