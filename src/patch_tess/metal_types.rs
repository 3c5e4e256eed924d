//! Layout contract between the Rust side and the patch shaders.
//!
//! Metal alignment rules that matter here:
//!
//! | Metal Type | Size     | Alignment |
//! |------------|----------|-----------|
//! | half       | 2 bytes  | 2 bytes   |
//! | float      | 4 bytes  | 4 bytes   |
//! | float3     | 12 bytes | 16 bytes! |
//! | float4x4   | 64 bytes | 16 bytes  |
//!
//! The control-point buffer is an array of `float3`, so every entry occupies
//! 16 bytes even though only 12 carry data. The vertex descriptor stride must
//! use the padded size.
//!
//! Patch layout: entry `i` of the control-point buffer belongs to patch
//! `i / 16`, local control point `i % 16`. The tessellation-factor buffer
//! holds exactly one record per patch.

use half::f16;
use std::mem;

// ============================================================================
// Patch Layout Constants
// ============================================================================

pub const PATCH_COUNT: usize = 32;
pub const CONTROL_POINTS_PER_PATCH: usize = 16;
pub const CONTROL_POINT_COUNT: usize = PATCH_COUNT * CONTROL_POINTS_PER_PATCH; // 512

/// Largest factor the tessellator accepts on macOS GPUs.
pub const MAX_TESSELLATION_FACTOR: f32 = 64.0;
pub const MIN_TESSELLATION_FACTOR: f32 = 1.0;

// Buffer binding slots
pub const SLOT_CONTROL_POINTS: u64 = 0;
pub const SLOT_TESS_FACTORS: u64 = 0;
pub const SLOT_TESS_PARAMS: u64 = 1;
pub const SLOT_FRAME_UNIFORMS: u64 = 1;

// ============================================================================
// Compile-Time Size Assertions
// ============================================================================

macro_rules! assert_metal_size {
    ($t:ty, $expected:expr) => {
        const _: () = {
            if mem::size_of::<$t>() != $expected {
                panic!("Metal struct size mismatch");
            }
        };
    };
}

// ============================================================================
// Buffer Element Types
// ============================================================================

/// One control point as the kernel stores it (`float3`, 16-byte stride).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ControlPoint {
    pub position: [f32; 3], // 12 bytes at offset 0
    pub _pad: f32,          // float3 alignment
}
assert_metal_size!(ControlPoint, 16);

impl ControlPoint {
    pub const STRIDE: usize = 16;

    pub fn new(position: [f32; 3]) -> Self {
        Self { position, _pad: 0.0 }
    }
}

/// Per-patch quad tessellation factors in the half-precision format the
/// tessellator reads (`MTLQuadTessellationFactorsHalf`, 12 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct QuadTessFactors {
    pub edge: [f16; 4],   // 8 bytes at offset 0
    pub inside: [f16; 2], // 4 bytes at offset 8
}
assert_metal_size!(QuadTessFactors, 12);

impl QuadTessFactors {
    pub const STRIDE: usize = 12;

    /// Uniform factors, clamped the same way the factor kernel clamps them.
    pub fn uniform(edge: f32, inside: f32) -> Self {
        let edge = f16::from_f32(clamp_factor(edge));
        let inside = f16::from_f32(clamp_factor(inside));
        Self {
            edge: [edge; 4],
            inside: [inside; 2],
        }
    }
}

// ============================================================================
// Transient Per-Draw Data
// ============================================================================

/// Camera/projection pair uploaded with `set_vertex_bytes` each frame
/// (128 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameUniforms {
    pub model_view: [[f32; 4]; 4], // 64 bytes at offset 0
    pub projection: [[f32; 4]; 4], // 64 bytes at offset 64
}
assert_metal_size!(FrameUniforms, 128);

/// Factor kernel parameters, set with `set_bytes` (16 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TessFactorParams {
    pub edge: f32,
    pub inside: f32,
    pub _pad: [f32; 2],
}
assert_metal_size!(TessFactorParams, 16);

impl TessFactorParams {
    pub fn new(edge: f32, inside: f32) -> Self {
        Self {
            edge,
            inside,
            _pad: [0.0; 2],
        }
    }
}

/// Clamp a requested factor into the range the tessellator accepts.
pub fn clamp_factor(factor: f32) -> f32 {
    if factor.is_nan() {
        return MIN_TESSELLATION_FACTOR;
    }
    factor.clamp(MIN_TESSELLATION_FACTOR, MAX_TESSELLATION_FACTOR)
}

// ============================================================================
// Buffer Sizes
// ============================================================================

pub const CONTROL_POINT_BUFFER_SIZE: usize = CONTROL_POINT_COUNT * ControlPoint::STRIDE;
pub const TESS_FACTOR_BUFFER_SIZE: usize = PATCH_COUNT * QuadTessFactors::STRIDE;

// ============================================================================
// Shader-side declarations
// ============================================================================

/// MSL declarations mirroring the types above. These MUST stay in sync with
/// the Rust definitions.
pub const SHADER_TYPES: &str = r#"
struct PatchTessFactors {
    half edge[4];       // 8 bytes at offset 0
    half inside[2];     // 4 bytes at offset 8
};  // Total: 12 bytes

struct FrameUniforms {
    float4x4 model_view;
    float4x4 projection;
};  // Total: 128 bytes

struct TessFactorParams {
    float edge;
    float inside;
    float2 _pad;
};  // Total: 16 bytes
"#;
