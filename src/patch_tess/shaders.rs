// Patch Shaders
//
// Four programs compiled from one MSL library at startup:
//
//   compute_control_points  - one thread per control point (512), writes float3
//   compute_tess_factors    - one thread per patch (32), writes half factors
//   patch_vertex            - post-tessellation vertex function, quad domain,
//                             16 control points per patch via stage_in
//   patch_fragment          - headlight shading
//
// Buffer slots (see metal_types.rs):
//   compute: [[buffer(0)]] output, [[buffer(1)]] TessFactorParams
//   vertex:  [[buffer(0)]] control points (vertex descriptor),
//            [[buffer(1)]] FrameUniforms

use super::metal_types::{
    CONTROL_POINTS_PER_PATCH, CONTROL_POINT_COUNT, MAX_TESSELLATION_FACTOR,
    MIN_TESSELLATION_FACTOR, PATCH_COUNT, SHADER_TYPES,
};
use super::surface::{ARC_SEGMENTS, ARC_SWEEP, PROFILE};

pub const CONTROL_POINT_KERNEL: &str = "compute_control_points";
pub const TESS_FACTOR_KERNEL: &str = "compute_tess_factors";
pub const VERTEX_FUNCTION: &str = "patch_vertex";
pub const FRAGMENT_FUNCTION: &str = "patch_fragment";

/// Threads per threadgroup for the control-point dispatch (one patch each).
pub const CONTROL_POINT_GROUP_WIDTH: u64 = CONTROL_POINTS_PER_PATCH as u64;

fn profile_table() -> String {
    PROFILE
        .iter()
        .map(|[r, z]| format!("    float2({:.6}, {:.6})", r, z))
        .collect::<Vec<_>>()
        .join(",\n")
}

/// Full MSL source for the patch library.
pub fn shader_source() -> String {
    format!(
        r#"
#include <metal_stdlib>
using namespace metal;

{types}

// ============================================================================
// Constants
// ============================================================================

constant uint PATCH_COUNT = {patch_count};
constant uint CONTROL_POINT_COUNT = {control_point_count};
constant uint CONTROL_POINTS_PER_PATCH = {per_patch};
constant uint ARC_SEGMENTS = {arc_segments};
constant float ARC_SWEEP = {arc_sweep:.8};
constant float MIN_FACTOR = {min_factor:.1};
constant float MAX_FACTOR = {max_factor:.1};

constant float2 PROFILE[] = {{
{profile}
}};

// ============================================================================
// Control points
// ============================================================================

// Unit-radius Bezier control point `col` of arc segment `arc`
inline float2 arc_control_point(uint arc, uint col) {{
    float start = float(arc + 1) * (M_PI_F / 4.0f);
    float end = start + ARC_SWEEP;
    float k = (4.0f / 3.0f) * tan(ARC_SWEEP / 4.0f);
    float2 a0 = float2(cos(start), sin(start));
    float2 a3 = float2(cos(end), sin(end));

    switch (col) {{
        case 0: return a0;
        case 1: return float2(a0.x - k * a0.y, a0.y + k * a0.x);
        case 2: return float2(a3.x + k * a3.y, a3.y - k * a3.x);
        default: return a3;
    }}
}}

kernel void compute_control_points(
    device float3* control_points [[buffer(0)]],
    uint tid [[thread_position_in_grid]]
) {{
    if (tid >= CONTROL_POINT_COUNT) return;

    uint patch_id = tid / CONTROL_POINTS_PER_PATCH;
    uint local_id = tid % CONTROL_POINTS_PER_PATCH;
    uint row = local_id / 4;
    uint col = local_id % 4;
    uint span = patch_id / ARC_SEGMENTS;
    uint arc = patch_id % ARC_SEGMENTS;

    float2 profile = PROFILE[span * 3 + row];
    float2 xy = arc_control_point(arc, col) * profile.x;
    control_points[tid] = float3(xy, profile.y);
}}

// ============================================================================
// Tessellation factors
// ============================================================================

kernel void compute_tess_factors(
    device PatchTessFactors* factors [[buffer(0)]],
    constant TessFactorParams& params [[buffer(1)]],
    uint pid [[thread_position_in_grid]]
) {{
    if (pid >= PATCH_COUNT) return;

    half edge = half(clamp(params.edge, MIN_FACTOR, MAX_FACTOR));
    half inside = half(clamp(params.inside, MIN_FACTOR, MAX_FACTOR));

    factors[pid].edge[0] = edge;
    factors[pid].edge[1] = edge;
    factors[pid].edge[2] = edge;
    factors[pid].edge[3] = edge;
    factors[pid].inside[0] = inside;
    factors[pid].inside[1] = inside;
}}

// ============================================================================
// Post-tessellation vertex + fragment
// ============================================================================

struct ControlPointIn {{
    float3 position [[attribute(0)]];
}};

struct PatchIn {{
    patch_control_point<ControlPointIn> control_points;
}};

struct VertexOut {{
    float4 position [[position]];
    float3 view_position;
    float3 view_normal;
    float2 uv;
}};

inline float4 bernstein(float t) {{
    float s = 1.0f - t;
    return float4(s * s * s, 3.0f * t * s * s, 3.0f * t * t * s, t * t * t);
}}

inline float4 bernstein_derivative(float t) {{
    float s = 1.0f - t;
    return float4(-3.0f * s * s,
                  3.0f * s * s - 6.0f * t * s,
                  6.0f * t * s - 3.0f * t * t,
                  3.0f * t * t);
}}

[[patch(quad, 16)]]
vertex VertexOut patch_vertex(
    PatchIn patch_in [[stage_in]],
    constant FrameUniforms& uniforms [[buffer(1)]],
    float2 uv [[position_in_patch]]
) {{
    float4 bu = bernstein(uv.x);
    float4 bv = bernstein(uv.y);
    float4 du = bernstein_derivative(uv.x);
    float4 dv = bernstein_derivative(uv.y);

    float3 p = float3(0.0f);
    float3 dpdu = float3(0.0f);
    float3 dpdv = float3(0.0f);
    for (uint row = 0; row < 4; ++row) {{
        for (uint col = 0; col < 4; ++col) {{
            float3 cp = patch_in.control_points[row * 4 + col].position;
            p += bv[row] * bu[col] * cp;
            dpdu += bv[row] * du[col] * cp;
            dpdv += dv[row] * bu[col] * cp;
        }}
    }}

    // Normals collapse at the poles; fall back to the axis
    float3 n = cross(dpdu, dpdv);
    float len = length(n);
    n = len > 1e-6f ? n / len : float3(0.0f, 0.0f, 1.0f);

    float4 view_position = uniforms.model_view * float4(p, 1.0f);

    VertexOut out;
    out.position = uniforms.projection * view_position;
    out.view_position = view_position.xyz;
    out.view_normal = (uniforms.model_view * float4(n, 0.0f)).xyz;
    out.uv = uv;
    return out;
}}

fragment float4 patch_fragment(VertexOut in [[stage_in]]) {{
    float3 n = normalize(in.view_normal);
    float3 to_eye = normalize(-in.view_position);
    // Two-sided: the model matrix may flip handedness
    float diffuse = abs(dot(n, to_eye));

    float3 base = float3(0.78f, 0.52f, 0.32f);
    float3 rim = float3(0.95f, 0.85f, 0.70f);
    float stripe = step(0.5f, fract(in.uv.y * 4.0f)) * 0.06f;
    float3 color = base * (0.15f + 0.85f * diffuse) + rim * pow(1.0f - diffuse, 3.0f) * 0.4f;
    return float4(color - stripe, 1.0f);
}}
"#,
        types = SHADER_TYPES,
        patch_count = PATCH_COUNT,
        control_point_count = CONTROL_POINT_COUNT,
        per_patch = CONTROL_POINTS_PER_PATCH,
        arc_segments = ARC_SEGMENTS,
        arc_sweep = ARC_SWEEP,
        min_factor = MIN_TESSELLATION_FACTOR,
        max_factor = MAX_TESSELLATION_FACTOR,
        profile = profile_table(),
    )
}
