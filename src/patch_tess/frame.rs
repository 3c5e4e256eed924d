// Frame Orchestrator
//
// One command buffer per frame:
//
//   compute pass   compute_control_points  512 threads, groups of 16
//                  compute_tess_factors     32 threads, execution-width groups
//   render pass    one drawPatches: 16 control points/patch, 32 patches,
//                  1 instance, factors read per patch
//   present + commit
//
// The two dispatches write disjoint buffers and may overlap on the GPU. The
// render pass sees both results because it is encoded after the compute pass
// in the same command buffer; no fences or CPU waits are involved.
//
// A frame without a drawable, or with attachments that no longer match it, is
// dropped before anything is encoded, so the buffers keep the previous frame's
// contents.

use super::config::SceneConfig;
use super::error::TessError;
use super::math::{self, Mat4};
use super::metal_types::{
    FrameUniforms, TessFactorParams, CONTROL_POINTS_PER_PATCH, CONTROL_POINT_COUNT, PATCH_COUNT,
    SLOT_CONTROL_POINTS, SLOT_FRAME_UNIFORMS, SLOT_TESS_FACTORS, SLOT_TESS_PARAMS,
};
use super::pipeline::{PipelineBuilder, TessPipelines};
use super::resources::PatchBuffers;
use super::shaders::CONTROL_POINT_GROUP_WIDTH;
use super::target::{RenderTarget, TargetFormat};
use metal::*;
use std::mem;
use tracing::{debug, info, trace, warn};

// ============================================================================
// Frame Description
// ============================================================================

/// A 1D `dispatch_threads` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub threads: u64,
    pub group_width: u64,
}

impl Dispatch {
    pub fn thread_groups(&self) -> u64 {
        (self.threads + self.group_width - 1) / self.group_width
    }
}

/// Arguments of the single tessellated draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchDraw {
    pub control_points_per_patch: u64,
    pub patch_start: u64,
    pub patch_count: u64,
    pub instance_count: u64,
}

/// Everything one frame encodes, computed on the CPU before any GPU work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePlan {
    pub control_points: Dispatch,
    pub tess_factors: Dispatch,
    pub tess_params: TessFactorParams,
    pub uniforms: FrameUniforms,
    pub draw: PatchDraw,
}

/// Fixed per-scene values the plan is derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSettings {
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub model: Mat4,
    pub tess_params: TessFactorParams,
    pub clear_color: [f64; 4],
}

impl FrameSettings {
    pub fn from_config(config: &SceneConfig) -> Self {
        Self {
            fov_y: math::rad_from_deg(config.camera.fov_y_degrees),
            near: config.camera.near,
            far: config.camera.far,
            model: model_matrix(config.model.vertical_offset, config.model.z_up),
            tess_params: TessFactorParams::new(
                config.tessellation.edge_factor,
                config.tessellation.inside_factor,
            ),
            clear_color: config.target.clear_color,
        }
    }
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self::from_config(&SceneConfig::default())
    }
}

/// Up-axis remap followed by the vertical offset.
pub fn model_matrix(vertical_offset: f32, z_up: bool) -> Mat4 {
    let offset = math::translation([0.0, vertical_offset, 0.0]);
    if z_up {
        math::mul(&offset, &math::Z_UP_TO_Y_UP)
    } else {
        offset
    }
}

/// `modelView = inverse(camera) * model`, projection from the drawable aspect.
pub fn frame_uniforms(
    settings: &FrameSettings,
    camera_world: &Mat4,
    drawable_size: (f64, f64),
) -> FrameUniforms {
    let view = math::inverse(camera_world);
    let aspect = (drawable_size.0 / drawable_size.1) as f32;

    FrameUniforms {
        model_view: math::mul(&view, &settings.model),
        projection: math::perspective(settings.fov_y, aspect, settings.near, settings.far),
    }
}

/// Describe one frame. Pure: equal inputs give bit-identical plans.
pub fn plan_frame(
    settings: &FrameSettings,
    camera_world: &Mat4,
    drawable_size: (f64, f64),
    tess_factor_group_width: u64,
) -> FramePlan {
    FramePlan {
        control_points: Dispatch {
            threads: CONTROL_POINT_COUNT as u64,
            group_width: CONTROL_POINT_GROUP_WIDTH,
        },
        tess_factors: Dispatch {
            threads: PATCH_COUNT as u64,
            group_width: tess_factor_group_width.max(1),
        },
        tess_params: settings.tess_params,
        uniforms: frame_uniforms(settings, camera_world, drawable_size),
        draw: PatchDraw {
            control_points_per_patch: CONTROL_POINTS_PER_PATCH as u64,
            patch_start: 0,
            patch_count: PATCH_COUNT as u64,
            instance_count: 1,
        },
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Outcome of `render_frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameResult {
    Submitted,
    /// No drawable (or a zero-area one); nothing was encoded.
    Dropped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub submitted: u64,
    pub dropped: u64,
}

/// Owns the patch buffers, pipelines and queue for the process lifetime.
pub struct FrameOrchestrator {
    command_queue: CommandQueue,
    buffers: PatchBuffers,
    pipelines: TessPipelines,
    settings: FrameSettings,
    format: TargetFormat,
    stats: FrameStats,
}

impl FrameOrchestrator {
    /// Allocate buffers and build pipelines. Any failure here is fatal to the
    /// caller; nothing is created lazily later.
    pub fn new(device: &Device, config: &SceneConfig, format: TargetFormat) -> Result<Self, TessError> {
        config.validate()?;

        let buffers = PatchBuffers::new(device)?;
        let pipelines = PipelineBuilder::new(device, format).build()?;
        let command_queue = device.new_command_queue();

        info!(
            patches = PATCH_COUNT,
            control_points = CONTROL_POINT_COUNT,
            "frame orchestrator ready"
        );

        Ok(Self {
            command_queue,
            buffers,
            pipelines,
            settings: FrameSettings::from_config(config),
            format,
            stats: FrameStats::default(),
        })
    }

    pub fn is_ready(&self) -> bool {
        self.buffers.is_ready() && self.pipelines.is_ready()
    }

    pub fn command_queue(&self) -> &CommandQueue {
        &self.command_queue
    }

    pub fn buffers(&self) -> &PatchBuffers {
        &self.buffers
    }

    pub fn pipelines(&self) -> &TessPipelines {
        &self.pipelines
    }

    pub fn settings(&self) -> &FrameSettings {
        &self.settings
    }

    pub fn format(&self) -> TargetFormat {
        self.format
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn plan_frame(&self, camera_world: &Mat4, drawable_size: (f64, f64)) -> FramePlan {
        plan_frame(
            &self.settings,
            camera_world,
            drawable_size,
            self.pipelines.tess_factor_group_width(),
        )
    }

    /// Encode, present and commit one frame.
    ///
    /// `target` is `None` when the host could not get a drawable; the frame
    /// is then skipped without touching the GPU. A target whose attachments
    /// were built for another format or size is skipped the same way.
    pub fn render_frame(
        &mut self,
        camera_world: &Mat4,
        drawable_size: (f64, f64),
        target: Option<&RenderTarget<'_>>,
    ) -> FrameResult {
        let target = match target {
            Some(t) if drawable_size.0 > 0.0 && drawable_size.1 > 0.0 => t,
            _ => {
                self.stats.dropped += 1;
                debug!(dropped = self.stats.dropped, "no drawable, skipping frame");
                return FrameResult::Dropped;
            }
        };
        if !target.matches(self.format) {
            self.stats.dropped += 1;
            warn!(
                attachments = ?target.attachments().size(),
                destination = ?target.drawable_size(),
                "attachments do not match the destination, skipping frame"
            );
            return FrameResult::Dropped;
        }

        let plan = self.plan_frame(camera_world, drawable_size);
        let command_buffer = self.command_queue.new_command_buffer();

        self.encode_compute(command_buffer, &plan);
        self.encode_render(command_buffer, target, &plan);

        if let Some(drawable) = target.drawable() {
            command_buffer.present_drawable(drawable);
        }
        command_buffer.commit();

        self.stats.submitted += 1;
        trace!(frame = self.stats.submitted, "frame submitted");
        FrameResult::Submitted
    }

    /// Compute pass only, waiting for completion (for testing).
    pub fn run_compute_sync(&self) {
        let plan = self.plan_frame(&math::IDENTITY, (1.0, 1.0));
        let command_buffer = self.command_queue.new_command_buffer();
        self.encode_compute(command_buffer, &plan);
        command_buffer.commit();
        command_buffer.wait_until_completed();
    }

    fn encode_compute(&self, command_buffer: &CommandBufferRef, plan: &FramePlan) {
        let encoder = command_buffer.new_compute_command_encoder();

        encoder.set_compute_pipeline_state(self.pipelines.control_points());
        encoder.set_buffer(SLOT_CONTROL_POINTS, Some(self.buffers.control_points()), 0);
        encoder.dispatch_threads(
            MTLSize::new(plan.control_points.threads, 1, 1),
            MTLSize::new(plan.control_points.group_width, 1, 1),
        );

        encoder.set_compute_pipeline_state(self.pipelines.tess_factors());
        encoder.set_buffer(SLOT_TESS_FACTORS, Some(self.buffers.tess_factors()), 0);
        encoder.set_bytes(
            SLOT_TESS_PARAMS,
            mem::size_of::<TessFactorParams>() as u64,
            &plan.tess_params as *const TessFactorParams as *const _,
        );
        encoder.dispatch_threads(
            MTLSize::new(plan.tess_factors.threads, 1, 1),
            MTLSize::new(plan.tess_factors.group_width, 1, 1),
        );

        encoder.end_encoding();
    }

    fn encode_render(
        &self,
        command_buffer: &CommandBufferRef,
        target: &RenderTarget<'_>,
        plan: &FramePlan,
    ) {
        let pass = target.pass_descriptor(self.settings.clear_color);
        let encoder = command_buffer.new_render_command_encoder(pass);

        encoder.set_render_pipeline_state(self.pipelines.render());
        encoder.set_depth_stencil_state(self.pipelines.depth_state());
        encoder.set_cull_mode(MTLCullMode::Back);
        encoder.set_front_facing_winding(MTLWinding::CounterClockwise);

        encoder.set_vertex_buffer(SLOT_CONTROL_POINTS, Some(self.buffers.control_points()), 0);
        encoder.set_vertex_bytes(
            SLOT_FRAME_UNIFORMS,
            mem::size_of::<FrameUniforms>() as u64,
            &plan.uniforms as *const FrameUniforms as *const _,
        );
        encoder.set_tessellation_factor_buffer(Some(self.buffers.tess_factors()), 0, 0);

        encoder.draw_patches(
            plan.draw.control_points_per_patch,
            plan.draw.patch_start,
            plan.draw.patch_count,
            None,
            0,
            plan.draw.instance_count,
            0,
        );
        encoder.end_encoding();
    }
}
