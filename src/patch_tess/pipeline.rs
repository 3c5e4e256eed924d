// Pipeline Builder
//
// Compiles the patch library and builds every pipeline object the frame needs:
// two compute pipelines, one tessellated render pipeline and the depth state.
// Any failure is returned from `build`; there is no partially built state.

use super::error::TessError;
use super::metal_types::{ControlPoint, MAX_TESSELLATION_FACTOR, SLOT_CONTROL_POINTS};
use super::shaders::{
    shader_source, CONTROL_POINT_KERNEL, FRAGMENT_FUNCTION, TESS_FACTOR_KERNEL, VERTEX_FUNCTION,
};
use super::target::TargetFormat;
use metal::*;
use tracing::info;

/// All pipeline state for one frame.
pub struct TessPipelines {
    control_points: ComputePipelineState,
    tess_factors: ComputePipelineState,
    render: RenderPipelineState,
    depth_state: DepthStencilState,
}

impl TessPipelines {
    pub fn control_points(&self) -> &ComputePipelineState {
        &self.control_points
    }

    pub fn tess_factors(&self) -> &ComputePipelineState {
        &self.tess_factors
    }

    pub fn render(&self) -> &RenderPipelineState {
        &self.render
    }

    pub fn depth_state(&self) -> &DepthStencilState {
        &self.depth_state
    }

    /// Preferred threadgroup width for the factor kernel.
    pub fn tess_factor_group_width(&self) -> u64 {
        self.tess_factors.thread_execution_width()
    }

    /// Every pipeline can actually run a threadgroup.
    pub fn is_ready(&self) -> bool {
        self.control_points.max_total_threads_per_threadgroup() > 0
            && self.tess_factors.max_total_threads_per_threadgroup() > 0
    }
}

/// Builds `TessPipelines` for a given render target format.
pub struct PipelineBuilder<'a> {
    device: &'a Device,
    format: TargetFormat,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(device: &'a Device, format: TargetFormat) -> Self {
        Self { device, format }
    }

    pub fn build(&self) -> Result<TessPipelines, TessError> {
        let library = self.compile_library()?;

        let control_points = self.compute_pipeline(&library, CONTROL_POINT_KERNEL)?;
        let tess_factors = self.compute_pipeline(&library, TESS_FACTOR_KERNEL)?;
        let render = self.render_pipeline(&library)?;
        let depth_state = self.depth_state();

        info!(
            device = %self.device.name(),
            tess_factor_width = tess_factors.thread_execution_width(),
            sample_count = self.format.sample_count,
            "built patch pipelines"
        );

        Ok(TessPipelines {
            control_points,
            tess_factors,
            render,
            depth_state,
        })
    }

    fn compile_library(&self) -> Result<Library, TessError> {
        let options = CompileOptions::new();
        self.device
            .new_library_with_source(&shader_source(), &options)
            .map_err(TessError::ShaderCompile)
    }

    fn function(&self, library: &Library, name: &str) -> Result<Function, TessError> {
        library
            .get_function(name, None)
            .map_err(|reason| TessError::MissingFunction {
                name: name.to_string(),
                reason,
            })
    }

    fn compute_pipeline(
        &self,
        library: &Library,
        name: &str,
    ) -> Result<ComputePipelineState, TessError> {
        let function = self.function(library, name)?;
        self.device
            .new_compute_pipeline_state_with_function(&function)
            .map_err(|reason| TessError::ComputePipeline {
                name: name.to_string(),
                reason,
            })
    }

    fn render_pipeline(&self, library: &Library) -> Result<RenderPipelineState, TessError> {
        let vertex_function = self.function(library, VERTEX_FUNCTION)?;
        let fragment_function = self.function(library, FRAGMENT_FUNCTION)?;

        let desc = RenderPipelineDescriptor::new();
        desc.set_vertex_function(Some(&vertex_function));
        desc.set_fragment_function(Some(&fragment_function));
        desc.set_sample_count(self.format.sample_count);

        let attachment = desc
            .color_attachments()
            .object_at(0)
            .ok_or_else(|| TessError::RenderPipeline("no color attachment slot".into()))?;
        attachment.set_pixel_format(self.format.color);
        desc.set_depth_attachment_pixel_format(self.format.depth);

        desc.set_vertex_descriptor(Some(control_point_layout()?));

        // Factors: half precision, one record per patch
        desc.set_tessellation_factor_format(MTLTessellationFactorFormat::Half);
        desc.set_tessellation_factor_step_function(MTLTessellationFactorStepFunction::PerPatch);
        desc.set_tessellation_output_winding_order(MTLWinding::CounterClockwise);
        desc.set_tessellation_partition_mode(MTLTessellationPartitionMode::Integer);
        desc.set_max_tessellation_factor(MAX_TESSELLATION_FACTOR as u64);

        self.device
            .new_render_pipeline_state(&desc)
            .map_err(TessError::RenderPipeline)
    }

    fn depth_state(&self) -> DepthStencilState {
        let desc = DepthStencilDescriptor::new();
        desc.set_depth_compare_function(MTLCompareFunction::Less);
        desc.set_depth_write_enabled(true);
        self.device.new_depth_stencil_state(&desc)
    }
}

/// One float3 position per patch control point, read from the control-point
/// buffer at its padded stride.
fn control_point_layout() -> Result<&'static VertexDescriptorRef, TessError> {
    let desc = VertexDescriptor::new();

    let attribute = desc
        .attributes()
        .object_at(0)
        .ok_or_else(|| TessError::RenderPipeline("no vertex attribute slot".into()))?;
    attribute.set_format(MTLVertexFormat::Float3);
    attribute.set_offset(0);
    attribute.set_buffer_index(SLOT_CONTROL_POINTS);

    let layout = desc
        .layouts()
        .object_at(SLOT_CONTROL_POINTS)
        .ok_or_else(|| TessError::RenderPipeline("no vertex layout slot".into()))?;
    layout.set_stride(ControlPoint::STRIDE as u64);
    layout.set_step_function(MTLVertexStepFunction::PerPatchControlPoint);
    layout.set_step_rate(1);

    Ok(desc)
}
