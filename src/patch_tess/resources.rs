// Patch Buffers - GPU Resource Manager
//
// Owns the two device-private buffers that connect the compute stage to the
// tessellator. Both are allocated once, sized exactly for PATCH_COUNT patches,
// and overwritten wholesale by the kernels every frame. The CPU never maps
// them; `read_back_sync` copies through shared staging buffers for tests and
// diagnostics only.

use super::error::TessError;
use super::metal_types::{
    ControlPoint, QuadTessFactors, CONTROL_POINT_BUFFER_SIZE, CONTROL_POINT_COUNT, PATCH_COUNT,
    TESS_FACTOR_BUFFER_SIZE,
};
use metal::*;
use tracing::info;

pub struct PatchBuffers {
    control_points: Buffer,
    tess_factors: Buffer,
}

/// CPU copy of both buffers.
#[derive(Debug, Clone)]
pub struct PatchReadback {
    pub control_points: Vec<ControlPoint>,
    pub tess_factors: Vec<QuadTessFactors>,
}

impl PatchBuffers {
    /// Allocate both buffers in private storage.
    pub fn new(device: &Device) -> Result<Self, TessError> {
        let control_points = device.new_buffer(
            CONTROL_POINT_BUFFER_SIZE as u64,
            MTLResourceOptions::StorageModePrivate,
        );
        control_points.set_label("patch control points");

        let tess_factors = device.new_buffer(
            TESS_FACTOR_BUFFER_SIZE as u64,
            MTLResourceOptions::StorageModePrivate,
        );
        tess_factors.set_label("patch tessellation factors");

        let buffers = Self {
            control_points,
            tess_factors,
        };
        buffers.check_sizes()?;

        info!(
            control_point_bytes = CONTROL_POINT_BUFFER_SIZE,
            tess_factor_bytes = TESS_FACTOR_BUFFER_SIZE,
            patches = PATCH_COUNT,
            "allocated patch buffers"
        );
        Ok(buffers)
    }

    fn check_sizes(&self) -> Result<(), TessError> {
        check_length(
            "control points",
            &self.control_points,
            CONTROL_POINT_BUFFER_SIZE as u64,
        )?;
        check_length(
            "tessellation factors",
            &self.tess_factors,
            TESS_FACTOR_BUFFER_SIZE as u64,
        )
    }

    /// Both buffers exist with their contract sizes.
    pub fn is_ready(&self) -> bool {
        self.check_sizes().is_ok()
    }

    pub fn control_points(&self) -> &Buffer {
        &self.control_points
    }

    pub fn tess_factors(&self) -> &Buffer {
        &self.tess_factors
    }

    /// Copy both buffers to the CPU and wait (for testing).
    pub fn read_back_sync(&self, queue: &CommandQueue) -> PatchReadback {
        let device = queue.device();
        let cp_staging = device.new_buffer(
            CONTROL_POINT_BUFFER_SIZE as u64,
            MTLResourceOptions::StorageModeShared,
        );
        let tf_staging = device.new_buffer(
            TESS_FACTOR_BUFFER_SIZE as u64,
            MTLResourceOptions::StorageModeShared,
        );

        let command_buffer = queue.new_command_buffer();
        let blit = command_buffer.new_blit_command_encoder();
        blit.copy_from_buffer(
            &self.control_points,
            0,
            &cp_staging,
            0,
            CONTROL_POINT_BUFFER_SIZE as u64,
        );
        blit.copy_from_buffer(
            &self.tess_factors,
            0,
            &tf_staging,
            0,
            TESS_FACTOR_BUFFER_SIZE as u64,
        );
        blit.end_encoding();
        command_buffer.commit();
        command_buffer.wait_until_completed();

        let control_points = unsafe {
            std::slice::from_raw_parts(
                cp_staging.contents() as *const ControlPoint,
                CONTROL_POINT_COUNT,
            )
        }
        .to_vec();
        let tess_factors = unsafe {
            std::slice::from_raw_parts(
                tf_staging.contents() as *const QuadTessFactors,
                PATCH_COUNT,
            )
        }
        .to_vec();

        PatchReadback {
            control_points,
            tess_factors,
        }
    }
}

fn check_length(name: &'static str, buffer: &BufferRef, expected: u64) -> Result<(), TessError> {
    let actual = buffer.length();
    if actual != expected {
        return Err(TessError::BufferSize {
            name,
            expected,
            actual,
        });
    }
    Ok(())
}
