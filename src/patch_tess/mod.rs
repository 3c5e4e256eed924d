// Bezier Patch Tessellation
//
// Compute kernels write control points and per-patch tessellation factors into
// device-private buffers; the render pass feeds both through the hardware
// tessellator. Leaf modules first.

pub mod math;         // Matrix construction and angle conversion
pub mod metal_types;  // Layout contract shared with the shaders
pub mod surface;      // Patch indexing + CPU reference of the kernels
pub mod error;        // Setup and config errors
pub mod config;       // Scene configuration (TOML)

pub mod shaders;      // Embedded MSL programs
pub mod resources;    // Control-point and tess-factor buffers
pub mod pipeline;     // Compute + tessellated render pipelines
pub mod target;       // Drawable + MSAA/depth attachments
pub mod frame;        // Per-frame orchestration
pub mod camera;       // Orbit camera controller

pub use camera::OrbitCamera;
pub use config::SceneConfig;
pub use error::{ConfigError, TessError};
pub use frame::{FrameOrchestrator, FramePlan, FrameResult, FrameStats};
pub use pipeline::{PipelineBuilder, TessPipelines};
pub use resources::PatchBuffers;
pub use target::{RenderTarget, TargetAttachments, TargetFormat};
