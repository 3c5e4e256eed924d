//! GPU-driven Bezier patch tessellation.
//!
//! Control points and tessellation factors are produced by compute kernels,
//! then consumed by Metal's fixed-function tessellator in the same command
//! buffer. See [`patch_tess`] for the components.

pub mod patch_tess;
