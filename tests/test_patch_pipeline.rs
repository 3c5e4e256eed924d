//! GPU tests for the tessellation pipeline: compute results against the CPU
//! reference surface, dropped frames, offscreen rendering, and
//! pipeline/attachment setup.
//!
//! Requires a Metal device.

use bezier_tess::patch_tess::math::IDENTITY;
use bezier_tess::patch_tess::metal_types::{QuadTessFactors, CONTROL_POINT_COUNT, PATCH_COUNT};
use bezier_tess::patch_tess::surface;
use bezier_tess::patch_tess::target::create_offscreen_texture;
use bezier_tess::patch_tess::{
    FrameOrchestrator, FrameResult, OrbitCamera, PipelineBuilder, RenderTarget, SceneConfig,
    TargetAttachments, TargetFormat,
};
use metal::*;

fn device() -> Device {
    Device::system_default().expect("No Metal device")
}

fn orchestrator(device: &Device) -> FrameOrchestrator {
    FrameOrchestrator::new(device, &SceneConfig::default(), TargetFormat::default())
        .expect("orchestrator setup")
}

#[test]
fn test_orchestrator_is_ready() {
    let device = device();
    let orchestrator = orchestrator(&device);
    assert!(orchestrator.is_ready());
    assert_eq!(orchestrator.stats().submitted, 0);
    assert_eq!(orchestrator.stats().dropped, 0);
}

#[test]
fn test_compute_matches_reference_surface() {
    let device = device();
    let orchestrator = orchestrator(&device);
    orchestrator.run_compute_sync();

    let readback = orchestrator
        .buffers()
        .read_back_sync(orchestrator.command_queue());
    let expected = surface::reference_control_points();
    assert_eq!(readback.control_points.len(), CONTROL_POINT_COUNT);

    for (i, (gpu, cpu)) in readback.control_points.iter().zip(&expected).enumerate() {
        for axis in 0..3 {
            assert!(
                (gpu.position[axis] - cpu.position[axis]).abs() < 1e-3,
                "control point {} axis {}: gpu {:?} cpu {:?}",
                i,
                axis,
                gpu.position,
                cpu.position
            );
        }
    }
}

#[test]
fn test_tess_factors_are_uniform_per_patch() {
    let device = device();
    let orchestrator = orchestrator(&device);
    orchestrator.run_compute_sync();

    let readback = orchestrator
        .buffers()
        .read_back_sync(orchestrator.command_queue());
    assert_eq!(readback.tess_factors.len(), PATCH_COUNT);

    let expected = QuadTessFactors::uniform(16.0, 16.0);
    for (patch, factors) in readback.tess_factors.iter().enumerate() {
        assert_eq!(*factors, expected, "patch {}", patch);
    }
}

#[test]
fn test_configured_factors_reach_the_buffer() {
    let device = device();
    let mut config = SceneConfig::default();
    config.tessellation.edge_factor = 7.0;
    config.tessellation.inside_factor = 3.0;
    let orchestrator = FrameOrchestrator::new(&device, &config, TargetFormat::default())
        .expect("orchestrator setup");
    orchestrator.run_compute_sync();

    let readback = orchestrator
        .buffers()
        .read_back_sync(orchestrator.command_queue());
    let expected = QuadTessFactors::uniform(7.0, 3.0);
    assert!(readback.tess_factors.iter().all(|f| *f == expected));
}

const SENTINEL: u8 = 0xAB;

/// Overwrite both patch buffers with `SENTINEL` bytes and wait.
fn fill_patch_buffers(orchestrator: &FrameOrchestrator) {
    let buffers = orchestrator.buffers();
    let command_buffer = orchestrator.command_queue().new_command_buffer();
    let blit = command_buffer.new_blit_command_encoder();
    for buffer in [buffers.control_points(), buffers.tess_factors()] {
        blit.fill_buffer(buffer, NSRange::new(0, buffer.length()), SENTINEL);
    }
    blit.end_encoding();
    command_buffer.commit();
    command_buffer.wait_until_completed();
}

fn assert_sentinel_intact(orchestrator: &FrameOrchestrator) {
    let readback = orchestrator
        .buffers()
        .read_back_sync(orchestrator.command_queue());
    let word = u32::from_ne_bytes([SENTINEL; 4]);
    let half_word = u16::from_ne_bytes([SENTINEL; 2]);

    for (i, point) in readback.control_points.iter().enumerate() {
        assert!(
            point.position.iter().all(|c| c.to_bits() == word),
            "control point {} was written: {:?}",
            i,
            point.position
        );
    }
    for (patch, factors) in readback.tess_factors.iter().enumerate() {
        assert!(
            factors
                .edge
                .iter()
                .chain(&factors.inside)
                .all(|f| f.to_bits() == half_word),
            "factors of patch {} were written: {:?}",
            patch,
            factors
        );
    }
}

/// Copy a BGRA8 texture into CPU memory.
fn read_pixels(queue: &CommandQueue, texture: &TextureRef) -> Vec<[u8; 4]> {
    let (width, height) = (texture.width(), texture.height());
    let bytes_per_row = width * 4;
    let staging = queue.device().new_buffer(
        bytes_per_row * height,
        MTLResourceOptions::StorageModeShared,
    );

    let command_buffer = queue.new_command_buffer();
    let blit = command_buffer.new_blit_command_encoder();
    blit.copy_from_texture_to_buffer(
        texture,
        0,
        0,
        MTLOrigin { x: 0, y: 0, z: 0 },
        MTLSize::new(width, height, 1),
        &staging,
        0,
        bytes_per_row,
        bytes_per_row * height,
        MTLBlitOption::empty(),
    );
    blit.end_encoding();
    command_buffer.commit();
    command_buffer.wait_until_completed();

    unsafe {
        std::slice::from_raw_parts(
            staging.contents() as *const [u8; 4],
            (width * height) as usize,
        )
    }
    .to_vec()
}

fn clear_pixel(clear_color: [f64; 4]) -> [u8; 4] {
    let [r, g, b, a] = clear_color.map(|c| (c * 255.0).round() as u8);
    [b, g, r, a]
}

#[test]
fn test_dropped_frame_dispatches_nothing() {
    let device = device();
    let mut orchestrator = orchestrator(&device);
    fill_patch_buffers(&orchestrator);
    assert_sentinel_intact(&orchestrator);

    let result = orchestrator.render_frame(&IDENTITY, (800.0, 600.0), None);
    assert_eq!(result, FrameResult::Dropped);
    assert_eq!(orchestrator.stats().dropped, 1);
    assert_eq!(orchestrator.stats().submitted, 0);

    // A zero-area destination is dropped the same way
    let format = TargetFormat::default();
    let attachments = TargetAttachments::new(&device, format, 64, 64);
    let texture = create_offscreen_texture(&device, format, 64, 64);
    let target = RenderTarget::offscreen(&texture, &attachments);
    let result = orchestrator.render_frame(&IDENTITY, (0.0, 64.0), Some(&target));
    assert_eq!(result, FrameResult::Dropped);
    assert_eq!(orchestrator.stats().dropped, 2);

    assert_sentinel_intact(&orchestrator);
}

#[test]
fn test_mismatched_attachments_drop_the_frame() {
    let device = device();
    let mut orchestrator = orchestrator(&device);
    fill_patch_buffers(&orchestrator);

    let format = TargetFormat::default();
    let texture = create_offscreen_texture(&device, format, 128, 128);

    let stale = TargetAttachments::new(&device, format, 64, 64);
    let target = RenderTarget::offscreen(&texture, &stale);
    assert!(!target.matches(format));
    let result = orchestrator.render_frame(&IDENTITY, target.drawable_size(), Some(&target));
    assert_eq!(result, FrameResult::Dropped);

    let single_sample =
        TargetAttachments::new(&device, TargetFormat::with_sample_count(1), 128, 128);
    let target = RenderTarget::offscreen(&texture, &single_sample);
    let result = orchestrator.render_frame(&IDENTITY, target.drawable_size(), Some(&target));
    assert_eq!(result, FrameResult::Dropped);

    assert_eq!(orchestrator.stats().dropped, 2);
    assert_eq!(orchestrator.stats().submitted, 0);
    assert_sentinel_intact(&orchestrator);
}

#[test]
fn test_offscreen_frame_draws_the_surface() {
    let device = device();
    let config = SceneConfig::default();
    let format = TargetFormat::with_sample_count(config.target.sample_count);
    let mut orchestrator =
        FrameOrchestrator::new(&device, &config, format).expect("orchestrator setup");
    fill_patch_buffers(&orchestrator);

    let (width, height) = (256, 256);
    let attachments = TargetAttachments::new(&device, format, width, height);
    let texture = create_offscreen_texture(&device, format, width, height);
    let target = RenderTarget::offscreen(&texture, &attachments);
    assert!(target.drawable().is_none());
    assert!(target.matches(format));

    let camera = OrbitCamera::from_config(&config.camera);
    let result =
        orchestrator.render_frame(&camera.world_transform(), target.drawable_size(), Some(&target));
    assert_eq!(result, FrameResult::Submitted);
    assert_eq!(orchestrator.stats().submitted, 1);
    assert_eq!(orchestrator.stats().dropped, 0);

    // Same queue, so the readback runs after the frame
    let pixels = read_pixels(orchestrator.command_queue(), &texture);
    let clear = clear_pixel(config.target.clear_color);
    let is_background = |p: &[u8; 4]| p.iter().zip(&clear).all(|(a, b)| a.abs_diff(*b) <= 2);
    let covered = pixels.iter().filter(|p| !is_background(p)).count();
    assert!(
        covered > pixels.len() / 100,
        "only {} of {} pixels differ from the clear colour",
        covered,
        pixels.len()
    );
    // Corners stay background
    assert!(is_background(&pixels[0]), "corner pixel {:?}", pixels[0]);

    // The frame's compute pass replaced the sentinel contents
    let readback = orchestrator
        .buffers()
        .read_back_sync(orchestrator.command_queue());
    let expected = surface::reference_control_points();
    for (gpu, cpu) in readback.control_points.iter().zip(&expected) {
        for axis in 0..3 {
            assert!((gpu.position[axis] - cpu.position[axis]).abs() < 1e-3);
        }
    }
    assert!(readback
        .tess_factors
        .iter()
        .all(|f| *f == QuadTessFactors::uniform(16.0, 16.0)));
}

#[test]
fn test_pipelines_build_for_each_sample_count() {
    let device = device();
    for samples in [1, 4] {
        let format = TargetFormat::with_sample_count(samples);
        let pipelines = PipelineBuilder::new(&device, format)
            .build()
            .unwrap_or_else(|e| panic!("sample count {}: {}", samples, e));
        assert!(pipelines.is_ready());
        assert!(pipelines.tess_factor_group_width() > 0);
    }
}

#[test]
fn test_attachments_follow_resize() {
    let device = device();
    let mut attachments = TargetAttachments::new(&device, TargetFormat::default(), 640, 480);
    assert_eq!(attachments.size(), (640, 480));

    attachments.resize(&device, 1024, 768);
    assert_eq!(attachments.size(), (1024, 768));
    assert_eq!(attachments.format().sample_count, 4);
}
