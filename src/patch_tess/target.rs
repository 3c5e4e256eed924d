//! Render target supplied by the host.
//!
//! The host hands over a drawable each frame, or an offscreen texture when
//! rendering headless. `TargetAttachments` owns the multisampled colour
//! texture (resolved into that destination) and the depth texture, and
//! recreates both when the destination size changes.

use metal::*;
use tracing::debug;

/// Pixel formats and sample count fixed for the lifetime of the pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFormat {
    pub color: MTLPixelFormat,
    pub depth: MTLPixelFormat,
    pub sample_count: u64,
}

impl Default for TargetFormat {
    fn default() -> Self {
        Self {
            color: MTLPixelFormat::BGRA8Unorm,
            depth: MTLPixelFormat::Depth32Float,
            sample_count: 4,
        }
    }
}

impl TargetFormat {
    pub fn with_sample_count(sample_count: u64) -> Self {
        Self {
            sample_count,
            ..Self::default()
        }
    }

    pub fn is_multisampled(&self) -> bool {
        self.sample_count > 1
    }
}

/// Colour (when multisampled) and depth attachments sized to the drawable.
pub struct TargetAttachments {
    format: TargetFormat,
    width: u64,
    height: u64,
    color: Option<Texture>,
    depth: Texture,
}

impl TargetAttachments {
    pub fn new(device: &DeviceRef, format: TargetFormat, width: u64, height: u64) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let color = format
            .is_multisampled()
            .then(|| create_texture(device, format.color, format.sample_count, width, height));
        let depth = create_texture(device, format.depth, format.sample_count, width, height);

        Self {
            format,
            width,
            height,
            color,
            depth,
        }
    }

    /// Recreate the textures if the drawable size changed.
    pub fn resize(&mut self, device: &DeviceRef, width: u64, height: u64) {
        if width.max(1) == self.width && height.max(1) == self.height {
            return;
        }
        debug!(width, height, "recreating target attachments");
        *self = Self::new(device, self.format, width, height);
    }

    pub fn format(&self) -> TargetFormat {
        self.format
    }

    pub fn size(&self) -> (u64, u64) {
        (self.width, self.height)
    }
}

fn create_texture(
    device: &DeviceRef,
    format: MTLPixelFormat,
    sample_count: u64,
    width: u64,
    height: u64,
) -> Texture {
    let desc = TextureDescriptor::new();
    if sample_count > 1 {
        desc.set_texture_type(MTLTextureType::D2Multisample);
        desc.set_sample_count(sample_count);
    }
    desc.set_width(width);
    desc.set_height(height);
    desc.set_pixel_format(format);
    desc.set_storage_mode(MTLStorageMode::Private);
    desc.set_usage(MTLTextureUsage::RenderTarget);
    device.new_texture(&desc)
}

/// Single-sample colour texture usable as an offscreen `RenderTarget`
/// destination and as a blit source for reading pixels back.
pub fn create_offscreen_texture(
    device: &DeviceRef,
    format: TargetFormat,
    width: u64,
    height: u64,
) -> Texture {
    let desc = TextureDescriptor::new();
    desc.set_width(width.max(1));
    desc.set_height(height.max(1));
    desc.set_pixel_format(format.color);
    desc.set_storage_mode(MTLStorageMode::Private);
    desc.set_usage(MTLTextureUsage::RenderTarget | MTLTextureUsage::ShaderRead);
    device.new_texture(&desc)
}

/// One frame's colour destination plus the attachments to render through.
///
/// The destination is the drawable's texture when presenting to a layer, or
/// any single-sample texture of the colour format when rendering offscreen.
pub struct RenderTarget<'a> {
    resolve: &'a TextureRef,
    drawable: Option<&'a MetalDrawableRef>,
    attachments: &'a TargetAttachments,
}

impl<'a> RenderTarget<'a> {
    pub fn new(drawable: &'a MetalDrawableRef, attachments: &'a TargetAttachments) -> Self {
        Self {
            resolve: drawable.texture(),
            drawable: Some(drawable),
            attachments,
        }
    }

    /// Render into `texture` with nothing to present.
    pub fn offscreen(texture: &'a TextureRef, attachments: &'a TargetAttachments) -> Self {
        Self {
            resolve: texture,
            drawable: None,
            attachments,
        }
    }

    /// Drawable to present after the frame, if any.
    pub fn drawable(&self) -> Option<&'a MetalDrawableRef> {
        self.drawable
    }

    pub fn attachments(&self) -> &TargetAttachments {
        self.attachments
    }

    /// Destination size in pixels.
    pub fn drawable_size(&self) -> (f64, f64) {
        (self.resolve.width() as f64, self.resolve.height() as f64)
    }

    /// The attachments were built for `format` and match the destination size.
    pub fn matches(&self, format: TargetFormat) -> bool {
        let size = (self.resolve.width(), self.resolve.height());
        self.attachments.format == format
            && self.attachments.size() == size
            && self.resolve.pixel_format() == format.color
    }

    /// Pass descriptor: clear colour and depth, resolve MSAA into the destination.
    pub fn pass_descriptor(&self, clear_color: [f64; 4]) -> &'static RenderPassDescriptorRef {
        let desc = RenderPassDescriptor::new();
        let [r, g, b, a] = clear_color;

        if let Some(color_attachment) = desc.color_attachments().object_at(0) {
            match &self.attachments.color {
                Some(msaa) => {
                    color_attachment.set_texture(Some(msaa));
                    color_attachment.set_resolve_texture(Some(self.resolve));
                    color_attachment.set_store_action(MTLStoreAction::MultisampleResolve);
                }
                None => {
                    color_attachment.set_texture(Some(self.resolve));
                    color_attachment.set_store_action(MTLStoreAction::Store);
                }
            }
            color_attachment.set_load_action(MTLLoadAction::Clear);
            color_attachment.set_clear_color(MTLClearColor::new(r, g, b, a));
        }

        if let Some(depth_attachment) = desc.depth_attachment() {
            depth_attachment.set_texture(Some(&self.attachments.depth));
            depth_attachment.set_load_action(MTLLoadAction::Clear);
            depth_attachment.set_clear_depth(1.0);
            depth_attachment.set_store_action(MTLStoreAction::DontCare);
        }

        desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_format() {
        let format = TargetFormat::default();
        assert_eq!(format.color, MTLPixelFormat::BGRA8Unorm);
        assert_eq!(format.depth, MTLPixelFormat::Depth32Float);
        assert_eq!(format.sample_count, 4);
        assert!(format.is_multisampled());
        assert!(!TargetFormat::with_sample_count(1).is_multisampled());
    }
}
