//! # Interop Texture Bridge
//!
//! Pairs one [`FrameSurface`] with a legacy-API texture and a modern-API
//! texture. With zero-copy support both textures view the surface memory.
//! Without it the modern texture gets private memory and every frame is
//! copied into it by [`InteropTextureBridge::synchronize`].
//!
//! ```text
//!          resize(size)
//!               │
//!   drop caches ─► drop surface ─► allocate surface ─► legacy cache ─► modern cache
//!                                        │                  │               │
//!                                        └──── any failure: bridge stays empty
//! ```

use framepipe_core::WeakPixelBuffer;
use framepipe_shared::{IntPoint, IntRect, IntSize};

use super::surface::FrameSurface;
use crate::error::{PipelineError, PipelineResult};
use crate::gpu::{
    CommandBuffer, GpuDevice, LegacyContext, Texture, TextureDescriptor, TextureFormat,
    TextureUsage,
};

/// The texture pair valid for the current surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteropTextures {
    /// Legacy-API view, the core's draw target.
    pub legacy: Texture,
    /// Modern-API view, sampled by the filter chain.
    pub modern: Texture,
    /// Both views alias the same memory.
    pub zero_copy: bool,
}

/// Zero-copy texture bridge between the two graphics APIs.
#[derive(Debug)]
pub struct InteropTextureBridge {
    surface: Option<FrameSurface>,
    textures: Option<InteropTextures>,
    generation: u64,
    rebuilds: u64,
}

impl InteropTextureBridge {
    /// Creates an empty bridge. [`resize`](Self::resize) builds it.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            surface: None,
            textures: None,
            generation: 0,
            rebuilds: 0,
        }
    }

    /// Replaces the surface and rebuilds both texture caches.
    ///
    /// Old textures are released before anything new is allocated. On
    /// failure the bridge is left empty and [`current_textures`](Self::current_textures)
    /// fails until the next successful resize.
    ///
    /// # Errors
    ///
    /// Returns the first allocation error. All of them are fatal.
    pub fn resize(
        &mut self,
        device: &dyn GpuDevice,
        legacy: &mut dyn LegacyContext,
        size: IntSize,
        format: TextureFormat,
    ) -> PipelineResult<()> {
        self.textures = None;
        self.surface = None;
        self.generation += 1;

        let surface = FrameSurface::allocate(device, size, format)?;
        let zero_copy = device.supports_zero_copy();

        let legacy_texture = legacy.create_texture_from_shared(surface.buffer(), format)?;

        let descriptor =
            TextureDescriptor::new("interop", size, format, TextureUsage::RENDER_TARGET);
        let modern_texture = if zero_copy {
            device.wrap_shared_buffer(surface.buffer(), &descriptor)?
        } else {
            device.create_texture(&descriptor)?
        };

        if zero_copy && !legacy_texture.aliases(&modern_texture) {
            return Err(PipelineError::resource(
                "interop texture",
                "legacy and modern views do not share memory",
            ));
        }

        self.surface = Some(surface);
        self.textures = Some(InteropTextures {
            legacy: legacy_texture,
            modern: modern_texture,
            zero_copy,
        });
        self.rebuilds += 1;

        tracing::debug!(
            target: "framepipe::renderer",
            "Interop bridge rebuilt at {size} ({format:?}, zero-copy: {zero_copy}, generation {})",
            self.generation
        );
        Ok(())
    }

    /// The current texture pair.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InteropUnavailable`] if the bridge was
    /// never built or its last rebuild failed.
    pub fn current_textures(&self) -> PipelineResult<&InteropTextures> {
        self.textures.as_ref().ok_or(PipelineError::InteropUnavailable)
    }

    /// Records the per-frame copy into the modern texture when the two
    /// views do not share memory. No-op for zero-copy.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InteropUnavailable`] if the bridge is empty.
    pub fn synchronize(&self, buffer: &mut CommandBuffer) -> PipelineResult<()> {
        let textures = self.current_textures()?;
        if !textures.zero_copy {
            buffer.copy_texture(
                &textures.legacy,
                IntRect::from_size(textures.legacy.size()),
                &textures.modern,
                IntPoint::ZERO,
            );
        }
        Ok(())
    }

    /// Legacy-API content has a bottom-left origin.
    #[inline]
    #[must_use]
    pub fn is_flipped_vertically(&self) -> bool {
        self.textures.is_some()
    }

    /// Current surface, if built.
    #[inline]
    #[must_use]
    pub fn surface(&self) -> Option<&FrameSurface> {
        self.surface.as_ref()
    }

    /// Size of the current surface.
    #[must_use]
    pub fn size(&self) -> Option<IntSize> {
        self.surface.as_ref().map(FrameSurface::size)
    }

    /// Non-owning reference to the current surface memory.
    #[must_use]
    pub fn downgrade_surface(&self) -> Option<WeakPixelBuffer> {
        self.surface.as_ref().map(FrameSurface::downgrade)
    }

    /// Number of resize attempts so far.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of successful rebuilds so far.
    #[inline]
    #[must_use]
    pub const fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }
}

impl Default for InteropTextureBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuCommand;
    use crate::headless::{HeadlessConfig, HeadlessDevice, HeadlessLegacyContext};

    fn build(zero_copy: bool) -> (HeadlessDevice, HeadlessLegacyContext, InteropTextureBridge) {
        let device = HeadlessDevice::new(HeadlessConfig {
            zero_copy,
            ..HeadlessConfig::default()
        });
        let legacy = HeadlessLegacyContext::new("present");
        (device, legacy, InteropTextureBridge::new())
    }

    #[test]
    fn test_empty_bridge_is_unavailable() {
        let bridge = InteropTextureBridge::new();
        assert_eq!(
            bridge.current_textures().unwrap_err(),
            PipelineError::InteropUnavailable
        );
        assert!(!bridge.is_flipped_vertically());
    }

    #[test]
    fn test_zero_copy_views_alias() {
        let (device, mut legacy, mut bridge) = build(true);
        bridge
            .resize(&device, &mut legacy, IntSize::new(256, 224), TextureFormat::Bgra8Unorm)
            .unwrap();

        let textures = bridge.current_textures().unwrap();
        assert!(textures.zero_copy);
        assert!(textures.legacy.aliases(&textures.modern));
        assert!(textures.modern.storage().aliases(bridge.surface().unwrap().buffer()));
        assert!(bridge.is_flipped_vertically());

        let mut cb = CommandBuffer::new("sync");
        bridge.synchronize(&mut cb).unwrap();
        assert!(cb.is_empty());
    }

    #[test]
    fn test_copy_fallback_records_copy() {
        let (device, mut legacy, mut bridge) = build(false);
        bridge
            .resize(&device, &mut legacy, IntSize::new(64, 64), TextureFormat::Bgra8Unorm)
            .unwrap();

        let textures = bridge.current_textures().unwrap();
        assert!(!textures.zero_copy);
        assert!(!textures.legacy.aliases(&textures.modern));
        assert!(textures.legacy.storage().aliases(bridge.surface().unwrap().buffer()));

        let mut cb = CommandBuffer::new("sync");
        bridge.synchronize(&mut cb).unwrap();
        assert!(matches!(cb.commands(), [GpuCommand::Copy { .. }]));
    }

    #[test]
    fn test_resize_replaces_everything() {
        let (device, mut legacy, mut bridge) = build(true);
        bridge
            .resize(&device, &mut legacy, IntSize::new(256, 224), TextureFormat::Bgra8Unorm)
            .unwrap();
        let old = bridge.current_textures().unwrap().clone();
        let old_surface = bridge.downgrade_surface().unwrap();
        drop(old);

        bridge
            .resize(&device, &mut legacy, IntSize::new(512, 448), TextureFormat::Bgra8Unorm)
            .unwrap();
        let fresh = bridge.current_textures().unwrap();

        assert_eq!(fresh.legacy.size(), IntSize::new(512, 448));
        assert_eq!(fresh.modern.size(), IntSize::new(512, 448));
        assert!(fresh.legacy.aliases(&fresh.modern));
        assert!(!old_surface.is_alive());
        assert_eq!(bridge.rebuild_count(), 2);
    }

    #[test]
    fn test_failed_resize_leaves_bridge_empty() {
        let (device, mut legacy, mut bridge) = build(true);
        bridge
            .resize(&device, &mut legacy, IntSize::new(64, 64), TextureFormat::Bgra8Unorm)
            .unwrap();

        legacy.set_fail_texture_cache(true);
        let err = bridge
            .resize(&device, &mut legacy, IntSize::new(128, 128), TextureFormat::Bgra8Unorm)
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(bridge.current_textures().is_err());
        assert!(bridge.surface().is_none());
        assert_eq!(bridge.generation(), 2);
        assert_eq!(bridge.rebuild_count(), 1);
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let (device, mut legacy, mut bridge) = build(true);
        let err = bridge
            .resize(&device, &mut legacy, IntSize::ZERO, TextureFormat::Bgra8Unorm)
            .unwrap_err();
        assert_eq!(err, PipelineError::EmptyBuffer(IntSize::ZERO));
    }
}
