//! In-memory legacy graphics context.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use framepipe_core::SharedPixelBuffer;
use framepipe_shared::{IntRect, IntSize};

use super::raster;
use crate::error::{PipelineError, PipelineResult};
use crate::gpu::{
    Framebuffer, GraphicsApi, LegacyContext, Texture, TextureDescriptor, TextureFormat,
    TextureStorage, TextureUsage,
};

static NEXT_SHARE_GROUP: AtomicU64 = AtomicU64::new(1);

/// Software legacy context. Contexts made by [`shared`](Self::shared) or
/// [`create_shared_context`](LegacyContext::create_shared_context) share
/// the fault switch and the share group.
#[derive(Debug)]
pub struct HeadlessLegacyContext {
    label: String,
    share_group: u64,
    fail_texture_cache: Arc<AtomicBool>,
    live_framebuffers: usize,
    flushes: u64,
    blits: u64,
}

impl HeadlessLegacyContext {
    /// Creates a context in a new share group.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            share_group: NEXT_SHARE_GROUP.fetch_add(1, Ordering::Relaxed),
            fail_texture_cache: Arc::new(AtomicBool::new(false)),
            live_framebuffers: 0,
            flushes: 0,
            blits: 0,
        }
    }

    /// A context in the same share group, with the same fault switch.
    #[must_use]
    pub fn shared(&self) -> Self {
        Self {
            label: format!("{} (shared)", self.label),
            share_group: self.share_group,
            fail_texture_cache: Arc::clone(&self.fail_texture_cache),
            live_framebuffers: 0,
            flushes: 0,
            blits: 0,
        }
    }

    /// Makes texture cache creation fail.
    pub fn set_fail_texture_cache(&self, fail: bool) {
        self.fail_texture_cache.store(fail, Ordering::SeqCst);
    }

    /// Framebuffers created and not deleted.
    #[must_use]
    pub fn live_framebuffers(&self) -> usize {
        self.live_framebuffers
    }

    /// Flushes so far.
    #[must_use]
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Blits so far.
    #[must_use]
    pub fn blits(&self) -> u64 {
        self.blits
    }
}

impl LegacyContext for HeadlessLegacyContext {
    fn label(&self) -> &str {
        &self.label
    }

    fn share_group(&self) -> u64 {
        self.share_group
    }

    fn create_texture_from_shared(
        &mut self,
        buffer: &SharedPixelBuffer,
        format: TextureFormat,
    ) -> PipelineResult<Texture> {
        if self.fail_texture_cache.load(Ordering::SeqCst) {
            return Err(PipelineError::resource(
                "legacy texture cache",
                "injected cache failure",
            ));
        }
        if buffer.bytes_per_pixel() != format.bytes_per_pixel() {
            return Err(PipelineError::resource(
                "legacy texture",
                format!("{format:?} cannot view a {}-byte buffer", buffer.bytes_per_pixel()),
            ));
        }
        let descriptor = TextureDescriptor::new(
            "legacy interop",
            buffer.size(),
            format,
            TextureUsage::RENDER_TARGET,
        );
        Ok(Texture::new(
            GraphicsApi::Legacy,
            descriptor,
            TextureStorage::Shared(buffer.clone()),
        ))
    }

    fn create_framebuffer(
        &mut self,
        color: &Texture,
        with_depth: bool,
    ) -> PipelineResult<Framebuffer> {
        if color.api() != GraphicsApi::Legacy {
            return Err(PipelineError::resource(
                "framebuffer",
                "color attachment is not a legacy texture",
            ));
        }
        self.live_framebuffers += 1;
        Ok(Framebuffer::new(color.clone(), with_depth))
    }

    fn create_offscreen_framebuffer(
        &mut self,
        size: IntSize,
        format: TextureFormat,
        with_depth: bool,
    ) -> PipelineResult<Framebuffer> {
        if size.is_empty() {
            return Err(PipelineError::resource("framebuffer", "zero-sized attachment"));
        }
        let color = Texture::new_private(
            GraphicsApi::Legacy,
            TextureDescriptor::new("back buffer", size, format, TextureUsage::RENDER_TARGET),
        );
        self.live_framebuffers += 1;
        Ok(Framebuffer::new(color, with_depth))
    }

    fn delete_framebuffer(&mut self, framebuffer: Framebuffer) {
        self.live_framebuffers = self.live_framebuffers.saturating_sub(1);
        drop(framebuffer);
    }

    fn clear_framebuffer(&mut self, framebuffer: &Framebuffer, color: [f64; 4]) {
        raster::clear(framebuffer.color(), color);
    }

    fn blit_framebuffer(&mut self, source: &Framebuffer, target: &Framebuffer, rect: IntRect) {
        if raster::copy(source.color(), rect, target.color(), rect.origin) {
            self.blits += 1;
        }
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }

    fn create_shared_context(&self) -> PipelineResult<Box<dyn LegacyContext>> {
        Ok(Box::new(self.shared()))
    }
}
