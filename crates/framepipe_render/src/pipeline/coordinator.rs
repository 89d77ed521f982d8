//! # Presentation Coordinator
//!
//! Drives one emulated frame from the core's pixels to the display layer.
//!
//! ```text
//! did_execute_frame()
//!   ├─ geometry changed? ── buffer size ──► rebuild renderer/bridge (rare, heavy)
//!   │                    └─ rect/aspect ──► filter.set_source_rect (cheap)
//!   ├─ paused && !display_always ─────────► Paused   [no render thread wait]
//!   ├─ render thread handshake (bounded)
//!   ├─ budget.try_acquire() ── None ──────► Skipped(BudgetExhausted)   [never blocks]
//!   ├─ offscreen CB: renderer texture → filter offscreen passes → commit
//!   ├─ next_drawable() ─────── None ──────► Skipped(NoDrawable), permit dropped
//!   └─ final CB: clear → final pass → present → commit
//!                                   └─ on GPU completion: permit released
//! ```
//!
//! Everything here runs on the thread that calls the per-frame hooks. The
//! only work that leaves it is the completion handler, which owns the
//! permit and the frame rate meter handle.

use std::sync::Arc;
use std::time::Duration;

use framepipe_core::{BudgetStats, FrameSkipCounter, HandshakeOutcome, PresentBudget};
use framepipe_shared::{
    preferred_frames_per_second, Bounds, IntRect, IntSize, MAX_BUFFER_DIMENSION,
};

use super::events::{DisplayEvent, DisplayEventBus, DisplayEventReceiver};
use super::frame::{CapturedImage, FrameOutcome, SkipReason};
use super::stats::{FrameRateMeter, PresentStats};
use crate::config::{EffectsMode, FatalErrorPolicy, PipelineConfig};
use crate::core_video::{CoreVideoSource, CoreVideoState};
use crate::error::{PipelineError, PipelineResult};
use crate::filter::{FilterChain, FrameDirection};
use crate::gpu::{
    Framebuffer, GpuDevice, LegacyContext, TextureDescriptor, TextureFormat, TextureUsage,
};
use crate::interop::InteropTextureBridge;
use crate::renderer::{Renderer, RendererKind, RenderThreadHandle};

const TARGET: &str = "framepipe::display";

/// Per-frame orchestration between a core, a renderer, a filter chain and
/// the display layer.
pub struct PresentationCoordinator {
    config: PipelineConfig,
    device: Arc<dyn GpuDevice>,
    core: Arc<dyn CoreVideoSource>,
    filter: Box<dyn FilterChain>,
    renderer: Renderer,

    budget: PresentBudget,
    skips: FrameSkipCounter,
    events: DisplayEventBus,
    meter: FrameRateMeter,
    stats: PresentStats,

    previous_buffer_size: IntSize,
    previous_screen_rect: IntRect,
    previous_aspect_size: IntSize,

    effects_mode: EffectsMode,
    output_bounds: Bounds,
    backing_scale_factor: f64,
    adaptive_sync: bool,
    frame_index: u64,
}

impl PresentationCoordinator {
    /// Selects a renderer for `core`, builds its resources and sizes the
    /// display layer to the core's buffer.
    ///
    /// `legacy` is required for cores drawing through the legacy API and
    /// ignored otherwise.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidConfig`] for a bad configuration, the
    /// recoverable geometry errors if the core starts with unusable
    /// dimensions, and fatal setup errors under
    /// [`FatalErrorPolicy::Propagate`]. Under [`FatalErrorPolicy::Abort`]
    /// fatal setup errors terminate the process.
    pub fn new(
        config: PipelineConfig,
        device: Arc<dyn GpuDevice>,
        legacy: Option<Box<dyn LegacyContext>>,
        core: Arc<dyn CoreVideoSource>,
        filter: Box<dyn FilterChain>,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let video = core.video_state();
        validate_geometry(&video)?;

        let policy = config.fatal_policy;
        let renderer = Renderer::select(Arc::clone(&device), legacy, &video, &config)
            .map_err(|err| escalate(policy, err))?;

        let mut coordinator = Self {
            budget: PresentBudget::new(),
            skips: FrameSkipCounter::new(),
            events: DisplayEventBus::new(config.event_capacity),
            meter: FrameRateMeter::new(),
            stats: PresentStats::default(),
            previous_buffer_size: video.buffer_size,
            previous_screen_rect: video.screen_rect,
            previous_aspect_size: video.aspect_size,
            effects_mode: config.effects_mode,
            output_bounds: Bounds::from_size(video.buffer_size),
            backing_scale_factor: config.backing_scale_factor,
            adaptive_sync: config.adaptive_sync,
            frame_index: 0,
            config,
            device,
            core,
            filter,
            renderer,
        };

        coordinator
            .renderer
            .update(&video)
            .map_err(|err| escalate(policy, err))?;
        coordinator.resize_drawable();
        coordinator.update_screen_size(&video);

        tracing::info!(
            target: TARGET,
            "Presentation ready on {}: {:?}, buffer {}, drawable {}",
            coordinator.device.name(),
            coordinator.renderer.kind(),
            video.buffer_size,
            coordinator.device.drawable_size()
        );
        Ok(coordinator)
    }

    // ========================================================================
    // PER-FRAME HOOKS
    // ========================================================================

    /// Hook for "the core is about to execute a frame".
    pub fn will_execute_frame(&self) {
        self.renderer.will_execute();
    }

    /// Hook for "the core finished a frame". Presents it or records why not.
    ///
    /// Never blocks on the present budget. Unusable frames come back as
    /// [`FrameOutcome::Skipped`], not as errors.
    ///
    /// # Errors
    ///
    /// Fatal errors (a GPU resource could not be created) under
    /// [`FatalErrorPolicy::Propagate`]. Under [`FatalErrorPolicy::Abort`]
    /// they terminate the process.
    pub fn did_execute_frame(&mut self) -> PipelineResult<FrameOutcome> {
        self.frame_index += 1;
        self.stats.frames_seen += 1;
        let video = self.core.video_state();

        if let Err(err) = self.reconfigure(&video) {
            return self.reject_frame(err);
        }

        // A paused core's render thread produces nothing to wait for.
        if video.paused && self.effects_mode == EffectsMode::ReflectPaused {
            self.stats.paused += 1;
            return Ok(FrameOutcome::Paused);
        }

        if self.renderer.did_execute() == HandshakeOutcome::TimedOut {
            self.stats.handshake_timeouts += 1;
        }

        let Some(permit) = self.budget.try_acquire() else {
            self.stats.skipped_budget += 1;
            self.record_skip(SkipReason::BudgetExhausted);
            return Ok(FrameOutcome::Skipped(SkipReason::BudgetExhausted));
        };

        // Offscreen work: frame texture plus every pass not targeting the
        // drawable. A failure here drops the permit before anything is
        // submitted, which releases it.
        let mut offscreen = match self.device.make_command_buffer("offscreen") {
            Ok(buffer) => buffer,
            Err(err) => return self.reject_frame(err),
        };
        let texture = match self
            .renderer
            .prepare_frame(self.core.as_ref(), &video, &mut offscreen)
        {
            Ok(texture) => texture,
            Err(err) => return self.reject_frame(err),
        };
        if let Err(err) = self.filter.render_offscreen_passes(&texture, &mut offscreen) {
            return self.reject_frame(err);
        }
        self.device.commit(offscreen);

        let Some(drawable) = self.device.next_drawable() else {
            // No completion handler will run for this frame.
            drop(permit);
            self.stats.skipped_no_drawable += 1;
            self.record_skip(SkipReason::NoDrawable);
            return Ok(FrameOutcome::Skipped(SkipReason::NoDrawable));
        };

        let mut present = match self.device.make_command_buffer("present") {
            Ok(buffer) => buffer,
            Err(err) => return self.reject_frame(err),
        };
        let target = drawable.texture().clone();
        let flip = self.renderer.is_flipped_vertically();
        let mut encoder = present.render_encoder(&target, self.config.clear_color);
        self.filter.render_final_pass(&mut encoder, flip);
        encoder.end_encoding();

        let meter = self.meter.clone();
        present.add_completed_handler(move || {
            meter.record();
            permit.release();
        });

        match self.minimum_frame_duration(&video) {
            Some(duration) => present.present_after_minimum_duration(drawable, duration),
            None => present.present(drawable),
        }
        self.device.commit(present);

        self.stats.presented += 1;
        Ok(FrameOutcome::Presented {
            frame: self.frame_index,
        })
    }

    fn reconfigure(&mut self, video: &CoreVideoState) -> PipelineResult<()> {
        validate_geometry(video)?;

        if video.buffer_size != self.previous_buffer_size {
            let from = self.previous_buffer_size;
            let to = video.buffer_size;
            self.previous_buffer_size = to;

            if !self.renderer.can_change_buffer_size() {
                // The next frame re-reads the geometry through the rect path.
                return Err(PipelineError::ResizeUnsupported { from, to });
            }

            tracing::debug!(target: TARGET, "Core buffer size change: {from} -> {to}");
            self.renderer.update(video)?;
            self.stats.reconfigurations += 1;
            self.events.publish(DisplayEvent::BufferResized { from, to });
            self.update_screen_size(video);
        } else if video.screen_rect != self.previous_screen_rect
            || video.aspect_size != self.previous_aspect_size
        {
            self.renderer.update(video)?;
            self.update_screen_size(video);
        }
        Ok(())
    }

    fn update_screen_size(&mut self, video: &CoreVideoState) {
        self.previous_screen_rect = video.screen_rect;
        self.previous_aspect_size = video.aspect_size;

        let source = self.renderer.source_rect(video);
        self.filter.set_source_rect(source, video.aspect_size);
        self.stats.source_rect_updates += 1;

        tracing::debug!(
            target: TARGET,
            "Screen rect {} (source {source}), aspect {}",
            video.screen_rect,
            video.aspect_size
        );
        self.events.publish(DisplayEvent::ScreenSizeChanged {
            screen: video.screen_rect,
            aspect: video.aspect_size,
        });
    }

    /// Turns a frame error into an outcome, or escalates it.
    fn reject_frame(&mut self, err: PipelineError) -> PipelineResult<FrameOutcome> {
        if err.is_fatal() {
            return Err(escalate(self.config.fatal_policy, err));
        }
        tracing::debug!(target: TARGET, "Dropping frame {}: {err}", self.frame_index);
        self.stats.invalid_frames += 1;
        self.record_skip(SkipReason::InvalidFrame);
        Ok(FrameOutcome::Skipped(SkipReason::InvalidFrame))
    }

    fn record_skip(&self, reason: SkipReason) {
        let total = self.skips.record();
        let interval = self.config.skip_log_interval.max(1);
        if total == 1 || total % interval == 0 {
            tracing::debug!(
                target: TARGET,
                "Skipped {total} frames so far (latest: {reason:?}, presented {})",
                self.stats.presented
            );
        }
        self.events.publish(DisplayEvent::FrameSkipped { total });
    }

    fn minimum_frame_duration(&self, video: &CoreVideoState) -> Option<Duration> {
        if !self.adaptive_sync {
            return None;
        }
        let fps = preferred_frames_per_second(video.frame_interval);
        Some(Duration::from_secs_f64(1.0 / f64::from(fps)))
    }

    // ========================================================================
    // DISPLAY LAYER
    // ========================================================================

    /// The UI resized the viewport. Resizes the drawables and, when the
    /// renderer can follow, asks the core to render at the new size.
    ///
    /// Returns true if the core accepted a resize request.
    pub fn set_output_bounds(&mut self, bounds: Bounds) -> bool {
        if bounds != self.output_bounds {
            self.output_bounds = bounds;
            self.resize_drawable();
        }
        if !self.renderer.can_change_buffer_size() {
            return false;
        }
        let size = bounds.size_rounded_up();
        if size.is_empty() || size.width > MAX_BUFFER_DIMENSION || size.height > MAX_BUFFER_DIMENSION
        {
            return false;
        }
        let accepted = self.core.try_resize_video(size);
        tracing::debug!(target: TARGET, "Requested core video size {size}: accepted={accepted}");
        accepted
    }

    /// Points-to-pixels ratio of the display.
    pub fn set_backing_scale_factor(&mut self, scale: f64) {
        if !(scale.is_finite() && scale > 0.0) {
            tracing::warn!(target: TARGET, "Ignoring backing scale factor {scale}");
            return;
        }
        self.backing_scale_factor = scale;
        self.resize_drawable();
    }

    fn resize_drawable(&mut self) {
        let size = self.output_bounds.pixel_size(self.backing_scale_factor);
        if size.is_empty() {
            return;
        }
        if size.width > MAX_BUFFER_DIMENSION || size.height > MAX_BUFFER_DIMENSION {
            tracing::warn!(target: TARGET, "Ignoring drawable size {size}");
            return;
        }
        let changed = size != self.device.drawable_size();
        if changed {
            self.device.set_drawable_size(size);
            self.events.publish(DisplayEvent::DrawableSizeChanged(size));
            tracing::debug!(target: TARGET, "Drawable size {size}");
        }
        self.filter.set_drawable_size(size);
    }

    /// Switches pause behavior.
    pub fn set_effects_mode(&mut self, mode: EffectsMode) {
        self.effects_mode = mode;
    }

    /// Requests variable-refresh presents of at least one core frame each.
    pub fn set_adaptive_sync_enabled(&mut self, enabled: bool) {
        if self.adaptive_sync != enabled {
            tracing::debug!(target: TARGET, "Adaptive sync {}", if enabled { "on" } else { "off" });
        }
        self.adaptive_sync = enabled;
    }

    // ========================================================================
    // PLAYBACK CONTROL
    // ========================================================================

    /// Lets an alternate-thread core run unthrottled.
    pub fn suspend_fps_limiting(&self) -> bool {
        self.renderer.suspend_fps_limiting()
    }

    /// Restores lockstep with an alternate-thread core.
    pub fn resume_fps_limiting(&self) -> bool {
        self.renderer.resume_fps_limiting()
    }

    /// Fast forward runs the core unthrottled.
    pub fn fast_forward_gameplay(&self, enabled: bool) {
        if enabled {
            self.suspend_fps_limiting();
        } else {
            self.resume_fps_limiting();
        }
    }

    /// Rewinding plays frames backwards through the filter chain.
    pub fn rewind_gameplay(&mut self, enabled: bool) {
        let direction = if enabled {
            FrameDirection::Reverse
        } else {
            FrameDirection::Forward
        };
        self.filter.set_frame_direction(direction);
    }

    // ========================================================================
    // LEGACY CORE SERVICES
    // ========================================================================

    /// Framebuffer a legacy core should bind for drawing.
    #[must_use]
    pub fn presentation_framebuffer(&self) -> Option<Framebuffer> {
        self.renderer.presentation_framebuffer()
    }

    /// Copies a double-buffered core's back buffer to the interop surface.
    pub fn present_double_buffered(&mut self) -> bool {
        self.renderer.present_double_buffered()
    }

    /// Handle to give a core that draws on its own thread.
    #[must_use]
    pub fn render_thread_handle(&self) -> Option<RenderThreadHandle> {
        self.renderer.render_thread_handle()
    }

    // ========================================================================
    // CAPTURE
    // ========================================================================

    /// The core's visible rect as last rendered, top row first.
    #[must_use]
    pub fn capture_source_image(&self) -> Option<CapturedImage> {
        let texture = self.renderer.capture_texture()?;
        let video = self.core.video_state();
        let rect = self.renderer.source_rect(&video);
        let bytes = texture.read_pixels(rect)?;
        let mut image = CapturedImage {
            size: rect.size,
            format: texture.format(),
            bytes,
        };
        if self.renderer.is_flipped_vertically() {
            image.flip_rows();
        }
        Some(image)
    }

    /// Renders the final pass into an offscreen image of the drawable size
    /// and reads it back. Waits for the device to go idle.
    ///
    /// # Errors
    ///
    /// Resource errors creating the target or the command buffer. Capture
    /// failures are returned as-is, never escalated.
    pub fn capture_output_image(&mut self) -> PipelineResult<CapturedImage> {
        let size = self.device.drawable_size();
        let descriptor = TextureDescriptor::new(
            "output capture",
            size,
            TextureFormat::Bgra8Unorm,
            TextureUsage::RENDER_TARGET,
        );
        let target = self.device.create_texture(&descriptor)?;
        let mut buffer = self.device.make_command_buffer("capture")?;
        let flip = self.renderer.is_flipped_vertically();
        let mut encoder = buffer.render_encoder(&target, self.config.clear_color);
        self.filter.render_final_pass(&mut encoder, flip);
        encoder.end_encoding();
        self.device.commit(buffer);
        self.device.wait_idle();

        let bytes = target
            .read_pixels(IntRect::from_size(size))
            .ok_or_else(|| PipelineError::resource("output capture", "target not readable"))?;
        Ok(CapturedImage {
            size,
            format: target.format(),
            bytes,
        })
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Frames dropped since creation.
    #[must_use]
    pub fn skipped_frames(&self) -> u64 {
        self.skips.total()
    }

    /// Session counters.
    #[must_use]
    pub fn stats(&self) -> PresentStats {
        self.stats
    }

    /// Present budget admission counters.
    #[must_use]
    pub fn budget_stats(&self) -> BudgetStats {
        self.budget.stats()
    }

    /// True while a presented frame has not completed on the GPU.
    #[must_use]
    pub fn is_frame_in_flight(&self) -> bool {
        self.budget.is_in_flight()
    }

    /// A receiver for display events.
    #[must_use]
    pub fn events(&self) -> DisplayEventReceiver {
        self.events.subscribe()
    }

    /// Events lost to a full channel.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped()
    }

    /// Frame rate measured from GPU completions.
    #[must_use]
    pub fn render_fps(&self) -> f64 {
        self.meter.fps()
    }

    /// Display refresh rate to request for the core.
    #[must_use]
    pub fn preferred_frames_per_second(&self) -> u32 {
        preferred_frames_per_second(self.core.video_state().frame_interval)
    }

    /// Current swapchain image size.
    #[must_use]
    pub fn drawable_size(&self) -> IntSize {
        self.device.drawable_size()
    }

    /// Viewport bounds in points.
    #[must_use]
    pub fn output_bounds(&self) -> Bounds {
        self.output_bounds
    }

    /// Points-to-pixels ratio.
    #[must_use]
    pub fn backing_scale_factor(&self) -> f64 {
        self.backing_scale_factor
    }

    /// Current pause behavior.
    #[must_use]
    pub fn effects_mode(&self) -> EffectsMode {
        self.effects_mode
    }

    /// Whether presents carry a minimum duration.
    #[must_use]
    pub fn is_adaptive_sync_enabled(&self) -> bool {
        self.adaptive_sync
    }

    /// Active renderer variant.
    #[must_use]
    pub fn renderer_kind(&self) -> RendererKind {
        self.renderer.kind()
    }

    /// The active renderer.
    #[must_use]
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// The interop bridge of legacy renderers.
    #[must_use]
    pub fn bridge(&self) -> Option<&InteropTextureBridge> {
        self.renderer.bridge()
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

fn validate_geometry(video: &CoreVideoState) -> PipelineResult<()> {
    if video.buffer_size.is_empty() {
        return Err(PipelineError::EmptyBuffer(video.buffer_size));
    }
    let oversized = video.buffer_size.width > MAX_BUFFER_DIMENSION
        || video.buffer_size.height > MAX_BUFFER_DIMENSION;
    if oversized
        || video.screen_rect.is_empty()
        || !video.screen_rect.fits_within(video.buffer_size)
    {
        return Err(PipelineError::InvalidGeometry {
            buffer: video.buffer_size,
            screen: video.screen_rect,
        });
    }
    Ok(())
}

fn escalate(policy: FatalErrorPolicy, err: PipelineError) -> PipelineError {
    tracing::error!(target: TARGET, "Fatal presentation error: {err}");
    if policy == FatalErrorPolicy::Abort {
        std::process::abort();
    }
    err
}
