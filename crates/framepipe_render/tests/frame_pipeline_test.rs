//! End-to-end presentation on the headless backend.
//!
//! Run with: cargo test -p framepipe_render --test frame_pipeline_test -- --nocapture

use std::sync::Arc;
use std::time::Duration;

use framepipe_render::headless::{
    CompletionMode, HeadlessConfig, HeadlessDevice, HeadlessLegacyContext, SimulatedCore,
};
use framepipe_render::{
    CoreVideoSource, DisplayEvent, EffectsMode, FatalErrorPolicy, FrameOutcome, GpuDevice,
    LegacyContext, PassthroughFilterChain, PipelineConfig, PresentationCoordinator,
    RendererKind, SkipReason,
};
use framepipe_shared::{IntSize, RenderingApi};

fn propagate() -> PipelineConfig {
    PipelineConfig::default().with_fatal_policy(FatalErrorPolicy::Propagate)
}

fn headless(latency_frames: u32) -> Arc<HeadlessDevice> {
    Arc::new(HeadlessDevice::new(HeadlessConfig {
        completion: CompletionMode::Manual { latency_frames },
        ..HeadlessConfig::default()
    }))
}

fn coordinator(
    device: &Arc<HeadlessDevice>,
    core: &Arc<SimulatedCore>,
    legacy: bool,
) -> PresentationCoordinator {
    let context: Option<Box<dyn LegacyContext>> =
        legacy.then(|| Box::new(HeadlessLegacyContext::new("present")) as _);
    PresentationCoordinator::new(
        propagate(),
        Arc::clone(device) as Arc<dyn GpuDevice>,
        context,
        Arc::clone(core) as Arc<dyn CoreVideoSource>,
        Box::new(PassthroughFilterChain::default()),
    )
    .unwrap()
}

// ============================================================================
// BACKPRESSURE
// ============================================================================

#[test]
fn test_ten_frames_at_two_frame_latency() {
    let device = headless(2);
    let core = Arc::new(SimulatedCore::new(IntSize::new(256, 224), RenderingApi::Video2D));
    let mut coordinator = coordinator(&device, &core, false);

    let mut presented = 0;
    let mut skipped = 0;
    for _ in 0..10 {
        coordinator.will_execute_frame();
        match coordinator.did_execute_frame().unwrap() {
            FrameOutcome::Presented { .. } => presented += 1,
            FrameOutcome::Skipped(SkipReason::BudgetExhausted) => skipped += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
        // One display interval passes.
        device.advance_frame();
    }

    println!("\n=== 10 frames, GPU latency 2 ===");
    println!("Presented: {presented}, skipped: {skipped}");

    assert_eq!(presented, 5);
    assert_eq!(skipped, 5);
    assert_eq!(coordinator.skipped_frames(), 5);
    assert_eq!(coordinator.stats().skipped_budget, 5);
    assert_eq!(device.counters().presents, 5);

    let budget = coordinator.budget_stats();
    assert_eq!(budget.acquired, 5);
    assert_eq!(budget.rejected, 5);
}

#[test]
fn test_budget_never_exceeds_one_frame_in_flight() {
    let device = headless(3);
    let core = Arc::new(SimulatedCore::new(IntSize::new(64, 64), RenderingApi::Video2D));
    let mut coordinator = coordinator(&device, &core, false);

    let mut last_skips = 0;
    for _ in 0..50 {
        let in_flight_before = coordinator.is_frame_in_flight();
        let outcome = coordinator.did_execute_frame().unwrap();
        // A new submission only starts when nothing is in flight.
        assert_eq!(outcome.is_presented(), !in_flight_before);
        assert!(device.pending_submissions() <= 2);

        let skips = coordinator.skipped_frames();
        assert!(skips >= last_skips);
        assert!(skips - last_skips <= 1);
        last_skips = skips;
        device.advance_frame();
    }
}

#[test]
fn test_missing_drawable_releases_budget() {
    let device = headless(0);
    let core = Arc::new(SimulatedCore::new(IntSize::new(64, 64), RenderingApi::Video2D));
    let mut coordinator = coordinator(&device, &core, false);

    device.set_starve_drawables(true);
    assert_eq!(
        coordinator.did_execute_frame().unwrap(),
        FrameOutcome::Skipped(SkipReason::NoDrawable)
    );
    assert!(!coordinator.is_frame_in_flight());
    assert_eq!(coordinator.skipped_frames(), 1);
    assert_eq!(coordinator.stats().skipped_no_drawable, 1);

    device.set_starve_drawables(false);
    assert!(coordinator.did_execute_frame().unwrap().is_presented());
}

#[test]
fn test_threaded_completion_releases_budget() {
    let device = Arc::new(HeadlessDevice::new(HeadlessConfig {
        completion: CompletionMode::Threaded {
            latency: Duration::from_millis(1),
        },
        ..HeadlessConfig::default()
    }));
    let core = Arc::new(SimulatedCore::new(IntSize::new(64, 64), RenderingApi::Video2D));
    let mut coordinator = coordinator(&device, &core, false);

    for _ in 0..20 {
        coordinator.did_execute_frame().unwrap();
        device.wait_idle();
    }

    // Every frame found the previous one completed.
    assert_eq!(coordinator.stats().presented, 20);
    assert_eq!(coordinator.skipped_frames(), 0);
    assert!(coordinator.render_fps() > 0.0);
}

// ============================================================================
// RECONFIGURATION
// ============================================================================

#[test]
fn test_buffer_resize_rebuilds_bridge_once() {
    let device = headless(0);
    let core = Arc::new(SimulatedCore::new(IntSize::new(256, 224), RenderingApi::OpenGl3));
    let mut coordinator = coordinator(&device, &core, true);
    assert_eq!(coordinator.renderer_kind(), RendererKind::LegacySingleThread);
    let events = coordinator.events();

    for _ in 0..3 {
        assert!(coordinator.did_execute_frame().unwrap().is_presented());
    }
    let bridge = coordinator.bridge().unwrap();
    let rebuilds_before = bridge.rebuild_count();
    let old_surface = bridge.downgrade_surface().unwrap();
    let skips_before = coordinator.skipped_frames();
    let _ = events.drain();

    core.set_buffer_size(IntSize::new(512, 448));
    for _ in 0..3 {
        assert!(coordinator.did_execute_frame().unwrap().is_presented());
    }

    let bridge = coordinator.bridge().unwrap();
    assert_eq!(bridge.rebuild_count(), rebuilds_before + 1);
    assert_eq!(bridge.size(), Some(IntSize::new(512, 448)));
    assert!(!old_surface.is_alive(), "old surface still referenced");
    assert_eq!(coordinator.skipped_frames(), skips_before);
    assert_eq!(coordinator.stats().reconfigurations, 1);

    let events = events.drain();
    assert!(events.contains(&DisplayEvent::BufferResized {
        from: IntSize::new(256, 224),
        to: IntSize::new(512, 448),
    }));
}

#[test]
fn test_legacy_frame_reaches_drawable() {
    let device = headless(0);
    let core = Arc::new(SimulatedCore::new(IntSize::new(32, 32), RenderingApi::OpenGl3));
    let mut coordinator = coordinator(&device, &core, true);

    // What a single-thread core draws into its framebuffer.
    let framebuffer = coordinator.presentation_framebuffer().unwrap();
    let mut bytes = framebuffer.color().storage().write();
    for texel in bytes.chunks_exact_mut(4) {
        texel.copy_from_slice(&[0x00, 0xFF, 0x00, 0xFF]);
    }
    drop(bytes);

    assert!(coordinator.did_execute_frame().unwrap().is_presented());
    let frame = device.last_presented().unwrap();
    assert_eq!(frame.size, IntSize::new(32, 32));
    assert!(frame.pixels.chunks_exact(4).all(|t| t == [0x00, 0xFF, 0x00, 0xFF]));
}

#[test]
fn test_copy_fallback_presents_same_pixels() {
    let device = Arc::new(HeadlessDevice::new(HeadlessConfig {
        zero_copy: false,
        ..HeadlessConfig::default()
    }));
    let core = Arc::new(SimulatedCore::new(IntSize::new(16, 16), RenderingApi::OpenGl3));
    let mut coordinator = coordinator(&device, &core, true);

    let textures = coordinator.bridge().unwrap().current_textures().unwrap();
    assert!(!textures.zero_copy);
    let framebuffer = coordinator.presentation_framebuffer().unwrap();
    framebuffer.color().storage().fill([0xFF, 0x00, 0x00, 0xFF]);

    assert!(coordinator.did_execute_frame().unwrap().is_presented());
    let frame = device.last_presented().unwrap();
    assert!(frame.pixels.chunks_exact(4).all(|t| t == [0xFF, 0x00, 0x00, 0xFF]));
}

// ============================================================================
// PAUSE
// ============================================================================

#[test]
fn test_pause_and_display_always() {
    let device = headless(0);
    let core = Arc::new(SimulatedCore::new(IntSize::new(64, 64), RenderingApi::Video2D));
    let mut coordinator = coordinator(&device, &core, false);

    core.set_paused(true);
    for _ in 0..3 {
        assert_eq!(coordinator.did_execute_frame().unwrap(), FrameOutcome::Paused);
    }
    assert_eq!(device.counters().presents, 0);

    coordinator.set_effects_mode(EffectsMode::DisplayAlways);
    assert!(coordinator.did_execute_frame().unwrap().is_presented());
    assert_eq!(coordinator.stats().paused, 3);
    assert_eq!(coordinator.skipped_frames(), 0);
}

// ============================================================================
// FAILURES
// ============================================================================

#[test]
fn test_unreadable_frame_is_skipped_then_recovers() {
    let device = headless(0);
    let core = Arc::new(SimulatedCore::new(IntSize::new(64, 64), RenderingApi::Video2D));
    let mut coordinator = coordinator(&device, &core, false);

    core.set_unreadable(true);
    assert_eq!(
        coordinator.did_execute_frame().unwrap(),
        FrameOutcome::Skipped(SkipReason::InvalidFrame)
    );
    assert!(!coordinator.is_frame_in_flight());

    core.set_unreadable(false);
    assert!(coordinator.did_execute_frame().unwrap().is_presented());
    assert_eq!(coordinator.skipped_frames(), 1);
}

#[test]
fn test_texture_cache_failure_is_fatal_on_resize() {
    let device = headless(0);
    let core = Arc::new(SimulatedCore::new(IntSize::new(64, 64), RenderingApi::OpenGl3));
    let context = HeadlessLegacyContext::new("present");
    // Shares the fault switch with `context`.
    let probe = context.shared();
    let mut coordinator = PresentationCoordinator::new(
        propagate(),
        Arc::clone(&device) as Arc<dyn GpuDevice>,
        Some(Box::new(context)),
        Arc::clone(&core) as Arc<dyn CoreVideoSource>,
        Box::new(PassthroughFilterChain::default()),
    )
    .unwrap();

    probe.set_fail_texture_cache(true);
    core.set_buffer_size(IntSize::new(128, 128));
    let err = coordinator.did_execute_frame().unwrap_err();
    assert!(err.is_fatal());
}
