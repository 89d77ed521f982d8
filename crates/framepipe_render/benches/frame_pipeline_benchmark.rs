//! # Frame Pipeline Benchmark
//!
//! Full frames through the coordinator on the headless backend.
//!
//! This benchmark measures:
//! 1. A presented 2D frame (convert, upload, passes, present) per buffer size
//! 2. A skipped frame while the previous one is in flight
//! 3. A presented legacy frame through the interop bridge

#![allow(dead_code)]
#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use framepipe_render::headless::{
    CompletionMode, HeadlessConfig, HeadlessDevice, HeadlessLegacyContext, SimulatedCore,
};
use framepipe_render::{
    CoreVideoSource, FatalErrorPolicy, GpuDevice, LegacyContext, PassthroughFilterChain,
    PipelineConfig, PresentationCoordinator,
};
use framepipe_shared::{IntSize, RenderingApi};

fn coordinator(
    device: &Arc<HeadlessDevice>,
    size: IntSize,
    api: RenderingApi,
) -> PresentationCoordinator {
    let core = Arc::new(SimulatedCore::new(size, api));
    core.fill([0x20, 0x40, 0x60, 0xFF]);
    let legacy: Option<Box<dyn LegacyContext>> = api
        .is_legacy_3d()
        .then(|| Box::new(HeadlessLegacyContext::new("bench")) as _);
    PresentationCoordinator::new(
        PipelineConfig::default().with_fatal_policy(FatalErrorPolicy::Propagate),
        Arc::clone(device) as Arc<dyn GpuDevice>,
        legacy,
        core as Arc<dyn CoreVideoSource>,
        Box::new(PassthroughFilterChain::default()),
    )
    .expect("headless setup")
}

fn bench_presented_2d_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("presented_2d_frame");

    for (width, height) in [(256u32, 224u32), (640, 480)] {
        let device = Arc::new(HeadlessDevice::new(HeadlessConfig::default()));
        let mut coordinator = coordinator(&device, IntSize::new(width, height), RenderingApi::Video2D);
        group.throughput(criterion::Throughput::Bytes(u64::from(width * height * 4)));
        group.bench_function(BenchmarkId::new("bgra", format!("{width}x{height}")), |b| {
            b.iter(|| {
                coordinator.will_execute_frame();
                black_box(coordinator.did_execute_frame().expect("frame"));
            });
        });
    }

    group.finish();
}

fn bench_skipped_frame(c: &mut Criterion) {
    // Completions never arrive, so after the first frame every attempt skips.
    let device = Arc::new(HeadlessDevice::new(HeadlessConfig {
        completion: CompletionMode::Manual {
            latency_frames: u32::MAX,
        },
        ..HeadlessConfig::default()
    }));
    let mut coordinator = coordinator(&device, IntSize::new(256, 224), RenderingApi::Video2D);
    let _ = coordinator.did_execute_frame();

    c.bench_function("skipped_frame", |b| {
        b.iter(|| black_box(coordinator.did_execute_frame().expect("frame")));
    });
}

fn bench_presented_legacy_frame(c: &mut Criterion) {
    let device = Arc::new(HeadlessDevice::new(HeadlessConfig::default()));
    let mut coordinator = coordinator(&device, IntSize::new(640, 480), RenderingApi::OpenGl3);

    c.bench_function("presented_legacy_frame_640x480", |b| {
        b.iter(|| black_box(coordinator.did_execute_frame().expect("frame")));
    });
}

criterion_group!(
    benches,
    bench_presented_2d_frame,
    bench_skipped_frame,
    bench_presented_legacy_frame
);
criterion_main!(benches);
