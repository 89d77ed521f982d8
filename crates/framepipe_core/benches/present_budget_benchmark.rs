//! # Present Budget Benchmark
//!
//! The skip path runs on the emulation thread every frame the GPU is
//! behind. It must stay a handful of nanoseconds.
//!
//! This benchmark measures:
//! 1. Acquire + release of a free slot (presented frame)
//! 2. Rejected acquire + skip count (skipped frame)
//! 3. Staging slot turnover in the upload ring

#![allow(dead_code)]
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use framepipe_core::{FrameSkipCounter, PresentBudget, UploadRing};

fn bench_acquire_release(c: &mut Criterion) {
    let budget = PresentBudget::new();

    c.bench_function("present_budget_acquire_release", |b| {
        b.iter(|| {
            let permit = budget.try_acquire();
            black_box(&permit);
            drop(permit);
        });
    });
}

fn bench_skip_path(c: &mut Criterion) {
    let budget = PresentBudget::new();
    let skips = FrameSkipCounter::new();
    // Hold the slot for the whole run so every attempt is rejected.
    let _in_flight = budget.try_acquire();

    c.bench_function("present_budget_skip_path", |b| {
        b.iter(|| {
            if budget.try_acquire().is_none() {
                black_box(skips.record());
            }
        });
    });
}

fn bench_upload_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("upload_ring_next_slot");

    for (width, height) in [(256usize, 224usize), (640, 480), (1280, 960)] {
        let len = width * height * 4;
        let mut ring = UploadRing::new(3);
        group.throughput(criterion::Throughput::Bytes(len as u64));
        group.bench_with_input(
            BenchmarkId::new("bgra", format!("{width}x{height}")),
            &len,
            |b, &len| {
                b.iter(|| {
                    let slot = ring.next_slot(len);
                    black_box(slot.as_ptr());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_acquire_release, bench_skip_path, bench_upload_ring);
criterion_main!(benches);
