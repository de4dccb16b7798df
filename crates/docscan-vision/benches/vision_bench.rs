// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the per-frame hot path in docscan-vision:
// rectangle detection on a camera-sized frame, perspective correction and
// the filter pipeline.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};

use docscan_core::{FilterConfig, FilterKind, Point, Quadrilateral};
use docscan_vision::{RectangleDetector, apply_filter, correct_perspective};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 1280x720 frame with a bright page on a dark desk.
fn camera_frame() -> RgbaImage {
    RgbaImage::from_fn(1280, 720, |x, y| {
        if (240..1040).contains(&x) && (90..630).contains(&y) {
            Rgba([236, 232, 226, 255])
        } else {
            Rgba([40, 34, 30, 255])
        }
    })
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_detection(c: &mut Criterion) {
    let frame = camera_frame();
    let detector = RectangleDetector::default();

    c.bench_function("detect (1280x720)", |b| {
        b.iter(|| black_box(detector.detect(black_box(&frame))));
    });
}

fn bench_correction(c: &mut Criterion) {
    let frame = camera_frame();
    let quad = Quadrilateral::new(
        Point::new(250.0, 100.0),
        Point::new(1030.0, 95.0),
        Point::new(1040.0, 625.0),
        Point::new(240.0, 630.0),
    );

    c.bench_function("correct_perspective (1280x720)", |b| {
        b.iter(|| black_box(correct_perspective(black_box(&frame), &quad)));
    });
}

fn bench_filters(c: &mut Criterion) {
    let frame = camera_frame();
    let mut group = c.benchmark_group("filter (1280x720)");
    for kind in [FilterKind::BlackAndWhite, FilterKind::Sepia, FilterKind::ColorEnhance] {
        let config = FilterConfig::with_kind(kind);
        group.bench_function(format!("{kind:?}"), |b| {
            b.iter(|| black_box(apply_filter(black_box(&frame), &config)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_detection, bench_correction, bench_filters);
criterion_main!(benches);
