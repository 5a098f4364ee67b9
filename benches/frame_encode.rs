//! Frame Encode Benchmark
//!
//! Scale/flip and JPEG cost for common capture sizes from a 720p framebuffer.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use vision_bridge::capture::frame::{encode_jpeg, scale_flip_nearest};
use vision_bridge::capture::{FrameSource, TestPatternSource};

const SOURCE: (u32, u32) = (1280, 720);
const TARGETS: [(u32, u32); 3] = [(384, 216), (640, 360), (854, 480)];

fn framebuffer() -> Vec<u8> {
    let mut source = TestPatternSource::new(SOURCE.0, SOURCE.1);
    let mut rgba = Vec::new();
    source
        .read_pixels(&mut rgba)
        .expect("test pattern always has pixels");
    rgba
}

fn bench_scale(c: &mut Criterion) {
    let rgba = framebuffer();
    let mut group = c.benchmark_group("scale_flip_nearest");
    for (w, h) in TARGETS {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{}x{}", w, h)), &(w, h), |b, &(w, h)| {
            b.iter(|| scale_flip_nearest(black_box(&rgba), SOURCE.0, SOURCE.1, w, h).unwrap())
        });
    }
    group.finish();
}

fn bench_jpeg(c: &mut Criterion) {
    let rgba = framebuffer();
    let mut group = c.benchmark_group("encode_jpeg");
    for (w, h) in TARGETS {
        let image = scale_flip_nearest(&rgba, SOURCE.0, SOURCE.1, w, h).unwrap();
        for quality in [0.5f32, 0.75] {
            group.bench_with_input(
                BenchmarkId::new(format!("{}x{}", w, h), quality),
                &quality,
                |b, &quality| b.iter(|| encode_jpeg(black_box(&image), quality).unwrap()),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_scale, bench_jpeg);
criterion_main!(benches);
