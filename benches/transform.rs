//! Pixel transform and cell rendering benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use mochi_graphics::blitter::{render_cells, BlitterType};
use mochi_graphics::transform::{flip, rotate90, scale, FlipDirection};
use mochi_graphics::visual::{PixelFormat, Visual};

const W: u32 = 320;
const H: u32 = 240;

fn buffer() -> Vec<u8> {
    (0..W * H * 4).map(|i| (i % 251) as u8).collect()
}

fn bench_transforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");
    let buf = buffer();
    group.throughput(Throughput::Bytes(buf.len() as u64));

    group.bench_function("scale_down_half", |b| {
        b.iter(|| scale(black_box(&buf), W, H, W / 2, H / 2, PixelFormat::Rgba))
    });

    group.bench_function("rotate90", |b| {
        b.iter(|| rotate90(black_box(&buf), W, H, PixelFormat::Rgba))
    });

    group.bench_function("flip_both", |b| {
        b.iter(|| flip(black_box(&buf), W, H, FlipDirection::Both, PixelFormat::Rgba))
    });

    group.finish();
}

fn bench_cells(c: &mut Criterion) {
    let mut group = c.benchmark_group("cells");
    let visual = Visual::new(W, H, PixelFormat::Rgba, buffer()).expect("valid buffer");

    for blitter in [
        BlitterType::HalfBlock,
        BlitterType::Quadrant,
        BlitterType::Sextant,
        BlitterType::Braille,
    ] {
        group.bench_function(blitter.name(), |b| {
            b.iter(|| black_box(render_cells(black_box(&visual), blitter, 0.02)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_transforms, bench_cells);
criterion_main!(benches);
