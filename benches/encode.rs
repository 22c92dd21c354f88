//! Encoder benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use mochi_graphics::color::{quantize, ColorChannel};
use mochi_graphics::protocol::{KittyEncoder, PackingMode, SixelEncoder, UploadFormat};
use mochi_graphics::visual::{PixelFormat, Visual};

fn gradient_visual(width: u32, height: u32) -> Visual {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8, 255]);
        }
    }
    Visual::new(width, height, PixelFormat::Rgba, data).expect("valid buffer")
}

fn bench_kitty_upload(c: &mut Criterion) {
    let mut group = c.benchmark_group("kitty");

    let payload = vec![0x5Au8; 256 * 256 * 4];
    group.throughput(Throughput::Bytes(payload.len() as u64));

    group.bench_function("upload_256x256", |b| {
        b.iter(|| {
            let mut encoder = KittyEncoder::new(4096);
            let mut out = Vec::with_capacity(payload.len() * 2);
            let handle = encoder
                .upload(&mut out, black_box(&payload), UploadFormat::Other)
                .expect("write to vec");
            black_box((handle, out))
        })
    });

    group.finish();
}

fn bench_sixel(c: &mut Criterion) {
    let mut group = c.benchmark_group("sixel");

    let visual = gradient_visual(200, 120);
    group.throughput(Throughput::Elements(u64::from(visual.width() * visual.height())));

    group.bench_function("quantize_200x120", |b| {
        b.iter(|| black_box(quantize(black_box(&visual), 256)))
    });

    let image = quantize(&visual, 256);
    for (name, mode) in [("mask", PackingMode::Mask), ("per_color", PackingMode::PerColor)] {
        let encoder = SixelEncoder::new(mode);
        group.bench_function(format!("encode_{}", name), |b| {
            b.iter(|| black_box(encoder.encode(black_box(&image))))
        });
    }

    group.finish();
}

fn bench_blend(c: &mut Criterion) {
    let fg = ColorChannel::new(200, 100, 50, 128);
    let bg = ColorChannel::rgb(10, 20, 30);
    c.bench_function("color_blend", |b| {
        b.iter(|| black_box(mochi_graphics::color::blend(black_box(fg), black_box(bg))))
    });
}

criterion_group!(benches, bench_kitty_upload, bench_sixel, bench_blend);
criterion_main!(benches);
