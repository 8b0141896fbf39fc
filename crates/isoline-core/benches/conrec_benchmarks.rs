//! Benchmarks for CONREC segment extraction and chain assembly.
//!
//! Run with: cargo bench --package isoline-core --bench conrec_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use isoline_core::chain::assemble;
use isoline_core::conrec::compute_segments;
use rand::Rng;

/// Generate a smooth field with overlapping sine waves, the same shape a
/// real scalar grid (temperature, pressure) tends to take.
fn generate_smooth_field(width: usize, height: usize) -> Vec<f64> {
    let mut data = vec![0.0f64; width * height];
    for y in 0..height {
        for x in 0..width {
            let fx = x as f64 / width as f64;
            let fy = y as f64 / height as f64;
            let v1 = (fx * std::f64::consts::PI * 4.0).sin() * 20.0;
            let v2 = (fy * std::f64::consts::PI * 4.0).sin() * 20.0;
            let v3 = ((fx + fy) * std::f64::consts::PI * 2.0).sin() * 10.0;
            data[y * width + x] = 50.0 + v1 + v2 + v3;
        }
    }
    data
}

/// A noisier field, producing a denser and more fragmented segment set.
fn generate_noisy_field(width: usize, height: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    let base = generate_smooth_field(width, height);
    base.iter().map(|&v| v + rng.gen_range(-5.0..5.0)).collect()
}

const EPS: f64 = 1e-4;

fn bench_compute_segments(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_segments");

    let sizes = [(64, 64), (128, 128), (256, 256), (512, 512)];

    for (width, height) in sizes {
        let smooth = generate_smooth_field(width, height);
        let noisy = generate_noisy_field(width, height);

        group.throughput(Throughput::Elements((width * height) as u64));

        group.bench_with_input(
            BenchmarkId::new("smooth_single_level", format!("{width}x{height}")),
            &smooth,
            |b, data| {
                b.iter(|| compute_segments(height, width, black_box(data), black_box(&[50.0]), EPS));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("noisy_single_level", format!("{width}x{height}")),
            &noisy,
            |b, data| {
                b.iter(|| compute_segments(height, width, black_box(data), black_box(&[50.0]), EPS));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("smooth_seven_levels", format!("{width}x{height}")),
            &smooth,
            |b, data| {
                let levels: Vec<f64> = (0..7).map(|i| 20.0 + i as f64 * 10.0).collect();
                b.iter(|| compute_segments(height, width, black_box(data), black_box(&levels), EPS));
            },
        );
    }

    group.finish();
}

fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble");

    let sizes = [(128, 128), (256, 256)];

    for (width, height) in sizes {
        let data = generate_smooth_field(width, height);
        let segments = compute_segments(height, width, &data, &[50.0], EPS);

        group.throughput(Throughput::Elements(segments.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("smooth", format!("{width}x{height}_{}seg", segments.len())),
            &segments,
            |b, segs| {
                b.iter(|| assemble(black_box(segs), EPS, black_box(1.0)));
            },
        );
    }

    group.finish();
}

fn bench_full_extraction_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_extraction_pipeline");
    group.sample_size(20);

    let data = generate_smooth_field(256, 256);
    let levels: Vec<f64> = (0..7).map(|i| 20.0 + i as f64 * 10.0).collect();

    group.bench_function("256x256_7levels", |b| {
        b.iter(|| {
            let segments = compute_segments(256, 256, black_box(&data), black_box(&levels), EPS);
            assemble(&segments, EPS, 1.0)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_compute_segments,
    bench_assemble,
    bench_full_extraction_pipeline,
);
criterion_main!(benches);
