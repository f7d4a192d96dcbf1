//! DSP processor benchmarks

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use mf_core::{EqBandType, SaturationType};
use mf_dsp::biquad::{BiquadCoeffs, BiquadTDF2};
use mf_dsp::{BrickwallLimiter, Compressor, FrameProcessor, MonoProcessor, Saturator};

fn sine_block(len: usize) -> Vec<f64> {
    (0..len).map(|i| (i as f64 * 0.01).sin() * 0.8).collect()
}

fn bench_eq_bands(c: &mut Criterion) {
    let mut group = c.benchmark_group("eq_band_1024");

    for band_type in [EqBandType::LowShelf, EqBandType::Peak, EqBandType::HighShelf] {
        let mut filter =
            BiquadTDF2::with_coeffs(BiquadCoeffs::eq_band(band_type, 1000.0, 1.0, 4.0, 48000.0));
        let mut buffer = sine_block(1024);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{band_type:?}")),
            &band_type,
            |b, _| b.iter(|| filter.process_block(black_box(&mut buffer))),
        );
    }

    group.finish();
}

fn bench_dynamics(c: &mut Criterion) {
    let mut comp = Compressor::new(48000.0);
    comp.set_params(-18.0, 4.0, 0.01, 0.1, 3.0);
    let mut limiter = BrickwallLimiter::new(-0.3, 0.05, 48000.0);
    let mut interleaved = sine_block(2048);

    c.bench_function("compressor_stereo_1024", |b| {
        b.iter(|| comp.process_interleaved(black_box(&mut interleaved), 2))
    });
    c.bench_function("limiter_stereo_1024", |b| {
        b.iter(|| limiter.process_interleaved(black_box(&mut interleaved), 2))
    });
}

fn bench_saturation(c: &mut Criterion) {
    let mut group = c.benchmark_group("saturation_1024");

    for saturation_type in [SaturationType::Tube, SaturationType::Tape, SaturationType::Soft] {
        let mut sat = Saturator::new(saturation_type, 2.0, 0.5);
        let mut buffer = sine_block(1024);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{saturation_type:?}")),
            &saturation_type,
            |b, _| b.iter(|| sat.process_block(black_box(&mut buffer))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_eq_bands, bench_dynamics, bench_saturation);
criterion_main!(benches);
