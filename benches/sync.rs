//! Synchronization benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dvbs2_phy::channel::{Channel, ChannelConfig};
use dvbs2_phy::params::TimingVariant;
use dvbs2_phy::*;
use num_complex::Complex64;

fn received_frame(params: &DvbS2Params) -> Vec<Complex64> {
    let s = std::f64::consts::FRAC_1_SQRT_2;
    let xfec: Vec<Complex64> = (0..params.geometry.xfec_frame_size)
        .map(|i| Complex64::new(if i % 3 == 0 { s } else { -s }, if i % 7 < 3 { s } else { -s }))
        .collect();
    let mut tx = Transmitter::new(params);
    let samples = tx.process_frame(&xfec).unwrap();

    let mut channel = Channel::new(&ChannelConfig {
        esn0_db: Some(12.0),
        freq_offset: 1e-4,
        delay: 2.5,
        ..ChannelConfig::default()
    })
    .unwrap();
    let mut out = vec![Complex64::default(); samples.len()];
    channel.apply(&samples, &mut out).unwrap();
    out
}

fn benchmark_timing(c: &mut Criterion, name: &str, variant: TimingVariant) {
    let sync = SyncConfig {
        timing_variant: variant,
        ..SyncConfig::default()
    };
    let params = DvbS2Params::with_config("QPSK-S_8/9", sync).unwrap();
    let n = params.geometry.pl_frame_size;
    let input = received_frame(&params);
    let mut timing = TimingSync::from_config(n, &params.sync).unwrap();
    timing.set_active(true);
    let mut samples = vec![Complex64::default(); input.len()];
    let mut strobes = vec![false; input.len()];

    c.bench_function(name, |b| {
        b.iter(|| {
            timing
                .synchronize(black_box(&input), &mut samples, &mut strobes)
                .unwrap();
        })
    });
}

fn benchmark_gardner_fast(c: &mut Criterion) {
    benchmark_timing(c, "gardner_fast_qpsk_frame", TimingVariant::Fast);
}

fn benchmark_gardner_ultra(c: &mut Criterion) {
    benchmark_timing(c, "gardner_ultra_qpsk_frame", TimingVariant::Ultra);
}

fn benchmark_step_composite(c: &mut Criterion) {
    let params = DvbS2Params::new("QPSK-S_8/9").unwrap();
    let input = received_frame(&params);
    let mut step = StepComposite::from_params(&params).unwrap();
    let mut symbols = vec![Complex64::default(); step.frame_len()];

    c.bench_function("step_composite_learning_frame", |b| {
        b.iter(|| step.synchronize(black_box(&input), &mut symbols, 0).unwrap())
    });
}

fn benchmark_receiver(c: &mut Criterion) {
    let sync = SyncConfig {
        skip_acquisition: true,
        ..SyncConfig::default()
    };
    let params = DvbS2Params::with_config("QPSK-S_8/9", sync).unwrap();
    let input = received_frame(&params);
    let mut rx = Receiver::new(params).unwrap();

    c.bench_function("receiver_transmission_frame", |b| {
        b.iter(|| black_box(rx.process_frame(black_box(&input)).unwrap()))
    });
}

criterion_group!(
    benches,
    benchmark_gardner_fast,
    benchmark_gardner_ultra,
    benchmark_step_composite,
    benchmark_receiver
);
criterion_main!(benches);
