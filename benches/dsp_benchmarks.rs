//! DSP Benchmarks
//!
//! Performance benchmarks for the disperser block path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use disperser::dsp::analysis::cascade_impulse_response;
use disperser::dsp::{AllPassCoefficients, DispersionEngine, DisperserSettings, Effect};
use disperser::engine::buffer::{AudioBuffer, ChannelLayout};
use disperser::EngineConfig;

fn benchmark_block_processing(c: &mut Criterion) {
    let buffer = AudioBuffer::sine(440.0, 0.5, 512, ChannelLayout::Stereo, 44100);
    let mut out_l = vec![0.0; 512];
    let mut out_r = vec![0.0; 512];

    for intensity in [1, 25, 50] {
        let settings = DisperserSettings::new(700.0, intensity, 0.7, 0.8);
        let mut engine = DispersionEngine::with_settings(EngineConfig::default(), settings).unwrap();
        engine.prepare(44100, 512);

        c.bench_function(&format!("disperser_512_{}_stages", intensity), |b| {
            b.iter(|| {
                engine.process_block(
                    black_box(buffer.channel(0)),
                    black_box(buffer.channel(1)),
                    &mut out_l,
                    &mut out_r,
                );
            })
        });
    }
}

fn benchmark_buffer_render(c: &mut Criterion) {
    let mut buffer = AudioBuffer::sine(440.0, 0.5, 441000, ChannelLayout::Stereo, 44100);
    let mut engine = DispersionEngine::default();

    c.bench_function("disperser_10s_stereo", |b| {
        b.iter(|| {
            engine.process(black_box(&mut buffer));
        })
    });
}

fn benchmark_impulse_response(c: &mut Criterion) {
    let coeffs = AllPassCoefficients::calculate(1000.0, 44100.0, 0.707);

    c.bench_function("impulse_50_stages_8192", |b| {
        b.iter(|| cascade_impulse_response(black_box(&coeffs), 50, 8192))
    });
}

criterion_group!(
    benches,
    benchmark_block_processing,
    benchmark_buffer_render,
    benchmark_impulse_response
);
criterion_main!(benches);
