use beatmachine_engine::{ClickTrack, Engine, EngineConfig, ParameterAddress, RenderEvent};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const SAMPLE_RATE: f64 = 48_000.0;
const BLOCK: usize = 512;

fn generate_test_audio(frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            0.3 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
        })
        .collect()
}

fn click() -> ClickTrack {
    ClickTrack::from_samples((0..480).map(|i| 1.0 - i as f32 / 480.0).collect())
}

/// Engine with `voices` slots recorded for one second each, then left playing.
fn playing_engine(voices: u8) -> Engine {
    let config = EngineConfig { slot_seconds: 2.0, ..EngineConfig::default() };
    let mut engine = Engine::new(config).unwrap();
    engine.initialize_with_click(1, 2, SAMPLE_RATE, click()).unwrap();

    let input = generate_test_audio(SAMPLE_RATE as usize);
    let mut left = vec![0.0; input.len()];
    let mut right = vec![0.0; input.len()];
    let notes: Vec<u8> = (0..voices).map(|v| 36 + v).collect();

    engine.set_param(ParameterAddress::SamplingMode, 1.0);
    for &note in &notes {
        engine.handle_midi(&[0x90, note, 100]);
    }
    engine.process(&[&input[..]], &mut [&mut left[..], &mut right[..]], input.len());
    engine.set_param(ParameterAddress::SamplingMode, 0.0);
    engine
}

fn benchmark_playback(c: &mut Criterion) {
    let mut group = c.benchmark_group("playback");
    let silence = vec![0.0; BLOCK];

    for voices in [1u8, 8, 32, 80] {
        let mut engine = playing_engine(voices);
        let mut left = vec![0.0; BLOCK];
        let mut right = vec![0.0; BLOCK];

        group.bench_with_input(BenchmarkId::from_parameter(voices), &voices, |b, _| {
            b.iter(|| {
                engine.process(&[&silence[..]], &mut [&mut left[..], &mut right[..]], BLOCK);
                black_box(left[BLOCK - 1])
            })
        });
    }

    group.finish();
}

fn benchmark_loop_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("loop_record");
    let input = generate_test_audio(BLOCK);

    for voices in [0u8, 16] {
        let mut engine = playing_engine(voices);
        engine.set_param(ParameterAddress::LoopRecord, 1.0);
        let mut left = vec![0.0; BLOCK];
        let mut right = vec![0.0; BLOCK];

        group.bench_with_input(BenchmarkId::from_parameter(voices), &voices, |b, _| {
            b.iter(|| {
                engine.process(&[&input[..]], &mut [&mut left[..], &mut right[..]], BLOCK);
                black_box(left[0])
            })
        });
    }

    group.finish();
}

fn benchmark_events(c: &mut Criterion) {
    let mut engine = playing_engine(16);
    let silence = vec![0.0; BLOCK];
    let mut left = vec![0.0; BLOCK];
    let mut right = vec![0.0; BLOCK];

    // Retrigger every voice at a spread of offsets inside the block.
    let events: Vec<RenderEvent> = (0..16u8)
        .flat_map(|v| {
            let at = u32::from(v) * 32;
            [RenderEvent::note_off(at, 0, 36 + v), RenderEvent::note_on(at, 0, 36 + v, 100)]
        })
        .collect();

    c.bench_function("events_16_voices", |b| {
        b.iter(|| {
            engine.process_with_events(&[&silence[..]], &mut [&mut left[..], &mut right[..]], BLOCK, black_box(&events));
            black_box(right[BLOCK - 1])
        })
    });
}

criterion_group!(benches, benchmark_playback, benchmark_loop_record, benchmark_events);
criterion_main!(benches);
