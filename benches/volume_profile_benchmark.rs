use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use replay_chart::chart::{DrawList, LinearPriceScale, ProfileRenderer};
use replay_chart::config::VolumeProfileConfig;
use replay_chart::core::{ValueAreaMode, VolumeProfileAggregator, VolumeProfileBin, VolumeProfileSession};

const TICK: f64 = 0.25;

fn synthetic_sessions(count: usize, bins_per_session: usize, seed: u64) -> Vec<VolumeProfileSession> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|s| {
            let center: f64 = 20_000.0 + rng.gen_range(-200..200) as f64 * TICK;
            let bins = (0..bins_per_session)
                .map(|i| {
                    let price = center + (i as f64 - bins_per_session as f64 / 2.0) * TICK;
                    let volume = rng.gen_range(0.0..500.0);
                    VolumeProfileBin::new(price, volume, price - TICK / 2.0, price + TICK / 2.0, rng.gen_bool(0.7))
                })
                .collect();
            VolumeProfileSession {
                time: s as i64 * 86_400,
                bins,
                poc: center,
                vah: center + 10.0,
                val: center - 10.0,
            }
        })
        .collect()
}

fn benchmark_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("profile_aggregation");

    for &sessions in &[10usize, 60, 250] {
        let input = synthetic_sessions(sessions, 80, 7);
        group.throughput(Throughput::Elements((sessions * 80) as u64));

        group.bench_with_input(BenchmarkId::new("carry_forward", sessions), &input, |b, input| {
            let mut aggregator = VolumeProfileAggregator::new(ValueAreaMode::CarryForward, 0.7);
            b.iter(|| aggregator.set_data(black_box(input)));
        });

        group.bench_with_input(BenchmarkId::new("recompute", sessions), &input, |b, input| {
            let mut aggregator = VolumeProfileAggregator::new(ValueAreaMode::Recompute, 0.7);
            b.iter(|| aggregator.set_data(black_box(input)));
        });
    }

    group.finish();
}

fn benchmark_render(c: &mut Criterion) {
    let sessions = synthetic_sessions(60, 80, 11);
    let profile = VolumeProfileAggregator::default().set_data(&sessions);
    let renderer = ProfileRenderer::new(VolumeProfileConfig::default());
    let scale = LinearPriceScale::with_margin(19_900.0, 20_100.0, 0.05, 0.0, 800.0);

    c.bench_function("profile_render_draw_list", |b| {
        b.iter(|| {
            let mut canvas = DrawList::new();
            renderer.render(black_box(&profile), &scale, 1200.0, &mut canvas);
            canvas
        });
    });
}

criterion_group!(benches, benchmark_aggregation, benchmark_render);
criterion_main!(benches);
