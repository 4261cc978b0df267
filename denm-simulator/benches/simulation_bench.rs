#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};
use denm_config::DenmConfig;
use denm_engine::TelemetrySinks;
use denm_simulator::{AlertFamily, Scenario, Simulator};

/// Full collision scenario: services, radio medium and relay per tick.
fn benchmark_collision_scenario(c: &mut Criterion) {
    let scenario = Scenario::builtin(AlertFamily::Collision).expect("built-in scenario");
    let config = DenmConfig::default();

    c.bench_function("collision_scenario", |b| {
        b.iter(|| {
            let mut simulator =
                Simulator::new(&scenario, &config, TelemetrySinks::disabled()).expect("simulator");
            black_box(simulator.run())
        })
    });
}

fn benchmark_speed_scenario(c: &mut Criterion) {
    let scenario = Scenario::builtin(AlertFamily::Speed).expect("built-in scenario");
    let config = DenmConfig::default();

    c.bench_function("speed_scenario", |b| {
        b.iter(|| {
            let mut simulator =
                Simulator::new(&scenario, &config, TelemetrySinks::disabled()).expect("simulator");
            black_box(simulator.run().digest)
        })
    });
}

criterion_group!(benches, benchmark_collision_scenario, benchmark_speed_scenario);
criterion_main!(benches);
