#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};

use denm_core::geo::Position;
use denm_core::station::StationId;
use denm_protocols::{Alert, AlertPayload, DenmEncoder, DenmParser, Severity};

fn sample_alerts() -> Vec<(&'static str, Alert)> {
    let at = Position::new(120.0, 3.5);
    vec![
        (
            "collision",
            Alert::new(
                StationId(1),
                10.0,
                Severity::Critical,
                at,
                20.0,
                90.0,
                AlertPayload::Collision {
                    time_to_collision: 1.2,
                },
            ),
        ),
        (
            "speed",
            Alert::new(
                StationId(2),
                10.0,
                Severity::Warning,
                at,
                35.0,
                0.0,
                AlertPayload::Speed {
                    offending_vehicle: StationId(7),
                    current_speed: 35.0,
                    speed_limit: 30.0,
                },
            ),
        ),
    ]
}

fn benchmark_denm_encode(c: &mut Criterion) {
    let encoder = DenmEncoder::new();
    for (family, alert) in sample_alerts() {
        c.bench_function(&format!("denm_encode_{family}"), |b| {
            b.iter(|| black_box(encoder.encode(black_box(&alert))))
        });
    }
}

fn benchmark_denm_parse(c: &mut Criterion) {
    let encoder = DenmEncoder::new();
    let parser = DenmParser::new();
    for (family, alert) in sample_alerts() {
        let frame = encoder.encode(&alert);
        c.bench_function(&format!("denm_parse_{family}"), |b| {
            b.iter(|| {
                black_box(parser.parse(&frame)).unwrap();
            })
        });
    }
}

criterion_group!(benches, benchmark_denm_encode, benchmark_denm_parse);
criterion_main!(benches);
