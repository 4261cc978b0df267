#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion, Throughput};

use denm_core::events::{EventBus, TimedEvent};
use denm_core::geo::{GeoArea, Position};

/// One broadcast fanned out to every listener, then drained at delivery time.
fn bench_broadcast_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast_fan_out");

    for listeners in [8usize, 64, 512] {
        group.throughput(Throughput::Elements(listeners as u64));
        group.bench_function(format!("listeners_{listeners}"), |b| {
            let bus = EventBus::with_capacity(listeners);
            b.iter(|| {
                for station in 0..listeners as u32 {
                    bus.event_enqueue(TimedEvent {
                        due_ns: 100_000_000,
                        event: (station, [0u8; 64]),
                    })
                    .unwrap();
                }
                black_box(bus.event_drain());
            });
        });
    }
    group.finish();
}

fn bench_area_filter(c: &mut Criterion) {
    let area = GeoArea::circle(Position::new(0.0, 0.0), 500.0);
    let nodes: Vec<Position> = (0..1024)
        .map(|i| Position::new((i % 32) as f64 * 40.0, (i / 32) as f64 * 40.0))
        .collect();

    c.bench_function("geo_area_contains_1024", |b| {
        b.iter(|| nodes.iter().filter(|p| area.contains(p)).count());
    });
}

criterion_group!(benches, bench_broadcast_fan_out, bench_area_filter);
criterion_main!(benches);
