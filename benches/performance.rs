use criterion::{criterion_group, criterion_main, Criterion};
use pkmodel::*;
use std::hint::black_box;

fn example_runs(n: usize) -> Vec<(Model, Protocol)> {
    (0..n)
        .map(|i| {
            let model = Model::builder(2.0)
                .clearance(3.0)
                .repeat(1 + i % 4, 1.0 + i as f64 * 0.1, 3.0)
                .build()
                .unwrap();
            let mut protocol = Protocol::new(10.0).unwrap();
            protocol.make_subcutaneous(0.3).unwrap();
            protocol.set_continuous_window(0.2, 0.6).unwrap();
            for t in [0.0, 0.1, 0.2, 0.3] {
                protocol.add_dose_time(t).unwrap();
            }
            (model, protocol)
        })
        .collect()
}

fn sequential(runs: &[(Model, Protocol)], settings: &SolverSettings) {
    for (model, protocol) in runs {
        black_box(solve_with(model, protocol, settings).unwrap());
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let runs = example_runs(20);
    let settings = SolverSettings::new(1.0, 1000);
    c.bench_function("sequential 20", |b| {
        b.iter(|| sequential(black_box(&runs), &settings))
    });
    c.bench_function("solve_many 20", |b| {
        b.iter(|| black_box(solve_many(black_box(&runs), &settings)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
