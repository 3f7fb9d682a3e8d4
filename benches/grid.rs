use criterion::{Criterion, black_box, criterion_group, criterion_main};
use imlayout::grid::assign_grid;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn bench_assign_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("assign_grid");
    let mut rng = StdRng::seed_from_u64(42);

    for n in [100, 400, 1000] {
        let labels = black_box((0..n).map(|i| format!("{i}.jpg")).collect::<Vec<_>>());
        let points = black_box((0..n).map(|_| [rng.random::<f64>(), rng.random::<f64>()]).collect::<Vec<_>>());
        group.bench_function(format!("assign_grid_{n}"), |b| b.iter(|| assign_grid(&labels, &points)));
    }

    group.finish();
}

criterion_group!(benches, bench_assign_grid);
criterion_main!(benches);
