use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use perfect_hash::graph::hash::{HashFunction, MaskingType, SeededHash, Seeds};
use perfect_hash::graph::layout::GraphLayout;
use perfect_hash::graph::seed::StdRngSeedSource;
use perfect_hash::graph::{Graph, GraphBuffer};
use perfect_hash::{Keys, Solver, SolverConfig};

fn keys(n: u32) -> Vec<u32> {
    (1..=n).map(|i| i.wrapping_mul(0x9E37_79B1)).collect()
}

fn bench_hash_functions(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash");
    let seeds = Seeds([0x1234_5678, 0x9ABC_DEF0, 0x0F1E_2D3C, 0x4B5A_6978]);
    let input = keys(1024);
    for function in HashFunction::ALL {
        group.bench_function(format!("{function:?}"), |b| {
            b.iter(|| {
                for &k in &input {
                    black_box(function.hash(&seeds, black_box(k)));
                }
            })
        });
    }
    group.finish();
}

fn bench_single_attempt(c: &mut Criterion) {
    let mut group = c.benchmark_group("attempt");
    for n in [1_000u32, 100_000] {
        let input = keys(n);
        let layout = GraphLayout::plan(input.len(), MaskingType::Modulus).unwrap();
        let mut buffer = GraphBuffer::new(&layout);
        let seeds = StdRngSeedSource::new(99);
        group.bench_with_input(BenchmarkId::new("insert_and_peel", n), &input, |b, input| {
            let mut graph = Graph::new(buffer.as_bytes_mut(), &layout).unwrap();
            b.iter(|| {
                graph.reset(&seeds).unwrap();
                if graph.insert_keys(&HashFunction::Crc32Rotate, input).is_ok() {
                    black_box(graph.is_acyclic());
                }
            })
        });
    }
    group.finish();
}

fn bench_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("solve");
    group.sample_size(10);
    for n in [10_000u32, 1_000_000] {
        let input = Keys::new(keys(n)).unwrap();
        for workers in [1usize, 4] {
            let mut solver = Solver::new(SolverConfig::default().with_concurrency(workers));
            let id = BenchmarkId::new(format!("{workers}_workers"), n);
            group.bench_with_input(id, &input, |b, input| {
                b.iter(|| black_box(solver.solve(input).unwrap()))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_hash_functions, bench_single_attempt, bench_solve);
criterion_main!(benches);
