use perfect_hash::graph::hash::Seeds;
use perfect_hash::{
    HashFunction, Keys, MaskingType, Result, SeedSource, SeededHash, SolveError, Solver,
    SolverConfig, StdRngSeedSource,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

fn assert_perfect<H: SeededHash>(table: &perfect_hash::SolvedTable<H>, keys: &Keys) {
    let slots: HashSet<u32> = keys.as_slice().iter().map(|&k| table.slot(k).unwrap()).collect();
    assert_eq!(slots.len(), keys.len());
    assert!(slots.iter().all(|&s| (s as usize) < keys.len()));
    table.check(keys).unwrap();
}

fn spread_keys(n: u32) -> Keys {
    // Multiplication by an odd constant is a bijection on u32.
    Keys::new((1..=n).map(|i| i.wrapping_mul(0x9E37_79B1)).collect()).unwrap()
}

/// Pair `c` of the sequence is `(2c + 1, 2c + 2)`.
#[derive(Default)]
struct CountingSeeds {
    next: AtomicU32,
}

impl SeedSource for CountingSeeds {
    fn fill_pair(&self) -> Result<[u32; 2]> {
        let c = self.next.fetch_add(1, Ordering::Relaxed);
        Ok([2 * c + 1, 2 * c + 2])
    }
}

/// Sends every key to vertices (0, 1) while the first seed is below 9,
/// which makes the graph cyclic; afterwards splits the key into two halves.
#[derive(Debug, Clone)]
struct CyclicUntilNinth;

impl SeededHash for CyclicUntilNinth {
    fn hash(&self, seeds: &Seeds, key: u32) -> (u32, u32) {
        if seeds.s1() < 9 {
            (0, 1)
        } else {
            (key >> 16, key & 0xffff)
        }
    }
}

#[derive(Debug, Clone)]
struct AlwaysCyclic;

impl SeededHash for AlwaysCyclic {
    fn hash(&self, _seeds: &Seeds, _key: u32) -> (u32, u32) {
        (0, 1)
    }
}

#[derive(Debug, Clone)]
struct Panicking;

impl SeededHash for Panicking {
    fn hash(&self, _seeds: &Seeds, _key: u32) -> (u32, u32) {
        panic!("hash exploded");
    }
}

struct BrokenEntropy;

impl SeedSource for BrokenEntropy {
    fn fill_pair(&self) -> Result<[u32; 2]> {
        Err(SolveError::SeedSource("entropy pool unavailable".into()))
    }
}

#[test]
fn four_keys_get_four_distinct_slots() {
    let keys = Keys::new(vec![10, 20, 30, 40]).unwrap();
    let mut solver = Solver::new(SolverConfig::default().with_concurrency(1));
    let table = solver.solve(&keys).unwrap();

    assert_eq!(table.dims().num_edges, 4);
    assert_eq!(table.dims().num_vertices, 10);
    assert_eq!(table.assigned().len(), 10);
    let slots: Vec<u32> = keys.as_slice().iter().map(|&k| table.slot(k).unwrap()).collect();
    assert!(slots.iter().all(|&s| s < 10));
    assert_perfect(&table, &keys);
    assert_eq!(table.stats().winner, Some(0));
    assert!(table.stats().attempts >= 1);
}

#[test]
fn single_key_converges() {
    let keys = Keys::new(vec![0xDEAD_BEEF]).unwrap();
    let table = Solver::new(SolverConfig::default().with_concurrency(2)).solve(&keys).unwrap();
    assert_eq!(table.slot(0xDEAD_BEEF), Some(0));
}

#[test]
fn racing_workers_publish_exactly_once() {
    let keys = spread_keys(64);
    let mut solver = Solver::new(SolverConfig::default().with_concurrency(2));
    for _ in 0..20 {
        let table = solver.solve(&keys).unwrap();
        let stats = table.stats();
        assert!(matches!(stats.winner, Some(0 | 1)));
        assert!(stats.late_finishers <= 1);
        assert_perfect(&table, &keys);
    }
}

#[test]
fn cyclic_attempts_are_retried_with_new_seeds() {
    let keys = Keys::new(vec![0x0000_0001, 0x0001_0002, 0x0002_0003, 0x0005_0006]).unwrap();
    let config = SolverConfig::default().with_concurrency(1).with_max_attempts(10);
    let mut solver = Solver::with_parts(config, CyclicUntilNinth, CountingSeeds::default());

    let table = solver.solve(&keys).unwrap();
    let stats = table.stats();
    assert_eq!(stats.attempts, 3);
    assert_eq!(stats.cyclic_attempts, 2);
    assert_eq!(stats.degenerate_attempts, 0);
    assert_eq!(table.seeds(), Seeds([9, 10, 11, 12]));
    assert_perfect(&table, &keys);
}

#[test]
fn every_hash_function_and_masking_converges() {
    let keys = spread_keys(16);
    for hash_function in HashFunction::ALL {
        for masking in MaskingType::ALL {
            let config = SolverConfig::default()
                .with_concurrency(2)
                .with_hash_function(hash_function)
                .with_masking(masking)
                .with_max_attempts(200_000);
            let table = Solver::new(config)
                .solve(&keys)
                .unwrap_or_else(|e| panic!("{hash_function:?}/{masking:?}: {e}"));
            if masking.needs_power_of_two() {
                assert!(table.dims().num_vertices.is_power_of_two());
            }
            assert_perfect(&table, &keys);
        }
    }
}

#[test]
fn larger_key_set_with_deterministic_seeds() {
    let keys = spread_keys(5_000);
    let config = SolverConfig::default().with_concurrency(1);
    let seeds = StdRngSeedSource::new(42);
    let mut solver = Solver::with_parts(config, HashFunction::Crc32Rotate, seeds);
    let table = solver.solve(&keys).unwrap();
    assert_perfect(&table, &keys);
}

#[test]
fn attempt_cap_reports_exhaustion() {
    let keys = spread_keys(8);
    let config = SolverConfig::default().with_concurrency(3).with_max_attempts(5);
    let mut solver = Solver::with_parts(config, AlwaysCyclic, StdRngSeedSource::new(1));
    assert_eq!(solver.solve(&keys).unwrap_err(), SolveError::AttemptsExhausted { attempts: 5 });
}

#[test]
fn shutdown_cancels_a_running_solve() {
    let keys = spread_keys(32);
    let config = SolverConfig::default().with_concurrency(2);
    let mut solver = Solver::with_parts(config, AlwaysCyclic, StdRngSeedSource::new(7));
    let handle = solver.shutdown_handle();

    let requester = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.request();
    });
    assert_eq!(solver.solve(&keys).unwrap_err(), SolveError::Cancelled);
    requester.join().unwrap();
}

#[test]
fn shutdown_before_solve_cancels_only_the_next_solve() {
    let keys = spread_keys(8);
    let config = SolverConfig::default().with_concurrency(1).with_max_attempts(3);
    let mut solver = Solver::with_parts(config, AlwaysCyclic, StdRngSeedSource::new(3));

    solver.shutdown_handle().request();
    assert_eq!(solver.solve(&keys).unwrap_err(), SolveError::Cancelled);
    assert_eq!(solver.solve(&keys).unwrap_err(), SolveError::AttemptsExhausted { attempts: 3 });
}

#[test]
fn seed_source_failure_is_fatal() {
    let keys = spread_keys(8);
    let config = SolverConfig::default().with_concurrency(2);
    let mut solver = Solver::with_parts(config, HashFunction::default(), BrokenEntropy);
    assert!(matches!(solver.solve(&keys), Err(SolveError::SeedSource(_))));
}

#[test]
fn worker_panic_is_contained() {
    let keys = spread_keys(8);
    let config = SolverConfig::default().with_concurrency(2);
    let mut solver = Solver::with_parts(config, Panicking, StdRngSeedSource::new(5));
    assert_eq!(solver.solve(&keys).unwrap_err(), SolveError::WorkerPanicked);
}

#[test]
fn config_parses_from_json_with_defaults() {
    let json = r#"{ "concurrency": 3, "hash_function": "rotate_xor" }"#;
    let config = SolverConfig::from_json(json).unwrap();
    assert_eq!(config.concurrency, 3);
    assert_eq!(config.hash_function, HashFunction::RotateXor);
    assert_eq!(config.masking, MaskingType::Modulus);
    assert_eq!(config.max_attempts, None);

    assert!(SolverConfig::from_json(r#"{ "masking": "bitwise" }"#).is_err());
    assert!(SolverConfig::default().resolved_concurrency() >= 1);
}
