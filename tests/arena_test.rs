use perfect_hash::alloc::GraphArena;
use perfect_hash::graph::hash::{HashFunction, MaskingType};
use perfect_hash::graph::layout::GraphLayout;
use perfect_hash::graph::seed::StdRngSeedSource;
use perfect_hash::graph::Graph;
use std::thread;

#[test]
fn each_slice_holds_an_independent_graph() {
    let keys: Vec<u32> = (0..500).map(|i: u32| i.wrapping_mul(0x0101_0101) ^ 0x5A5A).collect();
    let layout = GraphLayout::plan(keys.len(), MaskingType::Modulus).unwrap();
    let mut arena = GraphArena::reserve(4, layout.slice_bytes).unwrap();
    assert!(arena.slice_bytes() >= layout.graph_bytes);

    let solved: Vec<bool> = thread::scope(|s| {
        let handles: Vec<_> = arena
            .slices_mut()
            .into_iter()
            .enumerate()
            .map(|(i, slice)| {
                let (layout, keys) = (&layout, &keys);
                s.spawn(move || {
                    let seeds = StdRngSeedSource::new(i as u64);
                    let mut graph = Graph::new(slice, layout).unwrap();
                    for _ in 0..64 {
                        graph.reset(&seeds).unwrap();
                        if graph.insert_keys(&HashFunction::Crc32Rotate, keys).is_err() {
                            continue;
                        }
                        match graph.try_into_acyclic() {
                            Ok(acyclic) => {
                                let mut assigned = acyclic.assign().unwrap();
                                assigned.verify(&HashFunction::Crc32Rotate, keys).unwrap();
                                return true;
                            }
                            Err(cyclic) => graph = cyclic,
                        }
                    }
                    false
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(solved, vec![true; 4]);
}

#[test]
fn slices_do_not_overlap() {
    let mut arena = GraphArena::reserve(3, 4096).unwrap();
    let ranges: Vec<(usize, usize)> = arena
        .slices_mut()
        .iter()
        .map(|s| (s.as_ptr() as usize, s.as_ptr() as usize + s.len()))
        .collect();
    for pair in ranges.windows(2) {
        assert!(pair[0].1 < pair[1].0, "guard region missing between slices");
    }
}

#[cfg(feature = "guard-pages")]
#[test]
fn protected_guards_leave_slices_writable() {
    let mut arena = GraphArena::reserve(2, 8192).unwrap();
    for slice in arena.slices_mut() {
        slice.fill(0xFF);
        assert!(slice.iter().all(|&b| b == 0xFF));
    }
}
