#![cfg(loom)]

use loom::sync::Arc;
use loom::thread;
use perfect_hash::concurrency::FirstFinisher;

#[test]
fn concurrent_claims_elect_exactly_one_winner() {
    loom::model(|| {
        let finisher = Arc::new(FirstFinisher::new());
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let finisher = Arc::clone(&finisher);
                thread::spawn(move || finisher.try_claim())
            })
            .collect();

        let wins = handles.into_iter().map(|h| u32::from(h.join().unwrap())).sum::<u32>();
        assert_eq!(wins, 1);
        assert_eq!(finisher.finished(), 1);
        assert_eq!(finisher.late_finishers(), 1);
    });
}
