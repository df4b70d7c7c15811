//! Writers racing on the same log from separate threads never collide on an
//! id, however many threads or writes-per-thread.

use std::sync::Arc;
use std::thread;

use chronicle::{Log, LogOptions};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]
    #[test]
    fn concurrent_writes_never_collide(threads in 2usize..8, per_thread in 1usize..50) {
        let log: Arc<Log<u64>> = Arc::new(Log::new(LogOptions::new().with_name("concurrent")));
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let log = log.clone();
                thread::spawn(move || {
                    (0..per_thread)
                        .map(|i| log.write((t * 1000 + i) as u64))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all_ids = Vec::new();
        for h in handles {
            all_ids.extend(h.join().unwrap());
        }
        let unique: std::collections::HashSet<_> = all_ids.iter().collect();
        prop_assert_eq!(unique.len(), all_ids.len());
    }
}
