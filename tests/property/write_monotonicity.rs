//! Every id `write` hands back is strictly greater than the one before it,
//! for an arbitrary run length.

use chronicle::{Log, LogOptions};
use proptest::prelude::*;

proptest! {
    #[test]
    fn write_ids_strictly_increase(count in 1usize..200) {
        let log: Log<u64> = Log::new(LogOptions::new().with_name("monotone"));
        let mut last = None;
        for i in 0..count {
            let id = log.write(i as u64);
            if let Some(prev) = last {
                prop_assert!(id > prev);
            }
            last = Some(id);
        }
    }
}
