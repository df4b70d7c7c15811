//! `iter_from` agrees with a naive reference: everything strictly after the
//! pivot in key order, or nothing at all if the pivot was never inserted.

use chronicle::store::EntryStore;
use chronicle::EntryID;
use proptest::collection::vec;
use proptest::prelude::*;

fn id(ts: i64) -> EntryID {
    EntryID::new(ts, 0)
}

// Fixed 13-digit-wide timestamps: the store keys on the canonical string
// form, whose lexicographic order only matches numeric order when every
// timestamp has the same digit width.
proptest! {
    #[test]
    fn iterate_from_matches_reference(
        timestamps in vec(1_000_000_000_000i64..1_000_000_000_100, 0..30),
        pivot_ts in 1_000_000_000_000i64..1_000_000_000_100,
    ) {
        let mut store = EntryStore::new();
        let mut inserted: Vec<i64> = Vec::new();
        for ts in timestamps {
            store.insert(id(ts), ts);
            inserted.push(ts);
        }
        inserted.sort_unstable();
        inserted.dedup();

        let pivot = id(pivot_ts);
        let got: Vec<i64> = store.iter_from(Some(pivot)).map(|(_, p)| *p).collect();

        let expected: Vec<i64> = if inserted.contains(&pivot_ts) {
            inserted.iter().copied().filter(|&ts| ts > pivot_ts).collect()
        } else {
            Vec::new()
        };

        prop_assert_eq!(got, expected);
    }
}
