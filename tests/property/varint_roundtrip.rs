//! Varint encode/decode round-trips over the full `u64` range.

use bytes::BytesMut;
use chronicle::codec::{read_varint, write_varint};
use proptest::prelude::*;

proptest! {
    #[test]
    fn varint_roundtrips_any_u64(x: u64) {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, x);
        let mut frozen = buf.freeze();
        prop_assert_eq!(read_varint(&mut frozen).unwrap(), x);
    }
}
