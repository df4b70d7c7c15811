#[path = "property/write_monotonicity.rs"]
mod write_monotonicity;

#[path = "property/concurrent_writes.rs"]
mod concurrent_writes;

#[path = "property/varint_roundtrip.rs"]
mod varint_roundtrip;

#[path = "property/iterate_from.rs"]
mod iterate_from;
