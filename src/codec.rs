//! Binary snapshot codec: a magic + version header, `BytesMut`/`Buf` for the
//! wire layer, and a trailing CRC-64 checksum.
//!
//! Integers are encoded as a variable-length form: values `<= 127` are a
//! single byte; larger values are a byte holding `-byte_length` (as a signed
//! i8) followed by the minimal-length big-endian encoding of the value.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use crc::{CRC_64_REDIS, Crc};

use crate::error::ChronicleError;

const CHECKSUM_ALGO: Crc<u64> = Crc::<u64>::new(&CRC_64_REDIS);

/// Magic bytes + format version for the top-level snapshot envelope.
pub const SNAPSHOT_MAGIC: &[u8] = b"CHRNCL1\0";

/// Writes `x` in the codec's varint sub-format.
pub fn write_varint(buf: &mut BytesMut, x: u64) {
    if x <= 0x7F {
        buf.put_u8(x as u8);
        return;
    }
    let be = x.to_be_bytes();
    let first_nonzero = be.iter().position(|&b| b != 0).unwrap_or(7);
    let len = 8 - first_nonzero;
    buf.put_u8((-(len as i8)) as u8);
    buf.put_slice(&be[first_nonzero..]);
}

/// Reads a varint encoded per the codec's sub-format. Fails with
/// `InvalidLength` when the declared length exceeds 8 bytes or the buffer
/// doesn't hold enough data.
pub fn read_varint(buf: &mut Bytes) -> Result<u64, ChronicleError> {
    if !buf.has_remaining() {
        return Err(ChronicleError::InvalidLength(0));
    }
    let first = buf.get_u8();
    if first <= 0x7F {
        return Ok(first as u64);
    }
    // first as i8 can be i8::MIN (when first == 0x80), and negating that
    // overflows i8; widen to i16 first so the value falls through to the
    // length check below instead of panicking.
    let len = -(first as i8 as i16) as usize;
    if len > 8 {
        return Err(ChronicleError::InvalidLength(len));
    }
    if buf.remaining() < len {
        return Err(ChronicleError::InvalidLength(len));
    }
    let mut x: u64 = 0;
    for _ in 0..len {
        x = (x << 8) | buf.get_u8() as u64;
    }
    Ok(x)
}

pub fn write_bytes(buf: &mut BytesMut, data: &[u8]) {
    write_varint(buf, data.len() as u64);
    buf.put_slice(data);
}

pub fn read_bytes(buf: &mut Bytes) -> Result<Bytes, ChronicleError> {
    let len = read_varint(buf)? as usize;
    if buf.remaining() < len {
        return Err(ChronicleError::Corrupt(
            "declared payload length exceeds buffer".to_string(),
        ));
    }
    Ok(buf.split_to(len))
}

pub fn write_string(buf: &mut BytesMut, s: &str) {
    write_bytes(buf, s.as_bytes());
}

pub fn read_string(buf: &mut Bytes) -> Result<String, ChronicleError> {
    let bytes = read_bytes(buf)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ChronicleError::Corrupt(format!("invalid utf-8: {e}")))
}

/// Appends a CRC-64 checksum over everything written so far.
pub fn finalize_with_checksum(buf: &mut BytesMut) -> Bytes {
    let checksum = CHECKSUM_ALGO.checksum(buf);
    buf.put_u64_le(checksum);
    buf.split().freeze()
}

/// Validates and strips the trailing CRC-64 checksum from a decoded buffer.
pub fn verify_checksum(data: &[u8]) -> Result<Bytes, ChronicleError> {
    if data.len() < 8 {
        return Err(ChronicleError::Corrupt("snapshot too short".to_string()));
    }
    let (body, checksum_bytes) = data.split_at(data.len() - 8);
    let expected = u64::from_le_bytes(checksum_bytes.try_into().unwrap());
    let actual = CHECKSUM_ALGO.checksum(body);
    if actual != expected {
        return Err(ChronicleError::ChecksumMismatch);
    }
    Ok(Bytes::copy_from_slice(body))
}

/// A payload type that can be written into a snapshot.
pub trait Encode {
    fn encode(&self, buf: &mut BytesMut);
}

/// A payload type that can be read back out of a snapshot.
pub trait Decode: Sized {
    fn decode(buf: &mut Bytes) -> Result<Self, ChronicleError>;
}

impl Encode for Vec<u8> {
    fn encode(&self, buf: &mut BytesMut) {
        write_bytes(buf, self);
    }
}

impl Decode for Vec<u8> {
    fn decode(buf: &mut Bytes) -> Result<Self, ChronicleError> {
        Ok(read_bytes(buf)?.to_vec())
    }
}

impl Encode for Bytes {
    fn encode(&self, buf: &mut BytesMut) {
        write_bytes(buf, self);
    }
}

impl Decode for Bytes {
    fn decode(buf: &mut Bytes) -> Result<Self, ChronicleError> {
        read_bytes(buf)
    }
}
