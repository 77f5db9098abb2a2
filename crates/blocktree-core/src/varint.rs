//! Variable-length unsigned integers
//!
//! Base-128, most significant group first. Every byte except the last has
//! the high bit set. Each continued group is biased by one, so there is
//! exactly one encoding per value and no encoding is a prefix of another:
//!
//! | value        | bytes      |
//! |--------------|------------|
//! | 0            | `00`       |
//! | 127          | `7f`       |
//! | 128          | `80 00`    |
//! | 16383        | `fe 7f`    |
//! | 16384        | `ff 00`    |

use std::io::{self, Read};

/// Longest possible encoding (u64::MAX)
pub const MAX_VARINT_LEN: usize = 10;

/// Varint error type
#[derive(Debug, thiserror::Error)]
pub enum VarintError {
    #[error("varint truncated")]
    Truncated,
    #[error("varint overflows u64")]
    Overflow,
    #[error("IO error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for VarintError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            VarintError::Truncated
        } else {
            VarintError::Io(e)
        }
    }
}

/// Encode a value
pub fn encode_varint(n: u64) -> Vec<u8> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut pos = MAX_VARINT_LEN - 1;
    buf[pos] = (n & 0x7f) as u8;
    let mut n = n >> 7;
    while n != 0 {
        n -= 1;
        pos -= 1;
        buf[pos] = 0x80 | (n & 0x7f) as u8;
        n >>= 7;
    }
    buf[pos..].to_vec()
}

/// Append the encoding of `n` to `out`
pub fn encode_varint_into(n: u64, out: &mut Vec<u8>) {
    out.extend_from_slice(&encode_varint(n));
}

/// Number of bytes `encode_varint(n)` produces
pub fn encoded_len(n: u64) -> usize {
    let mut len = 1;
    let mut n = n >> 7;
    while n != 0 {
        n -= 1;
        len += 1;
        n >>= 7;
    }
    len
}

/// Decode one value, reading byte by byte from `reader`
pub fn decode_varint<R: Read + ?Sized>(reader: &mut R) -> Result<u64, VarintError> {
    let mut c = read_byte(reader)?;
    let mut value = u64::from(c & 0x7f);
    while c & 0x80 != 0 {
        c = read_byte(reader)?;
        value = value
            .checked_add(1)
            .and_then(|v| v.checked_mul(128))
            .and_then(|v| v.checked_add(u64::from(c & 0x7f)))
            .ok_or(VarintError::Overflow)?;
    }
    Ok(value)
}

/// Decode one value from the front of `data`
/// Returns (value, bytes consumed)
pub fn decode_varint_slice(data: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut cursor = data;
    let value = decode_varint(&mut cursor)?;
    Ok((value, data.len() - cursor.len()))
}

fn read_byte<R: Read + ?Sized>(reader: &mut R) -> Result<u8, VarintError> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}
