//! Binary block records and text encoding
//!
//! Format: `varint(function_code) || varint(block_size) || digest`
//!
//! The same layout serves both block hashes (block_size = that block's
//! length) and tree hashes (block_size = the tree's maximum block size).
//! Records carry no length prefix: standalone, the digest is the rest of
//! the buffer; inside a branch block, every digest has the tree's digest
//! size.

use std::io::Read;

use crate::hash::{HashError, HashFunction};
use crate::varint::{decode_varint, decode_varint_slice, encode_varint_into, encoded_len, VarintError};

/// Default read size when hashing a block from a stream
pub const DEFAULT_READ_CHUNK_SIZE: usize = 256 * 1024;

/// Codec error type
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("blockhash corrupt or truncated")]
    Truncated,
    #[error("branch block of {len} bytes is not a multiple of digest size {digest_size}")]
    BranchLength { len: usize, digest_size: usize },
    #[error("invalid lb32 text: {0}")]
    InvalidLb32(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Hash error: {0}")]
    Hash(#[from] HashError),
}

impl From<VarintError> for CodecError {
    fn from(e: VarintError) -> Self {
        match e {
            VarintError::Io(e) => CodecError::Io(e),
            VarintError::Truncated | VarintError::Overflow => CodecError::Truncated,
        }
    }
}

/// Join a blockhash from its components
pub fn join_blockhash(function_code: u64, block_size: u64, digest: &[u8]) -> Vec<u8> {
    let mut out =
        Vec::with_capacity(encoded_len(function_code) + encoded_len(block_size) + digest.len());
    encode_varint_into(function_code, &mut out);
    encode_varint_into(block_size, &mut out);
    out.extend_from_slice(digest);
    out
}

/// Split a blockhash into (function_code, block_size, digest)
pub fn split_blockhash(data: &[u8]) -> Result<(u64, u64, &[u8]), CodecError> {
    let (function_code, used) = decode_varint_slice(data)?;
    let rest = &data[used..];
    let (block_size, used) = decode_varint_slice(rest)?;
    let digest = &rest[used..];
    if digest.is_empty() {
        return Err(CodecError::Truncated);
    }
    Ok((function_code, block_size, digest))
}

/// Join a treehash; `block_size` is the tree's maximum block size
pub fn join_treehash(function_code: u64, block_size: u64, root_digest: &[u8]) -> Vec<u8> {
    join_blockhash(function_code, block_size, root_digest)
}

/// Split a treehash into (function_code, max_block_size, root_digest)
pub fn split_treehash(data: &[u8]) -> Result<(u64, u64, &[u8]), CodecError> {
    split_blockhash(data)
}

/// Function code of an encoded blockhash
pub fn blockhash_function_code(data: &[u8]) -> Result<u64, CodecError> {
    Ok(decode_varint_slice(data)?.0)
}

/// Block size recorded in an encoded blockhash
pub fn blockhash_block_size(data: &[u8]) -> Result<u64, CodecError> {
    let mut cursor = data;
    decode_varint(&mut cursor)?;
    Ok(decode_varint(&mut cursor)?)
}

/// Hash `content` and return its encoded blockhash
pub fn create_blockhash(
    function_code: u64,
    digest_size: usize,
    content: &[u8],
) -> Result<Vec<u8>, HashError> {
    let digest = HashFunction::from_code(function_code)?.digest(content, digest_size)?;
    Ok(join_blockhash(function_code, content.len() as u64, &digest))
}

/// Hash exactly `block_size` bytes from `reader`, in bounded reads
///
/// Returns the digest only. Fails with `Truncated` if the reader ends early.
pub fn digest_reader<R: Read + ?Sized>(
    function: HashFunction,
    digest_size: usize,
    reader: &mut R,
    block_size: u64,
    read_chunk_size: usize,
) -> Result<Vec<u8>, CodecError> {
    let mut hasher = function.hasher(digest_size)?;
    let mut buf = vec![0u8; read_chunk_size.max(1)];
    let mut left = block_size;
    while left > 0 {
        let want = buf.len().min(usize::try_from(left).unwrap_or(usize::MAX));
        let n = reader.read(&mut buf[..want])?;
        if n == 0 {
            return Err(CodecError::Truncated);
        }
        hasher.update(&buf[..n]);
        left -= n as u64;
    }
    Ok(hasher.finalize())
}

/// Split a branch block into its child digests
pub fn split_branch(digest_size: usize, data: &[u8]) -> Result<std::slice::Chunks<'_, u8>, CodecError> {
    if digest_size == 0 || data.len() % digest_size != 0 {
        return Err(CodecError::BranchLength {
            len: data.len(),
            digest_size,
        });
    }
    Ok(data.chunks(digest_size))
}

const LB32: base32::Alphabet = base32::Alphabet::Rfc4648 { padding: false };

/// Lowercase unpadded RFC 4648 base32
pub fn lb32encode(data: &[u8]) -> String {
    base32::encode(LB32, data).to_ascii_lowercase()
}

/// Decode lowercase unpadded base32 (case-insensitive, padding rejected)
pub fn lb32decode(text: &str) -> Result<Vec<u8>, CodecError> {
    if text.contains('=') {
        return Err(CodecError::InvalidLb32(text.to_string()));
    }
    base32::decode(LB32, &text.to_ascii_uppercase())
        .ok_or_else(|| CodecError::InvalidLb32(text.to_string()))
}
