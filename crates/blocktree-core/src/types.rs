//! Block and tree identities
//!
//! A `BlockHash` names one stored block; a `TreeHash` names a whole tree and
//! is all a reader needs, together with the content size, to rebuild it.

use std::fmt;
use std::str::FromStr;

use crate::codec::{join_blockhash, lb32decode, lb32encode, split_blockhash, CodecError};
use crate::hash::{HashError, HashFunction};

/// Block kind passed to stores
/// Informational only, never part of a hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockKind {
    /// Raw content bytes
    Leaf = 0,
    /// Concatenated child digests
    Branch = 1,
}

impl BlockKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(BlockKind::Leaf),
            1 => Some(BlockKind::Branch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Leaf => "leaf",
            BlockKind::Branch => "branch",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one block: function, exact length, digest
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockHash {
    pub function_code: u64,
    /// Exact byte length of the block
    pub block_size: u64,
    pub digest: Vec<u8>,
}

impl BlockHash {
    pub fn new(function_code: u64, block_size: u64, digest: Vec<u8>) -> Self {
        Self {
            function_code,
            block_size,
            digest,
        }
    }

    /// Hash a block held in memory
    pub fn create(
        function: HashFunction,
        digest_size: usize,
        content: &[u8],
    ) -> Result<Self, HashError> {
        Ok(Self::new(
            function.code(),
            content.len() as u64,
            function.digest(content, digest_size)?,
        ))
    }

    /// Hash exactly `block_size` bytes read from `reader`
    pub fn from_reader<R: std::io::Read + ?Sized>(
        function: HashFunction,
        digest_size: usize,
        reader: &mut R,
        block_size: u64,
    ) -> Result<Self, CodecError> {
        let digest = crate::codec::digest_reader(
            function,
            digest_size,
            reader,
            block_size,
            crate::codec::DEFAULT_READ_CHUNK_SIZE,
        )?;
        Ok(Self::new(function.code(), block_size, digest))
    }

    pub fn function(&self) -> Result<HashFunction, HashError> {
        HashFunction::from_code(self.function_code)
    }

    pub fn digest_size(&self) -> usize {
        self.digest.len()
    }

    /// Check `content` against this identity
    pub fn matches(&self, content: &[u8]) -> Result<bool, HashError> {
        if content.len() as u64 != self.block_size {
            return Ok(false);
        }
        Ok(self.function()?.digest(content, self.digest.len())? == self.digest)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        join_blockhash(self.function_code, self.block_size, &self.digest)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let (function_code, block_size, digest) = split_blockhash(data)?;
        Ok(Self::new(function_code, block_size, digest.to_vec()))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn to_lb32(&self) -> String {
        lb32encode(&self.to_bytes())
    }

    pub fn from_lb32(text: &str) -> Result<Self, CodecError> {
        Self::from_bytes(&lb32decode(text)?)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_lb32())
    }
}

impl FromStr for BlockHash {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_lb32(s)
    }
}

/// Identity of a whole tree: function, maximum block size, root digest
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeHash {
    pub function_code: u64,
    /// Maximum size of any block in the tree (not the root's own length)
    pub block_size: u64,
    pub root_digest: Vec<u8>,
}

impl TreeHash {
    pub fn new(function_code: u64, block_size: u64, root_digest: Vec<u8>) -> Self {
        Self {
            function_code,
            block_size,
            root_digest,
        }
    }

    pub fn function(&self) -> Result<HashFunction, HashError> {
        HashFunction::from_code(self.function_code)
    }

    /// Every digest in the tree has this length
    pub fn digest_size(&self) -> usize {
        self.root_digest.len()
    }

    /// Identity of the root block, given its exact length
    pub fn root_block(&self, root_size: u64) -> BlockHash {
        BlockHash::new(self.function_code, root_size, self.root_digest.clone())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        crate::codec::join_treehash(self.function_code, self.block_size, &self.root_digest)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let (function_code, block_size, digest) = crate::codec::split_treehash(data)?;
        Ok(Self::new(function_code, block_size, digest.to_vec()))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn to_lb32(&self) -> String {
        lb32encode(&self.to_bytes())
    }

    pub fn from_lb32(text: &str) -> Result<Self, CodecError> {
        Self::from_bytes(&lb32decode(text)?)
    }
}

impl fmt::Display for TreeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_lb32())
    }
}

impl FromStr for TreeHash {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_lb32(s)
    }
}

/// Convert bytes to hex string
pub fn to_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Convert hex string to bytes
pub fn from_hex(hex_str: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(hex_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_kind() {
        assert_eq!(BlockKind::from_u8(0), Some(BlockKind::Leaf));
        assert_eq!(BlockKind::from_u8(1), Some(BlockKind::Branch));
        assert_eq!(BlockKind::from_u8(2), None);
        assert_eq!(BlockKind::Branch.to_string(), "branch");
    }

    #[test]
    fn test_blockhash_create() {
        let bh = BlockHash::create(HashFunction::Sha3_256, 32, b"Hello, world!").unwrap();
        assert_eq!(bh.function_code, 56);
        assert_eq!(bh.block_size, 13);
        assert_eq!(
            bh.to_string(),
            "hag7grncdhnaaxv6tqnb5kwzpo7triimqrz6ihik675wc7fkbrvkoiq"
        );
        assert!(bh.matches(b"Hello, world!").unwrap());
        assert!(!bh.matches(b"Hello, world?").unwrap());
        assert!(!bh.matches(b"Hello").unwrap());
    }

    #[test]
    fn test_blockhash_from_reader() {
        let data = b"Hello, world!";
        let bh = BlockHash::from_reader(HashFunction::Sha3_256, 32, &mut &data[..], 13).unwrap();
        assert_eq!(bh, BlockHash::create(HashFunction::Sha3_256, 32, data).unwrap());
    }

    #[test]
    fn test_blockhash_text_roundtrip() {
        let bh = BlockHash::new(112, 1 << 20, vec![9u8; 64]);
        let parsed: BlockHash = bh.to_string().parse().unwrap();
        assert_eq!(parsed, bh);
        assert_eq!(BlockHash::from_bytes(&bh.to_bytes()).unwrap(), bh);
    }

    #[test]
    fn test_treehash_fields() {
        let th = TreeHash::from_bytes(
            &from_hex("388100a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a")
                .unwrap(),
        )
        .unwrap();
        assert_eq!(th.function_code, 56);
        assert_eq!(th.block_size, 256);
        assert_eq!(th.digest_size(), 32);
        assert_eq!(th.function().unwrap(), HashFunction::Sha3_256);
        assert_eq!(th.root_block(0).block_size, 0);
        assert!(th.root_block(0).matches(b"").unwrap());
    }

    #[test]
    fn test_unknown_function() {
        let th = TreeHash::new(99, 16, vec![1; 16]);
        assert!(th.function().is_err());
    }
}
