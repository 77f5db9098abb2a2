//! Tree parameters and their validation

use crate::hash::{HashError, HashFunction};
use crate::types::TreeHash;

/// Default maximum block size: 256KB
pub const DEFAULT_BLOCK_SIZE: usize = 256 * 1024;

/// Default digest size in bytes
pub const DEFAULT_DIGEST_SIZE: usize = 32;

/// Smallest digest the post format accepts
pub const MIN_DIGEST_SIZE: usize = 16;

/// Largest digest the post format accepts
pub const MAX_DIGEST_SIZE: usize = 64;

/// Parameter error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamsError {
    #[error("digest size {size} outside allowed range {min}..={max}")]
    InvalidDigestLength { size: usize, min: usize, max: usize },
    #[error("block size must be greater than zero")]
    ZeroBlockSize,
    #[error("block size {block_size} too small for digest size {digest_size}: a branch must hold more than one digest")]
    BlockSizeTooSmall { block_size: usize, digest_size: usize },
    #[error("block size {0} does not fit in memory")]
    BlockSizeOverflow(u64),
    #[error("Hash error: {0}")]
    Hash(#[from] HashError),
}

/// Inclusive bounds on accepted digest sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestLimits {
    pub min: usize,
    pub max: usize,
}

impl Default for DigestLimits {
    fn default() -> Self {
        Self {
            min: MIN_DIGEST_SIZE,
            max: MAX_DIGEST_SIZE,
        }
    }
}

impl DigestLimits {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Accept any non-empty digest
    pub fn any() -> Self {
        Self {
            min: 1,
            max: usize::MAX,
        }
    }

    pub fn check(&self, size: usize) -> Result<(), ParamsError> {
        if size == 0 || size < self.min || size > self.max {
            return Err(ParamsError::InvalidDigestLength {
                size,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// How content is cut and hashed into a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    pub hash_function: HashFunction,
    pub digest_size: usize,
    /// Maximum bytes per block
    pub block_size: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            hash_function: HashFunction::Sha3_256,
            digest_size: DEFAULT_DIGEST_SIZE,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl TreeParams {
    pub fn new(hash_function: HashFunction, digest_size: usize, block_size: usize) -> Self {
        Self {
            hash_function,
            digest_size,
            block_size,
        }
    }

    /// Parameters by numeric function code
    pub fn from_code(
        function_code: u64,
        digest_size: usize,
        block_size: usize,
    ) -> Result<Self, ParamsError> {
        Ok(Self::new(
            HashFunction::from_code(function_code)?,
            digest_size,
            block_size,
        ))
    }

    /// Parameters a tree was built with
    pub fn from_tree_hash(tree_hash: &TreeHash) -> Result<Self, ParamsError> {
        let block_size = usize::try_from(tree_hash.block_size)
            .map_err(|_| ParamsError::BlockSizeOverflow(tree_hash.block_size))?;
        Ok(Self::new(
            tree_hash.function()?,
            tree_hash.digest_size(),
            block_size,
        ))
    }

    pub fn with_hash_function(mut self, hash_function: HashFunction) -> Self {
        self.hash_function = hash_function;
        self
    }

    pub fn with_digest_size(mut self, digest_size: usize) -> Self {
        self.digest_size = digest_size;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn function_code(&self) -> u64 {
        self.hash_function.code()
    }

    /// Check digest size and block size; does not require a usable branch capacity
    pub fn validate(&self, limits: &DigestLimits) -> Result<(), ParamsError> {
        limits.check(self.digest_size)?;
        if self.block_size == 0 {
            return Err(ParamsError::ZeroBlockSize);
        }
        Ok(())
    }

    /// Digests per branch block; multi-block trees need at least two
    pub fn branch_capacity(&self) -> Result<usize, ParamsError> {
        branch_capacity(self.block_size, self.digest_size)
    }
}

/// `block_size / digest_size`, failing when a branch could not hold two digests
pub fn branch_capacity(block_size: usize, digest_size: usize) -> Result<usize, ParamsError> {
    if block_size == 0 {
        return Err(ParamsError::ZeroBlockSize);
    }
    let capacity = if digest_size == 0 { 0 } else { block_size / digest_size };
    if capacity <= 1 {
        return Err(ParamsError::BlockSizeTooSmall {
            block_size,
            digest_size,
        });
    }
    Ok(capacity)
}
