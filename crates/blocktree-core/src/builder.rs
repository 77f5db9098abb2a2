//! Tree builder
//!
//! - Content is cut into leaves of at most `block_size` bytes
//! - Leaf digests are grouped `block_size / digest_size` at a time into
//!   branch blocks, level by level, until one root digest remains
//! - Every block is handed to the store as it is produced
//! - Supports streaming appends
//!
//! Leaves are independent of each other, and so are the branches of one
//! level. The stage functions (`hash_leaf`, `branch_blocks`, `build_level`,
//! `build_root`) are public so callers can run those stages in parallel and
//! still get the same tree.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::geometry::TreeShape;
use crate::hash::HashError;
use crate::params::{DigestLimits, ParamsError, TreeParams};
use crate::store::{NullStore, Store, StoreError};
use crate::types::{BlockHash, BlockKind, TreeHash};

/// Builder configuration
#[derive(Clone)]
pub struct BuilderConfig<S: Store + ?Sized> {
    pub store: Arc<S>,
    pub params: TreeParams,
    pub limits: DigestLimits,
}

impl<S: Store + ?Sized> BuilderConfig<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            params: TreeParams::default(),
            limits: DigestLimits::default(),
        }
    }

    pub fn with_params(mut self, params: TreeParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.params.block_size = block_size;
        self
    }

    pub fn with_digest_size(mut self, digest_size: usize) -> Self {
        self.params.digest_size = digest_size;
        self
    }

    pub fn with_hash_function(mut self, hash_function: crate::hash::HashFunction) -> Self {
        self.params.hash_function = hash_function;
        self
    }

    pub fn with_digest_limits(mut self, limits: DigestLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Tree hash and content size of a stored tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResult {
    pub tree_hash: TreeHash,
    pub size: u64,
}

/// TreeBuilder - builds block trees into a store
pub struct TreeBuilder<S: Store + ?Sized> {
    store: Arc<S>,
    params: TreeParams,
    limits: DigestLimits,
}

impl<S: Store + ?Sized> TreeBuilder<S> {
    pub fn new(config: BuilderConfig<S>) -> Self {
        Self {
            store: config.store,
            params: config.params,
            limits: config.limits,
        }
    }

    pub fn params(&self) -> &TreeParams {
        &self.params
    }

    /// Store in-memory content
    pub fn put(&self, data: &[u8]) -> Result<PutResult, BuilderError> {
        self.put_reader_with_size(&mut &data[..], data.len() as u64)
    }

    /// Store everything from the current position to the end of `reader`
    ///
    /// The size is found by seeking to the end, then the position is restored.
    pub fn put_reader<R: Read + Seek>(&self, mut reader: R) -> Result<PutResult, BuilderError> {
        let start = reader.stream_position()?;
        let end = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(start))?;
        self.put_reader_with_size(&mut reader, end.saturating_sub(start))
    }

    /// Store exactly `content_size` bytes from `reader`
    ///
    /// Fails with `UnexpectedEof` if the reader ends early; bytes past
    /// `content_size` are left unread.
    pub fn put_reader_with_size<R: Read + ?Sized>(
        &self,
        reader: &mut R,
        content_size: u64,
    ) -> Result<PutResult, BuilderError> {
        self.params.validate(&self.limits)?;
        let shape = TreeShape::new(content_size, self.params.block_size, self.params.digest_size)?;

        let leaf_level = shape.leaf_level();
        let first_leaf = usize::try_from(content_size).unwrap_or(usize::MAX);
        let mut buf = vec![0u8; self.params.block_size.min(first_leaf)];
        // Grows as leaves arrive; the declared size is not trusted up front
        let mut digests = Vec::new();
        for position in 0..shape.leaf_count() {
            let len = shape.block_size_at(leaf_level, position) as usize;
            reader.read_exact(&mut buf[..len])?;
            let hash = store_leaf(&self.params, &buf[..len], &*self.store)?;
            digests.push(hash.digest);
        }

        let root = build_root(&self.params, digests, &*self.store)?;
        let tree_hash = TreeHash::new(
            self.params.function_code(),
            self.params.block_size as u64,
            root,
        );
        debug!(
            size = content_size,
            leaves = shape.leaf_count(),
            height = shape.height(),
            "built tree {}",
            tree_hash
        );
        Ok(PutResult {
            tree_hash,
            size: content_size,
        })
    }

    /// Store everything `reader` yields until it is exhausted
    ///
    /// Holds at most one block of content in memory.
    pub fn put_stream<R: Read>(&self, mut reader: R) -> Result<PutResult, BuilderError> {
        let mut stream = StreamBuilder::new(BuilderConfig {
            store: self.store.clone(),
            params: self.params,
            limits: self.limits,
        })?;
        let mut buf = vec![0u8; self.params.block_size];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            stream.append(&buf[..n])?;
        }
        stream.finalize()
    }
}

/// Compute a tree hash without storing any blocks
pub fn hash_blocktree(params: &TreeParams, data: &[u8]) -> Result<PutResult, BuilderError> {
    TreeBuilder::new(BuilderConfig::new(Arc::new(NullStore)).with_params(*params)).put(data)
}

/// Hash one leaf
pub fn hash_leaf(params: &TreeParams, data: &[u8]) -> Result<BlockHash, BuilderError> {
    Ok(BlockHash::create(params.hash_function, params.digest_size, data)?)
}

fn store_leaf<S: Store + ?Sized>(
    params: &TreeParams,
    data: &[u8],
    store: &S,
) -> Result<BlockHash, BuilderError> {
    let hash = hash_leaf(params, data)?;
    trace!(size = data.len(), "leaf {}", hash);
    store.put(BlockKind::Leaf, &hash, data.to_vec())?;
    Ok(hash)
}

/// Concatenate digests into branch blocks of at most `capacity` children
pub fn branch_blocks(digests: &[Vec<u8>], capacity: usize) -> impl Iterator<Item = Vec<u8>> + '_ {
    digests.chunks(capacity.max(1)).map(|children| children.concat())
}

/// Build one level of branches above `digests`, returning their digests
pub fn build_level<S: Store + ?Sized>(
    params: &TreeParams,
    digests: &[Vec<u8>],
    store: &S,
) -> Result<Vec<Vec<u8>>, BuilderError> {
    let capacity = params.branch_capacity()?;
    let mut parents = Vec::with_capacity(digests.len().div_ceil(capacity));
    for block in branch_blocks(digests, capacity) {
        let hash = BlockHash::create(params.hash_function, params.digest_size, &block)?;
        trace!(children = block.len() / params.digest_size, "branch {}", hash);
        store.put(BlockKind::Branch, &hash, block)?;
        parents.push(hash.digest);
    }
    Ok(parents)
}

/// Build branch levels until a single root digest remains
pub fn build_root<S: Store + ?Sized>(
    params: &TreeParams,
    mut digests: Vec<Vec<u8>>,
    store: &S,
) -> Result<Vec<u8>, BuilderError> {
    while digests.len() > 1 {
        digests = build_level(params, &digests, store)?;
    }
    digests.pop().ok_or(BuilderError::NoLeaves)
}

/// StreamBuilder - supports incremental appends
pub struct StreamBuilder<S: Store + ?Sized> {
    store: Arc<S>,
    params: TreeParams,

    // Current partial leaf
    buffer: Vec<u8>,

    // Digests of completed leaves
    leaves: Vec<Vec<u8>>,
    total_size: u64,
}

impl<S: Store + ?Sized> StreamBuilder<S> {
    pub fn new(config: BuilderConfig<S>) -> Result<Self, BuilderError> {
        config.params.validate(&config.limits)?;
        Ok(Self {
            store: config.store,
            params: config.params,
            buffer: Vec::with_capacity(config.params.block_size),
            leaves: Vec::new(),
            total_size: 0,
        })
    }

    /// Append data to the stream
    pub fn append(&mut self, data: &[u8]) -> Result<(), BuilderError> {
        let block_size = self.params.block_size;
        let mut offset = 0;

        while offset < data.len() {
            // A full buffer is only flushed once more data arrives, so the
            // capacity check sees the second leaf before it is stored
            if self.buffer.len() == block_size {
                self.flush_leaf()?;
            }
            let space = block_size - self.buffer.len();
            let to_write = space.min(data.len() - offset);
            self.buffer.extend_from_slice(&data[offset..offset + to_write]);
            offset += to_write;
        }

        self.total_size += data.len() as u64;
        Ok(())
    }

    fn flush_leaf(&mut self) -> Result<(), BuilderError> {
        // Only called once content exceeds one block
        self.params.branch_capacity()?;
        let leaf = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.params.block_size));
        let hash = store_leaf(&self.params, &leaf, &*self.store)?;
        self.leaves.push(hash.digest);
        Ok(())
    }

    /// Finalize the stream and return the tree hash
    pub fn finalize(mut self) -> Result<PutResult, BuilderError> {
        // Flush the last leaf; an empty stream still gets one empty leaf
        if !self.buffer.is_empty() || self.leaves.is_empty() {
            let leaf = std::mem::take(&mut self.buffer);
            if !self.leaves.is_empty() {
                self.params.branch_capacity()?;
            }
            let hash = store_leaf(&self.params, &leaf, &*self.store)?;
            self.leaves.push(hash.digest);
        }

        let leaves = self.leaves.len();
        let root = build_root(&self.params, self.leaves, &*self.store)?;
        let tree_hash = TreeHash::new(
            self.params.function_code(),
            self.params.block_size as u64,
            root,
        );
        debug!(size = self.total_size, leaves, "finalized stream {}", tree_hash);
        Ok(PutResult {
            tree_hash,
            size: self.total_size,
        })
    }

    /// Get stats
    pub fn stats(&self) -> StreamStats {
        StreamStats {
            leaves: self.leaves.len(),
            buffered: self.buffer.len(),
            total_size: self.total_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamStats {
    pub leaves: usize,
    pub buffered: usize,
    pub total_size: u64,
}

/// Builder error type
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Invalid configuration: {0}")]
    Params(#[from] ParamsError),
    #[error("Hash error: {0}")]
    Hash(#[from] HashError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("no leaves to build a tree from")]
    NoLeaves,
}
