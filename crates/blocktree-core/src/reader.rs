//! Tree reader - rebuilds content from a tree hash and a store
//!
//! Reading walks the tree depth first with an explicit stack, so memory is
//! bounded by `height * branch_capacity` digests no matter how large the
//! content is. Byte ranges prune every subtree that lies outside the
//! window. Branches on the path to the window are still fetched in order;
//! a hash tree has no shortcut to a block in the middle.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::codec::{split_branch, CodecError};
use crate::geometry::TreeShape;
use crate::hash::{HashError, HashFunction};
use crate::io::BlockTreeIO;
use crate::params::{ParamsError, TreeParams};
use crate::store::{Store, StoreError};
use crate::types::{BlockHash, BlockKind, TreeHash};

/// Reads block trees from a store
pub struct TreeReader<S: Store + ?Sized> {
    store: Arc<S>,
    verify: bool,
}

impl<S: Store + ?Sized> Clone for TreeReader<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            verify: self.verify,
        }
    }
}

impl<S: Store + ?Sized> TreeReader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            verify: true,
        }
    }

    /// Check each fetched block against its digest (default: on)
    ///
    /// Block lengths are always checked.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// All leaves in content order
    pub fn leaves(&self, tree_hash: &TreeHash, content_size: u64) -> Result<TreeBlocks<S>, ReaderError> {
        self.range(tree_hash, content_size, 0, None)
    }

    /// Chunks covering exactly `offset..offset + limit`
    ///
    /// `None` reads to the end. The window is clipped to the content, so an
    /// offset past the end yields nothing.
    pub fn range(
        &self,
        tree_hash: &TreeHash,
        content_size: u64,
        offset: u64,
        limit: Option<u64>,
    ) -> Result<TreeBlocks<S>, ReaderError> {
        let params = TreeParams::from_tree_hash(tree_hash)?;
        let shape = TreeShape::new(content_size, params.block_size, params.digest_size)?;

        let start = offset.min(content_size);
        let end = limit
            .map(|l| start.saturating_add(l))
            .unwrap_or(content_size)
            .min(content_size);

        let mut stack = Vec::new();
        if start < end {
            stack.push(PendingNode {
                level: 0,
                position: 0,
                digest: tree_hash.root_digest.clone(),
            });
        }
        debug!(
            size = content_size,
            height = shape.height(),
            start,
            end,
            "reading tree {}",
            tree_hash
        );

        Ok(TreeBlocks {
            store: self.store.clone(),
            function: params.hash_function,
            function_code: tree_hash.function_code,
            shape,
            verify: self.verify,
            start,
            end,
            stack,
        })
    }

    /// Read all content into memory
    pub fn read_all(&self, tree_hash: &TreeHash, content_size: u64) -> Result<Vec<u8>, ReaderError> {
        self.read_range(tree_hash, content_size, 0, None)
    }

    /// Read a byte range into memory
    pub fn read_range(
        &self,
        tree_hash: &TreeHash,
        content_size: u64,
        offset: u64,
        limit: Option<u64>,
    ) -> Result<Vec<u8>, ReaderError> {
        let mut out = Vec::new();
        for chunk in self.range(tree_hash, content_size, offset, limit)? {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    /// Open a seekable cursor over the content
    pub fn open(&self, tree_hash: &TreeHash, content_size: u64) -> Result<BlockTreeIO<S>, ReaderError> {
        BlockTreeIO::new(self.clone(), tree_hash.clone(), content_size)
    }

    /// Visit every block; report the ones that are missing or corrupt
    ///
    /// Subtrees under a missing or corrupt branch cannot be visited.
    /// Store errors abort the walk.
    pub fn verify_tree(&self, tree_hash: &TreeHash, content_size: u64) -> Result<VerifyResult, ReaderError> {
        let params = TreeParams::from_tree_hash(tree_hash)?;
        let shape = TreeShape::new(content_size, params.block_size, params.digest_size)?;
        let mut missing = Vec::new();
        let mut corrupt = Vec::new();
        let mut checked = 0u64;

        let mut stack = vec![(0usize, 0u64, tree_hash.root_digest.clone())];
        while let Some((level, position, digest)) = stack.pop() {
            let kind = shape.kind_at(level);
            let hash = BlockHash::new(
                tree_hash.function_code,
                shape.block_size_at(level, position),
                digest,
            );
            let data = match self.store.get(kind, &hash)? {
                Some(data) => data,
                None => {
                    missing.push(hash);
                    continue;
                }
            };
            checked += 1;
            if !hash.matches(&data)? {
                corrupt.push(hash);
                continue;
            }
            if kind == BlockKind::Branch {
                let first_child = position * shape.branch_capacity().unwrap_or(0) as u64;
                for (i, child) in split_branch(params.digest_size, &data)?.enumerate().rev() {
                    stack.push((level + 1, first_child + i as u64, child.to_vec()));
                }
            }
        }

        Ok(VerifyResult {
            valid: missing.is_empty() && corrupt.is_empty(),
            checked,
            missing,
            corrupt,
        })
    }
}

struct PendingNode {
    level: usize,
    position: u64,
    digest: Vec<u8>,
}

/// Lazy sequence of content chunks, one per leaf, in content order
///
/// The first and last chunks are trimmed to the requested window. After an
/// error the iterator yields nothing more.
pub struct TreeBlocks<S: Store + ?Sized> {
    store: Arc<S>,
    function: HashFunction,
    function_code: u64,
    shape: TreeShape,
    verify: bool,
    start: u64,
    end: u64,
    stack: Vec<PendingNode>,
}

impl<S: Store + ?Sized> TreeBlocks<S> {
    pub fn shape(&self) -> &TreeShape {
        &self.shape
    }

    fn fetch(&self, kind: BlockKind, hash: &BlockHash) -> Result<Vec<u8>, ReaderError> {
        let data = self
            .store
            .get(kind, hash)?
            .ok_or_else(|| ReaderError::MissingBlock(hash.to_string()))?;
        let digest_size = self.shape.digest_size();
        if kind == BlockKind::Branch && data.len() % digest_size != 0 {
            return Err(CodecError::BranchLength {
                len: data.len(),
                digest_size,
            }
            .into());
        }
        if data.len() as u64 != hash.block_size {
            return Err(ReaderError::CorruptBlock(hash.to_string()));
        }
        if self.verify && self.function.digest(&data, digest_size)? != hash.digest {
            return Err(ReaderError::CorruptBlock(hash.to_string()));
        }
        trace!(%kind, size = data.len(), "fetched {}", hash);
        Ok(data)
    }

    fn advance(&mut self) -> Result<Option<Vec<u8>>, ReaderError> {
        while let Some(node) = self.stack.pop() {
            let (span_start, span_end) = self.shape.byte_span(node.level, node.position);
            if span_end <= self.start || span_start >= self.end {
                continue;
            }

            let kind = self.shape.kind_at(node.level);
            let hash = BlockHash::new(
                self.function_code,
                self.shape.block_size_at(node.level, node.position),
                node.digest,
            );
            let data = self.fetch(kind, &hash)?;

            if kind == BlockKind::Branch {
                let capacity = self.shape.branch_capacity().unwrap_or(0) as u64;
                let first_child = node.position * capacity;
                for (i, child) in split_branch(self.shape.digest_size(), &data)?.enumerate().rev() {
                    self.stack.push(PendingNode {
                        level: node.level + 1,
                        position: first_child + i as u64,
                        digest: child.to_vec(),
                    });
                }
                continue;
            }

            if span_end >= self.end {
                self.stack.clear();
            }
            let lo = (self.start.saturating_sub(span_start)) as usize;
            let hi = (self.end.min(span_end) - span_start) as usize;
            if lo == 0 && hi == data.len() {
                return Ok(Some(data));
            }
            return Ok(Some(data[lo..hi].to_vec()));
        }
        Ok(None)
    }
}

impl<S: Store + ?Sized> Iterator for TreeBlocks<S> {
    type Item = Result<Vec<u8>, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.stack.clear();
                Some(Err(e))
            }
        }
    }
}

impl<S: Store + ?Sized> std::iter::FusedIterator for TreeBlocks<S> {}

/// Result of tree verification
#[derive(Debug, Clone)]
pub struct VerifyResult {
    pub valid: bool,
    /// Blocks fetched
    pub checked: u64,
    pub missing: Vec<BlockHash>,
    pub corrupt: Vec<BlockHash>,
}

/// Reader error type
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("Invalid tree parameters: {0}")]
    Params(#[from] ParamsError),
    #[error("Hash error: {0}")]
    Hash(#[from] HashError),
    #[error("Missing block: {0}")]
    MissingBlock(String),
    #[error("Corrupt block: {0}")]
    CorruptBlock(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuilderConfig, PutResult, TreeBuilder};
    use crate::store::MemoryStore;

    fn make_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn build(store: &Arc<MemoryStore>, data: &[u8], block_size: usize) -> PutResult {
        TreeBuilder::new(BuilderConfig::new(store.clone()).with_block_size(block_size))
            .put(data)
            .unwrap()
    }

    /// Counts fetches per kind
    struct CountingStore {
        inner: MemoryStore,
        leaves: std::sync::atomic::AtomicUsize,
        branches: std::sync::atomic::AtomicUsize,
    }

    impl Store for CountingStore {
        fn put(&self, kind: BlockKind, hash: &BlockHash, data: Vec<u8>) -> Result<bool, StoreError> {
            self.inner.put(kind, hash, data)
        }

        fn get(&self, kind: BlockKind, hash: &BlockHash) -> Result<Option<Vec<u8>>, StoreError> {
            let counter = match kind {
                BlockKind::Leaf => &self.leaves,
                BlockKind::Branch => &self.branches,
            };
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.get(kind, hash)
        }

        fn delete(&self, hash: &BlockHash) -> Result<bool, StoreError> {
            self.inner.delete(hash)
        }
    }

    #[test]
    fn test_read_all() {
        let store = make_store();
        for len in [0usize, 1, 64, 65, 167, 647, 5000] {
            let data = pattern(len);
            let result = build(&store, &data, 64);
            let reader = TreeReader::new(store.clone());
            assert_eq!(reader.read_all(&result.tree_hash, result.size).unwrap(), data, "length {}", len);
        }
    }

    #[test]
    fn test_leaves_in_order() {
        let store = make_store();
        let data = pattern(167);
        let result = build(&store, &data, 64);
        let reader = TreeReader::new(store);

        let chunks: Vec<Vec<u8>> = reader
            .leaves(&result.tree_hash, result.size)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], data[..64]);
        assert_eq!(chunks[2], data[128..]);
    }

    #[test]
    fn test_empty_content_fetches_nothing() {
        let store = Arc::new(CountingStore {
            inner: MemoryStore::new(),
            leaves: Default::default(),
            branches: Default::default(),
        });
        let result = TreeBuilder::new(BuilderConfig::new(store.clone())).put(b"").unwrap();
        let reader = TreeReader::new(store.clone());
        assert_eq!(reader.leaves(&result.tree_hash, 0).unwrap().count(), 0);
        assert_eq!(store.leaves.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_range() {
        let store = make_store();
        let data = pattern(1000);
        let result = build(&store, &data, 64);
        let reader = TreeReader::new(store);

        let cases: &[(u64, Option<u64>)] = &[
            (0, None),
            (0, Some(64)),
            (63, Some(2)),
            (64, Some(64)),
            (100, Some(500)),
            (999, None),
            (999, Some(10)),
            (1000, None),
            (5000, Some(3)),
            (10, Some(0)),
        ];
        for &(offset, limit) in cases {
            let got = reader.read_range(&result.tree_hash, 1000, offset, limit).unwrap();
            let start = (offset as usize).min(1000);
            let end = limit.map(|l| start + l as usize).unwrap_or(1000).min(1000);
            assert_eq!(got, data[start..end], "offset {} limit {:?}", offset, limit);
        }
    }

    #[test]
    fn test_range_skips_outside_subtrees() {
        let store = Arc::new(CountingStore {
            inner: MemoryStore::new(),
            leaves: Default::default(),
            branches: Default::default(),
        });
        // 64-byte blocks with 16-byte digests: 16 leaves under 4 branches
        let config = BuilderConfig::new(store.clone())
            .with_hash_function(HashFunction::Sha256)
            .with_digest_size(16)
            .with_block_size(64);
        let data: Vec<u8> = (0..1000).map(|i| (i % 256) as u8).collect();
        let result = TreeBuilder::new(config).put(&data).unwrap();

        let reader = TreeReader::new(store.clone());
        let got = reader.read_range(&result.tree_hash, 1000, 300, Some(100)).unwrap();
        assert_eq!(got, data[300..400]);

        // Leaves 4..=6 live under the second branch only
        assert_eq!(store.leaves.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert_eq!(store.branches.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_block() {
        let store = make_store();
        let data = pattern(167);
        let result = build(&store, &data, 64);
        let leaf = BlockHash::create(HashFunction::Sha3_256, 32, &data[64..128]).unwrap();
        store.delete(&leaf).unwrap();

        let reader = TreeReader::new(store);
        let mut blocks = reader.leaves(&result.tree_hash, result.size).unwrap();
        assert_eq!(blocks.next().unwrap().unwrap(), data[..64]);
        assert!(matches!(blocks.next(), Some(Err(ReaderError::MissingBlock(_)))));
        assert!(blocks.next().is_none());
    }

    #[test]
    fn test_corrupt_block_detected() {
        let store = make_store();
        let data = pattern(167);
        let result = build(&store, &data, 64);
        let leaf = BlockHash::create(HashFunction::Sha3_256, 32, &data[..64]).unwrap();
        let mut tampered = data[..64].to_vec();
        tampered[0] ^= 1;
        assert!(store.replace(&leaf, tampered.clone()));

        let reader = TreeReader::new(store.clone());
        assert!(matches!(
            reader.read_all(&result.tree_hash, result.size),
            Err(ReaderError::CorruptBlock(_))
        ));

        let unchecked = TreeReader::new(store).with_verification(false);
        let got = unchecked.read_all(&result.tree_hash, result.size).unwrap();
        assert_eq!(got[..64], tampered[..]);
    }

    #[test]
    fn test_branch_length_not_multiple_of_digest() {
        let store = make_store();
        let data = pattern(167);
        let result = build(&store, &data, 64);
        let root = result.tree_hash.root_block(64);
        assert!(store.replace(&root, vec![0u8; 63]));

        let reader = TreeReader::new(store);
        assert!(matches!(
            reader.read_all(&result.tree_hash, result.size),
            Err(ReaderError::Codec(CodecError::BranchLength { len: 63, digest_size: 32 }))
        ));
    }

    #[test]
    fn test_wrong_content_size() {
        let store = make_store();
        let result = build(&store, &pattern(167), 64);
        let reader = TreeReader::new(store);
        assert!(reader.read_all(&result.tree_hash, 166).is_err());
    }

    #[test]
    fn test_unknown_function_code() {
        let reader = TreeReader::new(make_store());
        let th = TreeHash::new(7, 64, vec![0; 32]);
        assert!(matches!(
            reader.leaves(&th, 10),
            Err(ReaderError::Params(ParamsError::Hash(HashError::UnsupportedHashFunction(7))))
        ));
    }

    #[test]
    fn test_huge_block_size_reports_missing_root() {
        let reader = TreeReader::new(make_store());
        let th = TreeHash::new(56, 1 << 40, vec![0; 32]);
        assert!(matches!(
            reader.read_all(&th, 1 << 41),
            Err(ReaderError::MissingBlock(_))
        ));
        let mut io = reader.open(&th, 1 << 41).unwrap();
        assert!(io.read_up_to(usize::MAX).is_err());
    }

    #[test]
    fn test_verify_tree() {
        let store = make_store();
        let data = pattern(647);
        let result = build(&store, &data, 64);
        let reader = TreeReader::new(store.clone());

        let report = reader.verify_tree(&result.tree_hash, result.size).unwrap();
        assert!(report.valid);
        assert_eq!(report.checked, store.size() as u64);

        let leaf = BlockHash::create(HashFunction::Sha3_256, 32, &data[640..]).unwrap();
        store.delete(&leaf).unwrap();
        let report = reader.verify_tree(&result.tree_hash, result.size).unwrap();
        assert!(!report.valid);
        assert_eq!(report.missing, vec![leaf]);
    }
}
