//! BlockTree - content-addressed merkle trees over fixed-size blocks
//!
//! Content is cut into leaves of `block_size` bytes. Leaf digests are packed
//! into branch blocks of the same size, level by level, until a single root
//! remains. A tree is named by its tree hash:
//! `varint(function code) || varint(block size) || root digest`.
//!
//! # Core Concepts
//!
//! - **Blockhash**: names one stored block (function code, block length, digest)
//! - **Tree hash**: names a whole tree (function code, block size, root digest)
//! - **Store**: maps blockhashes to block bytes
//! - **CHRP**: short self-delimiting text tags (`a`, `b`, `1a`) naming
//!   hash functions and signature schemes
//!
//! The content size is not part of the tree hash; it has to be kept next to
//! it and supplied when reading.
//!
//! # Example
//!
//! ```rust
//! use blocktree_core::{BuilderConfig, MemoryStore, TreeBuilder, TreeReader};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let builder = TreeBuilder::new(BuilderConfig::new(store.clone()).with_block_size(64));
//!
//!     let result = builder.put(b"Hello, World!")?;
//!
//!     let reader = TreeReader::new(store);
//!     let data = reader.read_all(&result.tree_hash, result.size)?;
//!     assert_eq!(data, b"Hello, World!".to_vec());
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod chrp;
pub mod codec;
pub mod geometry;
pub mod hash;
pub mod io;
pub mod params;
pub mod reader;
pub mod signature;
pub mod store;
pub mod types;
pub mod varint;

// Building and reading
pub use builder::{
    build_level, build_root, hash_blocktree, hash_leaf, BuilderConfig, BuilderError, PutResult,
    StreamBuilder, StreamStats, TreeBuilder,
};
pub use io::BlockTreeIO;
pub use reader::{ReaderError, TreeBlocks, TreeReader, VerifyResult};

// Parameters and shape
pub use geometry::TreeShape;
pub use params::{
    DigestLimits, ParamsError, TreeParams, DEFAULT_BLOCK_SIZE, DEFAULT_DIGEST_SIZE,
    MAX_DIGEST_SIZE, MIN_DIGEST_SIZE,
};

// Low-level codec
pub use chrp::{read_chrp, split_chrp, split_chrp_str, ChrpError};
pub use codec::{
    create_blockhash, join_blockhash, join_treehash, lb32decode, lb32encode, split_blockhash,
    split_treehash, CodecError,
};
pub use hash::{digest, parse_hash_config, verify, HashError, HashFunction, Hasher};
pub use varint::{decode_varint, encode_varint, VarintError};

// Store
pub use store::{MemoryStore, NullStore, Store, StoreError};
pub use types::{from_hex, to_hex, BlockHash, BlockKind, TreeHash};

// Signatures
pub use signature::{
    format_address, parse_address, sign_bytes, verify_bytes, KdfParams, SignatureError,
    SignatureType,
};
