//! Tree shape derived from (content size, block size, digest size)
//!
//! Nothing about a tree's layout is stored. Builder and reader both derive
//! it from these three numbers, so they always agree on which block is a
//! leaf, how many children a branch holds and how long every block is.
//!
//! Levels count from the root (level 0) down to the leaves
//! (level `height - 1`). Positions count left to right within a level.

use crate::params::{branch_capacity, ParamsError};
use crate::types::BlockKind;

/// Layout of one tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeShape {
    content_size: u64,
    block_size: usize,
    digest_size: usize,
    /// 0 for single-leaf trees, which never need a branch
    capacity: usize,
    /// Blocks per level, root first
    widths: Vec<u64>,
}

impl TreeShape {
    pub fn new(content_size: u64, block_size: usize, digest_size: usize) -> Result<Self, ParamsError> {
        if block_size == 0 {
            return Err(ParamsError::ZeroBlockSize);
        }
        if digest_size == 0 {
            return Err(ParamsError::InvalidDigestLength {
                size: 0,
                min: 1,
                max: usize::MAX,
            });
        }
        let leaf_count = leaf_count(content_size, block_size);
        if leaf_count == 1 {
            return Ok(Self {
                content_size,
                block_size,
                digest_size,
                capacity: 0,
                widths: vec![1],
            });
        }

        let capacity = branch_capacity(block_size, digest_size)?;
        let mut widths = vec![leaf_count];
        let mut width = leaf_count;
        while width > 1 {
            width = width.div_ceil(capacity as u64);
            widths.push(width);
        }
        widths.reverse();

        Ok(Self {
            content_size,
            block_size,
            digest_size,
            capacity,
            widths,
        })
    }

    pub fn content_size(&self) -> u64 {
        self.content_size
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn digest_size(&self) -> usize {
        self.digest_size
    }

    /// Digests per branch; `None` when the tree is a single leaf
    pub fn branch_capacity(&self) -> Option<usize> {
        (self.capacity > 0).then_some(self.capacity)
    }

    /// Number of levels, leaves included
    pub fn height(&self) -> usize {
        self.widths.len()
    }

    pub fn leaf_level(&self) -> usize {
        self.widths.len() - 1
    }

    /// Blocks at `level` (0 if out of range)
    pub fn width(&self, level: usize) -> u64 {
        self.widths.get(level).copied().unwrap_or(0)
    }

    pub fn leaf_count(&self) -> u64 {
        self.width(self.leaf_level())
    }

    pub fn branch_count(&self) -> u64 {
        self.widths[..self.leaf_level()].iter().sum()
    }

    pub fn block_count(&self) -> u64 {
        self.widths.iter().sum()
    }

    pub fn kind_at(&self, level: usize) -> BlockKind {
        if level < self.leaf_level() {
            BlockKind::Branch
        } else {
            BlockKind::Leaf
        }
    }

    pub fn root_kind(&self) -> BlockKind {
        self.kind_at(0)
    }

    /// Children held by the branch at (level, position)
    pub fn children_in_branch(&self, level: usize, position: u64) -> usize {
        if level >= self.leaf_level() {
            return 0;
        }
        let below = self.width(level + 1);
        let first = position.saturating_mul(self.capacity as u64);
        below.saturating_sub(first).min(self.capacity as u64) as usize
    }

    /// Exact byte length of the block at (level, position)
    pub fn block_size_at(&self, level: usize, position: u64) -> u64 {
        match self.kind_at(level) {
            BlockKind::Branch => (self.children_in_branch(level, position) * self.digest_size) as u64,
            BlockKind::Leaf => {
                let start = position.saturating_mul(self.block_size as u64);
                self.content_size
                    .saturating_sub(start)
                    .min(self.block_size as u64)
            }
        }
    }

    pub fn root_size(&self) -> u64 {
        self.block_size_at(0, 0)
    }

    /// Leaves covered by one full node at `level`
    pub fn leaves_per_node(&self, level: usize) -> u64 {
        let depth = self.leaf_level().saturating_sub(level) as u32;
        (self.capacity as u64).saturating_pow(depth).max(1)
    }

    /// Content byte range `[start, end)` under the node at (level, position)
    pub fn byte_span(&self, level: usize, position: u64) -> (u64, u64) {
        let node_bytes = self.leaves_per_node(level).saturating_mul(self.block_size as u64);
        let start = position.saturating_mul(node_bytes).min(self.content_size);
        let end = start.saturating_add(node_bytes).min(self.content_size);
        (start, end)
    }

    /// Every block as (level, position, size), leaves first, then each
    /// branch level bottom-up; the order blocks are produced in
    pub fn blocks(&self) -> impl Iterator<Item = (usize, u64, u64)> + '_ {
        (0..self.height()).rev().flat_map(move |level| {
            (0..self.width(level)).map(move |position| {
                (level, position, self.block_size_at(level, position))
            })
        })
    }
}

/// Leaves needed for `content_size` bytes; empty content still takes one
pub fn leaf_count(content_size: u64, block_size: usize) -> u64 {
    content_size.div_ceil(block_size.max(1) as u64).max(1)
}
