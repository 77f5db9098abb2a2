//! Seekable cursor over a stored tree
//!
//! `BlockTreeIO` wraps a range read starting at the cursor and holds at most
//! one leaf. Absolute seeks, backward seeks and seeks from the end start a
//! fresh range read at the new offset. Short forward seeks re-read and
//! discard the bytes in between, keeping the current walk.

use std::io::{self, Read, Seek, SeekFrom};

use tracing::trace;

use crate::reader::{ReaderError, TreeBlocks, TreeReader};
use crate::store::Store;
use crate::types::TreeHash;

/// Largest read used when skipping forward
pub const SKIP_CHUNK_SIZE: usize = 256 * 1024;

/// Stream-like access to the content of one tree
pub struct BlockTreeIO<S: Store + ?Sized> {
    reader: TreeReader<S>,
    tree_hash: TreeHash,
    content_size: u64,
    position: u64,
    blocks: Option<TreeBlocks<S>>,
    buffer: Vec<u8>,
    consumed: usize,
}

impl<S: Store + ?Sized> BlockTreeIO<S> {
    pub fn new(reader: TreeReader<S>, tree_hash: TreeHash, content_size: u64) -> Result<Self, ReaderError> {
        // Fail early on an unusable tree hash
        reader.range(&tree_hash, content_size, 0, Some(0))?;
        Ok(Self {
            reader,
            tree_hash,
            content_size,
            position: 0,
            blocks: None,
            buffer: Vec::new(),
            consumed: 0,
        })
    }

    /// Current offset
    pub fn tell(&self) -> u64 {
        self.position
    }

    pub fn content_size(&self) -> u64 {
        self.content_size
    }

    pub fn tree_hash(&self) -> &TreeHash {
        &self.tree_hash
    }

    /// Read up to `n` bytes; fewer only at the end of the content
    pub fn read_up_to(&mut self, n: usize) -> Result<Vec<u8>, ReaderError> {
        let remaining = self.content_size.saturating_sub(self.position);
        let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
        let mut out = Vec::with_capacity(n.min(remaining).min(SKIP_CHUNK_SIZE));
        while out.len() < n {
            let taken = self.take_buffered(n - out.len(), |chunk| out.extend_from_slice(chunk))?;
            if taken == 0 {
                break;
            }
        }
        Ok(out)
    }

    /// Move to an absolute offset, clamped to the end of the content
    pub fn set_position(&mut self, target: u64) -> Result<u64, ReaderError> {
        let target = target.min(self.content_size);
        if target >= self.position {
            let buffered = (self.buffer.len() - self.consumed) as u64;
            if target - self.position <= buffered {
                self.consumed += (target - self.position) as usize;
                self.position = target;
                return Ok(target);
            }
        }
        self.reset(target);
        Ok(target)
    }

    /// Skip forward by re-reading at most `distance` bytes
    pub fn skip(&mut self, distance: u64) -> Result<u64, ReaderError> {
        let target = self.position.saturating_add(distance);
        if target >= self.content_size {
            self.reset(self.content_size);
            return Ok(self.position);
        }
        let mut left = distance;
        while left > 0 {
            let want = usize::try_from(left).unwrap_or(usize::MAX).min(SKIP_CHUNK_SIZE);
            let taken = self.take_buffered(want, |_| {})?;
            if taken == 0 {
                break;
            }
            left -= taken as u64;
        }
        trace!(position = self.position, "skipped {} bytes", distance - left);
        Ok(self.position)
    }

    fn reset(&mut self, position: u64) {
        trace!(from = self.position, to = position, "re-seek");
        self.position = position;
        self.blocks = None;
        self.buffer.clear();
        self.consumed = 0;
    }

    /// Hand up to `want` buffered bytes to `sink`, fetching the next leaf if
    /// the buffer is empty. Returns the number of bytes handed over.
    fn take_buffered(&mut self, want: usize, mut sink: impl FnMut(&[u8])) -> Result<usize, ReaderError> {
        if self.consumed == self.buffer.len() && !self.fill()? {
            return Ok(0);
        }
        let take = want.min(self.buffer.len() - self.consumed);
        sink(&self.buffer[self.consumed..self.consumed + take]);
        self.consumed += take;
        self.position += take as u64;
        Ok(take)
    }

    fn fill(&mut self) -> Result<bool, ReaderError> {
        if self.position >= self.content_size {
            return Ok(false);
        }
        if self.blocks.is_none() {
            self.blocks = Some(
                self.reader
                    .range(&self.tree_hash, self.content_size, self.position, None)?,
            );
        }
        let next = match self.blocks.as_mut() {
            Some(blocks) => blocks.next(),
            None => None,
        };
        match next {
            Some(Ok(chunk)) => {
                self.buffer = chunk;
                self.consumed = 0;
                Ok(!self.buffer.is_empty())
            }
            Some(Err(e)) => {
                self.blocks = None;
                Err(e)
            }
            None => Ok(false),
        }
    }
}

fn invalid_seek(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg.to_string())
}

fn to_io_error(e: ReaderError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

impl<S: Store + ?Sized> Read for BlockTreeIO<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            let taken = self
                .take_buffered(buf.len() - written, |chunk| {
                    buf[written..written + chunk.len()].copy_from_slice(chunk)
                })
                .map_err(to_io_error)?;
            if taken == 0 {
                break;
            }
            written += taken;
        }
        Ok(written)
    }
}

impl<S: Store + ?Sized> Seek for BlockTreeIO<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::Start(offset) => self.set_position(offset).map_err(to_io_error),
            SeekFrom::Current(delta) if delta >= 0 => {
                let distance = delta as u64;
                let buffered = (self.buffer.len() - self.consumed) as u64;
                if distance <= buffered {
                    self.set_position(self.position + distance).map_err(to_io_error)
                } else {
                    self.skip(distance).map_err(to_io_error)
                }
            }
            SeekFrom::Current(delta) => {
                let target = self
                    .position
                    .checked_sub(delta.unsigned_abs())
                    .ok_or_else(|| invalid_seek("seek before start of content"))?;
                self.set_position(target).map_err(to_io_error)
            }
            SeekFrom::End(delta) if delta > 0 => {
                Err(invalid_seek("cannot seek past the end of content"))
            }
            SeekFrom::End(delta) => {
                let target = self
                    .content_size
                    .checked_sub(delta.unsigned_abs())
                    .ok_or_else(|| invalid_seek("seek before start of content"))?;
                self.set_position(target).map_err(to_io_error)
            }
        }
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}
