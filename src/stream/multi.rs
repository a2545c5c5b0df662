// ABOUTME: MultiBlockStream reads a buffer's block list as one byte stream
// ABOUTME: Supports seeking to segmented (block, offset) addresses

use std::sync::Arc;

use crate::buffer::{AdvancedOffset, Block};

use super::source::ByteSource;

/// Sequential reader over an ordered list of shared blocks.
///
/// Holding the `Arc`s keeps the bytes alive even if the store drops the
/// buffer while it is being executed.
pub struct MultiBlockStream {
    blocks: Vec<Arc<Block>>,
    index: usize,
    offset: usize,
}

impl MultiBlockStream {
    /// Create a stream positioned at the first byte.
    pub fn new(blocks: Vec<Arc<Block>>) -> Self {
        Self {
            blocks,
            index: 0,
            offset: 0,
        }
    }

    /// Reposition to a segmented address. A block index of `u32::MAX` seeks
    /// past the end, terminating further reads.
    pub fn seek(&mut self, offset: AdvancedOffset) {
        self.index = usize::try_from(offset.block).unwrap_or(usize::MAX);
        self.offset = offset.offset as usize;
    }

    fn normalize(&mut self) {
        while self.index < self.blocks.len() && self.offset >= self.blocks[self.index].size() {
            self.offset -= self.blocks[self.index].size();
            self.index += 1;
        }
    }
}

impl ByteSource for MultiBlockStream {
    fn read_byte(&mut self) -> Option<u8> {
        self.normalize();
        let block = self.blocks.get(self.index)?;
        let value = block.get(self.offset)?;
        self.offset += 1;
        Some(value)
    }

    fn available(&self) -> usize {
        if self.index >= self.blocks.len() {
            return 0;
        }
        let mut remaining = 0usize;
        let mut offset = self.offset;
        for block in &self.blocks[self.index..] {
            remaining += block.size().saturating_sub(offset);
            offset = offset.saturating_sub(block.size());
        }
        remaining
    }
}
