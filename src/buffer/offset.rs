// ABOUTME: AdvancedOffset addresses a byte inside a segmented buffer
// ABOUTME: Offsets carry a block index so block-level operations stay O(1)

use std::sync::Arc;

use super::Block;

/// A `(block, offset)` address within a buffer's ordered block list.
///
/// The address is normalized lazily: an `offset` past the end of the indexed
/// block rolls over into the following blocks on the next access. An address
/// whose block index runs off the end of the list is invalid; `u32::MAX` as
/// the block index is used deliberately as a "past end" address to terminate
/// stream reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvancedOffset {
    /// Index into the buffer's block list
    pub block: u32,
    /// Byte offset within (or past) the indexed block
    pub offset: u32,
}

impl AdvancedOffset {
    /// Address of the first byte of the buffer.
    pub fn start() -> Self {
        Self::default()
    }

    /// An address past any possible block, terminating reads.
    pub fn past_end() -> Self {
        Self {
            block: u32::MAX,
            offset: 0,
        }
    }
}

fn normalize(blocks: &[Arc<Block>], offset: &mut AdvancedOffset) {
    while (offset.block as usize) < blocks.len()
        && offset.offset as usize >= blocks[offset.block as usize].size()
    {
        offset.offset -= blocks[offset.block as usize].size() as u32;
        offset.block += 1;
    }
}

/// Read the byte at `offset`, normalizing first.
///
/// With `iterate` the block offset advances by one after the read; the
/// advancement itself is not normalized, the next access takes care of it.
pub fn buffer_byte(blocks: &[Arc<Block>], offset: &mut AdvancedOffset, iterate: bool) -> Option<u8> {
    normalize(blocks, offset);
    let block = blocks.get(offset.block as usize)?;
    let value = block.get(offset.offset as usize)?;
    if iterate {
        offset.offset += 1;
    }
    Some(value)
}

/// Write the byte at `offset`, normalizing first. Returns false when the
/// address lies outside the buffer.
pub fn set_buffer_byte(
    blocks: &[Arc<Block>],
    value: u8,
    offset: &mut AdvancedOffset,
    iterate: bool,
) -> bool {
    normalize(blocks, offset);
    let Some(block) = blocks.get(offset.block as usize) else {
        return false;
    };
    if !block.set(offset.offset as usize, value) {
        return false;
    }
    if iterate {
        offset.offset += 1;
    }
    true
}

/// Total byte size of a block list.
pub fn total_size(blocks: &[Arc<Block>]) -> usize {
    blocks.iter().map(|b| b.size()).sum()
}
