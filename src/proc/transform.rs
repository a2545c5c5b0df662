// ABOUTME: Structural transforms over buffers
// ABOUTME: Copy, consolidate, split, spread and reverse, all block-list based

use std::sync::Arc;

use crate::buffer::{offset, Block, RESERVED_ID};
use crate::error::Error;
use crate::Result;

use super::commands::*;
use super::StreamProcessor;

/// Merge a block list into one freshly allocated block. A single-block list
/// is copied as-is.
fn consolidated(blocks: &[Arc<Block>]) -> Arc<Block> {
    let mut data = Vec::with_capacity(offset::total_size(blocks));
    for block in blocks {
        data.extend_from_slice(&block.snapshot());
    }
    Arc::new(Block::from_vec(data))
}

/// Cut a byte payload into blocks of `length`, the last possibly short.
fn split_payload(data: &[u8], length: usize) -> Vec<Arc<Block>> {
    if length == 0 {
        return Vec::new();
    }
    data.chunks(length)
        .map(|chunk| Arc::new(Block::from_vec(chunk.to_vec())))
        .collect()
}

/// Reverse the order of `value_size`-wide units within `data`.
fn reverse_values(data: &mut [u8], value_size: usize) {
    if value_size <= 1 {
        data.reverse();
        return;
    }
    let units = data.len() / value_size;
    for i in 0..units / 2 {
        let j = units - 1 - i;
        for k in 0..value_size {
            data.swap(i * value_size + k, j * value_size + k);
        }
    }
}

/// Walks the target ids a split or spread distributes into: an explicit list
/// is cycled round-robin, an auto-numbered range counts up and stops before
/// the reserved id.
struct TargetWalker {
    targets: Vec<u16>,
    auto_number: bool,
    index: usize,
}

impl TargetWalker {
    fn new(targets: Vec<u16>, auto_number: bool) -> Self {
        Self {
            targets,
            auto_number,
            index: 0,
        }
    }

    fn next(&mut self) -> Option<u16> {
        if self.auto_number {
            let id = self.targets[0] as u32 + self.index as u32;
            self.index += 1;
            if id >= RESERVED_ID as u32 {
                log::debug!("split: target id range ran into the reserved id, stopping");
                return None;
            }
            Some(id as u16)
        } else {
            let id = self.targets[self.index % self.targets.len()];
            self.index += 1;
            Some(id)
        }
    }
}

impl StreamProcessor {
    /// Deep-copy blocks from `sources` into `target`, replacing it. The
    /// target may appear in its own source list; copies are taken before the
    /// replacement.
    pub(crate) fn buffer_copy(&mut self, target: u16, sources: &[u16]) {
        if target == RESERVED_ID {
            log::debug!("buffer_copy: ignoring reserved target");
            return;
        }
        if sources.is_empty() {
            log::debug!("buffer_copy: no source buffer ids");
            return;
        }
        let mut store = self.ctx.store.lock();
        let mut copies = Vec::new();
        for &source in sources {
            match store.blocks(source) {
                Some(blocks) => {
                    for block in blocks {
                        copies.push(Arc::new(Block::from_vec(block.snapshot())));
                    }
                }
                None => log::debug!("buffer_copy: buffer {source} not found"),
            }
        }
        log::debug!("buffer_copy: copied {} blocks into buffer {target}", copies.len());
        store.replace(target, copies);
    }

    /// Share block references from `sources` into `target`, skipping the
    /// target itself to avoid a self-reference loop.
    pub(crate) fn buffer_copy_ref(&mut self, target: u16, sources: &[u16]) {
        if target == RESERVED_ID {
            log::debug!("buffer_copy_ref: ignoring reserved target");
            return;
        }
        if sources.is_empty() {
            log::debug!("buffer_copy_ref: no source buffer ids");
            return;
        }
        let mut store = self.ctx.store.lock();
        let mut refs = Vec::new();
        for &source in sources {
            if source == target {
                log::debug!("buffer_copy_ref: skipping target {source} in its own sources");
                continue;
            }
            match store.blocks(source) {
                Some(blocks) => refs.extend(blocks.iter().cloned()),
                None => log::debug!("buffer_copy_ref: buffer {source} not found"),
            }
        }
        store.replace(target, refs);
    }

    /// Copy `sources` into `target` as one consolidated block, reusing the
    /// existing allocation when the total size already matches.
    pub(crate) fn buffer_copy_consolidate(&mut self, target: u16, sources: &[u16]) {
        if target == RESERVED_ID {
            log::debug!("buffer_copy_consolidate: ignoring reserved target");
            return;
        }
        if sources.is_empty() {
            log::debug!("buffer_copy_consolidate: no source buffer ids");
            return;
        }
        let mut store = self.ctx.store.lock();
        let length: usize = sources
            .iter()
            .filter(|&&s| s != target)
            .map(|&s| store.total_size(s))
            .sum();

        let reusable = store
            .blocks(target)
            .filter(|blocks| blocks.len() == 1 && blocks[0].size() == length)
            .map(|blocks| blocks[0].clone());
        let destination = match reusable {
            Some(block) => block,
            None => {
                let block = Arc::new(Block::zeroed(length));
                store.replace(target, vec![block.clone()]);
                block
            }
        };

        let mut data = Vec::with_capacity(length);
        for &source in sources {
            if source == target {
                log::debug!("buffer_copy_consolidate: skipping target {source}");
                continue;
            }
            for block in store.iter(source) {
                data.extend_from_slice(&block.snapshot());
            }
        }
        destination.fill_from(&data);
        log::debug!("buffer_copy_consolidate: copied {length} bytes into buffer {target}");
    }

    /// Merge all of `id`'s blocks into one.
    pub(crate) fn buffer_consolidate(&mut self, id: u16) {
        let mut store = self.ctx.store.lock();
        let Some(blocks) = store.blocks(id) else {
            log::debug!("buffer_consolidate: buffer {id} not found");
            return;
        };
        if blocks.len() <= 1 {
            return;
        }
        let merged = consolidated(blocks);
        store.replace(id, vec![merged]);
    }

    /// Split `source` into chunks of `length` bytes and distribute them over
    /// the targets. With `auto_number` the single listed target starts a
    /// consecutive id range.
    pub(crate) fn buffer_split_into(
        &mut self,
        source: u16,
        length: u16,
        targets: Vec<u16>,
        auto_number: bool,
    ) {
        if targets.is_empty() {
            log::debug!("buffer_split_into: no target buffer ids");
            return;
        }
        if length == 0 {
            log::debug!("buffer_split_into: zero split length");
            return;
        }
        let mut store = self.ctx.store.lock();
        let Some(blocks) = store.blocks(source) else {
            log::debug!("buffer_split_into: buffer {source} not found");
            return;
        };
        let payload = consolidated(blocks).snapshot();
        let chunks = split_payload(&payload, length as usize);

        if !auto_number {
            for &target in &targets {
                store.clear_blocks(target);
            }
        }
        let mut walker = TargetWalker::new(targets, auto_number);
        for chunk in chunks {
            let Some(target) = walker.next() else { break };
            if auto_number {
                store.clear_blocks(target);
            }
            store.append(target, chunk);
        }
    }

    /// Interleave-split `source` into `chunks` streams of `width` bytes,
    /// consolidate each stream and distribute them over the targets.
    pub(crate) fn buffer_split_by_into(
        &mut self,
        source: u16,
        width: u16,
        chunks: usize,
        targets: Vec<u16>,
        auto_number: bool,
    ) {
        if targets.is_empty() || chunks == 0 {
            log::debug!("buffer_split_by_into: no targets or zero chunk count");
            return;
        }
        if width == 0 {
            log::debug!("buffer_split_by_into: zero width");
            return;
        }
        let mut store = self.ctx.store.lock();
        let Some(blocks) = store.blocks(source) else {
            log::debug!("buffer_split_by_into: buffer {source} not found");
            return;
        };
        let payload = consolidated(blocks).snapshot();

        // Deal the width-sized pieces round-robin into the streams, then
        // flatten each stream back to one block.
        let mut streams: Vec<Vec<u8>> = vec![Vec::new(); chunks];
        for (i, piece) in payload.chunks(width as usize).enumerate() {
            streams[i % chunks].extend_from_slice(piece);
        }

        if !auto_number {
            for &target in &targets {
                store.clear_blocks(target);
            }
        }
        let mut walker = TargetWalker::new(targets, auto_number);
        for stream in streams {
            let Some(target) = walker.next() else { break };
            if auto_number {
                store.clear_blocks(target);
            }
            store.append(target, Arc::new(Block::from_vec(stream)));
        }
    }

    /// Distribute `source`'s existing blocks over the targets by reference,
    /// without consolidating.
    pub(crate) fn buffer_spread_into(&mut self, source: u16, targets: Vec<u16>, auto_number: bool) {
        if targets.is_empty() {
            log::debug!("buffer_spread_into: no target buffer ids");
            return;
        }
        let mut store = self.ctx.store.lock();
        let Some(blocks) = store.blocks_cloned(source) else {
            log::debug!("buffer_spread_into: buffer {source} not found");
            return;
        };
        if !auto_number {
            for &target in &targets {
                store.clear_blocks(target);
            }
        }
        let mut walker = TargetWalker::new(targets, auto_number);
        for block in blocks {
            let Some(target) = walker.next() else { break };
            if auto_number {
                store.clear_blocks(target);
            }
            store.append(target, block);
        }
    }

    /// Reverse the order of `id`'s blocks.
    pub(crate) fn buffer_reverse_blocks(&mut self, id: u16) {
        let mut store = self.ctx.store.lock();
        if let Some(mut blocks) = store.blocks_cloned(id) {
            blocks.reverse();
            store.replace(id, blocks);
            log::debug!("buffer_reverse_blocks: reversed blocks in buffer {id}");
        }
    }

    /// Reverse bytes within `id`'s blocks per the options byte: value size,
    /// optional chunking, optional block-order reversal. Any shape mismatch
    /// aborts before touching a byte.
    pub(crate) fn buffer_reverse(&mut self, id: u16, options: u8) -> Result<()> {
        let use_16bit = options & REVERSE_16BIT != 0;
        let use_32bit = options & REVERSE_32BIT != 0;
        let use_size = options & REVERSE_SIZE == REVERSE_SIZE;
        let use_chunks = options & REVERSE_CHUNKED != 0;
        let reverse_blocks = options & REVERSE_BLOCK != 0;
        if options & REVERSE_UNUSED != 0 {
            log::debug!("buffer_reverse: unused option bits set");
        }

        let mut value_size = 1usize;
        if use_size {
            value_size = self.read_word()? as usize;
        } else if use_32bit {
            value_size = 4;
        } else if use_16bit {
            value_size = 2;
        }
        let mut chunk_size = 0usize;
        if use_chunks {
            chunk_size = self.read_word()? as usize;
        }
        if value_size == 0 || (chunk_size != 0 && chunk_size % value_size != 0) {
            log::debug!("buffer_reverse: bad value/chunk size combination");
            return Ok(());
        }

        let mut store = self.ctx.store.lock();
        let Some(blocks) = store.blocks(id) else {
            return Err(Error::BufferNotFound(id));
        };
        for block in blocks {
            let size = block.size();
            if size % value_size != 0 || (chunk_size != 0 && size % chunk_size != 0) {
                log::debug!("buffer_reverse: buffer {id} block size {size} not divisible");
                return Err(Error::ShapeMismatch(format!(
                    "block of {size} bytes vs value {value_size} chunk {chunk_size}"
                )));
            }
        }

        for block in store.iter(id) {
            block.with_data_mut(|data| {
                if chunk_size == 0 {
                    reverse_values(data, value_size);
                } else {
                    for chunk in data.chunks_mut(chunk_size) {
                        reverse_values(chunk, value_size);
                    }
                }
            });
        }
        if reverse_blocks {
            if let Some(mut blocks) = store.blocks_cloned(id) {
                blocks.reverse();
                store.replace(id, blocks);
            }
        }
        log::debug!("buffer_reverse: reversed buffer {id}");
        Ok(())
    }
}
