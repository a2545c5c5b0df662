// ABOUTME: BufferStore maps 16-bit buffer IDs to ordered lists of shared blocks
// ABOUTME: Clears fan out to registered collaborators (sample store, bitmap store)

use std::collections::HashMap;
use std::sync::Arc;

use crate::stream::ByteSource;

use super::{offset, Block, RESERVED_ID};

/// Collaborators notified when buffers are cleared.
///
/// The sample store registers here so that clearing a buffer also drops the
/// sample stored under the same id. A live sample keeps its block references
/// either way; the notification only removes the id-level registration.
pub trait ClearListener: Send + Sync {
    /// A single buffer id was cleared.
    fn buffer_cleared(&self, id: u16);
    /// The entire store was cleared.
    fn store_cleared(&self);
}

/// Content-addressable store of byte streams keyed by 16-bit IDs.
///
/// Each id holds an ordered list of shared blocks. A single block may appear
/// in several buffers at once (see the copy-by-reference command), so removal
/// from the store only drops a reference, never the bytes out from under
/// another holder.
#[derive(Default)]
pub struct BufferStore {
    buffers: HashMap<u16, Vec<Arc<Block>>>,
    listeners: Vec<Arc<dyn ClearListener>>,
}

impl BufferStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collaborator for clear notifications.
    pub fn register_listener(&mut self, listener: Arc<dyn ClearListener>) {
        self.listeners.push(listener);
    }

    /// Read `length` bytes from `source` and append them as one new block.
    ///
    /// Returns the number of bytes that could not be read. On a partial read
    /// the data read so far is discarded and nothing is stored. The reserved
    /// id accepts the bytes but drops them.
    pub fn write(&mut self, id: u16, length: usize, source: &mut dyn ByteSource) -> usize {
        let mut data = Vec::with_capacity(length);
        for remaining in (1..=length).rev() {
            match source.read_byte() {
                Some(byte) => data.push(byte),
                None => {
                    log::debug!("write: timed out for buffer {id} ({remaining} bytes remaining)");
                    return remaining;
                }
            }
        }
        if id == RESERVED_ID {
            log::debug!("write: ignoring reserved buffer id");
            return 0;
        }
        self.buffers
            .entry(id)
            .or_default()
            .push(Arc::new(Block::from_vec(data)));
        log::debug!(
            "write: stored {length} bytes in buffer {id}, {} blocks held",
            self.buffers[&id].len()
        );
        0
    }

    /// Allocate one zero-filled writable block of `size` bytes under `id`.
    ///
    /// Fails when the id is reserved or already present. The returned block is
    /// the output-redirect target for the set-output command.
    pub fn create(&mut self, id: u16, size: usize) -> Option<Arc<Block>> {
        if id == RESERVED_ID {
            log::debug!("create: buffer id {id} is reserved");
            return None;
        }
        if self.buffers.contains_key(&id) {
            log::debug!("create: buffer {id} already exists");
            return None;
        }
        let block = Arc::new(Block::writable(size));
        self.buffers.insert(id, vec![block.clone()]);
        log::debug!("create: created buffer {id}, size {size}");
        Some(block)
    }

    /// Remove `id` from the store, or clear everything when `id` is reserved.
    /// Either way the registered collaborators are notified.
    pub fn clear(&mut self, id: u16) {
        if id == RESERVED_ID {
            self.buffers.clear();
            for listener in &self.listeners {
                listener.store_cleared();
            }
            return;
        }
        if self.buffers.remove(&id).is_none() {
            log::debug!("clear: buffer {id} not found");
            return;
        }
        for listener in &self.listeners {
            listener.buffer_cleared(id);
        }
        log::debug!("clear: cleared buffer {id}");
    }

    /// Empty the block list under `id` but keep the key. Used by the
    /// split/spread family when recycling targets; collaborators are not
    /// notified.
    pub fn clear_blocks(&mut self, id: u16) {
        if let Some(blocks) = self.buffers.get_mut(&id) {
            blocks.clear();
        }
    }

    /// Whether the store holds an entry for `id` (possibly with an empty
    /// block list).
    pub fn exists(&self, id: u16) -> bool {
        self.buffers.contains_key(&id)
    }

    /// Borrow the block list under `id`.
    pub fn blocks(&self, id: u16) -> Option<&Vec<Arc<Block>>> {
        self.buffers.get(&id)
    }

    /// Clone the block list under `id` (cheap, shares the blocks).
    pub fn blocks_cloned(&self, id: u16) -> Option<Vec<Arc<Block>>> {
        self.buffers.get(&id).cloned()
    }

    /// Iterate the blocks under `id`.
    pub fn iter(&self, id: u16) -> impl Iterator<Item = &Arc<Block>> {
        self.buffers.get(&id).into_iter().flatten()
    }

    /// Append one block under `id`, creating the entry if needed. The
    /// reserved id is silently dropped.
    pub fn append(&mut self, id: u16, block: Arc<Block>) {
        if id == RESERVED_ID {
            return;
        }
        self.buffers.entry(id).or_default().push(block);
    }

    /// Replace the block list under `id` wholesale.
    pub fn replace(&mut self, id: u16, blocks: Vec<Arc<Block>>) {
        if id == RESERVED_ID {
            return;
        }
        self.buffers.insert(id, blocks);
    }

    /// Total byte size stored under `id`; zero when absent.
    pub fn total_size(&self, id: u16) -> usize {
        self.buffers
            .get(&id)
            .map(|blocks| offset::total_size(blocks))
            .unwrap_or(0)
    }

    /// Number of ids held.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether the store holds no ids at all.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
