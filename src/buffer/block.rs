// ABOUTME: Block is a fixed-size, in-place mutable byte region
// ABOUTME: Shared by reference between buffers, samples and output redirection

use parking_lot::RwLock;

/// A contiguous byte region of fixed size.
///
/// Blocks are handed around as `Arc<Block>`; the same physical block may sit in
/// several logical buffers at once and in the block list of a live sample. The
/// byte payload is mutable in place behind a read/write lock so concurrent
/// readers (sample playback) never observe a torn resize, only updated bytes.
pub struct Block {
    size: usize,
    writable: bool,
    data: RwLock<Box<[u8]>>,
}

impl Block {
    /// Allocate a zero-filled block of `size` bytes.
    pub fn zeroed(size: usize) -> Self {
        Self {
            size,
            writable: false,
            data: RwLock::new(vec![0u8; size].into_boxed_slice()),
        }
    }

    /// Allocate a zero-filled block that accepts output redirection.
    pub fn writable(size: usize) -> Self {
        Self {
            writable: true,
            ..Self::zeroed(size)
        }
    }

    /// Build a block owning a copy of `data`.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            size: data.len(),
            writable: false,
            data: RwLock::new(data.into_boxed_slice()),
        }
    }

    /// Block size in bytes. Fixed for the lifetime of the block.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether this block was created as an output-redirect target.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Read one byte. `None` when `index` is out of range.
    pub fn get(&self, index: usize) -> Option<u8> {
        self.data.read().get(index).copied()
    }

    /// Write one byte. Returns false when `index` is out of range.
    pub fn set(&self, index: usize, value: u8) -> bool {
        match self.data.write().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Copy the whole payload out.
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.read().to_vec()
    }

    /// Overwrite the payload from the start of `src`, truncated to fit.
    pub fn fill_from(&self, src: &[u8]) {
        let mut guard = self.data.write();
        let n = src.len().min(guard.len());
        guard[..n].copy_from_slice(&src[..n]);
    }

    /// Run `f` over the mutable payload while holding the write lock.
    pub fn with_data_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.data.write())
    }

    /// Run `f` over the payload while holding the read lock.
    pub fn with_data<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.data.read())
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("size", &self.size)
            .field("writable", &self.writable)
            .finish()
    }
}
