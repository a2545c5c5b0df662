// ABOUTME: AudioSample is an immutable payload view onto shared blocks
// ABOUTME: Scalar metadata uses atomics so the channel worker never sees tears

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::{offset, Block, ClearListener};

use super::DEFAULT_BASE_FREQUENCY;

/// Format byte: mask of the PCM encoding bits.
pub const FORMAT_DATA_MASK: u8 = 0x07;
/// Format byte: an explicit sample rate follows on the wire.
pub const FORMAT_WITH_RATE: u8 = 0x08;
/// Format byte: sample is tuneable, base frequency defaults to the engine's.
pub const FORMAT_TUNEABLE: u8 = 0x10;

/// Wire sentinel for "repeat to end of sample".
pub const REPEAT_TO_END: u32 = 0xFF_FFFF;

/// PCM encoding of a sample payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcmFormat {
    /// Signed 8-bit PCM
    Signed8,
    /// Unsigned 8-bit PCM
    Unsigned8,
}

impl PcmFormat {
    /// Decode the data bits of a format byte. Unknown encodings fall back to
    /// signed 8-bit, the engine native format.
    pub fn from_bits(bits: u8) -> Self {
        match bits & FORMAT_DATA_MASK {
            1 => PcmFormat::Unsigned8,
            _ => PcmFormat::Signed8,
        }
    }

    /// Decode one payload byte to a signed amplitude.
    pub fn amplitude(&self, byte: u8) -> i8 {
        match self {
            PcmFormat::Signed8 => byte as i8,
            PcmFormat::Unsigned8 => (byte.wrapping_sub(0x80)) as i8,
        }
    }
}

/// Audio payload plus playback metadata.
///
/// The block list is a snapshot of the source buffer at creation time and is
/// never replaced; clearing the buffer afterwards does not invalidate the
/// sample. Scalar metadata is mutated by the dispatcher while the channel
/// worker reads it, hence the atomics.
pub struct AudioSample {
    blocks: Vec<Arc<Block>>,
    format: PcmFormat,
    size: usize,
    sample_rate: AtomicU32,
    base_frequency: AtomicU32,
    repeat_start: AtomicU32,
    repeat_length: AtomicU32,
}

impl AudioSample {
    /// Build a sample over a buffer's block list.
    ///
    /// Returns `None` for an empty block list; a sample must always have
    /// bytes behind it. The tuneable flag seeds the base frequency with the
    /// engine default, enabling pitch-shifted playback.
    pub fn from_blocks(blocks: Vec<Arc<Block>>, format_byte: u8, sample_rate: u32) -> Option<Self> {
        let size = offset::total_size(&blocks);
        if blocks.is_empty() || size == 0 {
            return None;
        }
        let base = if format_byte & FORMAT_TUNEABLE != 0 {
            DEFAULT_BASE_FREQUENCY as u32
        } else {
            0
        };
        Some(Self {
            blocks,
            format: PcmFormat::from_bits(format_byte),
            size,
            sample_rate: AtomicU32::new(sample_rate),
            base_frequency: AtomicU32::new(base),
            repeat_start: AtomicU32::new(0),
            repeat_length: AtomicU32::new(u32::MAX),
        })
    }

    /// Total payload size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The PCM encoding.
    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// The shared block list.
    pub fn blocks(&self) -> &[Arc<Block>] {
        &self.blocks
    }

    /// Playback rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    /// Change the playback rate.
    pub fn set_sample_rate(&self, rate: u32) {
        self.sample_rate.store(rate, Ordering::Relaxed);
    }

    /// Base frequency for tuneable playback; 0 means untuned.
    pub fn base_frequency(&self) -> u32 {
        self.base_frequency.load(Ordering::Relaxed)
    }

    /// Change the base frequency.
    pub fn set_base_frequency(&self, hz: u32) {
        self.base_frequency.store(hz, Ordering::Relaxed);
    }

    /// Loop start in bytes from the logical beginning.
    pub fn repeat_start(&self) -> u32 {
        self.repeat_start.load(Ordering::Relaxed)
    }

    /// Change the loop start.
    pub fn set_repeat_start(&self, bytes: u32) {
        self.repeat_start.store(bytes, Ordering::Relaxed);
    }

    /// Loop length in bytes; `u32::MAX` means "to end of sample".
    pub fn repeat_length(&self) -> u32 {
        self.repeat_length.load(Ordering::Relaxed)
    }

    /// Change the loop length. The wire sentinel `0xFFFFFF` maps to
    /// `u32::MAX`.
    pub fn set_repeat_length(&self, bytes: u32) {
        let stored = if bytes == REPEAT_TO_END { u32::MAX } else { bytes };
        self.repeat_length.store(stored, Ordering::Relaxed);
    }

    /// The byte window playback loops over while a note is held: start of the
    /// loop and one past its last byte, clamped to the payload.
    pub fn loop_window(&self) -> (usize, usize) {
        let start = (self.repeat_start() as usize).min(self.size);
        let length = self.repeat_length();
        let end = if length == u32::MAX {
            self.size
        } else {
            (start + length as usize).min(self.size)
        };
        (start, end.max(start))
    }

    /// Read the payload byte at `pos` as a signed amplitude.
    pub fn amplitude_at(&self, pos: usize) -> Option<i8> {
        let mut at = crate::buffer::AdvancedOffset {
            block: 0,
            offset: pos as u32,
        };
        offset::buffer_byte(&self.blocks, &mut at, false).map(|b| self.format.amplitude(b))
    }
}

/// Samples keyed by buffer id, shared between the dispatcher and the channel
/// workers.
///
/// Installing a sample under an id removes any prior sample there; one sample
/// per id at all times.
#[derive(Default)]
pub struct SampleStore {
    samples: Mutex<HashMap<u16, Arc<AudioSample>>>,
}

impl SampleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `sample` under `id`, dropping any predecessor.
    pub fn insert(&self, id: u16, sample: Arc<AudioSample>) {
        self.samples.lock().insert(id, sample);
    }

    /// Fetch the sample under `id`.
    pub fn get(&self, id: u16) -> Option<Arc<AudioSample>> {
        self.samples.lock().get(&id).cloned()
    }

    /// Remove the sample under `id`. Returns whether one was present.
    pub fn remove(&self, id: u16) -> bool {
        self.samples.lock().remove(&id).is_some()
    }

    /// Drop every sample.
    pub fn clear_all(&self) {
        self.samples.lock().clear();
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    /// Whether no samples are held.
    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }
}

impl ClearListener for SampleStore {
    fn buffer_cleared(&self, id: u16) {
        // The sample snapshot owns its block references, so dropping the
        // buffer leaves the sample playable. Only an explicit sample clear or
        // a whole-store clear removes the registration.
        if self.get(id).is_some() {
            log::debug!("buffer {id} cleared, sample kept alive by its own references");
        }
    }

    fn store_cleared(&self) {
        self.clear_all();
    }
}
