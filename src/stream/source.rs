// ABOUTME: Byte sources feeding the stream processor
// ABOUTME: SerialSource drains a crossbeam channel with a bounded read timeout

use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::buffer::AdvancedOffset;

use super::multi::MultiBlockStream;

/// A pull-based byte source with bounded blocking reads.
///
/// `read_byte` returning `None` means end-of-stream or timeout; the processor
/// treats both the same way and aborts the opcode in flight.
pub trait ByteSource: Send {
    /// Read the next byte, blocking up to the source's timeout.
    fn read_byte(&mut self) -> Option<u8>;

    /// Bytes known to be immediately available without blocking.
    fn available(&self) -> usize;
}

/// Channel-backed byte source standing in for the serial input framing.
///
/// The upstream side pushes bytes through a [`SerialFeed`]; the processor
/// drains them here. Reads block up to the configured timeout so a stalled
/// upstream aborts at most one opcode.
pub struct SerialSource {
    rx: Receiver<u8>,
    timeout: Duration,
}

/// Sending half paired with a [`SerialSource`].
#[derive(Clone)]
pub struct SerialFeed {
    tx: Sender<u8>,
}

impl SerialFeed {
    /// Queue `bytes` for the processor.
    pub fn send(&self, bytes: &[u8]) {
        for &b in bytes {
            // Receiver dropped means the processor is gone; nothing to do.
            if self.tx.send(b).is_err() {
                return;
            }
        }
    }
}

impl SerialSource {
    /// Create a feed/source pair with the given read timeout.
    pub fn pair(timeout: Duration) -> (SerialFeed, SerialSource) {
        let (tx, rx) = unbounded();
        (SerialFeed { tx }, SerialSource { rx, timeout })
    }
}

impl ByteSource for SerialSource {
    fn read_byte(&mut self) -> Option<u8> {
        match self.rx.try_recv() {
            Ok(byte) => Some(byte),
            Err(_) => self.rx.recv_timeout(self.timeout).ok(),
        }
    }

    fn available(&self) -> usize {
        self.rx.len()
    }
}

/// The processor's input: either an external source (top level) or a stream
/// over stored blocks (a called or jumped-to buffer).
pub enum InputStream {
    /// Top-level input from outside the store
    External(Box<dyn ByteSource>),
    /// Input over a buffer's block list
    Blocks(MultiBlockStream),
}

impl InputStream {
    /// Seek within a block-backed stream. External streams cannot seek; the
    /// jump command never targets one because top-level jumps degrade to
    /// calls.
    pub fn seek(&mut self, offset: AdvancedOffset) {
        match self {
            InputStream::Blocks(stream) => stream.seek(offset),
            InputStream::External(_) => {
                log::debug!("seek: ignored on external input stream");
            }
        }
    }
}

impl ByteSource for InputStream {
    fn read_byte(&mut self) -> Option<u8> {
        match self {
            InputStream::External(source) => source.read_byte(),
            InputStream::Blocks(stream) => stream.read_byte(),
        }
    }

    fn available(&self) -> usize {
        match self {
            InputStream::External(source) => source.available(),
            InputStream::Blocks(stream) => stream.available(),
        }
    }
}
