// ABOUTME: Packet output transport shared by the processor tiers
// ABOUTME: Supports redirection into a writable buffer block and a null target

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::Block;

/// Packet kind for audio status acknowledgements.
pub const PACKET_AUDIO: u8 = 0x05;

/// Downstream consumer of status packets.
///
/// The real transport lives outside this crate; implementations only need to
/// accept a packet kind and payload. Calls are already serialized by the
/// [`OutputHandle`].
pub trait PacketSink: Send + Sync {
    /// Deliver one packet.
    fn send_packet(&self, kind: u8, payload: &[u8]);
}

/// Sink that discards everything.
pub struct NullSink;

impl PacketSink for NullSink {
    fn send_packet(&self, _kind: u8, _payload: &[u8]) {}
}

/// Sink that records packets for inspection. Used by the demo and tests.
#[derive(Default)]
pub struct CollectSink {
    packets: Mutex<Vec<(u8, Vec<u8>)>>,
}

impl CollectSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every packet recorded so far.
    pub fn drain(&self) -> Vec<(u8, Vec<u8>)> {
        std::mem::take(&mut self.packets.lock())
    }
}

impl PacketSink for CollectSink {
    fn send_packet(&self, kind: u8, payload: &[u8]) {
        self.packets.lock().push((kind, payload.to_vec()));
    }
}

/// A writable block plus a shared write cursor.
///
/// Cloned output handles share the cursor, so a nested processor writing to a
/// redirected buffer continues where its parent left off. Writes past the end
/// of the block are dropped.
struct BlockWriter {
    block: Arc<Block>,
    pos: AtomicUsize,
}

impl BlockWriter {
    fn write(&self, bytes: &[u8]) {
        for &byte in bytes {
            let at = self.pos.fetch_add(1, Ordering::Relaxed);
            if !self.block.set(at, byte) {
                return;
            }
        }
    }
}

enum Target {
    Sink,
    Null,
    Buffer(Arc<BlockWriter>),
}

/// The processor's handle on the output transport.
///
/// Normally forwards packets to the original sink; the set-output command can
/// point it at a writable buffer block or at nothing. Nested processors get a
/// clone, so redirection inside a called buffer does not leak back out.
pub struct OutputHandle {
    original: Arc<dyn PacketSink>,
    serialize: Arc<Mutex<()>>,
    target: Target,
}

impl Clone for OutputHandle {
    fn clone(&self) -> Self {
        Self {
            original: self.original.clone(),
            serialize: self.serialize.clone(),
            target: match &self.target {
                Target::Sink => Target::Sink,
                Target::Null => Target::Null,
                Target::Buffer(writer) => Target::Buffer(writer.clone()),
            },
        }
    }
}

impl OutputHandle {
    /// Wrap a sink as the original transport.
    pub fn new(sink: Arc<dyn PacketSink>) -> Self {
        Self {
            original: sink,
            serialize: Arc::new(Mutex::new(())),
            target: Target::Sink,
        }
    }

    /// Send one packet through the current target.
    ///
    /// A redirected buffer receives the serialized form
    /// `kind | 0x80, len, payload...`, matching what the wire transport
    /// carries.
    pub fn send_packet(&self, kind: u8, payload: &[u8]) {
        let _guard = self.serialize.lock();
        match &self.target {
            Target::Sink => self.original.send_packet(kind, payload),
            Target::Null => {}
            Target::Buffer(writer) => {
                writer.write(&[kind | 0x80, payload.len() as u8]);
                writer.write(payload);
            }
        }
    }

    /// Convenience for the audio acknowledgement packet.
    pub fn send_audio_status(&self, channel: u8, status: u8) {
        self.send_packet(PACKET_AUDIO, &[channel, status]);
    }

    /// Redirect output into a writable block. Refused for plain blocks.
    pub fn redirect_to(&mut self, block: Arc<Block>) -> bool {
        if !block.is_writable() {
            log::debug!("redirect_to: block is not writable");
            return false;
        }
        self.target = Target::Buffer(Arc::new(BlockWriter {
            block,
            pos: AtomicUsize::new(0),
        }));
        true
    }

    /// Discard all further output.
    pub fn redirect_null(&mut self) {
        self.target = Target::Null;
    }

    /// Restore the original transport.
    pub fn restore(&mut self) {
        self.target = Target::Sink;
    }
}
