// ABOUTME: The stream processor: reads VDU command bytes and drives both subsystems
// ABOUTME: Holds the shared context (buffer store, sample store, channel set)

/// Audio command dispatch
pub mod audio;
/// In-place byte arithmetic and conditional evaluation
pub mod adjust;
/// The buffered command set: write, call, jump, clear, create, set-output
pub mod buffered;
/// Wire command codes and flag bits
pub mod commands;
/// Structural transforms: copy, consolidate, split, spread, reverse
pub mod transform;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::audio::{ChannelSet, SampleStore, DEFAULT_ENABLED_CHANNELS, MAX_CHANNELS};
use crate::buffer::{AdvancedOffset, BufferStore, RESERVED_ID};
use crate::error::Error;
use crate::stream::{ByteSource, InputStream, MultiBlockStream, OutputHandle, PacketSink};
use crate::Result;

/// Engine construction parameters. Configuration is constructor-based; there
/// are no files to read.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Channels enabled at startup
    pub enabled_channels: usize,
    /// How long a blocking input read may stall before aborting the opcode
    pub read_timeout: Duration,
    /// Cadence of the per-channel audio workers
    pub frame_interval: Duration,
}

impl EngineConfig {
    /// Build a feed/source pair for the external input using the configured
    /// read timeout.
    pub fn serial_pair(&self) -> (crate::stream::SerialFeed, crate::stream::SerialSource) {
        crate::stream::SerialSource::pair(self.read_timeout)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled_channels: DEFAULT_ENABLED_CHANNELS,
            read_timeout: Duration::from_millis(200),
            frame_interval: Duration::from_millis(5),
        }
    }
}

/// Shared services handed to every processor tier.
#[derive(Clone)]
pub struct Context {
    /// The buffer store, owned by the interpreter tier
    pub store: Arc<Mutex<BufferStore>>,
    /// Samples shared with the channel workers
    pub samples: Arc<SampleStore>,
    /// The channel set
    pub channels: Arc<ChannelSet>,
}

impl Context {
    /// Build a context with default configuration.
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    /// Build a context, wiring the clear-notification seam: dropping a buffer
    /// drops the sample registered under the same id, and a whole-store clear
    /// also cancels every note.
    pub fn with_config(config: &EngineConfig) -> Self {
        let samples = Arc::new(SampleStore::new());
        let channels = ChannelSet::new(MAX_CHANNELS, config.enabled_channels, config.frame_interval);
        let mut store = BufferStore::new();
        store.register_listener(samples.clone());
        store.register_listener(channels.clone());
        Self {
            store: Arc::new(Mutex::new(store)),
            samples,
            channels,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes the VDU command stream.
///
/// The top-level processor reads from an external source and carries the
/// reserved id as its "current buffer". Calling a buffer creates a nested
/// processor over that buffer's blocks; jumping swaps the input stream in
/// place. Command parse failures abort the opcode in flight and the loop
/// continues with the next byte.
pub struct StreamProcessor {
    pub(crate) input: InputStream,
    pub(crate) output: OutputHandle,
    pub(crate) ctx: Context,
    pub(crate) id: u16,
}

impl StreamProcessor {
    /// Create the top-level processor over an external byte source.
    pub fn new(source: Box<dyn ByteSource>, sink: Arc<dyn PacketSink>, ctx: Context) -> Self {
        Self {
            input: InputStream::External(source),
            output: OutputHandle::new(sink),
            ctx,
            id: RESERVED_ID,
        }
    }

    pub(crate) fn nested(
        stream: MultiBlockStream,
        output: OutputHandle,
        ctx: Context,
        id: u16,
    ) -> Self {
        Self {
            input: InputStream::Blocks(stream),
            output,
            ctx,
            id,
        }
    }

    /// Process commands until the input is exhausted (or, for an external
    /// source, a read times out with nothing queued).
    pub fn run(&mut self) {
        while let Some(byte) = self.input.read_byte() {
            self.dispatch(byte);
        }
    }

    fn dispatch(&mut self, byte: u8) {
        // Only the VDU 23 escape carries the commands this core implements;
        // anything else belongs to collaborators and is skipped.
        if byte != 23 {
            log::trace!("dispatch: ignoring byte {byte:#04x}");
            return;
        }
        if let Err(e) = self.vdu_sys() {
            log::debug!("dispatch: aborted command: {e}");
        }
    }

    fn vdu_sys(&mut self) -> Result<()> {
        let group = self.read_byte()?;
        if group != 0 {
            log::trace!("vdu_sys: ignoring group {group:#04x}");
            return Ok(());
        }
        let command = self.read_byte()?;
        match command {
            commands::VDU_SYS_AUDIO => self.vdu_audio(),
            commands::VDU_SYS_BUFFERED => self.vdu_buffered(),
            other => {
                log::debug!("vdu_sys: unknown system command {other:#04x}");
                Ok(())
            }
        }
    }

    pub(crate) fn read_byte(&mut self) -> Result<u8> {
        self.input.read_byte().ok_or(Error::StreamShort)
    }

    pub(crate) fn read_word(&mut self) -> Result<u16> {
        let lo = self.read_byte()?;
        let hi = self.read_byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub(crate) fn read_24(&mut self) -> Result<u32> {
        let b0 = self.read_byte()?;
        let b1 = self.read_byte()?;
        let b2 = self.read_byte()?;
        Ok(u32::from_le_bytes([b0, b1, b2, 0]))
    }

    /// Read an offset from the stream. Advanced offsets are 24-bit; a set top
    /// bit means an explicit 16-bit block index follows and is masked off the
    /// offset.
    pub(crate) fn read_offset(&mut self, advanced: bool) -> Result<AdvancedOffset> {
        if !advanced {
            return Ok(AdvancedOffset {
                block: 0,
                offset: self.read_word()? as u32,
            });
        }
        let raw = self.read_24()?;
        if raw & 0x0080_0000 != 0 {
            let block = self.read_word()? as u32;
            Ok(AdvancedOffset {
                block,
                offset: raw & 0x007F_FFFF,
            })
        } else {
            Ok(AdvancedOffset {
                block: 0,
                offset: raw,
            })
        }
    }
}
