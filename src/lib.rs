// ABOUTME: Main library entry point for copro
// ABOUTME: Exports the buffered command store, interpreter and audio channel engine

//! # copro
//!
//! Command-stream processor core for a retro display/sound coprocessor.
//!
//! Two tightly coupled subsystems share one buffer model: a content-addressable
//! store of byte streams keyed by 16-bit IDs that doubles as executable
//! sub-programs, and a per-channel audio engine driven by the same byte-stream
//! protocol. Blocks are reference counted so that buffers and audio samples can
//! share the same bytes without copies.

#![warn(missing_docs)]

/// Samples, envelopes, channels and channel workers
pub mod audio;
/// Shared blocks, the buffer store and segmented offset resolution
pub mod buffer;
/// The stream processor: command dispatch, interpreter and transforms
pub mod proc;
/// Byte-stream sources and the packet output transport
pub mod stream;

pub use buffer::{Block, BufferStore, RESERVED_ID};
pub use proc::{Context, EngineConfig, StreamProcessor};
pub use stream::{ByteSource, CollectSink, NullSink, PacketSink, SerialSource};

/// Result type for copro operations
pub type Result<T> = std::result::Result<T, error::Error>;

/// Error types for copro
pub mod error {
    use thiserror::Error;

    /// Error types for copro operations
    #[derive(Error, Debug)]
    pub enum Error {
        /// Input stream ended or timed out mid-command
        #[error("input stream ended mid-command")]
        StreamShort,

        /// Referenced buffer does not exist
        #[error("buffer {0} not found")]
        BufferNotFound(u16),

        /// A command addressed the reserved buffer id where a real one is
        /// required
        #[error("buffer id {0} is reserved")]
        ReservedId(u16),

        /// Block geometry does not divide by the requested unit
        #[error("block shape mismatch: {0}")]
        ShapeMismatch(String),
    }
}
