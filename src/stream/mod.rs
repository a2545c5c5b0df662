// ABOUTME: Byte-stream plumbing for the processor
// ABOUTME: Input sources, the multi-block reader and the packet output transport

/// Reader over a buffer's block list with seek support
pub mod multi;
/// Packet output transport and redirection
pub mod output;
/// Byte sources feeding the processor
pub mod source;

pub use multi::MultiBlockStream;
pub use output::{CollectSink, NullSink, OutputHandle, PacketSink, PACKET_AUDIO};
pub use source::{ByteSource, InputStream, SerialFeed, SerialSource};
