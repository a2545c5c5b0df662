// ABOUTME: Audio command channel engine
// ABOUTME: Samples backed by shared blocks, envelope models and per-channel workers

/// Per-channel state machine and worker
pub mod channel;
/// Volume and frequency envelope models
pub mod envelope;
/// Sample payloads and the sample store
pub mod sample;

pub use channel::{AudioChannel, ChannelSet, Waveform};
pub use envelope::{FrequencyEnvelope, VolumeEnvelope};
pub use sample::{AudioSample, PcmFormat, SampleStore};

/// Number of channels the engine carries.
pub const MAX_CHANNELS: usize = 32;

/// Channels enabled at startup by default.
pub const DEFAULT_ENABLED_CHANNELS: usize = 3;

/// Upper bound of the volume range.
pub const MAX_VOLUME: u8 = 127;

/// Sample rate assumed when none is supplied, in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_384;

/// Base frequency assigned to tuneable samples, in Hz (C5).
pub const DEFAULT_BASE_FREQUENCY: u16 = 523;

/// Base id of the translated sample-id space used by the audio sample
/// commands and by negative waveform selectors.
pub const SAMPLE_BASE_ID: u16 = 0xFB00;

/// Channel status byte: channel is enabled.
pub const STATUS_ENABLED: u8 = 0x01;
/// Channel status byte: a note is playing.
pub const STATUS_PLAYING: u8 = 0x02;
/// Channel status byte: the note is in its release phase.
pub const STATUS_RELEASING: u8 = 0x04;
/// Channel status byte: a volume envelope is attached.
pub const STATUS_VOLUME_ENVELOPE: u8 = 0x08;
/// Channel status byte: a frequency envelope is attached.
pub const STATUS_FREQUENCY_ENVELOPE: u8 = 0x10;
