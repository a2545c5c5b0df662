// ABOUTME: Wire command codes and flag bits for both subsystems
// ABOUTME: Multi-byte integers on the wire are little-endian throughout

/// VDU 23, 0 system command selector for the audio channel.
pub const VDU_SYS_AUDIO: u8 = 0x85;
/// VDU 23, 0 system command selector for the buffered command set.
pub const VDU_SYS_BUFFERED: u8 = 0xA0;

// Buffered command set, dispatched on the byte following the buffer id.

/// Append one block read from the stream.
pub const BUF_WRITE: u8 = 0;
/// Execute the buffer as a sub-program.
pub const BUF_CALL: u8 = 1;
/// Remove the buffer.
pub const BUF_CLEAR: u8 = 2;
/// Allocate a writable buffer.
pub const BUF_CREATE: u8 = 3;
/// Redirect the output transport into the buffer.
pub const BUF_SET_OUTPUT: u8 = 4;
/// In-place byte arithmetic.
pub const BUF_ADJUST: u8 = 5;
/// Conditional call.
pub const BUF_COND_CALL: u8 = 6;
/// Replace the input stream with the buffer.
pub const BUF_JUMP: u8 = 7;
/// Conditional jump.
pub const BUF_COND_JUMP: u8 = 8;
/// Jump with an entry offset.
pub const BUF_OFFSET_JUMP: u8 = 9;
/// Conditional jump with an entry offset.
pub const BUF_OFFSET_COND_JUMP: u8 = 10;
/// Call with an entry offset.
pub const BUF_OFFSET_CALL: u8 = 11;
/// Conditional call with an entry offset.
pub const BUF_OFFSET_COND_CALL: u8 = 12;
/// Deep copy blocks from a source list.
pub const BUF_COPY: u8 = 13;
/// Merge all blocks into one.
pub const BUF_CONSOLIDATE: u8 = 14;
/// Split into blocks of a given length, back into the same id.
pub const BUF_SPLIT: u8 = 15;
/// Split across an explicit target list.
pub const BUF_SPLIT_INTO: u8 = 16;
/// Split into consecutively numbered targets.
pub const BUF_SPLIT_FROM: u8 = 17;
/// Interleave-split in place.
pub const BUF_SPLIT_BY: u8 = 18;
/// Interleave-split across an explicit target list.
pub const BUF_SPLIT_BY_INTO: u8 = 19;
/// Interleave-split into consecutively numbered targets.
pub const BUF_SPLIT_BY_FROM: u8 = 20;
/// Distribute existing blocks over an explicit target list.
pub const BUF_SPREAD_INTO: u8 = 21;
/// Distribute existing blocks into consecutively numbered targets.
pub const BUF_SPREAD_FROM: u8 = 22;
/// Reverse the block order.
pub const BUF_REVERSE_BLOCKS: u8 = 23;
/// Reverse bytes within blocks.
pub const BUF_REVERSE: u8 = 24;
/// Shallow copy sharing block references.
pub const BUF_COPY_REF: u8 = 25;
/// Copy and merge into one block.
pub const BUF_COPY_AND_CONSOLIDATE: u8 = 26;
/// Log buffer geometry and a dump of the first block.
pub const BUF_DEBUG_INFO: u8 = 32;

// Adjust command byte: low bits select the operation, high bits are flags.

/// Adjust operation mask.
pub const ADJUST_OP_MASK: u8 = 0x0F;
/// Offsets are 24-bit with an optional block-index extension.
pub const ADJUST_ADVANCED_OFFSETS: u8 = 0x10;
/// The operand is drawn from another buffer.
pub const ADJUST_BUFFER_VALUE: u8 = 0x20;
/// Apply to a run of consecutive target bytes.
pub const ADJUST_MULTI_TARGET: u8 = 0x40;
/// Consume a run of operand bytes.
pub const ADJUST_MULTI_OPERAND: u8 = 0x80;

/// Bitwise complement.
pub const ADJUST_NOT: u8 = 0;
/// Two's-complement negate.
pub const ADJUST_NEG: u8 = 1;
/// Overwrite with the operand.
pub const ADJUST_SET: u8 = 2;
/// Byte-wise add, no carry.
pub const ADJUST_ADD: u8 = 3;
/// Little-endian add with carry propagation.
pub const ADJUST_ADD_CARRY: u8 = 4;
/// Bitwise and.
pub const ADJUST_AND: u8 = 5;
/// Bitwise or.
pub const ADJUST_OR: u8 = 6;
/// Bitwise xor.
pub const ADJUST_XOR: u8 = 7;

// Conditional command byte, same flag layout as adjust.

/// Conditional operation mask.
pub const COND_OP_MASK: u8 = 0x0F;
/// Conditional offsets are advanced.
pub const COND_ADVANCED_OFFSETS: u8 = 0x10;
/// Conditional operand is drawn from another buffer.
pub const COND_BUFFER_VALUE: u8 = 0x20;

/// True when the checked byte is non-zero.
pub const COND_EXISTS: u8 = 0;
/// True when the checked byte is zero.
pub const COND_NOT_EXISTS: u8 = 1;
/// Equality against the operand.
pub const COND_EQUAL: u8 = 2;
/// Inequality against the operand.
pub const COND_NOT_EQUAL: u8 = 3;
/// Checked byte strictly below the operand.
pub const COND_LESS: u8 = 4;
/// Checked byte strictly above the operand.
pub const COND_GREATER: u8 = 5;
/// Checked byte at most the operand.
pub const COND_LESS_EQUAL: u8 = 6;
/// Checked byte at least the operand.
pub const COND_GREATER_EQUAL: u8 = 7;
/// Both bytes non-zero.
pub const COND_AND: u8 = 8;
/// Either byte non-zero.
pub const COND_OR: u8 = 9;

// Reverse options byte.

/// Reverse 16-bit values.
pub const REVERSE_16BIT: u8 = 0x01;
/// Reverse 32-bit values.
pub const REVERSE_32BIT: u8 = 0x02;
/// Both size bits set: an explicit 16-bit value size follows.
pub const REVERSE_SIZE: u8 = 0x03;
/// A 16-bit chunk size follows; values reverse within each chunk.
pub const REVERSE_CHUNKED: u8 = 0x04;
/// Also reverse the block order.
pub const REVERSE_BLOCK: u8 = 0x08;
/// Bits with no assigned meaning.
pub const REVERSE_UNUSED: u8 = 0xF0;

// Audio channel commands, dispatched on the byte following the channel.

/// Begin note playback.
pub const AUDIO_PLAY: u8 = 0;
/// Report channel status.
pub const AUDIO_STATUS: u8 = 1;
/// Set channel volume.
pub const AUDIO_VOLUME: u8 = 2;
/// Set channel frequency.
pub const AUDIO_FREQUENCY: u8 = 3;
/// Select the waveform.
pub const AUDIO_WAVEFORM: u8 = 4;
/// Sample management.
pub const AUDIO_SAMPLE: u8 = 5;
/// Attach a volume envelope.
pub const AUDIO_ENV_VOLUME: u8 = 6;
/// Attach a frequency envelope.
pub const AUDIO_ENV_FREQUENCY: u8 = 7;
/// Enable the channel.
pub const AUDIO_ENABLE: u8 = 8;
/// Disable the channel.
pub const AUDIO_DISABLE: u8 = 9;
/// Reset the channel.
pub const AUDIO_RESET: u8 = 10;
/// Seek sample playback.
pub const AUDIO_SEEK: u8 = 11;
/// Adjust note duration.
pub const AUDIO_DURATION: u8 = 12;
/// Override the sample playback rate.
pub const AUDIO_SAMPLERATE: u8 = 13;
/// Set a per-waveform parameter.
pub const AUDIO_SET_PARAM: u8 = 14;

/// Waveform selector meaning "sample, explicit id follows".
pub const WAVEFORM_SAMPLE: i8 = -1;

// Sample management actions.

/// Read sample bytes from the stream.
pub const SAMPLE_LOAD: u8 = 0;
/// Drop the sample.
pub const SAMPLE_CLEAR: u8 = 1;
/// Build a sample over an existing buffer.
pub const SAMPLE_FROM_BUFFER: u8 = 2;
/// Set the base frequency of this channel's sample.
pub const SAMPLE_SET_FREQUENCY: u8 = 3;
/// Set the base frequency of a sample by buffer id.
pub const SAMPLE_BUFFER_SET_FREQUENCY: u8 = 4;
/// Set the loop start of this channel's sample.
pub const SAMPLE_SET_REPEAT_START: u8 = 5;
/// Set the loop start of a sample by buffer id.
pub const SAMPLE_BUFFER_SET_REPEAT_START: u8 = 6;
/// Set the loop length of this channel's sample.
pub const SAMPLE_SET_REPEAT_LENGTH: u8 = 7;
/// Set the loop length of a sample by buffer id.
pub const SAMPLE_BUFFER_SET_REPEAT_LENGTH: u8 = 8;
/// Log sample geometry and metadata.
pub const SAMPLE_DEBUG_INFO: u8 = 9;

// Envelope types.

/// No envelope.
pub const ENVELOPE_NONE: u8 = 0;
/// Classic ADSR volume envelope.
pub const ENVELOPE_ADSR: u8 = 1;
/// Multi-phase ADSR volume envelope.
pub const ENVELOPE_MULTIPHASE_ADSR: u8 = 2;
/// Stepped frequency envelope.
pub const FREQUENCY_ENVELOPE_STEPPED: u8 = 1;
