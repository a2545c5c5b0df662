use std::sync::Arc;
use std::time::Duration;

use copro::audio::sample::{AudioSample, PcmFormat, FORMAT_TUNEABLE};
use copro::audio::{DEFAULT_BASE_FREQUENCY, SAMPLE_BASE_ID};
use copro::buffer::Block;
use copro::{CollectSink, Context, SerialSource, StreamProcessor};

fn run_with_statuses(ctx: &Context, program: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let sink = Arc::new(CollectSink::new());
    let (feed, source) = SerialSource::pair(Duration::from_millis(10));
    feed.send(program);
    drop(feed);
    let mut processor = StreamProcessor::new(Box::new(source), sink.clone(), ctx.clone());
    processor.run();
    sink.drain()
}

fn write_cmd(id: u16, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![23, 0, 0xA0, id as u8, (id >> 8) as u8, 0];
    bytes.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

fn audio_cmd(channel: u8, tail: &[u8]) -> Vec<u8> {
    let mut bytes = vec![23, 0, 0x85, channel];
    bytes.extend_from_slice(tail);
    bytes
}

#[test]
fn test_sample_from_buffer_and_clear_keeps_sample_alive() {
    let ctx = Context::new();
    let mut program = write_cmd(7, &[1, 2, 3, 4]);
    // SAMPLE (5) FROM_BUFFER (2): buffer 7, format 0.
    program.extend(audio_cmd(0, &[5, 2, 7, 0, 0]));
    // Clear buffer 7: the sample created over it must survive.
    program.extend([23, 0, 0xA0, 7, 0, 2]);
    let statuses = run_with_statuses(&ctx, &program);
    assert_eq!(statuses.last().unwrap().1[1], 1, "sample creation refused");

    // The buffer is gone but the sample stays registered and playable until
    // an explicit sample clear.
    assert!(!ctx.store.lock().exists(7));
    let sample = ctx.samples.get(7).expect("sample should survive the buffer clear");
    assert_eq!(sample.size(), 4);
    assert_eq!(sample.amplitude_at(0), Some(1));

    // Recreating over the now missing buffer is refused and the registered
    // sample is left in place.
    let statuses = run_with_statuses(&ctx, &audio_cmd(0, &[5, 2, 7, 0, 0]));
    assert_eq!(statuses[0].1[1], 0);
    assert!(ctx.samples.get(7).is_some());
}

#[test]
fn test_sample_load_via_negative_channel() {
    let ctx = Context::new();
    // Channel byte 0xFF is sample selector -1, id SAMPLE_BASE_ID.
    // SAMPLE (5) LOAD (0) length 3, then the payload.
    let program = audio_cmd(0xFF, &[5, 0, 3, 0, 0, 0x10, 0x20, 0x30]);
    let statuses = run_with_statuses(&ctx, &program);
    assert_eq!(statuses[0].1[1], 1);
    let sample = ctx.samples.get(SAMPLE_BASE_ID).expect("sample");
    assert_eq!(sample.size(), 3);
    assert_eq!(ctx.store.lock().total_size(SAMPLE_BASE_ID), 3);
}

#[test]
fn test_sample_clear_action() {
    let ctx = Context::new();
    let mut program = audio_cmd(0xFF, &[5, 0, 1, 0, 0, 0x42]);
    program.extend(audio_cmd(0xFF, &[5, 1]));
    let statuses = run_with_statuses(&ctx, &program);
    assert_eq!(statuses[1].1[1], 1);
    assert!(ctx.samples.get(SAMPLE_BASE_ID).is_none());
}

#[test]
fn test_repeat_length_sentinel_means_to_end() {
    let ctx = Context::new();
    let mut program = write_cmd(7, &[1, 2, 3, 4, 5, 6]);
    program.extend(audio_cmd(0, &[5, 2, 7, 0, 0]));
    // BUFFER_SET_REPEAT_START (6): id 7, start 2.
    program.extend(audio_cmd(0, &[5, 6, 7, 0, 2, 0, 0]));
    // BUFFER_SET_REPEAT_LENGTH (8): id 7, the 24-bit sentinel.
    program.extend(audio_cmd(0, &[5, 8, 7, 0, 0xFF, 0xFF, 0xFF]));
    run_with_statuses(&ctx, &program);

    let sample = ctx.samples.get(7).expect("sample");
    assert_eq!(sample.repeat_start(), 2);
    assert_eq!(sample.repeat_length(), u32::MAX);
    assert_eq!(sample.loop_window(), (2, 6));
}

#[test]
fn test_repeat_window_with_explicit_length() {
    let sample = AudioSample::from_blocks(
        vec![Arc::new(Block::from_vec(vec![0; 10]))],
        0,
        16_384,
    )
    .unwrap();
    sample.set_repeat_start(2);
    sample.set_repeat_length(4);
    assert_eq!(sample.loop_window(), (2, 6));
    // Windows clamp to the payload.
    sample.set_repeat_length(100);
    assert_eq!(sample.loop_window(), (2, 10));
}

#[test]
fn test_sample_replaces_prior_registration() {
    let ctx = Context::new();
    let mut program = write_cmd(7, &[1]);
    program.extend(audio_cmd(0, &[5, 2, 7, 0, 0]));
    let first = {
        run_with_statuses(&ctx, &program);
        ctx.samples.get(7).unwrap()
    };
    // Write more data and recreate the sample under the same id.
    let mut program = write_cmd(7, &[2, 3]);
    program.extend(audio_cmd(0, &[5, 2, 7, 0, 0]));
    run_with_statuses(&ctx, &program);
    let second = ctx.samples.get(7).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.size(), 3);
}

#[test]
fn test_sample_from_missing_or_empty_buffer_refused() {
    let ctx = Context::new();
    let statuses = run_with_statuses(&ctx, &audio_cmd(0, &[5, 2, 7, 0, 0]));
    assert_eq!(statuses[0].1[1], 0);
}

#[test]
fn test_sample_format_with_rate_and_tuneable() {
    let ctx = Context::new();
    let mut program = write_cmd(7, &[1, 2]);
    // Format: WITH_RATE | TUNEABLE, explicit rate 8000.
    program.extend(audio_cmd(0, &[5, 2, 7, 0, 0x18, 0x40, 0x1F]));
    run_with_statuses(&ctx, &program);
    let sample = ctx.samples.get(7).expect("sample");
    assert_eq!(sample.sample_rate(), 8000);
    assert_eq!(sample.base_frequency(), DEFAULT_BASE_FREQUENCY as u32);
}

#[test]
fn test_clear_all_drops_samples() {
    let ctx = Context::new();
    let mut program = write_cmd(7, &[1, 2]);
    program.extend(audio_cmd(0, &[5, 2, 7, 0, 0]));
    // Clear the whole store.
    program.extend([23, 0, 0xA0, 0xFF, 0xFF, 2]);
    run_with_statuses(&ctx, &program);
    assert!(ctx.samples.is_empty());
    assert!(ctx.store.lock().is_empty());
}

#[test]
fn test_pcm_format_amplitudes() {
    assert_eq!(PcmFormat::Signed8.amplitude(0xFF), -1);
    assert_eq!(PcmFormat::Signed8.amplitude(0x7F), 127);
    assert_eq!(PcmFormat::Unsigned8.amplitude(0x80), 0);
    assert_eq!(PcmFormat::Unsigned8.amplitude(0x00), -128);
    assert_eq!(PcmFormat::from_bits(FORMAT_TUNEABLE), PcmFormat::Signed8);
    assert_eq!(PcmFormat::from_bits(1), PcmFormat::Unsigned8);
}

#[test]
fn test_sample_over_empty_blocks_refused() {
    assert!(AudioSample::from_blocks(vec![], 0, 16_384).is_none());
}

#[test]
fn test_non_negative_selector_wraps_below_base() {
    let ctx = Context::new();
    // The sample actions expect a negative selector in the channel byte; a
    // plain channel number must still translate without panicking, landing
    // just below the sample id base.
    let program = audio_cmd(0, &[5, 0, 2, 0, 0, 0x11, 0x22]);
    let statuses = run_with_statuses(&ctx, &program);
    assert_eq!(statuses[0].1[1], 1);
    let sample = ctx.samples.get(SAMPLE_BASE_ID - 1).expect("sample");
    assert_eq!(sample.size(), 2);
}
