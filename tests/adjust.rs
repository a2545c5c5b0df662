use std::sync::Arc;
use std::time::Duration;

use copro::{Context, NullSink, SerialSource, StreamProcessor};

fn run(ctx: &Context, program: &[u8]) {
    let (feed, source) = SerialSource::pair(Duration::from_millis(10));
    feed.send(program);
    drop(feed);
    let mut processor = StreamProcessor::new(Box::new(source), Arc::new(NullSink), ctx.clone());
    processor.run();
}

fn write_cmd(id: u16, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![23, 0, 0xA0, id as u8, (id >> 8) as u8, 0];
    bytes.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

fn adjust_cmd(id: u16, tail: &[u8]) -> Vec<u8> {
    let mut bytes = vec![23, 0, 0xA0, id as u8, (id >> 8) as u8, 5];
    bytes.extend_from_slice(tail);
    bytes
}

fn buffer_bytes(ctx: &Context, id: u16) -> Vec<u8> {
    ctx.store
        .lock()
        .iter(id)
        .flat_map(|block| block.snapshot())
        .collect()
}

const OP_NOT: u8 = 0;
const OP_NEG: u8 = 1;
const OP_SET: u8 = 2;
const OP_ADD: u8 = 3;
const OP_ADC: u8 = 4;
const OP_XOR: u8 = 7;
const MULTI_TARGET: u8 = 0x40;
const MULTI_OPERAND: u8 = 0x80;
const BUFFER_VALUE: u8 = 0x20;

#[test]
fn test_not_single_byte() {
    let ctx = Context::new();
    let mut program = write_cmd(5, &[0b1010_0101]);
    program.extend(adjust_cmd(5, &[OP_NOT, 0, 0]));
    run(&ctx, &program);
    assert_eq!(buffer_bytes(&ctx, 5), vec![0b0101_1010]);
}

#[test]
fn test_neg_single_byte() {
    let ctx = Context::new();
    let mut program = write_cmd(5, &[0x01, 0x00]);
    program.extend(adjust_cmd(5, &[OP_NEG, 0, 0]));
    run(&ctx, &program);
    assert_eq!(buffer_bytes(&ctx, 5), vec![0xFF, 0x00]);
}

#[test]
fn test_set_at_offset() {
    let ctx = Context::new();
    let mut program = write_cmd(5, &[0, 0, 0]);
    program.extend(adjust_cmd(5, &[OP_SET, 2, 0, 0x7E]));
    run(&ctx, &program);
    assert_eq!(buffer_bytes(&ctx, 5), vec![0, 0, 0x7E]);
}

#[test]
fn test_add_wraps_without_carry() {
    let ctx = Context::new();
    let mut program = write_cmd(5, &[0xFF]);
    program.extend(adjust_cmd(5, &[OP_ADD, 0, 0, 0x02]));
    run(&ctx, &program);
    assert_eq!(buffer_bytes(&ctx, 5), vec![0x01]);
}

#[test]
fn test_add_multi_target_applies_operand_to_each() {
    let ctx = Context::new();
    let mut program = write_cmd(5, &[1, 2, 3]);
    program.extend(adjust_cmd(5, &[OP_ADD | MULTI_TARGET, 0, 0, 3, 0, 0x10]));
    run(&ctx, &program);
    assert_eq!(buffer_bytes(&ctx, 5), vec![0x11, 0x12, 0x13]);
}

#[test]
fn test_adc_carry_chain_little_endian() {
    let ctx = Context::new();
    // Four bytes: three value bytes plus room for the trailing carry.
    let mut program = write_cmd(5, &[0xFF, 0x00, 0x00, 0x55]);
    program.extend(adjust_cmd(5, &[OP_ADC | MULTI_TARGET, 0, 0, 3, 0, 0x01]));
    run(&ctx, &program);
    // 0x0000FF + 1 = 0x000100 little-endian, final carry 0 written at offset 3.
    assert_eq!(buffer_bytes(&ctx, 5), vec![0x00, 0x01, 0x00, 0x00]);
}

#[test]
fn test_adc_carry_ripples_to_extension_byte() {
    let ctx = Context::new();
    let mut program = write_cmd(5, &[0xFF, 0xFF, 0x55]);
    program.extend(adjust_cmd(5, &[OP_ADC | MULTI_TARGET, 0, 0, 2, 0, 0x01]));
    run(&ctx, &program);
    // 0xFFFF + 1 = 0x10000: both bytes clear, carry byte lands at offset 2.
    assert_eq!(buffer_bytes(&ctx, 5), vec![0x00, 0x00, 0x01]);
}

#[test]
fn test_adc_short_buffer_keeps_partial_result() {
    let ctx = Context::new();
    let mut program = write_cmd(5, &[0xFF, 0x00, 0x00]);
    program.extend(adjust_cmd(5, &[OP_ADC | MULTI_TARGET, 0, 0, 3, 0, 0x01]));
    run(&ctx, &program);
    // No room for the carry byte; the summed bytes stay as written.
    assert_eq!(buffer_bytes(&ctx, 5), vec![0x00, 0x01, 0x00]);
}

#[test]
fn test_adc_single_target_multi_operand_accumulates() {
    let ctx = Context::new();
    let mut program = write_cmd(5, &[0x01, 0x55]);
    // Three inline operands accumulate into one byte, carry byte follows.
    program.extend(adjust_cmd(
        5,
        &[OP_ADC | MULTI_OPERAND, 0, 0, 3, 0, 0x80, 0x80, 0x02],
    ));
    run(&ctx, &program);
    // Each iteration folds the running carry back into the byte:
    // 0x01+0x80 = 0x81, 0x81+0x80 = 0x101 -> 0x01 carry 1, 0x01+0x02+1 = 0x04.
    assert_eq!(buffer_bytes(&ctx, 5), vec![0x04, 0x00]);
}

#[test]
fn test_adjust_with_buffer_sourced_operands() {
    let ctx = Context::new();
    let mut program = write_cmd(5, &[0x0F, 0xF0]);
    program.extend(write_cmd(6, &[0xFF, 0x0F]));
    // XOR each byte of 5 with the corresponding byte of 6.
    program.extend(adjust_cmd(
        5,
        &[
            OP_XOR | MULTI_TARGET | MULTI_OPERAND | BUFFER_VALUE,
            0, 0, // target offset
            2, 0, // count
            6, 0, // operand buffer id
            0, 0, // operand offset
        ],
    ));
    run(&ctx, &program);
    assert_eq!(buffer_bytes(&ctx, 5), vec![0xF0, 0xFF]);
}

#[test]
fn test_adjust_count_zero_is_noop() {
    let ctx = Context::new();
    let mut program = write_cmd(5, &[1, 2, 3]);
    program.extend(adjust_cmd(5, &[OP_ADD | MULTI_TARGET, 0, 0, 0, 0, 0x10]));
    run(&ctx, &program);
    assert_eq!(buffer_bytes(&ctx, 5), vec![1, 2, 3]);
}

#[test]
fn test_adjust_missing_buffer_is_ignored() {
    let ctx = Context::new();
    let mut program = adjust_cmd(5, &[OP_SET, 0, 0, 0x7E]);
    program.extend(write_cmd(6, &[0x42]));
    run(&ctx, &program);
    assert!(!ctx.store.lock().exists(5));
    assert_eq!(buffer_bytes(&ctx, 6), vec![0x42]);
}

#[test]
fn test_adjust_spans_block_boundaries() {
    let ctx = Context::new();
    // Two separate writes leave two blocks; the multi-target run crosses them.
    let mut program = write_cmd(5, &[0xFF]);
    program.extend(write_cmd(5, &[0x00, 0x55]));
    program.extend(adjust_cmd(5, &[OP_ADC | MULTI_TARGET, 0, 0, 2, 0, 0x01]));
    run(&ctx, &program);
    assert_eq!(buffer_bytes(&ctx, 5), vec![0x00, 0x01, 0x00]);
}
