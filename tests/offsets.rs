use std::sync::Arc;

use copro::buffer::offset::{buffer_byte, set_buffer_byte, total_size};
use copro::buffer::{AdvancedOffset, Block};
use copro::stream::MultiBlockStream;
use copro::ByteSource;

fn segmented() -> Vec<Arc<Block>> {
    vec![
        Arc::new(Block::from_vec(vec![0, 1, 2])),
        Arc::new(Block::from_vec(vec![3, 4])),
        Arc::new(Block::from_vec(vec![5, 6, 7, 8])),
    ]
}

#[test]
fn test_offset_normalizes_across_blocks() {
    let blocks = segmented();
    let mut at = AdvancedOffset { block: 0, offset: 4 };
    assert_eq!(buffer_byte(&blocks, &mut at, false), Some(4));
    // Normalization rewrote the address into block 1.
    assert_eq!(at, AdvancedOffset { block: 1, offset: 1 });
}

#[test]
fn test_offset_with_explicit_block_index() {
    let blocks = segmented();
    let mut at = AdvancedOffset { block: 2, offset: 3 };
    assert_eq!(buffer_byte(&blocks, &mut at, false), Some(8));
}

#[test]
fn test_offset_past_end_is_invalid() {
    let blocks = segmented();
    let mut at = AdvancedOffset { block: 0, offset: 9 };
    assert_eq!(buffer_byte(&blocks, &mut at, false), None);
    let mut at = AdvancedOffset::past_end();
    assert_eq!(buffer_byte(&blocks, &mut at, false), None);
}

#[test]
fn test_iterate_advances_and_renormalizes() {
    let blocks = segmented();
    let mut at = AdvancedOffset::start();
    let mut seen = Vec::new();
    while let Some(byte) = buffer_byte(&blocks, &mut at, true) {
        seen.push(byte);
    }
    assert_eq!(seen, vec![0, 1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn test_set_byte_across_segments() {
    let blocks = segmented();
    let mut at = AdvancedOffset { block: 0, offset: 3 };
    assert!(set_buffer_byte(&blocks, 0xEE, &mut at, true));
    assert_eq!(blocks[1].snapshot(), vec![0xEE, 4]);
    // The advanced position continues into the same block.
    assert!(set_buffer_byte(&blocks, 0xDD, &mut at, false));
    assert_eq!(blocks[1].snapshot(), vec![0xEE, 0xDD]);
}

#[test]
fn test_set_byte_out_of_range_fails() {
    let blocks = segmented();
    let mut at = AdvancedOffset { block: 0, offset: 9 };
    assert!(!set_buffer_byte(&blocks, 0xEE, &mut at, false));
}

#[test]
fn test_total_size() {
    assert_eq!(total_size(&segmented()), 9);
    assert_eq!(total_size(&[]), 0);
}

#[test]
fn test_multi_block_stream_reads_through() {
    let mut stream = MultiBlockStream::new(segmented());
    assert_eq!(stream.available(), 9);
    let mut seen = Vec::new();
    while let Some(byte) = stream.read_byte() {
        seen.push(byte);
    }
    assert_eq!(seen, vec![0, 1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(stream.available(), 0);
}

#[test]
fn test_multi_block_stream_seek() {
    let mut stream = MultiBlockStream::new(segmented());
    stream.seek(AdvancedOffset { block: 1, offset: 1 });
    assert_eq!(stream.read_byte(), Some(4));

    // A plain offset seek rolls across blocks.
    stream.seek(AdvancedOffset { block: 0, offset: 7 });
    assert_eq!(stream.read_byte(), Some(7));

    stream.seek(AdvancedOffset::past_end());
    assert_eq!(stream.read_byte(), None);
    assert_eq!(stream.available(), 0);
}
