use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use copro::buffer::{Block, BufferStore, ClearListener, RESERVED_ID};
use copro::{ByteSource, SerialSource};

fn source_with(bytes: &[u8]) -> SerialSource {
    let (feed, source) = SerialSource::pair(Duration::from_millis(10));
    feed.send(bytes);
    source
}

#[test]
fn test_write_appends_exactly_n_bytes() {
    let mut store = BufferStore::new();
    let mut source = source_with(&[1, 2, 3, 4, 5]);
    let remaining = store.write(7, 5, &mut source);
    assert_eq!(remaining, 0);
    assert_eq!(store.total_size(7), 5);

    let mut source = source_with(&[9, 9, 9]);
    let remaining = store.write(7, 3, &mut source);
    assert_eq!(remaining, 0);
    assert_eq!(store.total_size(7), 8);
    assert_eq!(store.blocks(7).unwrap().len(), 2);
}

#[test]
fn test_partial_write_discards_data() {
    let mut store = BufferStore::new();
    let mut source = source_with(&[1, 2]);
    let remaining = store.write(3, 5, &mut source);
    assert_eq!(remaining, 3);
    assert!(!store.exists(3));
}

#[test]
fn test_write_to_reserved_id_is_dropped() {
    let mut store = BufferStore::new();
    let mut source = source_with(&[1, 2, 3]);
    let remaining = store.write(RESERVED_ID, 3, &mut source);
    assert_eq!(remaining, 0);
    assert!(!store.exists(RESERVED_ID));
    assert!(store.is_empty());
}

#[test]
fn test_create_refuses_reserved_and_duplicate() {
    let mut store = BufferStore::new();
    assert!(store.create(RESERVED_ID, 16).is_none());
    let block = store.create(10, 16).expect("create");
    assert_eq!(block.size(), 16);
    assert!(block.is_writable());
    assert!(store.create(10, 16).is_none());
    // Created blocks arrive zero filled.
    assert_eq!(block.snapshot(), vec![0u8; 16]);
}

#[test]
fn test_clear_removes_key() {
    let mut store = BufferStore::new();
    store.create(4, 8);
    assert!(store.exists(4));
    store.clear(4);
    assert!(!store.exists(4));
}

#[test]
fn test_clear_blocks_keeps_key() {
    let mut store = BufferStore::new();
    store.create(4, 8);
    store.clear_blocks(4);
    assert!(store.exists(4));
    assert_eq!(store.total_size(4), 0);
}

#[derive(Default)]
struct Recorder {
    single: AtomicBool,
    all: AtomicBool,
}

impl ClearListener for Recorder {
    fn buffer_cleared(&self, id: u16) {
        assert_eq!(id, 5);
        self.single.store(true, Ordering::SeqCst);
    }

    fn store_cleared(&self) {
        self.all.store(true, Ordering::SeqCst);
    }
}

#[test]
fn test_clear_notifies_listeners() {
    let recorder = Arc::new(Recorder::default());
    let mut store = BufferStore::new();
    store.register_listener(recorder.clone());

    store.create(5, 4);
    store.clear(5);
    assert!(recorder.single.load(Ordering::SeqCst));
    assert!(!recorder.all.load(Ordering::SeqCst));

    store.create(6, 4);
    store.clear(RESERVED_ID);
    assert!(recorder.all.load(Ordering::SeqCst));
    assert!(store.is_empty());
}

#[test]
fn test_clear_missing_buffer_does_not_notify() {
    let recorder = Arc::new(Recorder::default());
    let mut store = BufferStore::new();
    store.register_listener(recorder.clone());
    store.clear(5);
    assert!(!recorder.single.load(Ordering::SeqCst));
}

#[test]
fn test_blocks_are_shared_by_reference() {
    let mut store = BufferStore::new();
    store.append(1, Arc::new(Block::from_vec(vec![0xAA, 0xBB])));
    let shared = store.blocks_cloned(1).unwrap();
    shared[0].set(0, 0xCC);
    assert_eq!(store.blocks(1).unwrap()[0].snapshot(), vec![0xCC, 0xBB]);
}

#[test]
fn test_serial_source_reports_available() {
    let mut source = source_with(&[1, 2, 3]);
    assert_eq!(source.available(), 3);
    assert_eq!(source.read_byte(), Some(1));
    assert_eq!(source.available(), 2);
}
