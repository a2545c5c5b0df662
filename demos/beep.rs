// ABOUTME: Feeds a small command program through the processor and prints the results
// ABOUTME: Run with: cargo run --example beep

use std::sync::Arc;
use std::time::Duration;

use copro::{CollectSink, Context, EngineConfig, StreamProcessor};

fn main() {
    env_logger::init();

    let config = EngineConfig::default();
    let ctx = Context::with_config(&config);
    let sink = Arc::new(CollectSink::new());
    let (feed, source) = config.serial_pair();

    // Store a 4-byte payload in buffer 1, consolidate it, then play a short
    // note on channel 0 with an ADSR volume envelope.
    #[rustfmt::skip]
    let program: &[u8] = &[
        // VDU 23, 0, &A0, 1; 0, 4; data
        23, 0, 0xA0, 1, 0, 0, 4, 0, 0x11, 0x22, 0x33, 0x44,
        // VDU 23, 0, &A0, 1; 14 (consolidate)
        23, 0, 0xA0, 1, 0, 14,
        // VDU 23, 0, &85, 0, 6, 1, attack; decay; sustain, release;
        23, 0, 0x85, 0, 6, 1, 10, 0, 20, 0, 96, 30, 0,
        // VDU 23, 0, &85, 0, 0, volume, frequency; duration;
        23, 0, 0x85, 0, 0, 100, 0xDC, 0x01, 120, 0,
        // VDU 23, 0, &85, 0, 1 (status)
        23, 0, 0x85, 0, 1,
    ];
    feed.send(program);
    drop(feed);

    let mut processor = StreamProcessor::new(Box::new(source), sink.clone(), ctx.clone());
    processor.run();

    let store = ctx.store.lock();
    println!(
        "buffer 1: {} block(s), {} bytes",
        store.blocks(1).map(|b| b.len()).unwrap_or(0),
        store.total_size(1)
    );
    for (kind, payload) in sink.drain() {
        println!("packet {kind:#04x}: {payload:02X?}");
    }

    // Let the channel worker run the note for a moment.
    std::thread::sleep(Duration::from_millis(60));
    if let Some(channel) = ctx.channels.get(0) {
        println!(
            "channel 0 status {:#04x}, volume {}",
            channel.status(),
            channel.current_volume()
        );
    }
}
