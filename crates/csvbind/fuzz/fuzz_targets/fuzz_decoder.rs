//! Fuzz target for the row decoder.
//!
//! This fuzzer tests that decoding:
//! 1. Never panics on malformed input
//! 2. Always terminates (every call consumes a row or ends the stream)

#![no_main]

use libfuzzer_sys::fuzz_target;
use csvbind::{record, CodecConfig, Decoder};

#[derive(Debug, Default)]
struct Target {
    id: i64,
    name: String,
    weight: f64,
    flags: Vec<bool>,
    parts: Vec<String>,
}

record!(Target {
    id => "id",
    name => "name,label",
    weight => "weight,limit=4",
    flags => "flags",
    parts => "part,span=3",
});

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    let Ok(decoder) = Decoder::from_reader(data, CodecConfig::default()) else {
        return;
    };
    for result in decoder.records::<Target>() {
        let _ = result;
    }
});
