//! Fuzz target for discard.
//!
//! Discards values from arbitrary input until it is exhausted or
//! rejected. Every successful call must consume input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use resp3::{Reader, ReaderOptions};

fuzz_target!(|data: &[u8]| {
    let options = ReaderOptions::new().single_read_size_limit(4096);
    for recursive in [true, false] {
        let mut reader = Reader::with_options(data, options);
        let mut remaining = data.len() + 1;
        while reader.discard(recursive).is_ok() {
            let left = reader.buffer().len() + reader.get_ref().len();
            assert!(left < remaining, "discard made no progress");
            remaining = left;
        }
    }
});
