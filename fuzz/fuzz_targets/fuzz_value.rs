//! Fuzz target for value trees.
//!
//! Decodes arbitrary input as values; anything that decodes and encodes
//! again must decode back to the same tree.

#![no_main]

use libfuzzer_sys::fuzz_target;
use resp3::{ProtocolError, Reader, ReaderOptions, Writer};

fuzz_target!(|data: &[u8]| {
    let options = ReaderOptions::new().single_read_size_limit(4096).max_depth(64);
    let mut reader = Reader::with_options(data, options);

    while let Ok(value) = reader.read_value() {
        let mut writer = Writer::new(Vec::new());
        if let Err(e) = writer.write_value(&value) {
            // simple lines may carry a bare CR on the wire
            assert_eq!(e.as_protocol(), Some(&ProtocolError::InvalidSimpleValue));
            continue;
        }

        let decoded = Reader::with_options(&writer.get_ref()[..], options)
            .read_value()
            .expect("encoded value must decode");
        // NaN never compares equal to itself
        if format!("{value:?}").contains("NaN") {
            continue;
        }
        assert_eq!(decoded, value);
    }
});
