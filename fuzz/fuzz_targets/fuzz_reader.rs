//! Fuzz target for the typed reader operations.
//!
//! Drives a reader over arbitrary input with an arbitrary sequence of
//! typed reads. No sequence may panic, and reads keep working after an
//! error.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use resp3::{Reader, ReaderOptions};

#[derive(Arbitrary, Debug)]
enum Op {
    Peek,
    ArrayHeader,
    AttributeHeader,
    MapHeader,
    PushHeader,
    SetHeader,
    BlobString,
    BlobError,
    BlobChunk,
    BlobChunks,
    VerbatimString,
    SimpleString,
    SimpleError,
    BigNumber,
    Boolean,
    Double,
    Integer,
    End,
    Null,
}

#[derive(Arbitrary, Debug)]
struct Input {
    limit: i16,
    buffer_size: u8,
    ops: Vec<Op>,
    data: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let options = ReaderOptions::new()
        .single_read_size_limit(i64::from(input.limit))
        .buffer_size(usize::from(input.buffer_size));
    let mut reader = Reader::with_options(&input.data[..], options);
    let mut buf = Vec::new();

    for op in input.ops.iter().take(64) {
        buf.clear();
        let _ = match op {
            Op::Peek => reader.peek().map(drop),
            Op::ArrayHeader => reader.read_array_header().map(drop),
            Op::AttributeHeader => reader.read_attribute_header().map(drop),
            Op::MapHeader => reader.read_map_header().map(drop),
            Op::PushHeader => reader.read_push_header().map(drop),
            Op::SetHeader => reader.read_set_header().map(drop),
            Op::BlobString => reader.read_blob_string(&mut buf).map(drop),
            Op::BlobError => reader.read_blob_error(&mut buf).map(drop),
            Op::BlobChunk => reader.read_blob_chunk(&mut buf).map(drop),
            Op::BlobChunks => reader.read_blob_chunks(&mut buf),
            Op::VerbatimString => reader.read_verbatim_string(&mut buf).map(drop),
            Op::SimpleString => reader.read_simple_string(&mut buf),
            Op::SimpleError => reader.read_simple_error(&mut buf),
            Op::BigNumber => reader.read_big_number().map(drop),
            Op::Boolean => reader.read_boolean().map(drop),
            Op::Double => reader.read_double().map(drop),
            Op::Integer => reader.read_integer().map(drop),
            Op::End => reader.read_end(),
            Op::Null => reader.read_null(),
        };
    }
});
