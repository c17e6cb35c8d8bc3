//! Property-based tests using proptest.
//!
//! These tests verify invariants that should always hold,
//! helping find edge cases that unit tests might miss.

use num_bigint::BigInt;
use proptest::prelude::*;
use resp3::{Error, Reader, ReaderOptions, Type, Value, Writer};

/// Generate single-line payloads (no CR or LF)
fn arb_line() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
        .prop_map(|v| v.into_iter().filter(|&b| b != b'\r' && b != b'\n').collect::<Vec<u8>>())
}

/// Generate binary-safe payloads
fn arb_blob() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Generate doubles that compare equal to themselves
fn arb_double() -> impl Strategy<Value = f64> {
    prop::num::f64::NORMAL
        | prop::num::f64::SUBNORMAL
        | prop::num::f64::ZERO
        | prop::num::f64::INFINITE
}

/// Generate big numbers well outside the i64 range
fn arb_big_number() -> impl Strategy<Value = BigInt> {
    (any::<i128>(), any::<u64>()).prop_map(|(hi, lo)| (BigInt::from(hi) << 64) + lo)
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        arb_line().prop_map(|s| Value::SimpleString(s.into())),
        arb_line().prop_map(|s| Value::SimpleError(s.into())),
        arb_blob().prop_map(|b| Value::BlobString(b.into())),
        arb_blob().prop_map(|b| Value::BlobError(b.into())),
        ("[a-z]{3}", arb_blob()).prop_map(|(format, text)| {
            let format: [u8; 3] = format.as_bytes().try_into().unwrap();
            Value::VerbatimString { format, text: text.into() }
        }),
        any::<i64>().prop_map(Value::Integer),
        arb_double().prop_map(Value::Double),
        arb_big_number().prop_map(Value::BigNumber),
        any::<bool>().prop_map(Value::Boolean),
        Just(Value::Null),
    ]
}

/// Generate arbitrary value trees
fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Push),
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Set),
            prop::collection::vec((inner.clone(), inner.clone()), 0..8).prop_map(Value::Map),
            prop::collection::vec((inner.clone(), inner), 0..4).prop_map(Value::Attribute),
        ]
    })
}

fn encode(value: &Value) -> Vec<u8> {
    let mut writer = Writer::new(Vec::new());
    writer.write_value(value).unwrap();
    writer.into_inner()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Writing a decoded value reproduces the original bytes
    #[test]
    fn prop_value_roundtrip(value in arb_value()) {
        let wire = encode(&value);
        let decoded = Reader::new(&wire[..]).read_value().unwrap();
        prop_assert_eq!(&decoded, &value);
        prop_assert_eq!(encode(&decoded), wire);
    }

    /// Integers survive a write/read cycle exactly
    #[test]
    fn prop_integer_roundtrip(n in any::<i64>()) {
        let mut writer = Writer::new(Vec::new());
        writer.write_integer(n).unwrap();
        prop_assert_eq!(Reader::new(&writer.get_ref()[..]).read_integer().unwrap(), n);
    }

    /// Peek never moves the stream
    #[test]
    fn prop_peek_is_idempotent(value in arb_value()) {
        let wire = encode(&value);
        let mut reader = Reader::new(&wire[..]);
        let first = reader.peek().unwrap();
        prop_assert_eq!(reader.peek().unwrap(), first);
        prop_assert_eq!(first, value.value_type());
        prop_assert_eq!(reader.read_value().unwrap(), value);
    }

    /// Recursive discard consumes exactly one value
    #[test]
    fn prop_discard_progress(first in arb_value(), second in arb_value()) {
        let mut wire = encode(&first);
        wire.extend_from_slice(&encode(&second));

        let mut reader = Reader::new(&wire[..]);
        prop_assert_eq!(reader.discard(true).unwrap(), first.value_type());
        prop_assert_eq!(reader.read_value().unwrap(), second);
        prop_assert!(reader.peek().unwrap_err().is_eof());
    }

    /// Chunked blobs decode to the concatenation of their chunks
    #[test]
    fn prop_chunked_blob(chunks in prop::collection::vec(
        prop::collection::vec(any::<u8>(), 1..64), 0..16
    )) {
        let mut writer = Writer::new(Vec::new());
        writer.write_blob_string_stream_header().unwrap();
        for chunk in &chunks {
            writer.write_blob_chunk(chunk).unwrap();
        }
        writer.write_blob_chunk(b"").unwrap();

        let decoded = Reader::new(&writer.get_ref()[..]).read_value().unwrap();
        prop_assert_eq!(decoded, Value::blob(chunks.concat()));
    }

    /// Arbitrary input never panics and always terminates
    #[test]
    fn prop_malformed_input_is_safe(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let options = ReaderOptions::new().single_read_size_limit(1024).max_depth(32);

        let mut reader = Reader::with_options(&data[..], options);
        for _ in 0..=data.len() {
            match reader.read_value() {
                Ok(_) => {}
                Err(Error::Eof) => break,
                Err(e) => {
                    prop_assert!(e.as_protocol().is_some());
                    break;
                }
            }
        }

        let mut reader = Reader::with_options(&data[..], options);
        for _ in 0..=data.len() {
            if reader.discard(true).is_err() {
                break;
            }
        }
    }

    /// Every strict prefix of a value is rejected as incomplete
    #[test]
    fn prop_truncated_value_is_framing_error(value in arb_value(), cut in any::<prop::sample::Index>()) {
        let wire = encode(&value);
        let cut = cut.index(wire.len());
        prop_assume!(cut > 0);

        let err = Reader::new(&wire[..cut]).read_value().unwrap_err();
        prop_assert!(!err.is_eof());
        let kind = err.kind();
        prop_assert!(
            matches!(kind, resp3::ErrorKind::Framing | resp3::ErrorKind::Grammar),
            "unexpected {:?} for {:?}", kind, Type::from_byte(wire[0])
        );
    }
}
