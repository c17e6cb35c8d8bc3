//! RESP3 writer.
//!
//! Each operation formats one value into a reusable `BytesMut` and hands
//! it to the sink with a single `write_all`. Values with a fixed encoding
//! are written straight from [`responses`].

use super::{CRLF, Type, VERBATIM_PREFIX_LEN, Value, responses};
use crate::error::{ProtocolError, Result};
use bytes::{BufMut, BytesMut};
use memchr::memchr2;
use num_bigint::BigInt;
use std::fmt::Write as _;
use std::io::Write;

/// Capacity above which the format buffer is released after a write.
const MAX_RETAINED_BUFFER: usize = 64 * 1024;

/// Serializes RESP3 values to a [`Write`] sink.
///
/// The writer does no buffering of its own beyond a single value; wrap
/// the sink in a [`BufWriter`](std::io::BufWriter) and call
/// [`flush`](Self::flush) to batch several values per syscall.
///
/// # Example
///
/// ```
/// use resp3::Writer;
///
/// let mut writer = Writer::new(Vec::new());
/// writer.write_array_header(2)?;
/// writer.write_blob_string(b"GET")?;
/// writer.write_blob_string(b"key")?;
/// assert_eq!(writer.get_ref(), b"*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n");
/// # Ok::<(), resp3::Error>(())
/// ```
#[derive(Debug)]
pub struct Writer<W> {
    inner: W,
    buf: BytesMut,
}

impl<W: Write> Writer<W> {
    /// Create a writer over `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
        }
    }

    /// Replace the sink, returning the previous one.
    pub fn reset(&mut self, inner: W) -> W {
        self.buf.clear();
        std::mem::replace(&mut self.inner, inner)
    }

    /// Flush the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Format a value with `f`, then write it out.
    ///
    /// Nothing reaches the sink if `f` fails.
    fn emit(&mut self, f: impl FnOnce(&mut BytesMut) -> Result<()>) -> Result<()> {
        self.buf.clear();
        let result = f(&mut self.buf).and_then(|()| Ok(self.inner.write_all(&self.buf)?));
        self.buf.clear();
        if self.buf.capacity() > MAX_RETAINED_BUFFER {
            self.buf = BytesMut::new();
        }
        result
    }

    fn write_static(&mut self, bytes: &'static [u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    // ─── Aggregates ─────────────────────────────────────────────────────────

    fn write_header(&mut self, ty: Type, n: i64) -> Result<()> {
        if n == -1 {
            return self.write_stream_header(ty);
        }
        self.emit(|buf| put_header(buf, ty, n))
    }

    fn write_stream_header(&mut self, ty: Type) -> Result<()> {
        match responses::stream_header(ty) {
            Some(header) => self.write_static(header),
            None => Err(ProtocolError::InvalidType(ty.as_byte()).into()),
        }
    }

    /// Write an array header for `n` elements.
    ///
    /// `-1` opens a streamed array, to be closed with
    /// [`write_end`](Self::write_end).
    pub fn write_array_header(&mut self, n: i64) -> Result<()> {
        self.write_header(Type::Array, n)
    }

    /// Write an attribute header for `n` key/value pairs.
    pub fn write_attribute_header(&mut self, n: i64) -> Result<()> {
        self.write_header(Type::Attribute, n)
    }

    /// Write a map header for `n` key/value pairs.
    pub fn write_map_header(&mut self, n: i64) -> Result<()> {
        self.write_header(Type::Map, n)
    }

    /// Write a push header for `n` elements.
    pub fn write_push_header(&mut self, n: i64) -> Result<()> {
        self.write_header(Type::Push, n)
    }

    /// Write a set header for `n` elements.
    pub fn write_set_header(&mut self, n: i64) -> Result<()> {
        self.write_header(Type::Set, n)
    }

    /// Open a streamed array. Close it with [`write_end`](Self::write_end).
    pub fn write_array_stream_header(&mut self) -> Result<()> {
        self.write_stream_header(Type::Array)
    }

    /// Open a streamed attribute.
    pub fn write_attribute_stream_header(&mut self) -> Result<()> {
        self.write_stream_header(Type::Attribute)
    }

    /// Open a streamed map.
    pub fn write_map_stream_header(&mut self) -> Result<()> {
        self.write_stream_header(Type::Map)
    }

    /// Open a streamed push.
    pub fn write_push_stream_header(&mut self) -> Result<()> {
        self.write_stream_header(Type::Push)
    }

    /// Open a streamed set.
    pub fn write_set_stream_header(&mut self) -> Result<()> {
        self.write_stream_header(Type::Set)
    }

    /// Write the terminator of a streamed aggregate.
    pub fn write_end(&mut self) -> Result<()> {
        self.write_static(responses::END)
    }

    // ─── Blobs ──────────────────────────────────────────────────────────────

    /// Write a binary-safe blob string.
    pub fn write_blob_string(&mut self, s: &[u8]) -> Result<()> {
        self.emit(|buf| {
            put_blob(buf, Type::BlobString, s);
            Ok(())
        })
    }

    /// Write a binary-safe blob error.
    pub fn write_blob_error(&mut self, s: &[u8]) -> Result<()> {
        self.emit(|buf| {
            put_blob(buf, Type::BlobError, s);
            Ok(())
        })
    }

    /// Open a streamed blob string. Follow with chunks and a final empty
    /// chunk.
    pub fn write_blob_string_stream_header(&mut self) -> Result<()> {
        self.write_stream_header(Type::BlobString)
    }

    /// Open a streamed blob error.
    pub fn write_blob_error_stream_header(&mut self) -> Result<()> {
        self.write_stream_header(Type::BlobError)
    }

    /// Write one chunk of a streamed blob. An empty chunk ends the stream.
    pub fn write_blob_chunk(&mut self, p: &[u8]) -> Result<()> {
        if p.is_empty() {
            return self.write_static(responses::LAST_CHUNK);
        }
        self.emit(|buf| {
            put_blob(buf, Type::BlobChunk, p);
            Ok(())
        })
    }

    /// Write a verbatim string with a 3-byte format prefix such as `txt`.
    pub fn write_verbatim_string(&mut self, prefix: &[u8], s: &[u8]) -> Result<()> {
        self.emit(|buf| put_verbatim(buf, prefix, s))
    }

    // ─── Simple values ──────────────────────────────────────────────────────

    /// Write a simple string. CR and LF are rejected.
    pub fn write_simple_string(&mut self, s: &[u8]) -> Result<()> {
        self.emit(|buf| put_simple(buf, Type::SimpleString, s))
    }

    /// Write a simple error. CR and LF are rejected.
    pub fn write_simple_error(&mut self, s: &[u8]) -> Result<()> {
        self.emit(|buf| put_simple(buf, Type::SimpleError, s))
    }

    // ─── Scalars ────────────────────────────────────────────────────────────

    /// Write an arbitrary-precision integer.
    pub fn write_big_number(&mut self, n: &BigInt) -> Result<()> {
        self.emit(|buf| {
            put_big_number(buf, n);
            Ok(())
        })
    }

    /// Write `#t` or `#f`.
    pub fn write_boolean(&mut self, b: bool) -> Result<()> {
        self.write_static(if b { responses::TRUE } else { responses::FALSE })
    }

    /// Write a double.
    ///
    /// Finite values use the shortest decimal form that parses back to the
    /// same value, without an exponent.
    pub fn write_double(&mut self, f: f64) -> Result<()> {
        if let Some(special) = special_double(f) {
            return self.write_static(special);
        }
        self.emit(|buf| {
            put_double(buf, f);
            Ok(())
        })
    }

    /// Write a signed 64-bit integer.
    pub fn write_integer(&mut self, n: i64) -> Result<()> {
        self.emit(|buf| {
            put_integer(buf, n);
            Ok(())
        })
    }

    /// Write the RESP3 null `_`.
    pub fn write_null(&mut self) -> Result<()> {
        self.write_static(responses::NULL)
    }

    // ─── Value trees ────────────────────────────────────────────────────────

    /// Write a complete value tree in one write.
    ///
    /// The whole tree is validated before anything reaches the sink.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        self.emit(|buf| value.serialize(buf))
    }
}

// ─── Formatting ─────────────────────────────────────────────────────────────

/// `<ty><n>\r\n` for a known element count.
pub(super) fn put_length(buf: &mut BytesMut, ty: Type, n: usize) {
    let mut temp = itoa::Buffer::new();
    buf.put_u8(ty.as_byte());
    buf.put_slice(temp.format(n).as_bytes());
    buf.put_slice(CRLF);
}

fn put_header(buf: &mut BytesMut, ty: Type, n: i64) -> Result<()> {
    let n = usize::try_from(n).map_err(|_| ProtocolError::InvalidAggregateLength)?;
    put_length(buf, ty, n);
    Ok(())
}

pub(super) fn put_blob(buf: &mut BytesMut, ty: Type, data: &[u8]) {
    buf.reserve(data.len() + 16);
    put_length(buf, ty, data.len());
    buf.put_slice(data);
    buf.put_slice(CRLF);
}

pub(super) fn put_verbatim(buf: &mut BytesMut, prefix: &[u8], s: &[u8]) -> Result<()> {
    if prefix.len() != VERBATIM_PREFIX_LEN {
        return Err(ProtocolError::InvalidVerbatimString(format!(
            "prefix must be {VERBATIM_PREFIX_LEN} bytes, got {:?}",
            String::from_utf8_lossy(prefix)
        ))
        .into());
    }
    buf.reserve(s.len() + 20);
    put_length(buf, Type::VerbatimString, prefix.len() + 1 + s.len());
    buf.put_slice(prefix);
    buf.put_u8(b':');
    buf.put_slice(s);
    buf.put_slice(CRLF);
    Ok(())
}

pub(super) fn put_simple(buf: &mut BytesMut, ty: Type, s: &[u8]) -> Result<()> {
    if memchr2(b'\r', b'\n', s).is_some() {
        return Err(ProtocolError::InvalidSimpleValue.into());
    }
    buf.put_u8(ty.as_byte());
    buf.put_slice(s);
    buf.put_slice(CRLF);
    Ok(())
}

pub(super) fn put_integer(buf: &mut BytesMut, n: i64) {
    let mut temp = itoa::Buffer::new();
    buf.put_u8(Type::Integer.as_byte());
    buf.put_slice(temp.format(n).as_bytes());
    buf.put_slice(CRLF);
}

pub(super) fn put_big_number(buf: &mut BytesMut, n: &BigInt) {
    buf.put_u8(Type::BigNumber.as_byte());
    // fmt::Write for BytesMut never fails
    let _ = write!(buf, "{n}");
    buf.put_slice(CRLF);
}

/// Fixed encodings for infinities and NaN.
pub(super) fn special_double(f: f64) -> Option<&'static [u8]> {
    if f.is_nan() {
        Some(responses::NAN)
    } else if f == f64::INFINITY {
        Some(responses::INF)
    } else if f == f64::NEG_INFINITY {
        Some(responses::NEG_INF)
    } else {
        None
    }
}

pub(super) fn put_double(buf: &mut BytesMut, f: f64) {
    if let Some(special) = special_double(f) {
        buf.put_slice(special);
        return;
    }
    buf.put_u8(Type::Double.as_byte());
    let _ = write!(buf, "{f}");
    buf.put_slice(CRLF);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use std::io;

    fn written(f: impl FnOnce(&mut Writer<Vec<u8>>) -> Result<()>) -> Vec<u8> {
        let mut w = Writer::new(Vec::new());
        f(&mut w).unwrap();
        w.into_inner()
    }

    fn protocol_err(result: Result<()>) -> ProtocolError {
        match result {
            Err(Error::Protocol(e)) => e,
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_write_aggregate_headers() {
        let cases: [(fn(&mut Writer<Vec<u8>>, i64) -> Result<()>, u8); 5] = [
            (Writer::write_array_header, b'*'),
            (Writer::write_attribute_header, b'|'),
            (Writer::write_map_header, b'%'),
            (Writer::write_push_header, b'>'),
            (Writer::write_set_header, b'~'),
        ];
        for (write, lead) in cases {
            for (n, body) in [(0, "0"), (1, "1"), (1234, "1234"), (-1, "?")] {
                let out = written(|w| write(w, n));
                assert_eq!(out, format!("{}{body}\r\n", char::from(lead)).into_bytes());
            }

            let mut w = Writer::new(Vec::new());
            assert_eq!(
                protocol_err(write(&mut w, -2)),
                ProtocolError::InvalidAggregateLength
            );
            assert!(w.get_ref().is_empty());
        }
    }

    #[test]
    fn test_write_stream_headers() {
        let out = written(|w| {
            w.write_array_stream_header()?;
            w.write_attribute_stream_header()?;
            w.write_map_stream_header()?;
            w.write_push_stream_header()?;
            w.write_set_stream_header()?;
            w.write_blob_string_stream_header()?;
            w.write_blob_error_stream_header()?;
            w.write_end()
        });
        assert_eq!(out, b"*?\r\n|?\r\n%?\r\n>?\r\n~?\r\n$?\r\n!?\r\n.\r\n");
    }

    #[test]
    fn test_write_blobs() {
        assert_eq!(written(|w| w.write_blob_string(b"")), b"$0\r\n\r\n");
        assert_eq!(written(|w| w.write_blob_string(b"hello")), b"$5\r\nhello\r\n");
        assert_eq!(
            written(|w| w.write_blob_string(b"a\r\nb")),
            b"$4\r\na\r\nb\r\n"
        );
        assert_eq!(written(|w| w.write_blob_error(b"ERR x")), b"!5\r\nERR x\r\n");
        assert_eq!(written(|w| w.write_blob_chunk(b"")), b";0\r\n");
        assert_eq!(written(|w| w.write_blob_chunk(b"hello")), b";5\r\nhello\r\n");
    }

    #[test]
    fn test_write_verbatim_string() {
        assert_eq!(
            written(|w| w.write_verbatim_string(b"txt", b"Some string")),
            b"=15\r\ntxt:Some string\r\n"
        );
        assert_eq!(written(|w| w.write_verbatim_string(b"mkd", b"")), b"=4\r\nmkd:\r\n");

        for prefix in [&b""[..], b"tx", b"text"] {
            let mut w = Writer::new(Vec::new());
            let err = protocol_err(w.write_verbatim_string(prefix, b"hello"));
            assert!(matches!(err, ProtocolError::InvalidVerbatimString(_)));
            assert!(w.get_ref().is_empty());
        }
    }

    #[test]
    fn test_write_simple() {
        assert_eq!(written(|w| w.write_simple_string(b"OK")), b"+OK\r\n");
        assert_eq!(written(|w| w.write_simple_string(b"")), b"+\r\n");
        assert_eq!(
            written(|w| w.write_simple_error(b"ERR unknown command")),
            b"-ERR unknown command\r\n"
        );

        for bad in [&b"a\rb"[..], b"a\nb", b"\r\n"] {
            let mut w = Writer::new(Vec::new());
            assert_eq!(
                protocol_err(w.write_simple_string(bad)),
                ProtocolError::InvalidSimpleValue
            );
            assert_eq!(
                protocol_err(w.write_simple_error(bad)),
                ProtocolError::InvalidSimpleValue
            );
            assert!(w.get_ref().is_empty());
        }
    }

    #[test]
    fn test_write_scalars() {
        assert_eq!(written(|w| w.write_boolean(true)), b"#t\r\n");
        assert_eq!(written(|w| w.write_boolean(false)), b"#f\r\n");
        assert_eq!(written(|w| w.write_integer(0)), b":0\r\n");
        assert_eq!(written(|w| w.write_integer(-1234)), b":-1234\r\n");
        assert_eq!(
            written(|w| w.write_integer(i64::MIN)),
            b":-9223372036854775808\r\n"
        );
        assert_eq!(written(|w| w.write_null()), b"_\r\n");
        assert_eq!(written(|w| w.write_end()), b".\r\n");
    }

    #[test]
    fn test_write_double() {
        let cases: [(f64, &[u8]); 9] = [
            (0.0, b",0\r\n"),
            (-0.0, b",-0\r\n"),
            (1.0, b",1\r\n"),
            (-1000.1234, b",-1000.1234\r\n"),
            (0.1, b",0.1\r\n"),
            (1e21, b",1000000000000000000000\r\n"),
            (f64::INFINITY, b",inf\r\n"),
            (f64::NEG_INFINITY, b",-inf\r\n"),
            (f64::NAN, b",nan\r\n"),
        ];
        for (f, want) in cases {
            assert_eq!(written(|w| w.write_double(f)), want, "{f}");
        }
    }

    #[test]
    fn test_write_big_number() {
        let n: BigInt = "-12345678901234567890123456789012345678901234567890"
            .parse()
            .unwrap();
        assert_eq!(
            written(|w| w.write_big_number(&n)),
            b"(-12345678901234567890123456789012345678901234567890\r\n"
        );
        assert_eq!(written(|w| w.write_big_number(&BigInt::from(0))), b"(0\r\n");
    }

    #[test]
    fn test_reset_and_flush() {
        let mut w = Writer::new(Vec::new());
        w.write_integer(1).unwrap();
        let old = w.reset(Vec::new());
        assert_eq!(old, b":1\r\n");
        w.write_integer(2).unwrap();
        w.flush().unwrap();
        assert_eq!(w.get_ref(), b":2\r\n");
        w.get_mut().clear();
        w.write_null().unwrap();
        assert_eq!(w.into_inner(), b"_\r\n");
    }

    #[test]
    fn test_large_buffer_is_released() {
        let mut w = Writer::new(io::sink());
        w.write_blob_string(&vec![b'x'; MAX_RETAINED_BUFFER * 2]).unwrap();
        assert!(w.buf.capacity() <= MAX_RETAINED_BUFFER);
    }

    #[test]
    fn test_io_error_propagates() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut w = Writer::new(Broken);
        let err = w.write_integer(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(w.write_null().unwrap_err().kind(), ErrorKind::Io);
    }
}
