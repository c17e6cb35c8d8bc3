//! Blocking RESP3 reader.
//!
//! The reader is built around a one-value lookahead: [`Reader::peek`]
//! classifies the next value without consuming it, and the caller picks
//! the matching `read_*` method. Payloads are appended to caller-supplied
//! buffers so a connection can decode many replies without allocating.
//!
//! # Security
//!
//! - Every length-prefixed or line read is checked against the single
//!   read size limit before any byte of it is buffered.
//! - Integers are folded with checked arithmetic and fail on overflow.
//! - Hostile lengths never cause a large up-front allocation.

use super::responses;
use super::source::Source;
use super::{CRLF, Length, Type, VERBATIM_PREFIX_LEN};
use crate::config::ReaderOptions;
use crate::error::{Error, ProtocolError, Result};
use memchr::memchr;
use num_bigint::BigInt;
use std::io::Read;
use tracing::{debug, trace};

/// Scratch capacity kept across calls; anything larger is released.
const MAX_RETAINED_SCRATCH: usize = 64 * 1024;

/// Reader for RESP3 values from a blocking byte source.
///
/// # Usage
///
/// ```
/// use resp3::{Length, Reader, Type};
///
/// let mut reader = Reader::new(&b"*2\r\n$3\r\nfoo\r\n:42\r\n"[..]);
/// assert_eq!(reader.read_array_header()?, Length::Known(2));
///
/// let mut buf = Vec::new();
/// reader.read_blob_string(&mut buf)?;
/// assert_eq!(buf, b"foo");
///
/// assert_eq!(reader.peek()?, Type::Integer);
/// assert_eq!(reader.read_integer()?, 42);
/// # Ok::<(), resp3::Error>(())
/// ```
///
/// A reader must not be shared between callers; every method takes
/// `&mut self`.
#[derive(Debug)]
pub struct Reader<R> {
    src: Source<R>,
    scratch: Vec<u8>,
    options: ReaderOptions,
}

impl<R: Read> Reader<R> {
    /// Create a reader with default options.
    pub fn new(inner: R) -> Self {
        Self::with_options(inner, ReaderOptions::default())
    }

    /// Create a reader with the given options.
    pub fn with_options(inner: R, options: ReaderOptions) -> Self {
        Self {
            src: Source::new(inner, options.buffer_size),
            scratch: Vec::new(),
            options,
        }
    }

    /// Current options.
    #[inline]
    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Replace the options. Takes effect on the next read.
    pub fn set_options(&mut self, options: ReaderOptions) {
        self.src.set_fill_size(options.buffer_size);
        self.options = options;
    }

    /// Configured single read size limit (0 = default, negative = unlimited).
    #[inline]
    pub fn single_read_size_limit(&self) -> i64 {
        self.options.single_read_size_limit
    }

    /// Set the single read size limit (0 = default, negative = unlimited).
    #[inline]
    pub fn set_single_read_size_limit(&mut self, limit: i64) {
        self.options.single_read_size_limit = limit;
    }

    /// Rebind the reader to a new source, returning the previous one.
    ///
    /// Buffered lookahead and scratch state are dropped; options are kept.
    pub fn reset(&mut self, inner: R) -> R {
        trace!(dropped = self.src.buffered().len(), "reader reset");
        self.scratch.clear();
        self.scratch.shrink_to(MAX_RETAINED_SCRATCH);
        self.src.reset(inner)
    }

    /// Bytes already read from the source but not yet consumed.
    #[inline]
    pub fn buffer(&self) -> &[u8] {
        self.src.buffered()
    }

    /// Get a reference to the underlying source.
    pub fn get_ref(&self) -> &R {
        self.src.get_ref()
    }

    /// Get a mutable reference to the underlying source.
    ///
    /// Reading from it directly skips whatever is in [`buffer`](Self::buffer).
    pub fn get_mut(&mut self) -> &mut R {
        self.src.get_mut()
    }

    /// Consume the reader, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.src.into_inner()
    }

    // ─── Lookahead ──────────────────────────────────────────────────────────

    /// Type of the next value, as given by its lead byte alone.
    fn peek_raw(&mut self) -> Result<Type> {
        match self.src.peek(1)?.first() {
            None => Err(Error::Eof),
            Some(&b) => Type::from_byte(b).ok_or_else(|| ProtocolError::InvalidType(b).into()),
        }
    }

    /// Return the type of the next value without consuming it.
    ///
    /// For RESP2 compatibility an array or blob string with length -1 is
    /// reported as [`Type::Null`]; [`read_null`](Self::read_null) accepts
    /// the same shape.
    ///
    /// Returns [`Error::Eof`] when the source is exhausted.
    pub fn peek(&mut self) -> Result<Type> {
        let ty = self.peek_raw()?;
        if self.at_legacy_null(ty).is_some() {
            return Ok(Type::Null);
        }
        Ok(ty)
    }

    /// Length of the RESP2 null of type `ty` if it is next.
    ///
    /// Only a length starting with `-` is looked at further, so a complete
    /// `*0\r\n` never waits on bytes past its end. A short or failed
    /// lookahead means no legacy null.
    fn at_legacy_null(&mut self, ty: Type) -> Option<usize> {
        let null = responses::legacy_null(ty)?;
        match self.src.peek(2) {
            Ok(&[_, b'-']) => {}
            _ => return None,
        }
        match self.src.peek(null.len()) {
            Ok(next) if next == null => Some(null.len()),
            _ => None,
        }
    }

    /// Check whether the next bytes equal `lit`, without consuming them.
    pub(super) fn match_literal(&mut self, lit: &[u8]) -> Result<bool> {
        Ok(self.src.peek(lit.len())? == lit)
    }

    /// Consume `lit` if the next bytes equal it.
    pub(super) fn consume_literal(&mut self, lit: &[u8]) -> Result<bool> {
        if self.match_literal(lit)? {
            self.src.consume(lit.len());
            return Ok(true);
        }
        Ok(false)
    }

    /// Consume the `<type>?\r\n` header if it is next.
    pub(super) fn consume_stream_header(&mut self, ty: Type) -> Result<bool> {
        match responses::stream_header(ty) {
            Some(header) => self.consume_literal(header),
            None => Ok(false),
        }
    }

    /// Consume the lead byte of a value of type `ty`.
    pub(super) fn expect(&mut self, ty: Type) -> Result<()> {
        let got = match self.peek_raw() {
            Err(Error::Eof) => {
                return Err(ProtocolError::eol(format!("expected value of type {ty:?}, got EOF")).into());
            }
            other => other?,
        };
        if got != ty {
            return Err(ProtocolError::UnexpectedType { expected: ty, got }.into());
        }
        self.src.consume(1);
        Ok(())
    }

    // ─── Primitives ─────────────────────────────────────────────────────────

    pub(super) fn check_size_limit(&self, size: u64) -> Result<()> {
        match self.options.effective_size_limit() {
            Some(limit) if size > limit => {
                debug!(size, limit, "single read size limit exceeded");
                Err(ProtocolError::SizeLimitExceeded { size, limit }.into())
            }
            _ => Ok(()),
        }
    }

    pub(super) fn read_eol(&mut self) -> Result<()> {
        let b = self.src.peek(CRLF.len())?;
        if b != CRLF {
            let msg = if b.len() < CRLF.len() {
                "expected \\r\\n, got EOF".to_string()
            } else {
                format!("expected \\r\\n, got {:?}", String::from_utf8_lossy(b))
            };
            return Err(ProtocolError::UnexpectedEol(msg).into());
        }
        self.src.consume(CRLF.len());
        Ok(())
    }

    /// Read a signed 64-bit integer terminated by CRLF.
    ///
    /// Digits are consumed one at a time so overflow is reported as soon as
    /// it happens. Only a leading `-` is accepted as sign.
    pub(super) fn read_number(&mut self) -> Result<i64> {
        let mut n: i64 = 0;
        let mut neg = false;
        let mut i = 0usize;
        loop {
            let b = match self.src.peek(1)?.first() {
                Some(&b) => b,
                None => return Err(ProtocolError::eol("expected number, got EOF").into()),
            };
            match b {
                b'-' if i == 0 => neg = true,
                b'0'..=b'9' => {
                    let digit = i64::from(b - b'0');
                    // negatives accumulate downwards so i64::MIN is reachable
                    n = n
                        .checked_mul(10)
                        .and_then(|n| if neg { n.checked_sub(digit) } else { n.checked_add(digit) })
                        .ok_or(ProtocolError::NumberOverflow)?;
                }
                b'\r' | b'\n' => break,
                _ => return Err(ProtocolError::InvalidNumber(char::from(b)).into()),
            }
            self.src.consume(1);
            i += 1;
        }
        self.read_eol()?;
        if i == 0 || (i == 1 && neg) {
            return Err(ProtocolError::eol("expected number, got empty value").into());
        }
        Ok(n)
    }

    /// Read one CRLF-terminated line, appending it without the terminator
    /// to `dst`, or skipping it when `dst` is `None`.
    ///
    /// The size limit is checked on every chunk so an endless line fails
    /// once it passes the limit instead of growing without bound.
    pub(super) fn read_line_to(&mut self, mut dst: Option<&mut Vec<u8>>) -> Result<()> {
        let mut total = 0usize;
        let mut prev_last = None;
        loop {
            let (take, done, tail) = {
                let buf = self.src.fill_buf()?;
                if buf.is_empty() {
                    return Err(ProtocolError::eol("expected \\r\\n, got EOF").into());
                }
                match memchr(b'\n', buf) {
                    Some(i) => (i + 1, true, i.checked_sub(1).map(|j| buf[j])),
                    None => (buf.len(), false, buf.last().copied()),
                }
            };

            total += take;
            self.check_size_limit(total.saturating_sub(CRLF.len()) as u64)?;
            if let Some(dst) = dst.as_deref_mut() {
                dst.extend_from_slice(&self.src.buffered()[..take]);
            }
            self.src.consume(take);

            if done {
                // the byte before \n may have arrived with the previous chunk
                let before_lf = if take > 1 { tail } else { prev_last };
                if total < CRLF.len() || before_lf != Some(b'\r') {
                    return Err(ProtocolError::eol("line not terminated by \\r\\n").into());
                }
                if let Some(dst) = dst.as_deref_mut() {
                    dst.truncate(dst.len() - CRLF.len());
                }
                return Ok(());
            }
            prev_last = tail;
        }
    }

    /// Read `n` body bytes plus CRLF, appending them to `dst` or skipping
    /// them when `dst` is `None`.
    pub(super) fn read_blob_body(&mut self, mut dst: Option<&mut Vec<u8>>, n: u64) -> Result<()> {
        self.check_size_limit(n)?;
        let mut remaining = usize::try_from(n).map_err(|_| ProtocolError::SizeLimitExceeded {
            size: n,
            limit: usize::MAX as u64,
        })?;
        if let Some(dst) = dst.as_deref_mut() {
            dst.reserve(remaining.min(self.src.buffered().len()));
        }
        while remaining > 0 {
            let buf = self.src.fill_buf()?;
            if buf.is_empty() {
                return Err(
                    ProtocolError::eol(format!("expected {remaining} more bytes, got EOF")).into(),
                );
            }
            let take = remaining.min(buf.len());
            if let Some(dst) = dst.as_deref_mut() {
                dst.extend_from_slice(&buf[..take]);
            }
            self.src.consume(take);
            remaining -= take;
        }
        self.read_eol()
    }

    /// Read a non-streamed blob of type `ty`, returning its length.
    pub(super) fn read_blob(&mut self, ty: Type, dst: Option<&mut Vec<u8>>) -> Result<u64> {
        self.expect(ty)?;
        let n = self.read_number()?;
        let n = u64::try_from(n).map_err(|_| ProtocolError::InvalidBlobLength(n))?;
        self.read_blob_body(dst, n)?;
        Ok(n)
    }

    pub(super) fn read_aggregate_header(&mut self, ty: Type) -> Result<Length> {
        if self.consume_stream_header(ty)? {
            return Ok(Length::Streamed);
        }
        self.expect(ty)?;
        let n = match self.read_number() {
            Err(Error::Protocol(ProtocolError::InvalidNumber(_))) => {
                return Err(ProtocolError::InvalidAggregateLength.into());
            }
            other => other?,
        };
        u64::try_from(n)
            .map(Length::Known)
            .map_err(|_| ProtocolError::InvalidAggregateLength.into())
    }

    fn read_streamable_blob(&mut self, ty: Type, dst: &mut Vec<u8>) -> Result<Length> {
        appending(self, dst, |rr, dst| {
            if rr.consume_stream_header(ty)? {
                return Ok(Length::Streamed);
            }
            rr.read_blob(ty, Some(dst)).map(Length::Known)
        })
    }

    fn read_simple(&mut self, ty: Type, dst: &mut Vec<u8>) -> Result<()> {
        appending(self, dst, |rr, dst| {
            rr.expect(ty)?;
            rr.read_line_to(Some(dst))
        })
    }

    /// Run `f` with the reusable scratch buffer, cleared.
    pub(super) fn with_scratch<T>(
        &mut self,
        f: impl FnOnce(&mut Self, &mut Vec<u8>) -> Result<T>,
    ) -> Result<T> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        let result = f(self, &mut scratch);
        if scratch.capacity() > MAX_RETAINED_SCRATCH {
            scratch.clear();
            scratch.shrink_to(MAX_RETAINED_SCRATCH);
        }
        self.scratch = scratch;
        result
    }

    // ─── Aggregate headers ──────────────────────────────────────────────────

    /// Read an array header.
    pub fn read_array_header(&mut self) -> Result<Length> {
        self.read_aggregate_header(Type::Array)
    }

    /// Read an attribute header. A known length counts key-value pairs.
    pub fn read_attribute_header(&mut self) -> Result<Length> {
        self.read_aggregate_header(Type::Attribute)
    }

    /// Read a map header. A known length counts key-value pairs.
    pub fn read_map_header(&mut self) -> Result<Length> {
        self.read_aggregate_header(Type::Map)
    }

    /// Read a push header.
    pub fn read_push_header(&mut self) -> Result<Length> {
        self.read_aggregate_header(Type::Push)
    }

    /// Read a set header.
    pub fn read_set_header(&mut self) -> Result<Length> {
        self.read_aggregate_header(Type::Set)
    }

    // ─── Blobs ──────────────────────────────────────────────────────────────

    /// Read a blob string, appending its body to `dst`.
    ///
    /// Returns [`Length::Streamed`] without appending anything if the
    /// string is sent in chunks; read them with
    /// [`read_blob_chunks`](Self::read_blob_chunks).
    ///
    /// On error `dst` is restored to its original length.
    pub fn read_blob_string(&mut self, dst: &mut Vec<u8>) -> Result<Length> {
        self.read_streamable_blob(Type::BlobString, dst)
    }

    /// Read a blob error, appending its body to `dst`.
    ///
    /// Behaves like [`read_blob_string`](Self::read_blob_string).
    pub fn read_blob_error(&mut self, dst: &mut Vec<u8>) -> Result<Length> {
        self.read_streamable_blob(Type::BlobError, dst)
    }

    /// Read one blob chunk, appending it to `dst`.
    ///
    /// Returns true for the zero-length chunk that ends the stream.
    pub fn read_blob_chunk(&mut self, dst: &mut Vec<u8>) -> Result<bool> {
        if self.consume_literal(responses::LAST_CHUNK)? {
            return Ok(true);
        }
        appending(self, dst, |rr, dst| rr.read_blob(Type::BlobChunk, Some(dst)))?;
        Ok(false)
    }

    /// Read blob chunks up to and including the last one, appending all of
    /// them to `dst`.
    pub fn read_blob_chunks(&mut self, dst: &mut Vec<u8>) -> Result<()> {
        appending(self, dst, |rr, dst| {
            while !rr.read_blob_chunk(dst)? {}
            Ok(())
        })
    }

    /// Read a verbatim string, appending its body to `dst` and returning
    /// the 3-byte format prefix.
    ///
    /// ```
    /// use resp3::Reader;
    ///
    /// let mut reader = Reader::new(&b"=9\r\ntxt:hello\r\n"[..]);
    /// let mut body = Vec::new();
    /// assert_eq!(&reader.read_verbatim_string(&mut body)?, b"txt");
    /// assert_eq!(body, b"hello");
    /// # Ok::<(), resp3::Error>(())
    /// ```
    pub fn read_verbatim_string(&mut self, dst: &mut Vec<u8>) -> Result<[u8; VERBATIM_PREFIX_LEN]> {
        appending(self, dst, |rr, dst| {
            let start = dst.len();
            rr.read_blob(Type::VerbatimString, Some(dst))?;
            let value = &dst[start..];
            if value.len() <= VERBATIM_PREFIX_LEN || value[VERBATIM_PREFIX_LEN] != b':' {
                let shown = &value[..value.len().min(VERBATIM_PREFIX_LEN * VERBATIM_PREFIX_LEN + 1)];
                return Err(ProtocolError::InvalidVerbatimString(
                    String::from_utf8_lossy(shown).into_owned(),
                )
                .into());
            }
            let prefix = [value[0], value[1], value[2]];
            dst.drain(start..=start + VERBATIM_PREFIX_LEN);
            Ok(prefix)
        })
    }

    // ─── Simple values ──────────────────────────────────────────────────────

    /// Read a simple string, appending it to `dst`.
    pub fn read_simple_string(&mut self, dst: &mut Vec<u8>) -> Result<()> {
        self.read_simple(Type::SimpleString, dst)
    }

    /// Read a simple error, appending it to `dst`.
    pub fn read_simple_error(&mut self, dst: &mut Vec<u8>) -> Result<()> {
        self.read_simple(Type::SimpleError, dst)
    }

    // ─── Scalars ────────────────────────────────────────────────────────────

    /// Read a big number.
    ///
    /// Accepts an optional `+` or `-` sign followed by decimal digits.
    pub fn read_big_number(&mut self) -> Result<BigInt> {
        self.with_scratch(|rr, line| {
            rr.read_big_number_line(line)?;
            BigInt::parse_bytes(line, 10).ok_or_else(|| invalid_big_number(line).into())
        })
    }

    /// Read the text of a big number into `line` and check its digits
    /// without converting it.
    pub(super) fn read_big_number_line(&mut self, line: &mut Vec<u8>) -> Result<()> {
        self.expect(Type::BigNumber)?;
        self.read_line_to(Some(line))?;
        let digits = match line.first() {
            None => return Err(ProtocolError::eol("missing value").into()),
            Some(b'+' | b'-') => &line[1..],
            Some(_) => &line[..],
        };
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return Err(invalid_big_number(line).into());
        }
        Ok(())
    }

    /// Read a boolean.
    pub fn read_boolean(&mut self) -> Result<bool> {
        self.expect(Type::Boolean)?;
        let p = self.src.peek(3)?;
        if p.len() < 3 {
            return Err(ProtocolError::eol("expected boolean, got EOF").into());
        }
        let value = match p[0] {
            b't' => true,
            b'f' => false,
            b => return Err(ProtocolError::InvalidBoolean(b).into()),
        };
        if &p[1..] != CRLF {
            let msg = format!("expected \\r\\n, got {:?}", String::from_utf8_lossy(&p[1..]));
            return Err(ProtocolError::UnexpectedEol(msg).into());
        }
        self.src.consume(3);
        Ok(value)
    }

    /// Read a double.
    ///
    /// Accepts `inf`, `-inf` and `+inf`, an optional leading `+`, and
    /// forms like `1.` and `.5`.
    pub fn read_double(&mut self) -> Result<f64> {
        self.expect(Type::Double)?;
        self.with_scratch(|rr, line| {
            rr.read_line_to(Some(line))?;
            if line.is_empty() {
                return Err(ProtocolError::eol("missing value").into());
            }
            std::str::from_utf8(&line[..])
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| {
                    ProtocolError::InvalidDouble(String::from_utf8_lossy(line).into_owned()).into()
                })
        })
    }

    /// Read an integer.
    ///
    /// A leading `+` is rejected, unlike for big numbers and doubles.
    pub fn read_integer(&mut self) -> Result<i64> {
        self.expect(Type::Integer)?;
        self.read_number()
    }

    /// Read the end marker of a streamed aggregate.
    pub fn read_end(&mut self) -> Result<()> {
        self.expect(Type::End)?;
        self.read_eol()
    }

    /// Read a null.
    ///
    /// The RESP2 forms `*-1\r\n` and `$-1\r\n` are accepted too.
    pub fn read_null(&mut self) -> Result<()> {
        let ty = match self.peek_raw() {
            Err(Error::Eof) => {
                return Err(ProtocolError::eol("expected value of type Null, got EOF").into());
            }
            other => other?,
        };
        if let Some(len) = self.at_legacy_null(ty) {
            self.src.consume(len);
            debug!(%ty, "accepted RESP2 null");
            return Ok(());
        }
        self.expect(Type::Null)?;
        self.read_eol()
    }
}

fn invalid_big_number(line: &[u8]) -> ProtocolError {
    ProtocolError::InvalidBigNumber(String::from_utf8_lossy(line).into_owned())
}

/// Run `f` against `dst`, truncating `dst` back to its original length if
/// `f` fails.
fn appending<R, T>(
    rr: &mut Reader<R>,
    dst: &mut Vec<u8>,
    f: impl FnOnce(&mut Reader<R>, &mut Vec<u8>) -> Result<T>,
) -> Result<T> {
    let len = dst.len();
    let result = f(rr, dst);
    if result.is_err() {
        dst.truncate(len);
    }
    result
}
