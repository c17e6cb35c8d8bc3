//! Skipping values without materializing them.
//!
//! [`Reader::discard`] consumes the next value of any type. Blob bodies
//! and simple lines are skipped in place; scalars are decoded into the
//! reader's scratch buffer and dropped so their grammar is still checked.
//!
//! Every call either consumes at least one byte or fails, and nesting is
//! bounded by [`ReaderOptions::max_depth`](crate::ReaderOptions::max_depth).

use super::reader::Reader;
use super::{Length, Type, responses};
use crate::error::{Error, ProtocolError, Result};
use std::io::Read;
use tracing::{debug, trace};

impl<R: Read> Reader<R> {
    /// Consume the next value, returning its type.
    ///
    /// With `recursive` set, nested values of aggregates and the chunks of
    /// streamed blobs are consumed too. Without it only the header is read,
    /// which lets a caller that already knows an aggregate's length hand
    /// each element to `discard` separately.
    ///
    /// Returns [`Error::Eof`] when the source is exhausted before the value
    /// starts. Stops at the first error without resynchronizing.
    ///
    /// ```
    /// use resp3::{Reader, Type};
    ///
    /// let mut reader = Reader::new(&b"*2\r\n+a\r\n*1\r\n:1\r\n:42\r\n"[..]);
    /// assert_eq!(reader.discard(true)?, Type::Array);
    /// assert_eq!(reader.read_integer()?, 42);
    /// # Ok::<(), resp3::Error>(())
    /// ```
    pub fn discard(&mut self, recursive: bool) -> Result<Type> {
        self.discard_at(0, recursive)
    }

    fn discard_at(&mut self, depth: usize, recursive: bool) -> Result<Type> {
        let max = self.options().max_depth;
        if depth > max {
            debug!(depth, max, "discard nesting too deep");
            return Err(ProtocolError::NestingTooDeep(max).into());
        }

        let ty = self.peek()?;
        trace!(%ty, depth, recursive, "discard");

        match ty {
            Type::Array | Type::Attribute | Type::Map | Type::Push | Type::Set => {
                let len = self.read_aggregate_header(ty)?;
                if recursive {
                    self.discard_elements(ty, len, depth + 1)?;
                }
            }
            Type::BlobError | Type::BlobString => {
                if self.consume_stream_header(ty)? {
                    if recursive {
                        self.discard_chunks()?;
                    }
                } else {
                    self.read_blob(ty, None)?;
                }
            }
            Type::BlobChunk => {
                if recursive {
                    self.discard_chunks()?;
                } else {
                    self.discard_chunk()?;
                }
            }
            Type::SimpleError | Type::SimpleString => {
                self.expect(ty)?;
                self.read_line_to(None)?;
            }
            Type::BigNumber => {
                self.with_scratch(|rr, line| rr.read_big_number_line(line))?;
            }
            Type::Boolean => {
                self.read_boolean()?;
            }
            Type::Double => {
                self.read_double()?;
            }
            Type::Integer => {
                self.read_integer()?;
            }
            Type::VerbatimString => {
                self.with_scratch(|rr, buf| rr.read_verbatim_string(buf))?;
            }
            Type::End => self.read_end()?,
            Type::Null => self.read_null()?,
        }

        Ok(ty)
    }

    /// Discard a value that must be present, such as an aggregate element.
    fn discard_nested(&mut self, depth: usize) -> Result<Type> {
        match self.discard_at(depth, true) {
            Err(Error::Eof) => Err(ProtocolError::eol("expected value, got EOF").into()),
            other => other,
        }
    }

    fn discard_elements(&mut self, ty: Type, len: Length, depth: usize) -> Result<()> {
        match len {
            Length::Known(n) => {
                let n = match ty {
                    Type::Map | Type::Attribute => n.saturating_mul(2),
                    _ => n,
                };
                for _ in 0..n {
                    self.discard_nested(depth)?;
                }
            }
            Length::Streamed => while self.discard_nested(depth)? != Type::End {},
        }
        Ok(())
    }

    /// Discard one blob chunk, returning true if it was the last one.
    fn discard_chunk(&mut self) -> Result<bool> {
        if self.consume_literal(responses::LAST_CHUNK)? {
            return Ok(true);
        }
        self.read_blob(Type::BlobChunk, None)?;
        Ok(false)
    }

    fn discard_chunks(&mut self) -> Result<()> {
        while !self.discard_chunk()? {}
        Ok(())
    }
}
