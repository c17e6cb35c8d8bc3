//! Buffered lookahead over a blocking byte source.
//!
//! `std::io::BufReader` can only expose whatever happens to be buffered,
//! while the reader needs to look at a fixed number of bytes (up to five,
//! for `$-1\r\n`) without consuming them. `Source` keeps unread bytes in a
//! `BytesMut` and refills it on demand.

use bytes::{Buf, BytesMut};
use std::io::{self, Read};

/// Lookahead cursor over a [`Read`] implementation.
#[derive(Debug)]
pub(crate) struct Source<R> {
    inner: R,
    buffer: BytesMut,
    fill_size: usize,
}

impl<R: Read> Source<R> {
    /// Create a source that requests `fill_size` bytes per read.
    pub(crate) fn new(inner: R, fill_size: usize) -> Self {
        let fill_size = fill_size.max(1);
        Self {
            inner,
            buffer: BytesMut::with_capacity(fill_size),
            fill_size,
        }
    }

    /// Read once from the inner source, appending to the buffer.
    ///
    /// Returns the number of bytes added; zero means end of input.
    fn fill(&mut self) -> io::Result<usize> {
        let start = self.buffer.len();
        self.buffer.resize(start + self.fill_size, 0);
        loop {
            match self.inner.read(&mut self.buffer[start..]) {
                Ok(n) => {
                    self.buffer.truncate(start + n);
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer.truncate(start);
                    return Err(e);
                }
            }
        }
    }

    /// Look at up to `n` bytes without consuming them.
    ///
    /// The returned slice is shorter than `n` only at end of input.
    pub(crate) fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        while self.buffer.len() < n {
            if self.fill()? == 0 {
                break;
            }
        }
        let n = n.min(self.buffer.len());
        Ok(&self.buffer[..n])
    }

    /// Return the buffered bytes, reading more first if none are buffered.
    ///
    /// An empty slice means end of input.
    pub(crate) fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.buffer.is_empty() {
            self.fill()?;
        }
        Ok(&self.buffer)
    }

    /// Drop `n` buffered bytes. `n` must not exceed what was peeked.
    #[inline]
    pub(crate) fn consume(&mut self, n: usize) {
        self.buffer.advance(n);
    }

    /// Bytes read from the inner source but not yet consumed.
    #[inline]
    pub(crate) fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Swap in a new inner source, dropping any buffered bytes.
    pub(crate) fn reset(&mut self, inner: R) -> R {
        self.buffer.clear();
        std::mem::replace(&mut self.inner, inner)
    }

    pub(crate) fn set_fill_size(&mut self, fill_size: usize) {
        self.fill_size = fill_size.max(1);
    }

    pub(crate) fn get_ref(&self) -> &R {
        &self.inner
    }

    pub(crate) fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub(crate) fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Yields its input one byte per read call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.split_first() {
                Some((&b, rest)) if !buf.is_empty() => {
                    buf[0] = b;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut src = Source::new(&b"hello"[..], 4096);
        assert_eq!(src.peek(3).unwrap(), b"hel");
        assert_eq!(src.peek(3).unwrap(), b"hel");
        src.consume(1);
        assert_eq!(src.peek(10).unwrap(), b"ello");
    }

    #[test]
    fn test_peek_across_reads() {
        let mut src = Source::new(Trickle(b"$-1\r\nrest"), 1);
        assert_eq!(src.peek(5).unwrap(), b"$-1\r\n");
        src.consume(5);
        assert_eq!(src.peek(4).unwrap(), b"rest");
    }

    #[test]
    fn test_eof() {
        let mut src = Source::new(&b""[..], 16);
        assert_eq!(src.peek(1).unwrap(), b"");
        assert!(src.fill_buf().unwrap().is_empty());
    }

    #[test]
    fn test_reset_drops_buffer() {
        let mut src = Source::new(&b"abc"[..], 16);
        src.peek(1).unwrap();
        assert_eq!(src.buffered(), b"abc");
        let old = src.reset(&b"xyz"[..]);
        assert!(old.is_empty());
        assert!(src.buffered().is_empty());
        assert_eq!(src.peek(1).unwrap(), b"x");
    }

    #[test]
    fn test_interrupted_is_retried() {
        struct Flaky {
            interrupted: bool,
        }
        impl Read for Flaky {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(io::ErrorKind::Interrupted.into());
                }
                buf[0] = b'!';
                Ok(1)
            }
        }
        let mut src = Source::new(Flaky { interrupted: false }, 8);
        assert_eq!(src.peek(1).unwrap(), b"!");
    }
}
