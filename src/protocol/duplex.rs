//! Reader and writer over one bidirectional stream.

use super::reader::Reader;
use super::writer::Writer;
use crate::config::ReaderOptions;
use std::io::{Read, Write};
use tracing::trace;

/// A [`Reader`] and a [`Writer`] sharing one connection.
///
/// `S` is a cloneable handle to the connection, such as `&TcpStream`;
/// each half owns its own clone. Use [`split`](Self::split) to drive both
/// halves at once from different threads.
///
/// # Example
///
/// ```no_run
/// use resp3::ReadWriter;
/// use std::net::TcpStream;
///
/// let stream = TcpStream::connect("127.0.0.1:6379")?;
/// let mut conn = ReadWriter::new(&stream);
/// conn.writer().write_array_header(1)?;
/// conn.writer().write_blob_string(b"PING")?;
/// let mut reply = Vec::new();
/// conn.reader().read_simple_string(&mut reply)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct ReadWriter<S> {
    reader: Reader<S>,
    writer: Writer<S>,
}

impl<S: Read + Write + Clone> ReadWriter<S> {
    /// Create a read-writer with default reader options.
    pub fn new(stream: S) -> Self {
        Self::with_options(stream, ReaderOptions::default())
    }

    /// Create a read-writer whose reader uses `options`.
    pub fn with_options(stream: S, options: ReaderOptions) -> Self {
        Self {
            reader: Reader::with_options(stream.clone(), options),
            writer: Writer::new(stream),
        }
    }

    /// Rebind both halves to `stream`, discarding buffered input.
    ///
    /// Reader options are kept.
    pub fn reset(&mut self, stream: S) {
        trace!("resetting read-writer");
        self.reader.reset(stream.clone());
        self.writer.reset(stream);
    }

    pub fn reader(&mut self) -> &mut Reader<S> {
        &mut self.reader
    }

    pub fn writer(&mut self) -> &mut Writer<S> {
        &mut self.writer
    }

    /// Borrow both halves at once.
    pub fn split(&mut self) -> (&mut Reader<S>, &mut Writer<S>) {
        (&mut self.reader, &mut self.writer)
    }

    /// Take the reader and writer apart. Buffered input stays with the
    /// reader.
    pub fn into_parts(self) -> (Reader<S>, Writer<S>) {
        (self.reader, self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    /// In-memory loopback: writes are appended to the data later reads see.
    #[derive(Clone, Default)]
    struct Loopback(Rc<RefCell<io::Cursor<Vec<u8>>>>);

    impl Read for Loopback {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.borrow_mut().read(buf)
        }
    }

    impl Write for Loopback {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut cursor = self.0.borrow_mut();
            cursor.get_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_then_read() {
        let mut rw = ReadWriter::new(Loopback::default());
        rw.writer().write_simple_string(b"PONG").unwrap();
        rw.writer().write_integer(7).unwrap();

        let mut buf = Vec::new();
        rw.reader().read_simple_string(&mut buf).unwrap();
        assert_eq!(buf, b"PONG");
        assert_eq!(rw.reader().read_integer().unwrap(), 7);
    }

    #[test]
    fn test_split() {
        let mut rw = ReadWriter::new(Loopback::default());
        let (reader, writer) = rw.split();
        writer.write_value(&Value::array(vec![Value::blob("a")])).unwrap();
        assert_eq!(reader.read_value().unwrap(), Value::array(vec![Value::blob("a")]));
    }

    #[test]
    fn test_reset_keeps_options() {
        let options = ReaderOptions::new().single_read_size_limit(3);
        let mut rw = ReadWriter::with_options(Loopback::default(), options);
        rw.writer().write_blob_string(b"abcd").unwrap();

        rw.reset(Loopback::default());
        assert_eq!(rw.reader().options().single_read_size_limit, 3);
        rw.writer().write_blob_string(b"abcd").unwrap();
        let err = rw.reader().read_blob_string(&mut Vec::new()).unwrap_err();
        assert!(err.is_recoverable());
    }
}
