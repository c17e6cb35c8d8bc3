//! Owned RESP3 value trees.
//!
//! [`Value`] covers every kind a complete message can hold. Streamed blobs
//! are joined and streamed aggregates collected, so a decoded tree no
//! longer remembers whether it arrived in streamed form. Attributes are
//! values of their own, placed before the value they annotate.

use super::reader::Reader;
use super::writer::{
    put_big_number, put_blob, put_double, put_integer, put_length, put_simple, put_verbatim,
};
use super::{Length, Type, VERBATIM_PREFIX_LEN, responses};
use crate::error::{Error, ProtocolError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use num_bigint::BigInt;
use std::fmt;
use std::io::Read;
use tracing::debug;

/// Upper bound on elements reserved up front from an aggregate header.
const MAX_PREALLOCATED_ELEMENTS: u64 = 1024;

/// A complete RESP3 value.
///
/// Cheap to clone for blob payloads, which are held as `Bytes`.
#[derive(Clone, PartialEq)]
pub enum Value {
    /// Ordered collection
    Array(Vec<Value>),

    /// Out-of-band metadata for the value that follows
    Attribute(Vec<(Value, Value)>),

    /// Key/value pairs in wire order
    Map(Vec<(Value, Value)>),

    /// Out-of-band message from the server
    Push(Vec<Value>),

    /// Unordered collection, kept in wire order
    Set(Vec<Value>),

    /// Arbitrary-precision integer
    BigNumber(BigInt),

    /// Boolean
    Boolean(bool),

    /// Double
    Double(f64),

    /// Binary-safe error
    BlobError(Bytes),

    /// Binary-safe string
    BlobString(Bytes),

    /// 64-bit signed integer
    Integer(i64),

    /// Null
    Null,

    /// Single-line error (no CR or LF)
    SimpleError(Bytes),

    /// Single-line string (no CR or LF)
    SimpleString(Bytes),

    /// Text with a 3-byte format such as `txt` or `mkd`
    VerbatimString {
        /// Format prefix
        format: [u8; VERBATIM_PREFIX_LEN],
        /// Text after the `:` separator
        text: Bytes,
    },
}

impl Value {
    /// Create a simple string value.
    #[inline]
    pub fn simple(s: impl Into<Bytes>) -> Self {
        Self::SimpleString(s.into())
    }

    /// Create a simple error value.
    #[inline]
    pub fn error(s: impl Into<Bytes>) -> Self {
        Self::SimpleError(s.into())
    }

    /// Create a blob string value.
    #[inline]
    pub fn blob(data: impl Into<Bytes>) -> Self {
        Self::BlobString(data.into())
    }

    #[inline]
    pub fn integer(n: i64) -> Self {
        Self::Integer(n)
    }

    #[inline]
    pub fn array(values: Vec<Value>) -> Self {
        Self::Array(values)
    }

    #[inline]
    pub fn map(pairs: Vec<(Value, Value)>) -> Self {
        Self::Map(pairs)
    }

    /// Create a verbatim string with format `txt`.
    #[inline]
    pub fn text(text: impl Into<Bytes>) -> Self {
        Self::VerbatimString {
            format: *b"txt",
            text: text.into(),
        }
    }

    /// Create a null value.
    #[inline]
    pub const fn null() -> Self {
        Self::Null
    }

    /// The wire type this value is written as.
    pub fn value_type(&self) -> Type {
        match self {
            Self::Array(_) => Type::Array,
            Self::Attribute(_) => Type::Attribute,
            Self::Map(_) => Type::Map,
            Self::Push(_) => Type::Push,
            Self::Set(_) => Type::Set,
            Self::BigNumber(_) => Type::BigNumber,
            Self::Boolean(_) => Type::Boolean,
            Self::Double(_) => Type::Double,
            Self::BlobError(_) => Type::BlobError,
            Self::BlobString(_) => Type::BlobString,
            Self::Integer(_) => Type::Integer,
            Self::Null => Type::Null,
            Self::SimpleError(_) => Type::SimpleError,
            Self::SimpleString(_) => Type::SimpleString,
            Self::VerbatimString { .. } => Type::VerbatimString,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if this is a simple or blob error.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::SimpleError(_) | Self::BlobError(_))
    }

    /// Try to get the value as bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::SimpleString(b)
            | Self::SimpleError(b)
            | Self::BlobString(b)
            | Self::BlobError(b)
            | Self::VerbatimString { text: b, .. } => Some(b),
            _ => None,
        }
    }

    /// Try to get the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()?).ok()
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get the elements of an array, push or set.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(v) | Self::Push(v) | Self::Set(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get the pairs of a map or attribute.
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(pairs) | Self::Attribute(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Serialize the value to a buffer.
    ///
    /// Fails on a simple string or error containing CR or LF, in which case
    /// `buf` may hold a partial encoding.
    pub fn serialize(&self, buf: &mut BytesMut) -> Result<()> {
        match self {
            Self::Array(values) | Self::Push(values) | Self::Set(values) => {
                put_length(buf, self.value_type(), values.len());
                for value in values {
                    value.serialize(buf)?;
                }
            }
            Self::Attribute(pairs) | Self::Map(pairs) => {
                put_length(buf, self.value_type(), pairs.len());
                for (key, value) in pairs {
                    key.serialize(buf)?;
                    value.serialize(buf)?;
                }
            }
            Self::BigNumber(n) => put_big_number(buf, n),
            Self::Boolean(b) => buf.put_slice(if *b { responses::TRUE } else { responses::FALSE }),
            Self::Double(f) => put_double(buf, *f),
            Self::BlobError(b) | Self::BlobString(b) => put_blob(buf, self.value_type(), b),
            Self::Integer(n) => put_integer(buf, *n),
            Self::Null => buf.put_slice(responses::NULL),
            Self::SimpleError(s) | Self::SimpleString(s) => put_simple(buf, self.value_type(), s)?,
            Self::VerbatimString { format, text } => put_verbatim(buf, format, text)?,
        }
        Ok(())
    }

    /// Serialize to a `Vec<u8>` for convenience.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::new();
        self.serialize(&mut buf)?;
        Ok(buf.to_vec())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn bytes(f: &mut fmt::Formatter<'_>, name: &str, b: &[u8]) -> fmt::Result {
            match std::str::from_utf8(b) {
                Ok(s) => write!(f, "{name}({s:?})"),
                Err(_) => write!(f, "{name}({b:?})"),
            }
        }

        match self {
            Self::Array(v) => {
                write!(f, "Array")?;
                f.debug_list().entries(v).finish()
            }
            Self::Attribute(pairs) => {
                write!(f, "Attribute")?;
                f.debug_map().entries(pairs.iter().map(|(k, v)| (k, v))).finish()
            }
            Self::Map(pairs) => {
                write!(f, "Map")?;
                f.debug_map().entries(pairs.iter().map(|(k, v)| (k, v))).finish()
            }
            Self::Push(v) => {
                write!(f, "Push")?;
                f.debug_list().entries(v).finish()
            }
            Self::Set(v) => {
                write!(f, "Set")?;
                f.debug_set().entries(v).finish()
            }
            Self::BigNumber(n) => write!(f, "BigNumber({n})"),
            Self::Boolean(b) => write!(f, "Boolean({b})"),
            Self::Double(d) => write!(f, "Double({d})"),
            Self::BlobError(b) => bytes(f, "BlobError", b),
            Self::BlobString(b) => bytes(f, "BlobString", b),
            Self::Integer(n) => write!(f, "Integer({n})"),
            Self::Null => write!(f, "Null"),
            Self::SimpleError(b) => bytes(f, "SimpleError", b),
            Self::SimpleString(b) => bytes(f, "SimpleString", b),
            Self::VerbatimString { format, text } => {
                write!(f, "VerbatimString({}:", String::from_utf8_lossy(format))?;
                match std::str::from_utf8(text) {
                    Ok(s) => write!(f, "{s:?})"),
                    Err(_) => write!(f, "{text:?})"),
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array(v) | Self::Push(v) | Self::Set(v) => {
                if v.is_empty() {
                    return write!(f, "(empty {})", self.value_type_name());
                }
                for (i, value) in v.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {value}", i + 1)?;
                }
                Ok(())
            }
            Self::Attribute(pairs) | Self::Map(pairs) => {
                if pairs.is_empty() {
                    return write!(f, "(empty {})", self.value_type_name());
                }
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}# {key} => {value}", i + 1)?;
                }
                Ok(())
            }
            Self::BigNumber(n) => write!(f, "(big number) {n}"),
            Self::Boolean(b) => write!(f, "({b})"),
            Self::Double(d) => write!(f, "(double) {d}"),
            Self::BlobError(b) | Self::SimpleError(b) => {
                write!(f, "(error) {}", String::from_utf8_lossy(b))
            }
            Self::BlobString(b) | Self::SimpleString(b) => match std::str::from_utf8(b) {
                Ok(s) => write!(f, "{s:?}"),
                Err(_) => write!(f, "<{} bytes>", b.len()),
            },
            Self::Integer(n) => write!(f, "(integer) {n}"),
            Self::Null => write!(f, "(nil)"),
            Self::VerbatimString { format, text } => write!(
                f,
                "({}) {}",
                String::from_utf8_lossy(format),
                String::from_utf8_lossy(text)
            ),
        }
    }
}

impl Value {
    fn value_type_name(&self) -> &'static str {
        match self {
            Self::Array(_) => "array",
            Self::Attribute(_) => "attribute",
            Self::Map(_) => "map",
            Self::Push(_) => "push",
            Self::Set(_) => "set",
            _ => "value",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::BlobString(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::BlobString(Bytes::from(s))
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Self::BlobString(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Double(f)
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Self::BigNumber(n)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Self::Array(values)
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::Array(iter.into_iter().map(Into::into).collect())
    }
}

// ─── Decoding ───────────────────────────────────────────────────────────────

impl<R: Read> Reader<R> {
    /// Read one complete value, including everything nested in it.
    ///
    /// Streamed blobs are joined into a single payload and streamed
    /// aggregates are collected. Nesting deeper than
    /// [`ReaderOptions::max_depth`](crate::ReaderOptions::max_depth) fails
    /// with [`ProtocolError::NestingTooDeep`].
    ///
    /// Returns [`Error::Eof`] when the source is exhausted before the value
    /// starts.
    ///
    /// ```
    /// use resp3::{Reader, Value};
    ///
    /// let mut reader = Reader::new(&b"%1\r\n+key\r\n*?\r\n:1\r\n#t\r\n.\r\n"[..]);
    /// let value = reader.read_value()?;
    /// assert_eq!(
    ///     value,
    ///     Value::map(vec![(
    ///         Value::simple("key"),
    ///         Value::array(vec![Value::integer(1), Value::Boolean(true)]),
    ///     )])
    /// );
    /// # Ok::<(), resp3::Error>(())
    /// ```
    pub fn read_value(&mut self) -> Result<Value> {
        self.read_value_at(0)
    }

    fn read_value_at(&mut self, depth: usize) -> Result<Value> {
        let max = self.options().max_depth;
        if depth > max {
            debug!(depth, max, "value nesting too deep");
            return Err(ProtocolError::NestingTooDeep(max).into());
        }

        let ty = self.peek()?;
        let value = match ty {
            Type::Array => Value::Array(self.read_elements(ty, depth)?),
            Type::Push => Value::Push(self.read_elements(ty, depth)?),
            Type::Set => Value::Set(self.read_elements(ty, depth)?),
            Type::Attribute => Value::Attribute(self.read_pairs(ty, depth)?),
            Type::Map => Value::Map(self.read_pairs(ty, depth)?),
            Type::BlobError => Value::BlobError(self.read_joined_blob(ty)?),
            Type::BlobString => Value::BlobString(self.read_joined_blob(ty)?),
            Type::BlobChunk | Type::End => {
                return Err(ProtocolError::MisplacedStreamValue(ty).into());
            }
            Type::SimpleError => {
                let mut buf = Vec::new();
                self.read_simple_error(&mut buf)?;
                Value::SimpleError(buf.into())
            }
            Type::SimpleString => {
                let mut buf = Vec::new();
                self.read_simple_string(&mut buf)?;
                Value::SimpleString(buf.into())
            }
            Type::VerbatimString => {
                let mut buf = Vec::new();
                let format = self.read_verbatim_string(&mut buf)?;
                Value::VerbatimString {
                    format,
                    text: buf.into(),
                }
            }
            Type::BigNumber => Value::BigNumber(self.read_big_number()?),
            Type::Boolean => Value::Boolean(self.read_boolean()?),
            Type::Double => Value::Double(self.read_double()?),
            Type::Integer => Value::Integer(self.read_integer()?),
            Type::Null => {
                self.read_null()?;
                Value::Null
            }
        };
        Ok(value)
    }

    /// Read a value that must be present, such as an aggregate element.
    fn read_nested(&mut self, depth: usize) -> Result<Value> {
        match self.read_value_at(depth) {
            Err(Error::Eof) => Err(ProtocolError::eol("expected value, got EOF").into()),
            other => other,
        }
    }

    /// Read the next element of a streamed aggregate, or `None` at its end.
    fn read_streamed(&mut self, depth: usize) -> Result<Option<Value>> {
        match self.peek() {
            Ok(Type::End) => {
                self.read_end()?;
                Ok(None)
            }
            Err(Error::Eof) => Err(ProtocolError::eol("expected value or end, got EOF").into()),
            Err(e) => Err(e),
            Ok(_) => self.read_nested(depth).map(Some),
        }
    }

    fn read_elements(&mut self, ty: Type, depth: usize) -> Result<Vec<Value>> {
        let depth = depth + 1;
        let mut values = Vec::new();
        match self.read_aggregate_header(ty)? {
            Length::Known(n) => {
                values.reserve(n.min(MAX_PREALLOCATED_ELEMENTS) as usize);
                for _ in 0..n {
                    values.push(self.read_nested(depth)?);
                }
            }
            Length::Streamed => {
                while let Some(value) = self.read_streamed(depth)? {
                    values.push(value);
                }
            }
        }
        Ok(values)
    }

    fn read_pairs(&mut self, ty: Type, depth: usize) -> Result<Vec<(Value, Value)>> {
        let depth = depth + 1;
        let mut pairs = Vec::new();
        match self.read_aggregate_header(ty)? {
            Length::Known(n) => {
                pairs.reserve(n.min(MAX_PREALLOCATED_ELEMENTS) as usize);
                for _ in 0..n {
                    let key = self.read_nested(depth)?;
                    pairs.push((key, self.read_nested(depth)?));
                }
            }
            Length::Streamed => {
                while let Some(key) = self.read_streamed(depth)? {
                    pairs.push((key, self.read_nested(depth)?));
                }
            }
        }
        Ok(pairs)
    }

    fn read_joined_blob(&mut self, ty: Type) -> Result<Bytes> {
        let mut buf = Vec::new();
        let len = match ty {
            Type::BlobError => self.read_blob_error(&mut buf)?,
            _ => self.read_blob_string(&mut buf)?,
        };
        if len.is_streamed() {
            self.read_blob_chunks(&mut buf)?;
        }
        Ok(buf.into())
    }
}
