//! RESP3 wire protocol.
//!
//! This module holds the type table shared by both halves of the codec,
//! the blocking [`Reader`] and [`Writer`], the [`discard`](Reader::discard)
//! skip engine, and the owned [`Value`] tree built on top of them.

mod discard;
mod duplex;
mod reader;
pub mod responses;
mod source;
mod value;
mod writer;

pub use duplex::ReadWriter;
pub use reader::Reader;
pub use value::Value;
pub use writer::Writer;

use std::fmt;

/// CRLF terminator bytes.
pub const CRLF: &[u8] = b"\r\n";

/// Length of the format prefix of a verbatim string (`txt`, `mkd`, ...).
pub const VERBATIM_PREFIX_LEN: usize = 3;

/// Type markers for RESP3.
pub mod markers {
    /// Array: *
    pub const ARRAY: u8 = b'*';
    /// Attribute: |
    pub const ATTRIBUTE: u8 = b'|';
    /// Big number: (
    pub const BIG_NUMBER: u8 = b'(';
    /// Boolean: #
    pub const BOOLEAN: u8 = b'#';
    /// Double: ,
    pub const DOUBLE: u8 = b',';
    /// Blob error: !
    pub const BLOB_ERROR: u8 = b'!';
    /// Blob string: $
    pub const BLOB_STRING: u8 = b'$';
    /// Blob chunk: ;
    pub const BLOB_CHUNK: u8 = b';';
    /// Stream end: .
    pub const END: u8 = b'.';
    /// Map: %
    pub const MAP: u8 = b'%';
    /// Null: _
    pub const NULL: u8 = b'_';
    /// Integer: :
    pub const INTEGER: u8 = b':';
    /// Push: >
    pub const PUSH: u8 = b'>';
    /// Set: ~
    pub const SET: u8 = b'~';
    /// Simple error: -
    pub const SIMPLE_ERROR: u8 = b'-';
    /// Simple string: +
    pub const SIMPLE_STRING: u8 = b'+';
    /// Verbatim string: =
    pub const VERBATIM_STRING: u8 = b'=';

    /// Length token used in place of a count for streamed values.
    pub const STREAMED: u8 = b'?';
}

/// The kind of a RESP3 value, tagged with its lead byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Type {
    /// Array of values
    Array = markers::ARRAY,
    /// Out-of-band attribute map attached to the next value
    Attribute = markers::ATTRIBUTE,
    /// Arbitrary-precision signed integer
    BigNumber = markers::BIG_NUMBER,
    /// Boolean
    Boolean = markers::BOOLEAN,
    /// 64-bit float
    Double = markers::DOUBLE,
    /// Binary-safe error
    BlobError = markers::BLOB_ERROR,
    /// Binary-safe string
    BlobString = markers::BLOB_STRING,
    /// One chunk of a streamed blob
    BlobChunk = markers::BLOB_CHUNK,
    /// Terminator of a streamed aggregate
    End = markers::END,
    /// Map of key-value pairs
    Map = markers::MAP,
    /// Null
    Null = markers::NULL,
    /// 64-bit signed integer
    Integer = markers::INTEGER,
    /// Out-of-band push data
    Push = markers::PUSH,
    /// Unordered set of values
    Set = markers::SET,
    /// Line-framed error
    SimpleError = markers::SIMPLE_ERROR,
    /// Line-framed string
    SimpleString = markers::SIMPLE_STRING,
    /// Blob string with a 3-byte format prefix
    VerbatimString = markers::VERBATIM_STRING,
}

/// Every type, in table order.
const ALL_TYPES: [Type; 17] = [
    Type::Array,
    Type::Attribute,
    Type::BigNumber,
    Type::Boolean,
    Type::Double,
    Type::BlobError,
    Type::BlobString,
    Type::BlobChunk,
    Type::End,
    Type::Map,
    Type::Null,
    Type::Integer,
    Type::Push,
    Type::Set,
    Type::SimpleError,
    Type::SimpleString,
    Type::VerbatimString,
];

/// Lead byte to type lookup, built at compile time. Unmapped bytes are `None`.
static TYPES: [Option<Type>; 256] = {
    let mut table = [None; 256];
    let mut i = 0;
    while i < ALL_TYPES.len() {
        table[ALL_TYPES[i] as usize] = Some(ALL_TYPES[i]);
        i += 1;
    }
    table
};

impl Type {
    /// Map a lead byte to its type.
    #[inline]
    pub fn from_byte(b: u8) -> Option<Self> {
        TYPES[b as usize]
    }

    /// The lead byte of this type.
    #[inline]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Returns true for types followed by a count of nested values.
    #[inline]
    pub const fn is_aggregate(self) -> bool {
        matches!(
            self,
            Self::Array | Self::Attribute | Self::Map | Self::Push | Self::Set
        )
    }

    /// Every known type.
    pub fn all() -> &'static [Type] {
        &ALL_TYPES
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(self.as_byte()))
    }
}

/// Length of an aggregate or blob as announced by its header.
///
/// For maps and attributes a known length counts key-value pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Length {
    /// Fixed length announced up front.
    Known(u64),
    /// Announced with `?`. Aggregates end with an [`Type::End`] value,
    /// blobs with a zero-length [`Type::BlobChunk`].
    Streamed,
}

impl Length {
    /// Returns true for the `?` form.
    #[inline]
    pub const fn is_streamed(self) -> bool {
        matches!(self, Self::Streamed)
    }

    /// The known length, if any.
    #[inline]
    pub const fn known(self) -> Option<u64> {
        match self {
            Self::Known(n) => Some(n),
            Self::Streamed => None,
        }
    }
}
