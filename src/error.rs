//! Error types for the RESP3 codec.
//!
//! Errors are split in two layers. [`Error`] is what every reader and
//! writer operation returns; it separates a clean end of input and raw
//! I/O failures from [`ProtocolError`], which covers everything the codec
//! itself rejects on the wire.

use crate::protocol::Type;
use std::io;
use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type returned by [`Reader`](crate::Reader) and
/// [`Writer`](crate::Writer) operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The source was exhausted between two values.
    ///
    /// Only [`Reader::peek`](crate::Reader::peek) and the top level of
    /// [`Reader::discard`](crate::Reader::discard) and
    /// [`Reader::read_value`](crate::Reader::read_value) report this.
    /// Running out of input in the middle of a value is a
    /// [`ProtocolError::UnexpectedEol`].
    #[error("end of input")]
    Eof,

    /// Protocol errors
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O errors from the underlying source or sink
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Protocol-level errors raised while decoding or encoding RESP3 values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A line was not terminated by CRLF, or input ended inside a value.
    #[error("unexpected end of line: {0}")]
    UnexpectedEol(String),

    /// The lead byte does not name a RESP3 type.
    #[error("invalid type: {:?}", char::from(*.0))]
    InvalidType(u8),

    /// The lead byte names a different type than the one requested.
    #[error("unexpected type: expected {expected:?}, got {got:?}")]
    UnexpectedType {
        /// Type the caller asked for
        expected: Type,
        /// Type found on the wire
        got: Type,
    },

    /// Stream terminator or blob chunk where a complete value is required
    #[error("unexpected {0:?} outside a stream")]
    MisplacedStreamValue(Type),

    /// Aggregate header with a negative or malformed count
    #[error("invalid aggregate type length")]
    InvalidAggregateLength,

    /// Blob header with a negative length
    #[error("blob length must be >= 0, got {0}")]
    InvalidBlobLength(i64),

    /// Boolean body other than `t` or `f`
    #[error("invalid boolean: expected f or t, got {:?}", char::from(*.0))]
    InvalidBoolean(u8),

    /// Double body that does not parse as a float
    #[error("invalid double: {0}")]
    InvalidDouble(String),

    /// Integer or length containing a non-digit
    #[error("invalid number: invalid character {0:?}")]
    InvalidNumber(char),

    /// Integer outside the signed 64-bit range
    #[error("number overflows a 64-bit signed integer")]
    NumberOverflow,

    /// Big number body that is not a signed decimal integer
    #[error("invalid big number: {0}")]
    InvalidBigNumber(String),

    /// Verbatim string without a 3-byte prefix followed by `:`
    #[error("invalid verbatim string: {0}")]
    InvalidVerbatimString(String),

    /// Simple string or error payload containing CR or LF
    #[error("simple errors/strings must not contain \\r or \\n")]
    InvalidSimpleValue,

    /// A single length-prefixed or line read exceeds the configured limit
    #[error("value of size {size} exceeds configured limit of {limit} bytes")]
    SizeLimitExceeded {
        /// Size of the offending value in bytes
        size: u64,
        /// Effective limit in bytes
        limit: u64,
    },

    /// Aggregates or streams nested deeper than the configured maximum
    #[error("nesting too deep: exceeds maximum depth of {0}")]
    NestingTooDeep(usize),
}

/// Coarse classification of errors, for deciding whether a stream can
/// still be used after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Clean end of input between values
    Eof,
    /// Missing or malformed line termination, or truncated value
    Framing,
    /// Unknown lead byte, or a type other than the one requested
    Type,
    /// Value content rejected by its decoder or encoder
    Grammar,
    /// Size or nesting limit exceeded, or integer overflow
    Limit,
    /// Failure in the underlying source or sink
    Io,
}

impl ProtocolError {
    /// Shorthand for an [`UnexpectedEol`](Self::UnexpectedEol) error.
    pub(crate) fn eol(msg: impl Into<String>) -> Self {
        Self::UnexpectedEol(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnexpectedEol(_) => ErrorKind::Framing,
            Self::InvalidType(_)
            | Self::UnexpectedType { .. }
            | Self::MisplacedStreamValue(_) => ErrorKind::Type,
            Self::InvalidAggregateLength
            | Self::InvalidBlobLength(_)
            | Self::InvalidBoolean(_)
            | Self::InvalidDouble(_)
            | Self::InvalidNumber(_)
            | Self::InvalidBigNumber(_)
            | Self::InvalidVerbatimString(_)
            | Self::InvalidSimpleValue => ErrorKind::Grammar,
            Self::NumberOverflow | Self::SizeLimitExceeded { .. } | Self::NestingTooDeep(_) => {
                ErrorKind::Limit
            }
        }
    }
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Eof => ErrorKind::Eof,
            Self::Protocol(e) => e.kind(),
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns the protocol error, if this is one.
    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            Self::Protocol(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true for a clean end of input between values.
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /// Returns true if the error concerns a single value rather than the
    /// stream framing, so the caller may choose to skip that value.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Grammar | ErrorKind::Limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Protocol(ProtocolError::InvalidType(b'A'));
        assert_eq!(err.to_string(), "protocol error: invalid type: 'A'");

        let err = Error::Protocol(ProtocolError::UnexpectedType {
            expected: Type::Integer,
            got: Type::SimpleString,
        });
        assert!(err.to_string().contains("expected Integer"));

        let err = ProtocolError::SizeLimitExceeded { size: 6, limit: 5 };
        assert_eq!(
            err.to_string(),
            "value of size 6 exceeds configured limit of 5 bytes"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(ProtocolError::eol("EOF").kind(), ErrorKind::Framing);
        assert_eq!(ProtocolError::InvalidType(0).kind(), ErrorKind::Type);
        assert_eq!(
            ProtocolError::MisplacedStreamValue(Type::End).kind(),
            ErrorKind::Type
        );
        assert_eq!(ProtocolError::InvalidBoolean(b'x').kind(), ErrorKind::Grammar);
        assert_eq!(ProtocolError::NumberOverflow.kind(), ErrorKind::Limit);
        assert_eq!(ProtocolError::NestingTooDeep(8).kind(), ErrorKind::Limit);
        assert_eq!(Error::Eof.kind(), ErrorKind::Eof);
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::from(ProtocolError::InvalidDouble("x".into())).is_recoverable());
        assert!(Error::from(ProtocolError::SizeLimitExceeded { size: 2, limit: 1 }).is_recoverable());
        assert!(!Error::from(ProtocolError::eol("EOF")).is_recoverable());
        assert!(!Error::Eof.is_recoverable());
        assert!(Error::Eof.is_eof());
    }

    #[test]
    fn test_as_protocol() {
        let err = Error::from(ProtocolError::InvalidAggregateLength);
        assert_eq!(err.as_protocol(), Some(&ProtocolError::InvalidAggregateLength));
        assert_eq!(Error::Eof.as_protocol(), None);
    }
}
