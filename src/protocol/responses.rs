//! Fixed wire forms.
//!
//! Values whose encoding never varies are kept as static byte slices so
//! the writer can emit them without formatting and the reader can match
//! them with a single lookahead.

use super::Type;

/// Null: _\r\n
pub static NULL: &[u8] = b"_\r\n";

/// Stream terminator: .\r\n
pub static END: &[u8] = b".\r\n";

/// Boolean true: #t\r\n
pub static TRUE: &[u8] = b"#t\r\n";

/// Boolean false: #f\r\n
pub static FALSE: &[u8] = b"#f\r\n";

/// Positive infinity: ,inf\r\n
pub static INF: &[u8] = b",inf\r\n";

/// Negative infinity: ,-inf\r\n
pub static NEG_INF: &[u8] = b",-inf\r\n";

/// Not a number: ,nan\r\n
pub static NAN: &[u8] = b",nan\r\n";

/// Zero-length blob chunk closing a streamed blob: ;0\r\n
pub static LAST_CHUNK: &[u8] = b";0\r\n";

/// RESP2 null array: *-1\r\n
pub static NULL_ARRAY: &[u8] = b"*-1\r\n";

/// RESP2 null bulk string: $-1\r\n
pub static NULL_BULK: &[u8] = b"$-1\r\n";

/// The `<type>?\r\n` header opening a streamed aggregate or blob.
///
/// Returns `None` for types that have no streamed form.
pub fn stream_header(ty: Type) -> Option<&'static [u8]> {
    match ty {
        Type::Array => Some(b"*?\r\n"),
        Type::Attribute => Some(b"|?\r\n"),
        Type::Map => Some(b"%?\r\n"),
        Type::Push => Some(b">?\r\n"),
        Type::Set => Some(b"~?\r\n"),
        Type::BlobError => Some(b"!?\r\n"),
        Type::BlobString => Some(b"$?\r\n"),
        _ => None,
    }
}

/// The RESP2 `<type>-1\r\n` null form for arrays and blob strings.
pub fn legacy_null(ty: Type) -> Option<&'static [u8]> {
    match ty {
        Type::Array => Some(NULL_ARRAY),
        Type::BlobString => Some(NULL_BULK),
        _ => None,
    }
}
