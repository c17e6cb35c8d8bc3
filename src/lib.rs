//! # resp3
//!
//! A streaming RESP3 codec for blocking byte streams.
//!
//! The crate reads and writes the wire format spoken by Redis-compatible
//! servers since protocol version 3:
//! - Typed [`Reader`] with single-byte type lookahead
//! - [`Writer`] for every RESP3 kind, including streamed aggregates and blobs
//! - [`Reader::discard`] to skip values without decoding them
//! - Owned [`Value`] trees for full decode and encode
//! - RESP2 null compatibility (`*-1`, `$-1`)
//!
//! ## Safety Features
//!
//! - Configurable per-read size limit (32 MiB by default)
//! - Bounded nesting depth for recursive operations
//! - Overflow-checked integer and length parsing
//!
//! ## Example
//!
//! ```
//! use resp3::{Length, Reader, Writer};
//!
//! let mut writer = Writer::new(Vec::new());
//! writer.write_map_header(1)?;
//! writer.write_simple_string(b"server")?;
//! writer.write_blob_string(b"redis")?;
//!
//! let wire = writer.into_inner();
//! let mut reader = Reader::new(&wire[..]);
//! assert_eq!(reader.read_map_header()?, Length::Known(1));
//!
//! let mut key = Vec::new();
//! reader.read_simple_string(&mut key)?;
//! let mut value = Vec::new();
//! reader.read_blob_string(&mut value)?;
//! assert_eq!((&key[..], &value[..]), (&b"server"[..], &b"redis"[..]));
//! # Ok::<(), resp3::Error>(())
//! ```

#![doc(html_root_url = "https://docs.rs/resp3/0.1.0")]
#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unused_lifetimes,
    unused_qualifications
)]
#![allow(
    clippy::module_name_repetitions,
    missing_docs // Plain accessors are undocumented
)]

// ─────────────────────────────────────────────────────────────────────────────
// Modules
// ─────────────────────────────────────────────────────────────────────────────

/// Reader limits and defaults.
pub mod config;
/// Error types and result aliases.
pub mod error;
/// RESP3 wire protocol.
pub mod protocol;

// ─────────────────────────────────────────────────────────────────────────────
// Common Re-exports
// ─────────────────────────────────────────────────────────────────────────────

// Error handling
pub use error::{Error, ErrorKind, ProtocolError, Result};

// Protocol
pub use protocol::{Length, ReadWriter, Reader, Type, Value, Writer};

// Configuration
pub use config::{
    DEFAULT_BUFFER_SIZE, DEFAULT_MAX_DEPTH, DEFAULT_SINGLE_READ_SIZE_LIMIT, ReaderOptions,
};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Crate version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// RESP protocol version implemented by this crate.
pub const PROTOCOL_VERSION: u8 = 3;
