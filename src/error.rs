//! Crate error types.
//!
//! Every failure mode the encoder or decoder can hit is represented as a variant of [`Error`].
//! There is no derive-macro error crate in the dependency graph — variants carry whatever
//! structured data is needed to render a useful [`std::fmt::Display`] message, including the
//! triggering byte offset where one is known.

use std::fmt;

/// A shardwire `Result`, normally returning a shardwire [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A shardwire error. Encompasses every failure that can happen while encoding or decoding a
/// value graph.
#[derive(Debug)]
pub enum Error {
    /// The encoder was asked to serialize a value kind with no wire representation: an
    /// unregistered opaque host object, or an opaque procedure when no dump hook is installed.
    Unserializable(String),
    /// `register` was called with a name or type identity that's already present.
    DuplicateRegistration(String),
    /// The decoder saw a custom-object type name, or a resource name, with no registry entry.
    UnknownRegistration(String),
    /// A custom encoder's argument graph looped back to the value being encoded before that
    /// value was assigned an identity index.
    InfiniteConstructor(String),
    /// The decoder's cursor would have to read past the end of the buffer.
    TruncatedInput {
        /// Byte offset at which the read was attempted.
        offset: usize,
        /// Bytes requested.
        needed: usize,
        /// Bytes actually remaining.
        remaining: usize,
    },
    /// The first byte of a value encoding isn't in the tag set.
    BadTag {
        /// Byte offset of the bad tag.
        offset: usize,
        /// The offending byte.
        tag: u8,
    },
    /// A decoded length (string/table/argument count) is negative or exceeds the remaining
    /// buffer.
    BadLength {
        /// Byte offset where the length was read.
        offset: usize,
        /// The decoded length.
        len: i64,
    },
    /// A back-reference index is zero, or beyond the identity table's current length.
    BadReference {
        /// Byte offset of the back-reference.
        offset: usize,
        /// The requested index.
        index: i64,
        /// Number of entries in the identity table at the time.
        table_len: usize,
    },
    /// The legacy decimal float form failed to parse.
    MalformedNumber {
        /// Byte offset of the failing float.
        offset: usize,
        /// What went wrong.
        reason: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Unserializable(msg) => write!(f, "cannot serialize this value: {msg}"),
            Error::DuplicateRegistration(msg) => write!(f, "duplicate registration: {msg}"),
            Error::UnknownRegistration(msg) => write!(f, "unknown registration: {msg}"),
            Error::InfiniteConstructor(msg) => write!(f, "infinite loop in constructor: {msg}"),
            Error::TruncatedInput {
                offset,
                needed,
                remaining,
            } => write!(
                f,
                "truncated input at offset {offset}: needed {needed} bytes, only {remaining} remained"
            ),
            Error::BadTag { offset, tag } => {
                write!(f, "bad tag byte 0x{tag:02x} at offset {offset}")
            }
            Error::BadLength { offset, len } => {
                write!(f, "bad length {len} at offset {offset}")
            }
            Error::BadReference {
                offset,
                index,
                table_len,
            } => write!(
                f,
                "bad back-reference {index} at offset {offset}: identity table has {table_len} entries"
            ),
            Error::MalformedNumber { offset, reason } => {
                write!(f, "malformed number at offset {offset}: {reason}")
            }
        }
    }
}

impl std::error::Error for Error {}
