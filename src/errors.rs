use std::{io, result};

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = result::Result<T, Error>;

/// Everything that can go wrong while decoding a heka stream.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying stream failed
    #[error("I/O Error: {0}")]
    IO(#[from] io::Error),

    /// Bytes were found where a record separator was expected (strict mode only)
    #[error("Unexpected character(s) at the start of record: skipped {count} bytes before offset {offset}")]
    SkippedBytes {
        /// number of bytes skipped to find the separator
        count: u64,
        /// offset of the separator that was eventually found
        offset: u64,
    },

    /// The byte following the header was not a unit separator
    #[error("Unexpected unit separator character at offset {offset}: {found}")]
    UnitSeparator {
        /// offset just past the offending byte
        offset: u64,
        /// the byte actually read
        found: u8,
    },

    /// The stream ended inside a message body (strict mode only)
    #[error("Truncated record at offset {offset}: expected {expected} body bytes, found {found}")]
    Truncated {
        /// offset at which the body started
        offset: u64,
        /// declared message length
        expected: u64,
        /// bytes actually available
        found: u64,
    },

    /// Header or message bytes do not match the protobuf schema
    #[error("Protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Payload or submission JSON is malformed
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    /// A deferred side-field value failed to parse on first access
    #[error("Malformed lazy JSON value: {0}")]
    LazyJson(String),
}

/// Coarse classification of an [`Error`], used to pick a recovery strategy.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ErrorKind {
    /// Stream corruption: lost sync, bad unit separator, truncated body
    Framing,
    /// Schema mismatch, commonly a wrong snappy guess
    Decode,
    /// Connection dropped mid-stream
    Transport,
    /// Malformed JSON in a payload or field
    Json,
    /// Any other I/O failure
    Io,
}

impl Error {
    /// Classifies this error
    pub fn kind(&self) -> ErrorKind {
        match *self {
            Error::SkippedBytes { .. } | Error::UnitSeparator { .. } | Error::Truncated { .. } => {
                ErrorKind::Framing
            }
            Error::Decode(_) => ErrorKind::Decode,
            Error::Json(_) | Error::LazyJson(_) => ErrorKind::Json,
            Error::IO(_) if self.is_transient_transport() => ErrorKind::Transport,
            Error::IO(_) => ErrorKind::Io,
        }
    }

    /// True only for a connection that was reset or aborted under us.
    ///
    /// Object storage bodies occasionally die this way half-way through; the
    /// record façade stops at that point instead of failing the whole batch.
    pub fn is_transient_transport(&self) -> bool {
        match *self {
            Error::IO(ref e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        let reset = Error::from(io::Error::new(io::ErrorKind::ConnectionReset, "tls read"));
        assert_eq!(ErrorKind::Transport, reset.kind());
        assert!(reset.is_transient_transport());

        let eof = Error::from(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        assert_eq!(ErrorKind::Io, eof.kind());
        assert!(!eof.is_transient_transport());

        let sep = Error::UnitSeparator { offset: 7, found: 0x41 };
        assert_eq!(ErrorKind::Framing, sep.kind());
        assert_eq!("Unexpected unit separator character at offset 7: 65", sep.to_string());
    }
}
