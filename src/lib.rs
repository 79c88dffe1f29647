//! Streaming library for reading Heka framed protobuf streams, as archived by
//! the Mozilla telemetry pipeline.
//!
//! Each record is a record separator, a length-prefixed protobuf header, a
//! unit separator and a (maybe snappy compressed) protobuf message whose JSON
//! payload and side-fields make up one telemetry ping.
//!
//! # Example
//! ```no_run
//! use std::fs::File;
//!
//! let file = File::open("/path/to/part-0.heka").unwrap();
//!
//! for ping in hekafile::parse_message(file) {
//!     let ping = ping.unwrap();
//!     println!("{:?}", ping.meta());
//! }
//! ```
//!
//! Frames can be read directly too, with control over error recovery:
//! ```no_run
//! use hekafile::UnpackOptions;
//!
//! let opts = UnpackOptions::default().verbose(true).backtrack(true);
//! let mut frames = hekafile::unpack_path("/path/to/part-0.heka.gz", opts).unwrap();
//! for frame in &mut frames {
//!     let (frame, offset) = frame.unwrap();
//!     println!("{} bytes in, {:?}", offset, frame.header);
//! }
//! println!("{:?}", frames.stats());
//! ```

#![crate_name = "hekafile"]
#![deny(missing_docs,
        missing_debug_implementations, missing_copy_implementations,
        trivial_casts, trivial_numeric_casts,
        unsafe_code,
        unstable_features,
        unused_import_braces)]

/// Convenience typedef
pub type ByteString = Vec<u8>;

// modules
mod compress;
mod errors;
mod options;
mod parser;
mod util;

pub mod lazy;
pub mod message;
pub mod reader;
pub mod record;
pub mod rewind;

#[cfg(test)]
mod test_utils;

// exports
pub use compress::{decompress_payload, StreamCodec};
pub use errors::{Error, ErrorKind, Result};
pub use lazy::LazyValue;
pub use message::{Field, Header, Message, ValueType};
pub use options::UnpackOptions;
pub use parser::{parse_message, parse_message_with, Messages};
pub use reader::{unpack, unpack_bytes, unpack_path, unpack_seekable, Frame, UnpackStats, Unpacker};
pub use record::{project, Node, Record};
pub use rewind::{Replay, Rewind, Seekable};
