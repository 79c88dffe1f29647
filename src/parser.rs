//! Record-level façade: decoded pings instead of frames.

use std::io::{BufReader, Read};

use tracing::warn;

use crate::errors::Result;
use crate::options::UnpackOptions;
use crate::reader::{unpack, UnpackStats, Unpacker};
use crate::record::{project, Record};
use crate::rewind::{Replay, Rewind};

/// Decoded pings of a stream.
///
/// A connection reset or abort while reading ends the sequence early instead
/// of failing; [`Messages::truncated`] tells whether that happened.
#[derive(Debug)]
pub struct Messages<S> {
    unpacker: Unpacker<S>,
    truncated: bool,
}

impl<S: Rewind> Messages<S> {
    /// Wraps an unpacker; frames without a message (raw mode) are skipped
    pub fn new(unpacker: Unpacker<S>) -> Messages<S> {
        Messages {
            unpacker,
            truncated: false,
        }
    }

    /// Whether a transport error cut the stream short
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Counters of the underlying unpacker
    pub fn stats(&self) -> UnpackStats {
        self.unpacker.stats()
    }
}

impl<S: Rewind> Iterator for Messages<S> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        loop {
            match self.unpacker.next()? {
                Ok((frame, _)) => {
                    if let Some(ref message) = frame.message {
                        return Some(project(message));
                    }
                }
                Err(err) if err.is_transient_transport() => {
                    let stats = self.unpacker.stats();
                    warn!(
                        "stream truncated after {} records ({} bytes): {}",
                        stats.records, stats.bytes, err
                    );
                    self.truncated = true;
                    return None;
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl<S: Rewind> Unpacker<S> {
    /// Projects every frame into a [`Record`]
    pub fn records(self) -> Messages<S> {
        Messages::new(self)
    }
}

/// Decodes every ping in `reader` with the default settings.
pub fn parse_message<R: Read>(reader: R) -> Messages<Replay<BufReader<R>>> {
    parse_message_with(reader, UnpackOptions::default())
}

/// Decodes every ping in `reader`; `raw` is ignored.
pub fn parse_message_with<R: Read>(reader: R, options: UnpackOptions) -> Messages<Replay<BufReader<R>>> {
    Messages::new(unpack(reader, options.raw(false)))
}
