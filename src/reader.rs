//! Frame reader and the streaming unpacker built on it
//!
//! Stream framing, see <https://hekad.readthedocs.io/en/latest/message/index.html>:
//!
//! ```text
//! 0x1E | header length (u8) | header (protobuf) | 0x1F | body (header.message_length bytes)
//! ```

use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::compress::{self, StreamCodec};
use crate::errors::{Error, ErrorKind, Result};
use crate::message::{self, Header, Message};
use crate::options::UnpackOptions;
use crate::rewind::{Replay, Rewind, Seekable};
use crate::util::ReadFrameExt;
use crate::ByteString;

/// ASCII record separator, starts every frame
pub const RECORD_SEPARATOR: u8 = 0x1e;
/// ASCII unit separator, ends the header
pub const UNIT_SEPARATOR: u8 = 0x1f;

/// One delimited unit of the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Exact bytes of the frame, separator through body
    pub raw: ByteString,
    /// Parsed header
    pub header: Header,
    /// Decoded body; `None` in raw mode or when `error` is set
    pub message: Option<Message>,
    /// Per-record framing problem
    pub error: Option<String>,
}

impl Frame {
    fn failed(raw: ByteString, header: Header, err: Error) -> Frame {
        Frame {
            raw,
            header,
            message: None,
            error: Some(err.to_string()),
        }
    }
}

/// Reads frames one at a time, tracking the logical stream offset.
#[derive(Debug)]
pub struct FrameReader<S> {
    stream: S,
    options: UnpackOptions,
    offset: u64,
    mark_offset: u64,
    skipped_bytes: u64,
}

impl<S: Rewind> FrameReader<S> {
    /// Reads from `stream` with the given settings
    pub fn new(stream: S, options: UnpackOptions) -> FrameReader<S> {
        FrameReader {
            stream,
            options,
            offset: 0,
            mark_offset: 0,
            skipped_bytes: 0,
        }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Garbage bytes skipped while looking for separators
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped_bytes
    }

    /// Reads the next frame, `None` at end of stream.
    ///
    /// A run of separators counts as one. Marks for backtracking are taken
    /// just past the last separator of the run.
    ///
    /// # Failures
    /// Lost separator sync, bad unit separators and short bodies fail only in
    /// strict mode. Otherwise the first is reported and the other two come
    /// back as a frame carrying just the error. Header and body schema errors
    /// always fail.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        let (skipped, eof) = self.stream.scan_to(RECORD_SEPARATOR)?;
        self.offset += skipped;
        if eof {
            self.skipped_bytes += skipped;
            return Ok(None);
        }
        self.offset += 1;

        if skipped > 0 {
            if self.options.strict {
                return Err(Error::SkippedBytes {
                    count: skipped,
                    offset: self.offset - 1,
                });
            }
            self.skipped_bytes += skipped;
            self.report(format_args!(
                "Skipped {} bytes to find a valid separator",
                skipped
            ));
        }

        let header_length = loop {
            if self.options.backtrack {
                self.stream.mark()?;
                self.mark_offset = self.offset;
            }

            match self.stream.read_byte()? {
                Some(RECORD_SEPARATOR) => self.offset += 1,
                Some(len) => break len,
                None => return Ok(None),
            }
        };
        self.offset += 1;

        let mut raw = Vec::with_capacity(header_length as usize + 3);
        raw.push(RECORD_SEPARATOR);
        raw.push(header_length);

        let mut header_raw = vec![0u8; header_length as usize];
        let n = self.stream.read_up_to(&mut header_raw)?;
        self.offset += n as u64;
        if n < header_raw.len() {
            debug!("stream ended inside a header at offset {}", self.offset);
            return Ok(None);
        }
        raw.extend_from_slice(&header_raw);
        let header = message::decode_header(&header_raw)?;

        let unit_separator = match self.stream.read_byte()? {
            Some(c) => c,
            None => return Ok(None),
        };
        self.offset += 1;
        raw.push(unit_separator);
        if unit_separator != UNIT_SEPARATOR {
            let err = Error::UnitSeparator {
                offset: self.offset,
                found: unit_separator,
            };
            if self.options.strict {
                return Err(err);
            }
            return Ok(Some(Frame::failed(raw, header, err)));
        }

        // the declared length is untrusted, grow only as bytes arrive
        let body_start = self.offset;
        let expected = header.body_length() as u64;
        let mut body = Vec::new();
        let n = (&mut self.stream).take(expected).read_to_end(&mut body)? as u64;
        self.offset += n;
        raw.extend_from_slice(&body);
        if n < expected {
            let err = Error::Truncated {
                offset: body_start,
                expected,
                found: n,
            };
            if self.options.strict {
                return Err(err);
            }
            return Ok(Some(Frame::failed(raw, header, err)));
        }

        let message = if self.options.raw {
            None
        } else {
            Some(self.decode_body(&body)?)
        };

        Ok(Some(Frame {
            raw,
            header,
            message,
            error: None,
        }))
    }

    /// Returns to just past the separator of the last frame started and
    /// resets the offset accordingly.
    pub fn backtrack(&mut self) -> Result<()> {
        self.stream.rewind()?;
        self.offset = self.mark_offset;

        Ok(())
    }

    fn decode_body(&self, body: &[u8]) -> Result<Message> {
        if self.options.try_snappy {
            let decompressed = compress::decompress_payload(body, true);
            if let Cow::Owned(ref buf) = decompressed {
                match message::decode_message(buf) {
                    Ok(msg) => return Ok(msg),
                    Err(e) => debug!("snappy output did not decode, trying raw body: {}", e),
                }
            }
        }

        message::decode_message(body)
    }

    fn report(&self, args: fmt::Arguments<'_>) {
        if self.options.verbose {
            warn!("{}", args);
        } else {
            debug!("{}", args);
        }
    }
}

/// Counters kept by an [`Unpacker`], exact in every mode.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct UnpackStats {
    /// Frames handed out
    pub records: u64,
    /// Frames lost to framing or decode errors
    pub errors: u64,
    /// Garbage bytes skipped to resynchronize
    pub skipped_bytes: u64,
    /// Stream offset reached
    pub bytes: u64,
}

/// Lazy, forward-only sequence of `(frame, cumulative bytes)` pairs.
///
/// Frames whose framing failed are counted but not yielded. Once an error is
/// yielded (strict mode, or an I/O failure) the sequence is over. The
/// underlying stream is dropped as soon as the sequence ends; the counters
/// stay available.
#[derive(Debug)]
pub struct Unpacker<S> {
    reader: Option<FrameReader<S>>,
    options: UnpackOptions,
    records: u64,
    errors: u64,
    skipped_bytes: u64,
    bytes: u64,
}

impl<S: Rewind> Unpacker<S> {
    /// Unpacks an already wrapped stream
    pub fn new(stream: S, options: UnpackOptions) -> Unpacker<S> {
        Unpacker {
            reader: Some(FrameReader::new(stream, options)),
            options,
            records: 0,
            errors: 0,
            skipped_bytes: 0,
            bytes: 0,
        }
    }

    /// Settings in use
    pub fn options(&self) -> UnpackOptions {
        self.options
    }

    /// Whether the underlying stream is still held
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Counters so far
    pub fn stats(&self) -> UnpackStats {
        let (skipped_bytes, bytes) = match self.reader {
            Some(ref r) => (r.skipped_bytes(), r.offset()),
            None => (self.skipped_bytes, self.bytes),
        };

        UnpackStats {
            records: self.records,
            errors: self.errors,
            skipped_bytes,
            bytes,
        }
    }

    fn release(&mut self) {
        if let Some(reader) = self.reader.take() {
            self.skipped_bytes = reader.skipped_bytes();
            self.bytes = reader.offset();
        }
    }

    fn finish(&mut self) {
        self.release();
        if self.options.verbose {
            info!("Processed {} records", self.records);
        }
    }

    fn fail(&mut self, err: Error) -> Option<Result<(Frame, u64)>> {
        self.release();
        Some(Err(err))
    }

    fn report(&self, err: &dyn fmt::Display) {
        if self.options.verbose {
            warn!("{}", err);
        } else {
            debug!("{}", err);
        }
    }
}

impl<S: Rewind> Iterator for Unpacker<S> {
    type Item = Result<(Frame, u64)>;

    fn next(&mut self) -> Option<Result<(Frame, u64)>> {
        loop {
            let reader = self.reader.as_mut()?;
            match reader.read_frame() {
                Ok(None) => {
                    self.finish();
                    return None;
                }
                Ok(Some(frame)) => {
                    let offset = reader.offset();
                    if let Some(ref err) = frame.error {
                        self.errors += 1;
                        self.report(err);
                        continue;
                    }

                    self.records += 1;
                    return Some(Ok((frame, offset)));
                }
                Err(err) => {
                    if self.options.strict || err.kind() == ErrorKind::Io || err.kind() == ErrorKind::Transport {
                        return self.fail(err);
                    }

                    if self.options.backtrack && err.kind() == ErrorKind::Decode {
                        if let Err(e) = reader.backtrack() {
                            return self.fail(e);
                        }
                    }
                    self.errors += 1;
                    self.report(&err);
                }
            }
        }
    }
}

/// Unpacks any byte stream, buffering for replay only when backtracking.
pub fn unpack<R: Read>(reader: R, options: UnpackOptions) -> Unpacker<Replay<BufReader<R>>> {
    Unpacker::new(Replay::new(BufReader::new(reader), options.backtrack), options)
}

/// Unpacks a seekable stream; backtracking seeks instead of buffering.
pub fn unpack_seekable<R: Read + Seek>(reader: R, options: UnpackOptions) -> Unpacker<Seekable<BufReader<R>>> {
    Unpacker::new(Seekable::new(BufReader::new(reader)), options)
}

/// Unpacks an in-memory buffer.
pub fn unpack_bytes(buf: &[u8], options: UnpackOptions) -> Unpacker<Seekable<Cursor<&[u8]>>> {
    Unpacker::new(Seekable::new(Cursor::new(buf)), options)
}

/// Opens and unpacks a local file, decompressing `.gz` and `.bz2` streams.
pub fn unpack_path<P: AsRef<Path>>(path: P, options: UnpackOptions) -> Result<Unpacker<Box<dyn Rewind>>> {
    let path = path.as_ref();
    let codec = StreamCodec::from_path(path);
    let file = File::open(path)?;

    let stream: Box<dyn Rewind> = match codec {
        StreamCodec::None => Box::new(Seekable::new(BufReader::new(file))),
        _ => Box::new(Replay::new(
            BufReader::new(compress::decompressor(codec, BufReader::new(file))),
            options.backtrack,
        )),
    };

    Ok(Unpacker::new(stream, options))
}
