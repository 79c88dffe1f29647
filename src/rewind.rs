//! Streams that can return to a previously marked position.
//!
//! A protobuf decode failure is only noticed after the separator, header and
//! whole body are consumed, so recovering the rest of the stream means going
//! back to just past the failed record's separator and scanning forward.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

/// A reader that can remember a position and go back to it.
pub trait Rewind: Read {
    /// Remembers the current position, forgetting any previous mark
    fn mark(&mut self) -> io::Result<()>;

    /// Repositions the stream at the last mark
    fn rewind(&mut self) -> io::Result<()>;
}

impl<R: Rewind + ?Sized> Rewind for Box<R> {
    fn mark(&mut self) -> io::Result<()> {
        (**self).mark()
    }

    fn rewind(&mut self) -> io::Result<()> {
        (**self).rewind()
    }
}

impl fmt::Debug for dyn Rewind + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Rewind")
    }
}

/// In-memory replay for forward-only streams (network bodies, decompressors).
///
/// While recording, everything read since the last mark is kept so it can be
/// handed out again after [`Rewind::rewind`]. With recording off it is a plain
/// pass-through and `rewind` fails.
#[derive(Debug)]
pub struct Replay<R> {
    inner: R,
    buffer: Vec<u8>,
    pos: usize,
    recording: bool,
}

impl<R: Read> Replay<R> {
    /// Wraps `inner`, buffering only if `recording`
    pub fn new(inner: R, recording: bool) -> Replay<R> {
        Replay {
            inner,
            buffer: Vec::new(),
            pos: 0,
            recording,
        }
    }

    /// Bytes held for a possible replay
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Unwraps the underlying reader, dropping any replay buffer
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Replay<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.pos < self.buffer.len() {
            let n = (&self.buffer[self.pos..]).read(out)?;
            self.pos += n;
            return Ok(n);
        }

        let n = self.inner.read(out)?;
        if self.recording {
            self.buffer.extend_from_slice(&out[..n]);
            self.pos += n;
        }

        Ok(n)
    }
}

impl<R: Read> Rewind for Replay<R> {
    fn mark(&mut self) -> io::Result<()> {
        if self.recording {
            self.buffer.drain(..self.pos);
            self.pos = 0;
        }

        Ok(())
    }

    fn rewind(&mut self) -> io::Result<()> {
        if !self.recording {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "stream was opened without backtracking",
            ));
        }
        self.pos = 0;

        Ok(())
    }
}

/// Rewinds by seeking, for local files.
#[derive(Debug)]
pub struct Seekable<R> {
    inner: R,
    mark: u64,
}

impl<R: Read + Seek> Seekable<R> {
    /// Wraps `inner`; until the first mark, rewinding goes to the start
    pub fn new(inner: R) -> Seekable<R> {
        Seekable { inner, mark: 0 }
    }

    /// Unwraps the underlying reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Seekable<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.inner.read(out)
    }
}

impl<R: Read + Seek> Rewind for Seekable<R> {
    fn mark(&mut self) -> io::Result<()> {
        self.mark = self.inner.stream_position()?;
        Ok(())
    }

    fn rewind(&mut self) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(self.mark))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_n<R: Read>(r: &mut R, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        r.read_exact(&mut buf).unwrap();
        buf
    }

    #[test]
    fn replays_since_mark() {
        let mut r = Replay::new(&b"0123456789"[..], true);
        read_n(&mut r, 2);
        r.mark().unwrap();
        assert_eq!(b"234".to_vec(), read_n(&mut r, 3));
        r.rewind().unwrap();
        assert_eq!(b"23456".to_vec(), read_n(&mut r, 5));
        assert_eq!(5, r.buffered());
    }

    #[test]
    fn mark_drops_consumed_bytes() {
        let mut r = Replay::new(&b"0123456789"[..], true);
        read_n(&mut r, 6);
        r.rewind().unwrap();
        read_n(&mut r, 4);
        r.mark().unwrap();
        assert_eq!(2, r.buffered());
        assert_eq!(b"45".to_vec(), read_n(&mut r, 2));
    }

    #[test]
    fn pass_through_cannot_rewind() {
        let mut r = Replay::new(&b"0123"[..], false);
        read_n(&mut r, 2);
        r.mark().unwrap();
        assert_eq!(0, r.buffered());
        assert!(r.rewind().is_err());
    }

    #[test]
    fn seeks_back_to_mark() {
        let mut r = Seekable::new(Cursor::new(b"0123456789".to_vec()));
        read_n(&mut r, 3);
        r.mark().unwrap();
        read_n(&mut r, 4);
        r.rewind().unwrap();
        assert_eq!(b"34".to_vec(), read_n(&mut r, 2));
    }
}
