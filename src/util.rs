use std::io::{self, Read};

/// Short-read aware helpers for walking a framed stream.
///
/// A heka stream may end anywhere, so instead of `read_exact` failing with
/// `UnexpectedEof` these report how much was actually available.
pub trait ReadFrameExt: Read {
    /// Reads one byte, `None` at end of stream
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut raw_buffer = [0u8; 1];
        loop {
            match self.read(&mut raw_buffer) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(raw_buffer[0])),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Fills as much of `buf` as the stream allows, returning the count
    fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(filled)
    }

    /// Consumes bytes up to and including `separator`.
    ///
    /// Returns the number of bytes skipped before it and whether the stream
    /// ended first.
    fn scan_to(&mut self, separator: u8) -> io::Result<(u64, bool)> {
        let mut skipped = 0u64;
        loop {
            match self.read_byte()? {
                None => return Ok((skipped, true)),
                Some(c) if c == separator => return Ok((skipped, false)),
                Some(_) => skipped += 1,
            }
        }
    }
}

impl<R> ReadFrameExt for R where R: Read {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn skips_garbage_before_separator() {
        let mut c = Cursor::new(b"abc\x1exyz".to_vec());
        assert_eq!((3, false), c.scan_to(0x1e).unwrap());
        assert_eq!(Some(b'x'), c.read_byte().unwrap());
    }

    #[test]
    fn reports_eof_while_skipping() {
        let mut c = Cursor::new(b"abc".to_vec());
        assert_eq!((3, true), c.scan_to(0x1e).unwrap());
        assert_eq!(None, c.read_byte().unwrap());
    }

    #[test]
    fn short_read() {
        let mut c = Cursor::new(vec![1u8, 2, 3]);
        let mut buf = [0u8; 5];
        assert_eq!(3, c.read_up_to(&mut buf).unwrap());
        assert_eq!([1, 2, 3, 0, 0], buf);
    }
}
