use std::borrow::Cow;
use std::io;
use std::path::Path;

use bzip2::read::BzDecoder;
use flate2::read::MultiGzDecoder;
use tracing::debug;

/// File extension of gzip wrapped streams
pub const GZIP_EXTENSION: &str = "gz";
/// File extension of bzip2 wrapped streams
pub const BZIP2_EXTENSION: &str = "bz2";

/// Compression wrapped around a whole heka stream, e.g. an archived `.gz` object.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum StreamCodec {
    /// Plain framed records.
    None,
    /// Gzip, possibly multi-member.
    Gzip,
    /// Bzip2 compression.
    Bzip2,
}

impl StreamCodec {
    /// Picks a codec from the file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> StreamCodec {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(GZIP_EXTENSION) => StreamCodec::Gzip,
            Some(BZIP2_EXTENSION) => StreamCodec::Bzip2,
            _ => StreamCodec::None,
        }
    }
}

/// Wraps `reader` in the decompressor for `codec`
pub fn decompressor<'a, R: io::Read + 'a>(codec: StreamCodec, reader: R) -> Box<dyn io::Read + 'a> {
    match codec {
        StreamCodec::None => Box::new(reader),
        StreamCodec::Gzip => Box::new(MultiGzDecoder::new(reader)),
        StreamCodec::Bzip2 => Box::new(BzDecoder::new(reader)),
    }
}

/// Returns bytes ready for message decoding.
///
/// With `try_snappy` the body is run through a raw snappy decoder first and
/// the original bytes are returned untouched when that fails; producers do
/// not consistently compress frames.
pub fn decompress_payload(body: &[u8], try_snappy: bool) -> Cow<'_, [u8]> {
    if !try_snappy {
        return Cow::Borrowed(body);
    }

    match snap::raw::Decoder::new().decompress_vec(body) {
        Ok(buf) => Cow::Owned(buf),
        Err(e) => {
            debug!("body is not snappy compressed: {}", e);
            Cow::Borrowed(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::io::Write;

    #[test]
    fn detects_codec_from_extension() {
        assert_eq!(StreamCodec::Gzip, StreamCodec::from_path("a/b/part-0.heka.gz"));
        assert_eq!(StreamCodec::Bzip2, StreamCodec::from_path("part-0.bz2"));
        assert_eq!(StreamCodec::None, StreamCodec::from_path("part-0.heka"));
        assert_eq!(StreamCodec::None, StreamCodec::from_path("noext"));
    }

    #[test]
    fn snappy_round_trip() {
        let compressed = snap::raw::Encoder::new().compress_vec(b"hello hello hello").unwrap();
        assert_eq!(&b"hello hello hello"[..], &*decompress_payload(&compressed, true));
    }

    #[test]
    fn falls_back_to_raw_bytes() {
        // declares a 0x7f byte output but carries nothing
        let body = [0x7f, 0x00];
        let out = decompress_payload(&body, true);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(&body[..], &*out);
    }

    #[test]
    fn skips_snappy_when_disabled() {
        let compressed = snap::raw::Encoder::new().compress_vec(b"abc").unwrap();
        assert_eq!(&compressed[..], &*decompress_payload(&compressed, false));
    }

    #[test]
    fn gzip_stream() {
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(b"\x1e\x00\x1f").unwrap();
        let gz = enc.finish().unwrap();

        let mut out = Vec::new();
        decompressor(StreamCodec::Gzip, &gz[..]).read_to_end(&mut out).unwrap();
        assert_eq!(b"\x1e\x00\x1f".to_vec(), out);
    }
}
