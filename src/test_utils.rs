//! Builders for in-memory heka streams used by the tests.

use prost::Message as _;

use crate::message::{Field, Header, Message, ValueType};
use crate::reader::{RECORD_SEPARATOR, UNIT_SEPARATOR};

/// A telemetry message carrying `payload`
pub fn ping(payload: &str) -> Message {
    Message {
        uuid: vec![0x42; 16],
        timestamp: 1_000,
        r#type: Some("telemetry".to_string()),
        hostname: Some("h1".to_string()),
        payload: Some(payload.to_string()),
        ..Default::default()
    }
}

/// A string-typed side-field
pub fn string_field(name: &str, value: &str) -> Field {
    Field {
        name: name.to_string(),
        value_type: Some(ValueType::String as i32),
        value_string: vec![value.to_string()],
        ..Default::default()
    }
}

/// A bytes-typed side-field
pub fn bytes_field(name: &str, value: &[u8]) -> Field {
    Field {
        name: name.to_string(),
        value_type: Some(ValueType::Bytes as i32),
        value_bytes: vec![value.to_vec()],
        ..Default::default()
    }
}

/// Assembles a frame around arbitrary header bytes, unit separator and body
pub fn frame_with_header(header: &[u8], unit_separator: u8, body: &[u8]) -> Vec<u8> {
    let mut buf = vec![RECORD_SEPARATOR, header.len() as u8];
    buf.extend_from_slice(header);
    buf.push(unit_separator);
    buf.extend_from_slice(body);
    buf
}

/// Frames an arbitrary body with a correct header
pub fn frame_body(body: &[u8]) -> Vec<u8> {
    let header = Header {
        message_length: Some(body.len() as u32),
        ..Default::default()
    };
    frame_with_header(&header.encode_to_vec(), UNIT_SEPARATOR, body)
}

/// Encodes and frames `message`, snappy compressing the body if asked
pub fn encode_frame(message: &Message, snappy: bool) -> Vec<u8> {
    let mut body = message.encode_to_vec();
    if snappy {
        body = snap::raw::Encoder::new()
            .compress_vec(&body)
            .expect("snappy compression");
    }
    frame_body(&body)
}

/// `n` plain frames with payloads `{"seq": i}`
pub fn seq_stream(n: usize, snappy: bool) -> Vec<u8> {
    (0..n)
        .flat_map(|i| encode_frame(&ping(&format!(r#"{{"seq": {}}}"#, i)), snappy))
        .collect()
}
