//! Heka protobuf schema: the frame header and the message it describes.
//!
//! The definitions mirror heka's `message.proto` (proto2), so optional scalars
//! are `Option`s and absent values fall back to the schema defaults.

use prost::Message as _;

use crate::errors::Result;

/// Hash function used for the (unverified) header HMAC
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum HmacHashFunction {
    /// HMAC-MD5
    Md5 = 0,
    /// HMAC-SHA1
    Sha1 = 1,
}

/// Metadata preceding every message body.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Header {
    /// Length in bytes of the message body that follows the unit separator
    #[prost(uint32, optional, tag = "1")]
    pub message_length: Option<u32>,
    /// See [`HmacHashFunction`]
    #[prost(enumeration = "HmacHashFunction", optional, tag = "3")]
    pub hmac_hash_function: Option<i32>,
    /// Name of the signing key owner
    #[prost(string, optional, tag = "4")]
    pub hmac_signer: Option<String>,
    /// Signing key version
    #[prost(uint32, optional, tag = "5")]
    pub hmac_key_version: Option<u32>,
    /// Message signature
    #[prost(bytes = "vec", optional, tag = "6")]
    pub hmac: Option<Vec<u8>>,
}

impl Header {
    /// Declared body length, 0 when unset
    pub fn body_length(&self) -> usize {
        self.message_length.unwrap_or(0) as usize
    }
}

/// Type tag of a side-field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ValueType {
    /// `value_string`
    String = 0,
    /// `value_bytes`
    Bytes = 1,
    /// `value_integer`
    Integer = 2,
    /// `value_double`
    Double = 3,
    /// `value_bool`
    Bool = 4,
}

/// A typed key/value pair carried next to the payload.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Field {
    /// Dotted name, e.g. `environment.system`
    #[prost(string, required, tag = "1")]
    pub name: String,
    /// Raw type tag, see [`Field::kind`]
    #[prost(enumeration = "ValueType", optional, tag = "2")]
    pub value_type: Option<i32>,
    /// Free-form unit hint
    #[prost(string, optional, tag = "3")]
    pub representation: Option<String>,
    /// Values when the tag is `String`
    #[prost(string, repeated, tag = "4")]
    pub value_string: Vec<String>,
    /// Values when the tag is `Bytes`
    #[prost(bytes = "vec", repeated, tag = "5")]
    pub value_bytes: Vec<Vec<u8>>,
    /// Values when the tag is `Integer`
    #[prost(int64, repeated, packed = "true", tag = "6")]
    pub value_integer: Vec<i64>,
    /// Values when the tag is `Double`
    #[prost(double, repeated, packed = "true", tag = "7")]
    pub value_double: Vec<f64>,
    /// Values when the tag is `Bool`
    #[prost(bool, repeated, packed = "true", tag = "8")]
    pub value_bool: Vec<bool>,
}

impl Field {
    /// Resolved type tag; unknown tags read as strings, like the schema default
    pub fn kind(&self) -> ValueType {
        self.value_type
            .and_then(|v| ValueType::try_from(v).ok())
            .unwrap_or(ValueType::String)
    }
}

/// A decoded heka message.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Message {
    /// 16 byte message id
    #[prost(bytes = "vec", required, tag = "1")]
    pub uuid: Vec<u8>,
    /// Nanoseconds since the epoch
    #[prost(int64, required, tag = "2")]
    pub timestamp: i64,
    /// Message type, e.g. `telemetry`
    #[prost(string, optional, tag = "3")]
    pub r#type: Option<String>,
    /// Producing plugin
    #[prost(string, optional, tag = "4")]
    pub logger: Option<String>,
    /// Syslog severity, 7 (debug) when unset
    #[prost(int32, optional, tag = "5", default = "7")]
    pub severity: Option<i32>,
    /// Usually the JSON ping
    #[prost(string, optional, tag = "6")]
    pub payload: Option<String>,
    /// Producer environment version
    #[prost(string, optional, tag = "7")]
    pub env_version: Option<String>,
    /// Producer process id
    #[prost(int32, optional, tag = "8")]
    pub pid: Option<i32>,
    /// Producing host
    #[prost(string, optional, tag = "9")]
    pub hostname: Option<String>,
    /// Side-fields, in wire order
    #[prost(message, repeated, tag = "10")]
    pub fields: Vec<Field>,
}

/// Parses a header blob.
pub fn decode_header(buf: &[u8]) -> Result<Header> {
    Ok(Header::decode(buf)?)
}

/// Parses a (decompressed) message body.
pub fn decode_message(buf: &[u8]) -> Result<Message> {
    Ok(Message::decode(buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Error, ErrorKind};

    #[test]
    fn empty_header_has_zero_length() {
        let header = decode_header(&[]).unwrap();
        assert_eq!(0, header.body_length());
    }

    #[test]
    fn reads_message_length() {
        // field 1, varint 300
        let header = decode_header(&[0x08, 0xac, 0x02]).unwrap();
        assert_eq!(300, header.body_length());
    }

    #[test]
    fn unknown_value_type_reads_as_string() {
        let field = Field {
            name: "a".to_string(),
            value_type: Some(42),
            ..Default::default()
        };
        assert_eq!(ValueType::String, field.kind());
    }

    #[test]
    fn garbage_is_a_decode_error() {
        // field 1 with wire type 7 does not exist
        let err = decode_message(&[0x0f, 0x01, 0x02]).unwrap_err();
        assert_eq!(ErrorKind::Decode, err.kind());
        assert!(matches!(err, Error::Decode(_)));
    }
}
