//! Projection of a heka message into the nested ping document.

use std::mem;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::errors::Result;
use crate::lazy::LazyValue;
use crate::message::{Field, Message, ValueType};

/// Bytes field whose JSON is layered over the payload
pub const SUBMISSION_FIELD: &str = "submission";
/// Key holding the message metadata
pub const META_KEY: &str = "meta";

/// A value inside a [`Record`].
#[derive(Debug, Clone)]
pub enum Node {
    /// Eagerly parsed JSON, from the payload or a typed scalar field
    Json(Value),
    /// Nested mapping created for a dotted field name
    Object(Record),
    /// Side-field text, parsed on demand
    Lazy(LazyValue),
}

impl Node {
    /// The nested mapping, if this is one
    pub fn as_record(&self) -> Option<&Record> {
        match *self {
            Node::Object(ref r) => Some(r),
            _ => None,
        }
    }

    /// The deferred value, if this is one
    pub fn as_lazy(&self) -> Option<&LazyValue> {
        match *self {
            Node::Lazy(ref l) => Some(l),
            _ => None,
        }
    }

    /// The eager JSON value, if this is one
    pub fn as_json(&self) -> Option<&Value> {
        match *self {
            Node::Json(ref v) => Some(v),
            _ => None,
        }
    }

    /// Fully materialized copy
    pub fn to_json(&self) -> Result<Value> {
        match *self {
            Node::Json(ref v) => Ok(v.clone()),
            Node::Object(ref r) => r.to_json(),
            Node::Lazy(ref l) => l.to_json(),
        }
    }

    fn into_record(self) -> Result<Record> {
        let value = match self {
            Node::Object(r) => return Ok(r),
            Node::Json(v) => v,
            Node::Lazy(l) => l.into_json()?,
        };

        Ok(match value {
            Value::Object(map) => Record::from(map),
            _ => Record::new(),
        })
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match *self {
            Node::Json(ref v) => v.serialize(serializer),
            Node::Object(ref r) => r.serialize(serializer),
            Node::Lazy(ref l) => l.serialize(serializer),
        }
    }
}

/// A decoded ping: ordered keys mapping to eager, nested or deferred values.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: IndexMap<String, Node>,
}

impl Record {
    /// Empty record
    pub fn new() -> Record {
        Record::default()
    }

    /// Value under `key`
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.fields.get(key)
    }

    /// Follows `keys` through nested mappings
    pub fn path(&self, keys: &[&str]) -> Option<&Node> {
        let (last, parents) = keys.split_last()?;
        let mut current = self;
        for key in parents {
            current = current.get(key)?.as_record()?;
        }

        current.get(last)
    }

    /// The `meta` mapping
    pub fn meta(&self) -> Option<&Record> {
        self.get(META_KEY).and_then(Node::as_record)
    }

    /// Sets `key`, returning the previous value
    pub fn insert<K: Into<String>>(&mut self, key: K, node: Node) -> Option<Node> {
        self.fields.insert(key.into(), node)
    }

    /// Number of top-level keys
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True without keys
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Fully materialized copy; every deferred value gets parsed
    pub fn to_json(&self) -> Result<Value> {
        let mut map = Map::with_capacity(self.fields.len());
        for (k, v) in &self.fields {
            map.insert(k.clone(), v.to_json()?);
        }

        Ok(Value::Object(map))
    }

    /// Mapping under `key`, created (or replacing a non-mapping) as needed
    fn child_mut(&mut self, key: &str) -> Result<&mut Record> {
        let slot = self
            .fields
            .entry(key.to_owned())
            .or_insert_with(|| Node::Object(Record::new()));

        if !matches!(*slot, Node::Object(_)) {
            let record = mem::replace(slot, Node::Json(Value::Null)).into_record()?;
            *slot = Node::Object(record);
        }

        match *slot {
            Node::Object(ref mut r) => Ok(r),
            _ => unreachable!("slot was just replaced by a mapping"),
        }
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Record {
        Record {
            fields: map.into_iter().map(|(k, v)| (k, Node::Json(v))).collect(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Builds the ping document for `message`.
///
/// The JSON payload is the base; `meta` carries timestamp, type and hostname
/// plus any single-segment field, and dotted field names become nested
/// mappings ending in a [`LazyValue`].
///
/// # Failures
/// A payload or `submission` field that is not a JSON object.
pub fn project(message: &Message) -> Result<Record> {
    let mut record = match message.payload.as_deref() {
        Some(payload) if !payload.is_empty() => {
            Record::from(serde_json::from_str::<Map<String, Value>>(payload)?)
        }
        _ => Record::new(),
    };

    let mut meta = Record::new();
    meta.insert("Timestamp", Node::Json(Value::from(message.timestamp)));
    meta.insert(
        "Type",
        Node::Json(Value::from(message.r#type.clone().unwrap_or_default())),
    );
    meta.insert(
        "Hostname",
        Node::Json(Value::from(message.hostname.clone().unwrap_or_default())),
    );
    record.insert(META_KEY, Node::Object(meta));

    for field in &message.fields {
        if field.kind() == ValueType::Bytes {
            if field.name == SUBMISSION_FIELD {
                merge_submission(&mut record, field)?;
            } else {
                // TODO: carry non-submission bytes fields once consumers agree on an encoding
                debug!("dropping bytes field {}", field.name);
            }
            continue;
        }

        let mut segments: Vec<&str> = field.name.split('.').collect();
        let last = segments.pop().unwrap_or_default();
        if segments.is_empty() {
            let value = first_value(field).unwrap_or_else(|| Value::from(""));
            record.child_mut(META_KEY)?.insert(last, Node::Json(value));
            continue;
        }

        let mut container = &mut record;
        for segment in segments {
            container = container.child_mut(segment)?;
        }
        container.insert(last, leaf(field));
    }

    Ok(record)
}

fn merge_submission(record: &mut Record, field: &Field) -> Result<()> {
    let bytes = match field.value_bytes.first() {
        Some(b) => b,
        None => return Ok(()),
    };

    let submission: Map<String, Value> = serde_json::from_str(&String::from_utf8_lossy(bytes))?;
    for (k, v) in submission {
        record.insert(k, Node::Json(v));
    }

    Ok(())
}

fn first_value(field: &Field) -> Option<Value> {
    match field.kind() {
        ValueType::String => field.value_string.first().map(|s| Value::from(s.as_str())),
        ValueType::Integer => field.value_integer.first().map(|&i| Value::from(i)),
        ValueType::Double => field
            .value_double
            .first()
            .map(|&d| Number::from_f64(d).map_or(Value::Null, Value::Number)),
        ValueType::Bool => field.value_bool.first().map(|&b| Value::from(b)),
        ValueType::Bytes => None,
    }
}

fn leaf(field: &Field) -> Node {
    if field.kind() == ValueType::String {
        let raw = field.value_string.first().cloned().unwrap_or_default();
        return Node::Lazy(LazyValue::new(raw));
    }

    Node::Json(first_value(field).unwrap_or_else(|| Value::from("")))
}
