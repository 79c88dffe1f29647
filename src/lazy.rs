//! Deferred JSON for side-field values.
//!
//! Side-fields often carry whole serialized sub-documents (histogram dumps and
//! the like) that most consumers never look at. The shape is guessed from the
//! first character; objects and arrays keep the raw text until first access
//! and then parse exactly once.

use std::borrow::Cow;
use std::cell::OnceCell;
use std::fmt;

use serde::ser::{Error as _, Serialize, Serializer};
use serde_json::{Number, Value};

use crate::errors::{Error, Result};

/// Raw JSON text parsed on first access and cached afterwards.
#[derive(Clone)]
pub struct Deferred {
    raw: String,
    parsed: OnceCell<std::result::Result<Value, String>>,
}

impl Deferred {
    fn new(raw: String) -> Deferred {
        Deferred {
            raw,
            parsed: OnceCell::new(),
        }
    }

    /// The original text
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the text has been parsed yet
    pub fn is_parsed(&self) -> bool {
        self.parsed.get().is_some()
    }

    /// Parses on first call, then hands out the cached value.
    ///
    /// A parse failure is cached too, every call reports it.
    pub fn get(&self) -> Result<&Value> {
        match self.parsed.get_or_init(|| parse(&self.raw)) {
            Ok(v) => Ok(v),
            Err(e) => Err(Error::LazyJson(e.clone())),
        }
    }

    /// Consumes the wrapper, parsing if nobody did yet
    pub fn into_value(self) -> Result<Value> {
        match self.parsed.into_inner() {
            Some(Ok(v)) => Ok(v),
            Some(Err(e)) => Err(Error::LazyJson(e)),
            None => parse(&self.raw).map_err(Error::LazyJson),
        }
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parsed.get() {
            Some(Ok(v)) => write!(f, "{}", v),
            _ => write!(f, "<unparsed {} bytes>", self.raw.len()),
        }
    }
}

#[cfg(test)]
thread_local! {
    pub(crate) static PARSE_CALLS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

fn parse(raw: &str) -> std::result::Result<Value, String> {
    #[cfg(test)]
    PARSE_CALLS.with(|c| c.set(c.get() + 1));

    serde_json::from_str(raw).map_err(|e| e.to_string())
}

/// A side-field value, typed from its raw string.
#[derive(Debug, Clone)]
pub enum LazyValue {
    /// Text starting with `{`
    Map(Deferred),
    /// Text starting with `[`
    Seq(Deferred),
    /// Text that reads as an integer or a float
    Number(Number),
    /// Anything else, kept verbatim
    Str(String),
}

impl LazyValue {
    /// Classifies `raw` without parsing structures.
    ///
    /// Text containing `.`, `e` or `E` is tried as a float, anything else as
    /// an integer; surrounding whitespace is ignored.
    pub fn new(raw: String) -> LazyValue {
        if raw.starts_with('{') {
            return LazyValue::Map(Deferred::new(raw));
        }
        if raw.starts_with('[') {
            return LazyValue::Seq(Deferred::new(raw));
        }

        match parse_number(&raw) {
            Some(n) => LazyValue::Number(n),
            None => LazyValue::Str(raw),
        }
    }

    /// The parsed value, borrowed when it is cached
    pub fn value(&self) -> Result<Cow<'_, Value>> {
        match *self {
            LazyValue::Map(ref d) | LazyValue::Seq(ref d) => d.get().map(Cow::Borrowed),
            LazyValue::Number(ref n) => Ok(Cow::Owned(Value::Number(n.clone()))),
            LazyValue::Str(ref s) => Ok(Cow::Owned(Value::String(s.clone()))),
        }
    }

    /// Owned copy of the parsed value
    pub fn to_json(&self) -> Result<Value> {
        self.value().map(Cow::into_owned)
    }

    /// Consumes the wrapper
    pub fn into_json(self) -> Result<Value> {
        match self {
            LazyValue::Map(d) | LazyValue::Seq(d) => d.into_value(),
            LazyValue::Number(n) => Ok(Value::Number(n)),
            LazyValue::Str(s) => Ok(Value::String(s)),
        }
    }

    /// Looks up `key` in a mapping; `None` for other shapes
    pub fn get(&self, key: &str) -> Result<Option<&Value>> {
        match *self {
            LazyValue::Map(ref d) => Ok(d.get()?.get(key)),
            _ => Ok(None),
        }
    }

    /// Element `index` of a sequence; `None` for other shapes
    pub fn index(&self, index: usize) -> Result<Option<&Value>> {
        match *self {
            LazyValue::Seq(ref d) => Ok(d.get()?.get(index)),
            _ => Ok(None),
        }
    }

    /// Number of entries of a mapping or sequence, 0 for scalars
    pub fn len(&self) -> Result<usize> {
        match *self {
            LazyValue::Map(ref d) | LazyValue::Seq(ref d) => Ok(match *d.get()? {
                Value::Object(ref m) => m.len(),
                Value::Array(ref a) => a.len(),
                _ => 0,
            }),
            _ => Ok(0),
        }
    }

    /// True when [`LazyValue::len`] is 0
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    /// Whether structural data is still raw text
    pub fn is_deferred(&self) -> bool {
        match *self {
            LazyValue::Map(ref d) | LazyValue::Seq(ref d) => !d.is_parsed(),
            _ => false,
        }
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    let text = raw.trim();
    if text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        return text.parse::<f64>().ok().and_then(Number::from_f64);
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::from(i));
    }

    text.parse::<u64>().ok().map(Number::from)
}

impl Serialize for LazyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.value().map_err(S::Error::custom)?.serialize(serializer)
    }
}
