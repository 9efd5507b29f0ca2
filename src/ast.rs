use std::fmt;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][-+]?[0-9]+)?$")
        .expect("number pattern is valid")
});

static SPECIAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN)|0x[0-9a-fA-F]+|0o[0-7]+)$")
        .expect("special number pattern is valid")
});

/// A numeric scalar that remembers how it was written, so untouched numbers
/// dump back exactly as they were loaded.
///
/// Besides decimals this covers the core-schema `.inf`, `-.inf` and `.nan`
/// forms and unsigned `0x` and `0o` integers.
#[derive(Debug, Clone)]
pub struct Number {
    text: String,
}

impl Number {
    /// Parse a plain scalar as a YAML core-schema number.
    pub fn parse(text: &str) -> Option<Number> {
        let valid = NUMBER_RE.is_match(text)
            || (SPECIAL_RE.is_match(text) && (!text.starts_with('0') || radix_integer(text).is_some()));
        if valid {
            Some(Number { text: text.to_string() })
        } else {
            None
        }
    }

    pub fn from_f64(n: f64) -> Number {
        let text = if n.is_nan() {
            ".nan".to_string()
        } else if n.is_infinite() {
            let text = if n > 0.0 { ".inf" } else { "-.inf" };
            text.to_string()
        } else if n.fract() == 0.0 && n.abs() < 1e15 {
            format!("{}", n as i64)
        } else {
            format!("{}", n)
        };
        Number { text }
    }

    pub fn from_u64(n: u64) -> Number {
        Number { text: n.to_string() }
    }

    pub fn as_f64(&self) -> f64 {
        if let Some(n) = radix_integer(&self.text) {
            return n as f64;
        }
        match self.text.trim_start_matches('+') {
            ".inf" | ".Inf" | ".INF" => f64::INFINITY,
            "-.inf" | "-.Inf" | "-.INF" => f64::NEG_INFINITY,
            ".nan" | ".NaN" | ".NAN" => f64::NAN,
            text => text.parse::<f64>().unwrap_or(f64::NAN),
        }
    }

    /// Integral value, if the number has no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        if let Some(n) = radix_integer(&self.text) {
            return i64::try_from(n).ok();
        }
        if let Ok(n) = self.text.trim_start_matches('+').parse::<i64>() {
            return Some(n);
        }
        let f = self.as_f64();
        if f.fract() == 0.0 && f.abs() < 9.0e15 {
            Some(f as i64)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

fn radix_integer(text: &str) -> Option<u64> {
    if let Some(hex) = text.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(octal) = text.strip_prefix("0o") {
        u64::from_str_radix(octal, 8).ok()
    } else {
        None
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.as_f64(), other.as_f64());
        a == b || (a.is_nan() && b.is_nan())
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_i64() {
            Some(n) => serializer.serialize_i64(n),
            None => serializer.serialize_f64(self.as_f64()),
        }
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NumberVisitor;

        impl Visitor<'_> for NumberVisitor {
            type Value = Number;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Number, E> {
                Ok(Number { text: v.to_string() })
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Number, E> {
                Ok(Number::from_u64(v))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Number, E> {
                Ok(Number::from_f64(v))
            }
        }

        deserializer.deserialize_any(NumberVisitor)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Provider intrinsic functions written in short tag form (`!Sub`, `!Ref`, ...).
///
/// Unrecognized tags are kept as `Other` with their payload untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Sub,
    Ref,
    GetAtt,
    If,
    Join,
    Split,
    Not,
    Equals,
    ImportValue,
    Other(String),
}

impl Tag {
    /// Map a tag name (without the leading `!`) to a tag.
    pub fn from_name(name: &str) -> Tag {
        match name {
            "Sub" => Tag::Sub,
            "Ref" => Tag::Ref,
            "GetAtt" => Tag::GetAtt,
            "If" => Tag::If,
            "Join" => Tag::Join,
            "Split" => Tag::Split,
            "Not" => Tag::Not,
            "Equals" => Tag::Equals,
            "ImportValue" => Tag::ImportValue,
            other => Tag::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Tag::Sub => "Sub",
            Tag::Ref => "Ref",
            Tag::GetAtt => "GetAtt",
            Tag::If => "If",
            Tag::Join => "Join",
            Tag::Split => "Split",
            Tag::Not => "Not",
            Tag::Equals => "Equals",
            Tag::ImportValue => "ImportValue",
            Tag::Other(name) => name,
        }
    }

    /// Key used for this function in JSON templates.
    pub fn long_form(&self) -> String {
        match self {
            Tag::Ref => "Ref".to_string(),
            Tag::Other(name) if name == "Condition" => name.clone(),
            other => format!("Fn::{}", other.name()),
        }
    }

    /// Inverse of [`long_form`](Self::long_form) for the recognized functions.
    pub fn from_long_form(key: &str) -> Option<Tag> {
        let tag = match key {
            "Ref" => Tag::Ref,
            _ => Tag::from_name(key.strip_prefix("Fn::")?),
        };
        tag.is_recognized().then_some(tag)
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Tag::Other(_))
    }

    /// Check that a payload has the shape this function requires.
    ///
    /// Returns a description of the expected shape on mismatch. `Other` tags
    /// accept anything.
    pub fn check_payload(&self, payload: &Value) -> Result<(), &'static str> {
        let seq_len = |n: usize| matches!(payload, Value::Sequence(items) if items.len() == n);
        let ok = match self {
            Tag::Sub => match payload {
                Value::String(_) => true,
                Value::Sequence(items) => {
                    items.len() == 2
                        && matches!(items[0].value, Value::String(_))
                        && matches!(items[1].value, Value::Mapping(_))
                }
                _ => false,
            },
            Tag::Ref => matches!(payload, Value::String(_)),
            Tag::GetAtt => match payload {
                Value::String(s) => s.contains('.'),
                _ => seq_len(2),
            },
            Tag::If => seq_len(3),
            Tag::Join | Tag::Split | Tag::Equals => seq_len(2),
            Tag::Not => seq_len(1),
            Tag::ImportValue => matches!(payload, Value::String(_) | Value::Tagged(..)),
            Tag::Other(_) => true,
        };

        if ok {
            return Ok(());
        }
        Err(match self {
            Tag::Sub => "a string or a [string, mapping] pair",
            Tag::Ref => "a resource or parameter name",
            Tag::GetAtt => "`Resource.Attribute` or a 2-element sequence",
            Tag::If => "a 3-element sequence",
            Tag::Join | Tag::Split | Tag::Equals => "a 2-element sequence",
            Tag::Not => "a 1-element sequence",
            Tag::ImportValue => "a string or a function",
            Tag::Other(_) => "anything",
        })
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "!{}", self.name())
    }
}

/// Comment text attached to a node. Not part of the node's value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    /// Full-line comments directly above the node, without the `#`.
    pub leading: Vec<String>,
    /// End-of-line comment on the line that introduces the node.
    pub trailing: Option<String>,
}

impl Comments {
    pub fn is_empty(&self) -> bool {
        self.leading.is_empty() && self.trailing.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Mapping(Vec<(String, Node)>),
    Sequence(Vec<Node>),
    Tagged(Tag, Box<Node>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Mapping(_) => "mapping",
            Value::Sequence(_) => "sequence",
            Value::Tagged(..) => "tagged function",
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_mapping(&self) -> Option<&Vec<(String, Node)>> {
        if let Value::Mapping(entries) = self {
            Some(entries)
        } else {
            None
        }
    }

    pub fn as_sequence(&self) -> Option<&Vec<Node>> {
        if let Value::Sequence(items) = self {
            Some(items)
        } else {
            None
        }
    }
}

/// A document node: a value plus its comment annotation.
///
/// Equality ignores comments.
#[derive(Debug, Clone)]
pub struct Node {
    pub value: Value,
    pub comments: Comments,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Node {
    pub fn new(value: Value) -> Self {
        Node {
            value,
            comments: Comments::default(),
        }
    }

    pub fn null() -> Self {
        Node::new(Value::Null)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Node::new(Value::String(s.into()))
    }

    pub fn number(n: f64) -> Self {
        Node::new(Value::Number(Number::from_f64(n)))
    }

    pub fn bool(b: bool) -> Self {
        Node::new(Value::Bool(b))
    }

    pub fn mapping(entries: Vec<(String, Node)>) -> Self {
        Node::new(Value::Mapping(entries))
    }

    pub fn sequence(items: Vec<Node>) -> Self {
        Node::new(Value::Sequence(items))
    }

    pub fn tagged(tag: Tag, payload: Node) -> Self {
        Node::new(Value::Tagged(tag, Box::new(payload)))
    }

    pub fn with_leading_comment(mut self, text: impl Into<String>) -> Self {
        self.comments.leading.push(text.into());
        self
    }

    pub fn with_trailing_comment(mut self, text: impl Into<String>) -> Self {
        self.comments.trailing = Some(text.into());
        self
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    pub fn as_mapping(&self) -> Option<&Vec<(String, Node)>> {
        self.value.as_mapping()
    }

    pub fn as_sequence(&self) -> Option<&Vec<Node>> {
        self.value.as_sequence()
    }

    /// Look up a key in a mapping node.
    pub fn get_key(&self, key: &str) -> Option<&Node> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// A loaded or generated document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Node,
    /// Where the document was read from, if it came from disk.
    pub source: Option<PathBuf>,
    /// Comments after the last node.
    pub trailing_comments: Vec<String>,
}

impl Document {
    pub fn new(root: Node) -> Self {
        Document {
            root,
            source: None,
            trailing_comments: Vec::new(),
        }
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }
}
