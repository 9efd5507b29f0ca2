use std::fmt;

use crate::ast::{Document, Node, Value};
use crate::CompileError;

/// One step of a [`KeyPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// A location in a document, written `Resources.Api.Properties.Tags[0]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<Segment>,
}

impl KeyPath {
    /// The empty path, naming the document root.
    pub fn root() -> Self {
        KeyPath::default()
    }

    /// Parse the dotted form. Indices are written in brackets after a key
    /// (`Tags[0]`) or on their own (`[1][0]`).
    pub fn parse(text: &str) -> Result<Self, CompileError> {
        let mut path = KeyPath::root();
        if text.trim().is_empty() {
            return Ok(path);
        }

        for part in text.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            if !key.is_empty() {
                path.segments.push(Segment::Key(key.to_string()));
            } else if rest.is_empty() {
                return Err(bad_path(text, "empty key"));
            }

            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| bad_path(text, "unclosed '['"))?;
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| bad_path(text, "index is not a number"))?;
                path.segments.push(Segment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(bad_path(text, "unexpected text after ']'"));
                }
            }
        }

        Ok(path)
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(Segment::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(Segment::Index(index));
        self
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) -> Option<Segment> {
        self.segments.pop()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path without its last segment, plus that segment.
    pub fn split_last(&self) -> Option<(KeyPath, &Segment)> {
        let (last, parent) = self.segments.split_last()?;
        Some((
            KeyPath {
                segments: parent.to_vec(),
            },
            last,
        ))
    }

    fn prefix(&self, len: usize) -> KeyPath {
        KeyPath {
            segments: self.segments[..len].to_vec(),
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{}", key)?,
                Segment::Key(key) => write!(f, ".{}", key)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for KeyPath {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyPath::parse(s)
    }
}

fn bad_path(text: &str, reason: &str) -> CompileError {
    CompileError::type_mismatch(text, "a key path", reason)
}

fn step<'n>(node: &'n Node, segment: &Segment, path: &KeyPath, depth: usize) -> Result<&'n Node, CompileError> {
    match (segment, &node.value) {
        (Segment::Key(key), Value::Mapping(entries)) => entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .ok_or_else(|| CompileError::not_found(path.prefix(depth + 1))),
        (Segment::Index(index), Value::Sequence(items)) => items
            .get(*index)
            .ok_or_else(|| CompileError::not_found(path.prefix(depth + 1))),
        (Segment::Key(_), other) => Err(CompileError::type_mismatch(path.prefix(depth), "mapping", other.kind())),
        (Segment::Index(_), other) => Err(CompileError::type_mismatch(path.prefix(depth), "sequence", other.kind())),
    }
}

fn step_mut<'n>(node: &'n mut Node, segment: &Segment, path: &KeyPath, depth: usize) -> Result<&'n mut Node, CompileError> {
    match (segment, &mut node.value) {
        (Segment::Key(key), Value::Mapping(entries)) => entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .ok_or_else(|| CompileError::not_found(path.prefix(depth + 1))),
        (Segment::Index(index), Value::Sequence(items)) => items
            .get_mut(*index)
            .ok_or_else(|| CompileError::not_found(path.prefix(depth + 1))),
        (Segment::Key(_), other) => Err(CompileError::type_mismatch(path.prefix(depth), "mapping", other.kind())),
        (Segment::Index(_), other) => Err(CompileError::type_mismatch(path.prefix(depth), "sequence", other.kind())),
    }
}

impl Node {
    /// Navigate to the node at `path`.
    ///
    /// A missing key or index is `NotFound`; walking into a scalar (or a
    /// mapping with an index) is `TypeMismatch`.
    pub fn get(&self, path: &KeyPath) -> Result<&Node, CompileError> {
        let mut current = self;
        for (depth, segment) in path.segments.iter().enumerate() {
            current = step(current, segment, path, depth)?;
        }
        Ok(current)
    }

    pub fn get_mut(&mut self, path: &KeyPath) -> Result<&mut Node, CompileError> {
        let mut current = self;
        for (depth, segment) in path.segments.iter().enumerate() {
            current = step_mut(current, segment, path, depth)?;
        }
        Ok(current)
    }

    /// Set the node at `path`. The parent must exist.
    ///
    /// An existing key is replaced in place and keeps its comments unless the
    /// new node carries its own; a new key is appended to the mapping. For
    /// sequences, an index equal to the length appends.
    pub fn insert(&mut self, path: &KeyPath, node: Node) -> Result<(), CompileError> {
        let (parent_path, last) = path
            .split_last()
            .ok_or_else(|| CompileError::type_mismatch(path, "a key path below the root", "the root"))?;
        let parent = self.get_mut(&parent_path)?;

        match (last, &mut parent.value) {
            (Segment::Key(key), Value::Mapping(entries)) => {
                match entries.iter_mut().find(|(k, _)| k == key) {
                    Some((_, existing)) => replace_keeping_comments(existing, node),
                    None => entries.push((key.clone(), node)),
                }
                Ok(())
            }
            (Segment::Index(index), Value::Sequence(items)) => {
                if *index < items.len() {
                    replace_keeping_comments(&mut items[*index], node);
                    Ok(())
                } else if *index == items.len() {
                    items.push(node);
                    Ok(())
                } else {
                    Err(CompileError::not_found(path))
                }
            }
            (Segment::Key(_), other) => Err(CompileError::type_mismatch(&parent_path, "mapping", other.kind())),
            (Segment::Index(_), other) => Err(CompileError::type_mismatch(&parent_path, "sequence", other.kind())),
        }
    }

    /// Insert a new key into the mapping at `path` at `position`. An existing
    /// key is replaced where it already stands.
    pub fn insert_at(&mut self, path: &KeyPath, position: usize, key: &str, node: Node) -> Result<(), CompileError> {
        let target = self.get_mut(path)?;
        let found = target.value.kind();
        let entries = match &mut target.value {
            Value::Mapping(entries) => entries,
            _ => return Err(CompileError::type_mismatch(path, "mapping", found)),
        };

        if let Some((_, existing)) = entries.iter_mut().find(|(k, _)| k == key) {
            replace_keeping_comments(existing, node);
            return Ok(());
        }
        let position = position.min(entries.len());
        entries.insert(position, (key.to_string(), node));
        Ok(())
    }

    /// Swap the value at `path`, leaving its comments untouched.
    pub fn replace_value(&mut self, path: &KeyPath, value: Value) -> Result<Value, CompileError> {
        let target = self.get_mut(path)?;
        Ok(std::mem::replace(&mut target.value, value))
    }

    /// Append to the sequence at `path`.
    pub fn push(&mut self, path: &KeyPath, node: Node) -> Result<(), CompileError> {
        let target = self.get_mut(path)?;
        let found = target.value.kind();
        match &mut target.value {
            Value::Sequence(items) => {
                items.push(node);
                Ok(())
            }
            _ => Err(CompileError::type_mismatch(path, "sequence", found)),
        }
    }

    /// Remove the node at `path` and return it.
    pub fn remove(&mut self, path: &KeyPath) -> Result<Node, CompileError> {
        let (parent_path, last) = path
            .split_last()
            .ok_or_else(|| CompileError::type_mismatch(path, "a key path below the root", "the root"))?;
        let parent = self.get_mut(&parent_path)?;

        match (last, &mut parent.value) {
            (Segment::Key(key), Value::Mapping(entries)) => {
                let pos = entries
                    .iter()
                    .position(|(k, _)| k == key)
                    .ok_or_else(|| CompileError::not_found(path))?;
                Ok(entries.remove(pos).1)
            }
            (Segment::Index(index), Value::Sequence(items)) => {
                if *index < items.len() {
                    Ok(items.remove(*index))
                } else {
                    Err(CompileError::not_found(path))
                }
            }
            (Segment::Key(_), other) => Err(CompileError::type_mismatch(&parent_path, "mapping", other.kind())),
            (Segment::Index(_), other) => Err(CompileError::type_mismatch(&parent_path, "sequence", other.kind())),
        }
    }
}

fn replace_keeping_comments(existing: &mut Node, node: Node) {
    if node.comments.is_empty() {
        existing.value = node.value;
    } else {
        *existing = node;
    }
}

impl Document {
    /// Navigate by dotted path.
    ///
    /// # Examples
    /// ```
    /// # use cfngen::load_str;
    /// # fn main() -> Result<(), cfngen::CompileError> {
    /// let doc = load_str("Resources:\n  Api:\n    Type: AWS::Serverless::Api\n")?;
    /// let ty = doc.node("Resources.Api.Type")?;
    /// assert_eq!(ty.as_str(), Some("AWS::Serverless::Api"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn node(&self, path: &str) -> Result<&Node, CompileError> {
        let path = KeyPath::parse(path).map_err(|e| self.locate(e))?;
        self.root.get(&path).map_err(|e| self.locate(e))
    }

    pub fn node_mut(&mut self, path: &str) -> Result<&mut Node, CompileError> {
        let source = self.source.clone();
        let path = KeyPath::parse(path).map_err(|e| e.with_optional_document(source.as_deref()))?;
        self.root
            .get_mut(&path)
            .map_err(|e| e.with_optional_document(source.as_deref()))
    }

    /// Get a typed scalar using dot notation.
    ///
    /// # Examples
    /// ```
    /// # use cfngen::load_str;
    /// # fn main() -> Result<(), cfngen::CompileError> {
    /// let doc = load_str("Parameters:\n  Memory:\n    Default: 512\n")?;
    /// let memory: u64 = doc.get("Parameters.Memory.Default")?;
    /// assert_eq!(memory, 512);
    /// # Ok(())
    /// # }
    /// ```
    pub fn get<'a, T>(&'a self, path: &str) -> Result<T, CompileError>
    where
        T: TryFrom<&'a Node, Error = CompileError>,
    {
        let node = self.node(path)?;
        T::try_from(node).map_err(|e| match e {
            CompileError::TypeMismatch { expected, found, .. } => CompileError::TypeMismatch {
                document: self.source.clone(),
                key_path: path.to_string(),
                expected,
                found,
            },
            other => self.locate(other),
        })
    }

    /// Like [`get`](Self::get), but an absent path is `None`.
    pub fn get_optional<'a, T>(&'a self, path: &str) -> Result<Option<T>, CompileError>
    where
        T: TryFrom<&'a Node, Error = CompileError>,
    {
        match self.get(path) {
            Ok(v) => Ok(Some(v)),
            Err(CompileError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn insert(&mut self, path: &str, node: Node) -> Result<(), CompileError> {
        let source = self.source.clone();
        KeyPath::parse(path)
            .and_then(|p| self.root.insert(&p, node))
            .map_err(|e| e.with_optional_document(source.as_deref()))
    }

    pub fn remove(&mut self, path: &str) -> Result<Node, CompileError> {
        let source = self.source.clone();
        KeyPath::parse(path)
            .and_then(|p| self.root.remove(&p))
            .map_err(|e| e.with_optional_document(source.as_deref()))
    }

    fn locate(&self, err: CompileError) -> CompileError {
        err.with_optional_document(self.source.as_deref())
    }
}

macro_rules! scalar_conversion {
    ($ty:ty, $expected:expr, |$value:ident| $body:expr) => {
        impl TryFrom<&Node> for $ty {
            type Error = CompileError;

            fn try_from(node: &Node) -> Result<Self, Self::Error> {
                let $value = &node.value;
                let converted: Option<$ty> = $body;
                converted.ok_or_else(|| CompileError::type_mismatch("", $expected, node.value.kind()))
            }
        }
    };
}

scalar_conversion!(String, "string", |value| match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
});

scalar_conversion!(bool, "bool", |value| match value {
    Value::Bool(b) => Some(*b),
    _ => None,
});

scalar_conversion!(f64, "number", |value| match value {
    Value::Number(n) => Some(n.as_f64()),
    _ => None,
});

scalar_conversion!(i64, "integer", |value| match value {
    Value::Number(n) => n.as_i64(),
    _ => None,
});

scalar_conversion!(u64, "unsigned integer", |value| match value {
    Value::Number(n) => n.as_i64().and_then(|i| u64::try_from(i).ok()),
    _ => None,
});

impl<'a> TryFrom<&'a Node> for &'a str {
    type Error = CompileError;

    fn try_from(node: &'a Node) -> Result<Self, Self::Error> {
        node.as_str()
            .ok_or_else(|| CompileError::type_mismatch("", "string", node.value.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_str;

    const TEMPLATE: &str = r#"Resources:
  Api:
    Type: AWS::Serverless::Api
    Properties:
      StageName: prod # stage
      Tags:
        - alpha
        - beta
      MemorySize: 512
"#;

    #[test]
    fn test_key_path_display_and_parse() {
        let path = KeyPath::root().key("Resources").key("Api").key("Tags").index(0);
        assert_eq!(path.to_string(), "Resources.Api.Tags[0]");
        assert_eq!(KeyPath::parse("Resources.Api.Tags[0]").unwrap(), path);
        assert_eq!(KeyPath::parse("[1][0]").unwrap(), KeyPath::root().index(1).index(0));
        assert!(KeyPath::parse("a[x]").is_err());
        assert!(KeyPath::parse("a..b").is_err());
    }

    #[test]
    fn test_not_found_vs_type_mismatch() {
        let doc = load_str(TEMPLATE).expect("Failed to load template");

        match doc.node("Resources.Api.Properties.Missing") {
            Err(CompileError::NotFound { key_path, .. }) => {
                assert_eq!(key_path, "Resources.Api.Properties.Missing");
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }

        match doc.node("Resources.Api.Type.Inner") {
            Err(CompileError::TypeMismatch { key_path, expected, found, .. }) => {
                assert_eq!(key_path, "Resources.Api.Type");
                assert_eq!(expected, "mapping");
                assert_eq!(found, "string");
            }
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }

        assert!(matches!(
            doc.node("Resources.Api.Properties.Tags[5]"),
            Err(CompileError::NotFound { .. })
        ));
    }

    #[test]
    fn test_typed_get() {
        let doc = load_str(TEMPLATE).expect("Failed to load template");
        let memory: u64 = doc.get("Resources.Api.Properties.MemorySize").unwrap();
        let stage: String = doc.get("Resources.Api.Properties.StageName").unwrap();
        let tag: &str = doc.get("Resources.Api.Properties.Tags[1]").unwrap();
        assert_eq!(memory, 512);
        assert_eq!(stage, "prod");
        assert_eq!(tag, "beta");

        let err = doc.get::<bool>("Resources.Api.Properties.StageName").unwrap_err();
        match err {
            CompileError::TypeMismatch { key_path, expected, .. } => {
                assert_eq!(key_path, "Resources.Api.Properties.StageName");
                assert_eq!(expected, "bool");
            }
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }

        let missing: Option<String> = doc.get_optional("Resources.Api.Properties.Nope").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_insert_replaces_in_place_and_keeps_comments() {
        let mut doc = load_str(TEMPLATE).expect("Failed to load template");
        doc.insert("Resources.Api.Properties.StageName", Node::string("dev")).unwrap();
        doc.insert("Resources.Api.Properties.Cors", Node::string("*")).unwrap();

        let props = doc.node("Resources.Api.Properties").unwrap();
        let keys: Vec<&str> = props.as_mapping().unwrap().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["StageName", "Tags", "MemorySize", "Cors"]);

        let stage = props.get_key("StageName").unwrap();
        assert_eq!(stage.as_str(), Some("dev"));
        assert_eq!(stage.comments.trailing.as_deref(), Some(" stage"));
    }

    #[test]
    fn test_insert_at_position_and_push() {
        let mut doc = load_str(TEMPLATE).expect("Failed to load template");
        let props = KeyPath::parse("Resources.Api.Properties").unwrap();
        doc.root.insert_at(&props, 0, "Name", Node::string("analysis")).unwrap();
        doc.root.push(&props.clone().key("Tags"), Node::string("gamma")).unwrap();

        let node = doc.root.get(&props).unwrap();
        assert_eq!(node.as_mapping().unwrap()[0].0, "Name");
        assert_eq!(node.get_key("Tags").unwrap().as_sequence().unwrap().len(), 3);

        let err = doc.root.push(&props.clone().key("Name"), Node::null()).unwrap_err();
        assert!(matches!(err, CompileError::TypeMismatch { .. }));
    }

    #[test]
    fn test_replace_value_keeps_comments() {
        let mut doc = load_str(TEMPLATE).expect("Failed to load template");
        let path = KeyPath::parse("Resources.Api.Properties.StageName").unwrap();
        let old = doc.root.replace_value(&path, Value::Mapping(vec![])).unwrap();
        assert_eq!(old, Value::String("prod".into()));
        let node = doc.root.get(&path).unwrap();
        assert_eq!(node.comments.trailing.as_deref(), Some(" stage"));
    }

    #[test]
    fn test_remove() {
        let mut doc = load_str(TEMPLATE).expect("Failed to load template");
        let removed = doc.remove("Resources.Api.Properties.Tags[0]").unwrap();
        assert_eq!(removed.as_str(), Some("alpha"));
        doc.remove("Resources.Api.Properties.MemorySize").unwrap();
        assert!(matches!(
            doc.remove("Resources.Api.Properties.MemorySize"),
            Err(CompileError::NotFound { .. })
        ));
    }

    #[test]
    fn test_errors_carry_document_source() {
        let doc = load_str(TEMPLATE)
            .expect("Failed to load template")
            .with_source("deploy/api.yml");
        let err = doc.node("Outputs").unwrap_err();
        assert_eq!(err.to_string(), "deploy/api.yml: no node at `Outputs`");
    }
}
