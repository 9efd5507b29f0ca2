use crate::ast::{Document, Node, Value};
use crate::CompileError;

/// Top-level sections of a config document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Section {
    Embed,
    Alarms,
    BatchMode,
    OutputFormat,
}

const SECTIONS: &[Section] = &[Section::Embed, Section::Alarms, Section::BatchMode, Section::OutputFormat];

impl Section {
    pub(super) fn key(&self) -> &'static str {
        match self {
            Section::Embed => "embed",
            Section::Alarms => "alarms",
            Section::BatchMode => "batch_mode",
            Section::OutputFormat => "output_format",
        }
    }

    fn from_key(key: &str) -> Option<Section> {
        SECTIONS.iter().copied().find(|s| s.key() == key)
    }
}

/// Check the document shape and pair every top-level key with its section.
///
/// An empty document has no sections. Anything other than a mapping, or a
/// key outside the known sections, is a `TypeMismatch` naming the file.
pub(super) fn sections(doc: &Document) -> Result<Vec<(Section, &Node)>, CompileError> {
    let source = doc.source.as_deref();
    let entries = match &doc.root.value {
        Value::Mapping(entries) => entries,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(CompileError::type_mismatch("", "a mapping of config sections", other.kind())
                .with_optional_document(source));
        }
    };

    let mut found = Vec::with_capacity(entries.len());
    for (key, node) in entries {
        let section = Section::from_key(key).ok_or_else(|| {
            let expected = SECTIONS.iter().map(Section::key).collect::<Vec<_>>().join(", ");
            CompileError::type_mismatch(key, format!("one of {}", expected), format!("unknown key `{}`", key))
                .with_optional_document(source)
        })?;
        found.push((section, node));
    }
    Ok(found)
}
