// Author: Dustin Pilgrim
// License: MIT

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::Document;
use crate::export;
use crate::parser::Parser;
use crate::CompileError;

/// Text format of a document on disk or on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    #[default]
    Yaml,
    Json,
}

impl Format {
    /// Guess the format from a file extension. Anything that is not `.json`
    /// is treated as YAML, which also accepts JSON input.
    pub fn from_path(path: impl AsRef<Path>) -> Format {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Format::Yaml => "yml",
            Format::Json => "json",
        }
    }
}

/// Parse YAML or JSON text into a document.
///
/// # Examples
/// ```
/// use cfngen::load_str;
///
/// # fn main() -> Result<(), cfngen::CompileError> {
/// let doc = load_str("Resources: {}\n")?;
/// assert!(doc.root.get_key("Resources").is_some());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Returns `CompileError::Parse` with the line and column of the first
/// offending token.
pub fn load_str(text: &str) -> Result<Document, CompileError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let normalized;
    let text = if text.contains('\r') {
        normalized = text.replace("\r\n", "\n");
        normalized.as_str()
    } else {
        text
    };

    let mut parser = Parser::new(text)?;
    parser.parse_document()
}

/// Read and parse a file, recording its path as the document source.
///
/// # Errors
/// Returns `CompileError::Io` if the file cannot be read, or a parse error
/// naming the file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Document, CompileError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
    debug!(path = %path.display(), bytes = content.len(), "loading document");

    let doc = load_str(&content).map_err(|e| e.with_document(path))?;
    Ok(doc.with_source(path))
}

/// Serialize a document as YAML.
pub fn dump(doc: &Document) -> String {
    export::to_yaml_string(doc)
}

/// Serialize a document as JSON, with tags in their long form.
///
/// # Errors
/// `TypeMismatch` for a non-finite number, which JSON cannot hold.
pub fn dump_json(doc: &Document) -> Result<String, CompileError> {
    export::to_json_string(doc)
}

/// Serialize a document in the requested format.
pub fn dump_as(doc: &Document, format: Format) -> Result<String, CompileError> {
    match format {
        Format::Yaml => Ok(dump(doc)),
        Format::Json => dump_json(doc),
    }
}

/// Write a document to `path`, picking the format from its extension.
pub fn write_file(doc: &Document, path: impl AsRef<Path>) -> Result<(), CompileError> {
    let path = path.as_ref();
    let text = dump_as(doc, Format::from_path(path))?;
    fs::write(path, text).map_err(|e| CompileError::io(path, e))?;
    debug!(path = %path.display(), "wrote document");
    Ok(())
}
