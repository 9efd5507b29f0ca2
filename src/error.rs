// Author: Dustin Pilgrim
// License: MIT

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The main error type for loading, embedding, and generating templates.
///
/// Every variant carries enough context (document and key path) to locate
/// the problem without re-running the compiler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Malformed input text.
    #[error("{}: parse error at {line}:{column}: {message}{}", DocLabel(.document), HintLabel(.hint))]
    Parse {
        document: Option<PathBuf>,
        message: String,
        line: usize,
        column: usize,
        hint: Option<String>,
    },

    /// A pointer resolved to nothing.
    #[error("{}: `{key_path}` points at `{target}`, which does not exist", DocLabel(.document))]
    ReferenceNotFound {
        document: Option<PathBuf>,
        key_path: String,
        target: String,
    },

    /// Navigation of a path that is absent from the document.
    #[error("{}: no node at `{key_path}`", DocLabel(.document))]
    NotFound {
        document: Option<PathBuf>,
        key_path: String,
    },

    /// A node exists but has the wrong shape for the requested operation.
    #[error("{}: expected {expected} at `{key_path}`, found {found}", DocLabel(.document))]
    TypeMismatch {
        document: Option<PathBuf>,
        key_path: String,
        expected: String,
        found: String,
    },

    #[error("template `{template}`: unknown metric `{metric}` at `{key_path}`")]
    UnknownMetric {
        template: String,
        metric: String,
        key_path: String,
    },

    #[error("template `{template}`: invalid alarm spec at `{key_path}`: {message}")]
    InvalidSpec {
        template: String,
        key_path: String,
        message: String,
    },

    #[error("{}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

impl CompileError {
    pub(crate) fn parse(message: impl Into<String>, line: usize, column: usize) -> Self {
        CompileError::Parse {
            document: None,
            message: message.into(),
            line,
            column,
            hint: None,
        }
    }

    pub(crate) fn type_mismatch(
        key_path: impl fmt::Display,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        CompileError::TypeMismatch {
            document: None,
            key_path: key_path.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn not_found(key_path: impl fmt::Display) -> Self {
        CompileError::NotFound {
            document: None,
            key_path: key_path.to_string(),
        }
    }

    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        CompileError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Fill in the document identity if the layer that raised the error did
    /// not know which document it was working on.
    pub fn with_document(mut self, path: impl AsRef<Path>) -> Self {
        match &mut self {
            CompileError::Parse { document, .. }
            | CompileError::ReferenceNotFound { document, .. }
            | CompileError::NotFound { document, .. }
            | CompileError::TypeMismatch { document, .. } => {
                if document.is_none() {
                    *document = Some(path.as_ref().to_path_buf());
                }
            }
            _ => {}
        }
        self
    }

    /// Same as [`with_document`](Self::with_document) but tolerates a
    /// document that was never read from disk.
    pub fn with_optional_document(self, path: Option<&Path>) -> Self {
        match path {
            Some(p) => self.with_document(p),
            None => self,
        }
    }

    pub(crate) fn with_hint(mut self, text: impl Into<String>) -> Self {
        if let CompileError::Parse { hint, .. } = &mut self {
            *hint = Some(text.into());
        }
        self
    }

    pub fn document(&self) -> Option<&Path> {
        match self {
            CompileError::Parse { document, .. }
            | CompileError::ReferenceNotFound { document, .. }
            | CompileError::NotFound { document, .. }
            | CompileError::TypeMismatch { document, .. } => document.as_deref(),
            CompileError::Io { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn key_path(&self) -> Option<&str> {
        match self {
            CompileError::ReferenceNotFound { key_path, .. }
            | CompileError::NotFound { key_path, .. }
            | CompileError::TypeMismatch { key_path, .. }
            | CompileError::UnknownMetric { key_path, .. }
            | CompileError::InvalidSpec { key_path, .. } => Some(key_path),
            _ => None,
        }
    }
}

struct DocLabel<'a>(&'a Option<PathBuf>);

impl fmt::Display for DocLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(path) => write!(f, "{}", path.display()),
            None => f.write_str("<input>"),
        }
    }
}

struct HintLabel<'a>(&'a Option<String>);

impl fmt::Display for HintLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(hint) => write!(f, " (hint: {})", hint),
            None => Ok(()),
        }
    }
}
