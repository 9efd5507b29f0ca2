// Author: Dustin Pilgrim
// License: MIT

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::access::{KeyPath, Segment};
use crate::ast::{Document, Node, Value};
use crate::loader::load_file;
use crate::resolver::resolve_pointer_path;
use crate::CompileError;

/// A resource type whose definition may live in a separate file, and the
/// property under `Properties` that points at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiShape {
    pub resource_type: String,
    pub pointer_key: String,
}

impl ApiShape {
    pub fn new(resource_type: impl Into<String>, pointer_key: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            pointer_key: pointer_key.into(),
        }
    }

    /// Serverless REST and HTTP APIs (`DefinitionBody`) and plain API
    /// Gateway REST APIs (`Body`).
    pub fn defaults() -> Vec<ApiShape> {
        vec![
            ApiShape::new("AWS::Serverless::Api", "DefinitionBody"),
            ApiShape::new("AWS::Serverless::HttpApi", "DefinitionBody"),
            ApiShape::new("AWS::ApiGateway::RestApi", "Body"),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbedOptions {
    /// Directory pointers are resolved against. Defaults to the directory of
    /// the parent document.
    pub base_dir: Option<PathBuf>,
    pub shapes: Vec<ApiShape>,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            base_dir: None,
            shapes: ApiShape::defaults(),
        }
    }
}

impl EmbedOptions {
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn with_shape(mut self, shape: ApiShape) -> Self {
        self.shapes.push(shape);
        self
    }
}

/// One pointer replaced by the document it named.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedDefinition {
    pub key_path: KeyPath,
    pub source: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedReport {
    pub embedded: Vec<EmbeddedDefinition>,
}

impl EmbedReport {
    pub fn len(&self) -> usize {
        self.embedded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embedded.is_empty()
    }
}

struct Pointer {
    key_path: KeyPath,
    target: String,
}

/// Replace every API definition pointer in `doc` with the root mapping of
/// the file it names.
///
/// All referenced files are loaded before the document is touched, so on
/// error `doc` is left exactly as it was. Running the pass again on its own
/// output finds nothing to do.
///
/// # Examples
/// ```no_run
/// use cfngen::{embed_api_definitions, load_file, EmbedOptions};
///
/// # fn main() -> Result<(), cfngen::CompileError> {
/// let mut doc = load_file("deployments/web_server.yml")?;
/// let report = embed_api_definitions(&mut doc, &EmbedOptions::default())?;
/// println!("embedded {} definitions", report.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// - `ReferenceNotFound` if a pointer names a missing file
/// - `Parse` (located in the nested file) if a definition is malformed
/// - `TypeMismatch` if a definition's root is not a mapping
pub fn embed_api_definitions(doc: &mut Document, options: &EmbedOptions) -> Result<EmbedReport, CompileError> {
    let mut pointers = Vec::new();
    let mut path = KeyPath::root();
    collect_pointers(&doc.root, &options.shapes, &mut path, &mut pointers);

    if pointers.is_empty() {
        debug!(document = %doc_label(doc), "no API definition pointers found");
        return Ok(EmbedReport::default());
    }

    let base_dir = options
        .base_dir
        .clone()
        .or_else(|| doc.source.as_deref().and_then(Path::parent).map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    // load everything first so a failure leaves the parent untouched
    let mut loaded: HashMap<PathBuf, Node> = HashMap::new();
    let mut resolved: Vec<(KeyPath, PathBuf)> = Vec::with_capacity(pointers.len());
    for pointer in pointers {
        let source = resolve_pointer_path(&pointer.target, &base_dir)
            .map_err(|e| e.with_optional_document(doc.source.as_deref()))?;

        if !loaded.contains_key(&source) {
            let root = load_definition(doc, &pointer, &source)?;
            loaded.insert(source.clone(), root);
        }
        resolved.push((pointer.key_path, source));
    }

    let mut report = EmbedReport::default();
    for (key_path, source) in resolved {
        let node = doc
            .root
            .get_mut(&key_path)
            .map_err(|e| e.with_optional_document(doc.source.as_deref()))?;
        if let Some(root) = loaded.get(&source) {
            // the pointer's own comments stay with the spliced mapping
            node.value = root.value.clone();
        }
        debug!(key_path = %key_path, source = %source.display(), "embedded API definition");
        report.embedded.push(EmbeddedDefinition { key_path, source });
    }

    info!(
        document = %doc_label(doc),
        embedded = report.len(),
        "embedded API definitions"
    );
    Ok(report)
}

fn load_definition(doc: &Document, pointer: &Pointer, source: &Path) -> Result<Node, CompileError> {
    if !source.is_file() {
        return Err(CompileError::ReferenceNotFound {
            document: doc.source.clone(),
            key_path: pointer.key_path.to_string(),
            target: source.display().to_string(),
        });
    }

    let nested = load_file(source).map_err(|e| match e {
        CompileError::Parse { .. } => e.with_hint(format!(
            "embedded from {}:{}",
            doc_label(doc),
            pointer.key_path
        )),
        other => other,
    })?;

    if matches!(nested.root.value, Value::Mapping(_)) {
        return Ok(nested.root);
    }
    Err(CompileError::TypeMismatch {
        document: doc.source.clone(),
        key_path: pointer.key_path.to_string(),
        expected: format!("a mapping at the root of {}", source.display()),
        found: nested.root.value.kind().to_string(),
    })
}

/// Depth-first walk recording every resource that matches one of `shapes`.
fn collect_pointers(node: &Node, shapes: &[ApiShape], path: &mut KeyPath, out: &mut Vec<Pointer>) {
    match &node.value {
        Value::Mapping(entries) => {
            if let Some(pointer) = match_shape(node, shapes, path) {
                debug!(key_path = %pointer.key_path, target = %pointer.target, "found API definition pointer");
                out.push(pointer);
                return;
            }
            for (key, child) in entries {
                path.push(Segment::Key(key.clone()));
                collect_pointers(child, shapes, path, out);
                path.pop();
            }
        }
        Value::Sequence(items) => {
            for (i, child) in items.iter().enumerate() {
                path.push(Segment::Index(i));
                collect_pointers(child, shapes, path, out);
                path.pop();
            }
        }
        _ => {}
    }
}

fn match_shape(node: &Node, shapes: &[ApiShape], path: &KeyPath) -> Option<Pointer> {
    let resource_type = node.get_key("Type")?.as_str()?;
    let shape = shapes.iter().find(|s| s.resource_type == resource_type)?;
    let target = node
        .get_key("Properties")?
        .get_key(&shape.pointer_key)?
        .as_str()?;

    Some(Pointer {
        key_path: path.clone().key("Properties").key(shape.pointer_key.as_str()),
        target: target.to_string(),
    })
}

fn doc_label(doc: &Document) -> String {
    match &doc.source {
        Some(p) => p.display().to_string(),
        None => "<input>".to_string(),
    }
}
