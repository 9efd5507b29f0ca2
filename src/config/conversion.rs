// Author: Dustin Pilgrim
// License: MIT

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::ast::Node;
use crate::export::to_json_value;
use crate::CompileError;

/// Deserialize a subtree into `T`.
///
/// The node goes through its JSON form, so tagged functions arrive as their
/// long form (`{"Ref": ...}`). Any mismatch is reported as `TypeMismatch`
/// at `key_path` in `document`.
pub(crate) fn from_node<T>(
    node: &Node,
    document: Option<&Path>,
    key_path: &str,
    expected: &str,
) -> Result<T, CompileError>
where
    T: DeserializeOwned,
{
    let json = to_json_value(node).map_err(|e| e.with_optional_document(document))?;
    serde_json::from_value(json).map_err(|e| CompileError::TypeMismatch {
        document: document.map(Path::to_path_buf),
        key_path: key_path.to_string(),
        expected: expected.to_string(),
        found: e.to_string(),
    })
}
