// Author: Dustin Pilgrim
// License: MIT

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::ast::{Node, Tag};
use crate::CompileError;

/// Named values available to `${Name}` interpolation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitutions {
    vars: IndexMap<String, String>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Substitutions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut subs = Substitutions::new();
        for (k, v) in iter {
            subs.insert(k, v);
        }
        subs
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Substitutions {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

/// Result of interpolating a string.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpolated {
    /// Every reference was known. `${!Literal}` escapes are unescaped.
    Resolved(String),
    /// Some references are only known at deploy time. The text is still in
    /// substitution syntax, with the known names already filled in.
    Deferred { text: String, unresolved: Vec<String> },
}

impl Interpolated {
    /// A plain string when fully resolved, otherwise `!Sub` over the
    /// partially resolved text.
    pub fn into_node(self) -> Node {
        match self {
            Interpolated::Resolved(s) => Node::string(s),
            Interpolated::Deferred { text, .. } => Node::tagged(Tag::Sub, Node::string(text)),
        }
    }
}

/// Interpolate `${Name}` references in `text`.
///
/// Names missing from `vars` (typically pseudo parameters such as
/// `${AWS::StackName}` or `${Resource.Arn}`) are left in place and the
/// result is [`Interpolated::Deferred`].
///
/// # Errors
/// Returns a parse error for an unclosed `${` or an empty `${}`.
pub fn interpolate(text: &str, vars: &Substitutions) -> Result<Interpolated, CompileError> {
    // two renderings: `literal` is the final string, `deferred` stays valid
    // substitution syntax
    let mut literal = String::with_capacity(text.len());
    let mut deferred = String::with_capacity(text.len());
    let mut unresolved: Vec<String> = Vec::new();

    let mut rest = text;
    while let Some(start) = rest.find("${") {
        literal.push_str(&rest[..start]);
        deferred.push_str(&rest[..start]);

        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            let column = text.len() - rest.len() + start;
            CompileError::parse(format!("unclosed `${{` in `{}`", text), 1, column)
        })?;
        let name = &after[..end];

        if let Some(escaped) = name.strip_prefix('!') {
            literal.push_str("${");
            literal.push_str(escaped);
            literal.push('}');
            deferred.push_str("${!");
            deferred.push_str(escaped);
            deferred.push('}');
        } else if name.trim().is_empty() {
            let column = text.len() - rest.len() + start;
            return Err(CompileError::parse(format!("empty `${{}}` in `{}`", text), 1, column));
        } else if let Some(value) = vars.get(name) {
            literal.push_str(value);
            deferred.push_str(&value.replace("${", "${!"));
        } else {
            deferred.push_str("${");
            deferred.push_str(name);
            deferred.push('}');
            if !unresolved.iter().any(|n| n == name) {
                unresolved.push(name.to_string());
            }
        }

        rest = &after[end + 1..];
    }
    literal.push_str(rest);
    deferred.push_str(rest);

    if unresolved.is_empty() {
        Ok(Interpolated::Resolved(literal))
    } else {
        Ok(Interpolated::Deferred {
            text: deferred,
            unresolved,
        })
    }
}

/// Expand `~/` and resolve relative paths against `base_dir`.
pub fn resolve_pointer_path(raw_path: &str, base_dir: &Path) -> Result<PathBuf, CompileError> {
    let mut p = if let Some(rest) = raw_path.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| CompileError::Io {
            path: PathBuf::from(raw_path),
            message: "could not determine home directory for ~ expansion".into(),
        })?;
        home.join(rest)
    } else {
        PathBuf::from(raw_path)
    };

    if p.is_relative() {
        p = base_dir.join(p);
    }
    Ok(p)
}
