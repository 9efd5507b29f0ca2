// Author: Dustin Pilgrim
// License: MIT

use std::path::Path;

use tracing::debug;

use crate::ast::{Document, Value};
use crate::embed::EmbedOptions;
use crate::loader::{load_file, load_str, Format};
use crate::metrics::{AlarmOptions, BatchMode};
use crate::resolver::resolve_pointer_path;
use crate::CompileError;

pub(crate) mod conversion;
mod validation;

use conversion::from_node;
use validation::Section;

/// Settings for one compiler run.
///
/// ```yaml
/// embed:
///   base_dir: ./api
/// alarms:
///   name_prefix: Panther-
///   topic_parameter: AlarmTopicArn
/// batch_mode: best_effort
/// output_format: json
/// ```
///
/// Every section is optional; missing sections keep their defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilerConfig {
    pub embed: EmbedOptions,
    pub alarms: AlarmOptions,
    pub batch_mode: BatchMode,
    pub output_format: Format,
}

impl CompilerConfig {
    /// Load a config file. A relative `embed.base_dir` is resolved against
    /// the directory of the config file.
    ///
    /// # Example
    /// ```ignore
    /// let config = CompilerConfig::from_file("cfngen.yml")?;
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CompileError> {
        let path_ref = path.as_ref();
        let doc = load_file(path_ref)?;
        let mut config = Self::from_document(&doc)?;

        if let Some(dir) = &config.embed.base_dir {
            let base = path_ref.parent().unwrap_or_else(|| Path::new("."));
            let resolved = resolve_pointer_path(&dir.to_string_lossy(), base)
                .map_err(|e| e.with_document(path_ref))?;
            config.embed.base_dir = Some(resolved);
        }

        debug!(path = %path_ref.display(), "loaded compiler config");
        Ok(config)
    }

    /// Load from the primary path, or from the fallback when the primary
    /// file does not exist.
    pub fn from_file_with_fallback<P: AsRef<Path>>(primary: P, fallback: P) -> Result<Self, CompileError> {
        if primary.as_ref().is_file() {
            Self::from_file(primary)
        } else {
            debug!(
                primary = %primary.as_ref().display(),
                fallback = %fallback.as_ref().display(),
                "primary config missing, using fallback"
            );
            Self::from_file(fallback)
        }
    }

    /// Parse a config from text (no file I/O, `base_dir` kept as written).
    pub fn from_str(content: &str) -> Result<Self, CompileError> {
        Self::from_document(&load_str(content)?)
    }

    pub fn from_document(doc: &Document) -> Result<Self, CompileError> {
        let source = doc.source.as_deref();
        let mut config = CompilerConfig::default();

        for (section, node) in validation::sections(doc)? {
            if matches!(node.value, Value::Null) {
                continue;
            }
            let key = section.key();
            match section {
                Section::Embed => config.embed = from_node(node, source, key, "embed options")?,
                Section::Alarms => config.alarms = from_node(node, source, key, "alarm options")?,
                Section::BatchMode => config.batch_mode = from_node(node, source, key, "fail_fast or best_effort")?,
                Section::OutputFormat => config.output_format = from_node(node, source, key, "yaml or json")?,
            }
        }

        Ok(config)
    }

    pub fn with_embed(mut self, embed: EmbedOptions) -> Self {
        self.embed = embed;
        self
    }

    pub fn with_alarms(mut self, alarms: AlarmOptions) -> Self {
        self.alarms = alarms;
        self
    }

    pub fn with_batch_mode(mut self, mode: BatchMode) -> Self {
        self.batch_mode = mode;
        self
    }

    pub fn with_output_format(mut self, format: Format) -> Self {
        self.output_format = format;
        self
    }
}

#[cfg(test)]
mod tests;
