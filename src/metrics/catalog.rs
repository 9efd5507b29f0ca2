use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::access::KeyPath;
use crate::ast::{Document, Node, Value};
use crate::config::conversion::from_node;
use crate::loader::load_file;
use crate::CompileError;

/// Aggregation applied to a metric over each alarm period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    #[default]
    Sum,
    Average,
    #[serde(alias = "Maximum")]
    Max,
    #[serde(alias = "Minimum")]
    Min,
    SampleCount,
}

impl Statistic {
    /// Name used by the monitoring service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Sum => "Sum",
            Statistic::Average => "Average",
            Statistic::Max => "Maximum",
            Statistic::Min => "Minimum",
            Statistic::SampleCount => "SampleCount",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extraction of a metric from log events. A catalog entry with a log
/// filter is log-derived: its alarm needs a metric filter resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogFilter {
    /// Log group name; may use `${TemplateName}` and configured variables.
    pub log_group: String,
    pub pattern: String,
    /// Value published per matching event.
    #[serde(default = "default_metric_value")]
    pub value: String,
}

fn default_metric_value() -> String {
    "1".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricCatalogEntry {
    pub namespace: String,
    pub metric_name: String,
    /// Dimension name to value template, in output order.
    #[serde(default)]
    pub dimensions: IndexMap<String, String>,
    #[serde(default)]
    pub statistic: Statistic,
    #[serde(default)]
    pub log_filter: Option<LogFilter>,
}

impl MetricCatalogEntry {
    pub fn new(namespace: impl Into<String>, metric_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            metric_name: metric_name.into(),
            dimensions: IndexMap::new(),
            statistic: Statistic::Sum,
            log_filter: None,
        }
    }

    pub fn with_dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(name.into(), value.into());
        self
    }

    pub fn with_statistic(mut self, statistic: Statistic) -> Self {
        self.statistic = statistic;
        self
    }

    pub fn with_log_filter(mut self, filter: LogFilter) -> Self {
        self.log_filter = Some(filter);
        self
    }

    pub fn is_log_derived(&self) -> bool {
        self.log_filter.is_some()
    }
}

/// Logical metric names mapped to the metrics they stand for.
///
/// Built once per run and shared read-only by every generation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricCatalog {
    entries: IndexMap<String, MetricCatalogEntry>,
}

impl MetricCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: MetricCatalogEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn with_entry(mut self, name: impl Into<String>, entry: MetricCatalogEntry) -> Self {
        self.insert(name, entry);
        self
    }

    pub fn get(&self, name: &str) -> Option<&MetricCatalogEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricCatalogEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `other` into this catalog. Entries from `other` win.
    pub fn extend(&mut self, other: MetricCatalog) {
        for (name, entry) in other.entries {
            self.entries.insert(name, entry);
        }
    }

    /// Read a catalog document: a mapping of logical name to entry fields.
    ///
    /// ```yaml
    /// FailedLogins:
    ///   namespace: Security
    ///   metric_name: FailedLoginCount
    ///   statistic: Sum
    /// ```
    pub fn from_document(doc: &Document) -> Result<Self, CompileError> {
        let source = doc.source.as_deref();
        let entries = match &doc.root.value {
            Value::Mapping(entries) => entries,
            Value::Null => return Ok(MetricCatalog::new()),
            other => {
                return Err(CompileError::type_mismatch("", "a mapping of metric names", other.kind())
                    .with_optional_document(source));
            }
        };

        let mut catalog = MetricCatalog::new();
        for (name, node) in entries {
            let entry: MetricCatalogEntry = from_node(node, source, name, "a metric catalog entry")?;
            catalog.insert(name.clone(), entry);
        }
        debug!(entries = catalog.len(), "loaded metric catalog");
        Ok(catalog)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CompileError> {
        let doc = load_file(path)?;
        Self::from_document(&doc)
    }

    /// Collect the metrics an existing template already publishes through
    /// `AWS::Logs::MetricFilter` resources.
    ///
    /// Each metric transformation becomes an entry named after its metric,
    /// aggregated with `Sum`. These metrics are produced by the template
    /// itself, so the entries carry no log filter of their own.
    pub fn from_template(doc: &Document) -> Result<Self, CompileError> {
        let source = doc.source.as_deref();
        let mut catalog = MetricCatalog::new();

        let resources = match doc.root.get_key("Resources") {
            Some(node) => node,
            None => return Ok(catalog),
        };
        let resources = match &resources.value {
            Value::Mapping(entries) => entries,
            other => {
                return Err(CompileError::type_mismatch("Resources", "mapping", other.kind())
                    .with_optional_document(source));
            }
        };

        for (logical_id, resource) in resources {
            if resource.get_key("Type").and_then(Node::as_str) != Some("AWS::Logs::MetricFilter") {
                continue;
            }

            let path = KeyPath::root()
                .key("Resources")
                .key(logical_id.as_str())
                .key("Properties")
                .key("MetricTransformations");
            let transformations = resource
                .get(&KeyPath::root().key("Properties").key("MetricTransformations"))
                .map_err(|_| CompileError::not_found(&path).with_optional_document(source))?;
            let items = match &transformations.value {
                Value::Sequence(items) => items,
                other => {
                    return Err(CompileError::type_mismatch(&path, "sequence", other.kind())
                        .with_optional_document(source));
                }
            };

            for (i, transformation) in items.iter().enumerate() {
                let item_path = path.clone().index(i);
                let metric_name = string_field(transformation, "MetricName", &item_path, source)?;
                let namespace = string_field(transformation, "MetricNamespace", &item_path, source)?;
                debug!(resource = %logical_id, metric = %metric_name, "found metric filter");
                catalog.insert(metric_name.clone(), MetricCatalogEntry::new(namespace, metric_name));
            }
        }

        Ok(catalog)
    }
}

fn string_field(node: &Node, key: &str, path: &KeyPath, source: Option<&Path>) -> Result<String, CompileError> {
    let field_path = path.clone().key(key);
    let field = node
        .get_key(key)
        .ok_or_else(|| CompileError::not_found(&field_path).with_optional_document(source))?;
    match &field.value {
        Value::String(s) => Ok(s.clone()),
        other => Err(CompileError::type_mismatch(&field_path, "string", other.kind()).with_optional_document(source)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_str;

    const CATALOG: &str = r#"
FailedLogins:
  namespace: Security
  metric_name: FailedLoginCount
  dimensions: {}
  statistic: Sum
LambdaErrors:
  namespace: AWS/Lambda
  metric_name: Errors
  dimensions:
    FunctionName: ${TemplateName}-handler
  statistic: Maximum
ParseFailures:
  namespace: Panther
  metric_name: ParseFailures
  log_filter:
    log_group: /aws/lambda/${TemplateName}
    pattern: '{ $.level = "ERROR" }'
"#;

    #[test]
    fn test_catalog_from_document() {
        let catalog = MetricCatalog::from_document(&load_str(CATALOG).unwrap()).expect("Failed to load catalog");
        assert_eq!(catalog.len(), 3);

        let failed = catalog.get("FailedLogins").unwrap();
        assert_eq!(failed.namespace, "Security");
        assert_eq!(failed.metric_name, "FailedLoginCount");
        assert!(failed.dimensions.is_empty());
        assert!(!failed.is_log_derived());

        let errors = catalog.get("LambdaErrors").unwrap();
        assert_eq!(errors.statistic, Statistic::Max);
        assert_eq!(errors.statistic.as_str(), "Maximum");
        assert_eq!(errors.dimensions.get("FunctionName").map(String::as_str), Some("${TemplateName}-handler"));

        let parse = catalog.get("ParseFailures").unwrap();
        let filter = parse.log_filter.as_ref().unwrap();
        assert_eq!(filter.value, "1");
        assert_eq!(parse.statistic, Statistic::Sum);
    }

    #[test]
    fn test_catalog_entry_errors_name_the_entry() {
        let doc = load_str("Broken:\n  namespace: Security\n")
            .unwrap()
            .with_source("catalog.yml");
        let err = MetricCatalog::from_document(&doc).unwrap_err();
        match err {
            CompileError::TypeMismatch { document, key_path, found, .. } => {
                assert_eq!(document.as_deref(), Some(Path::new("catalog.yml")));
                assert_eq!(key_path, "Broken");
                assert!(found.contains("metric_name"));
            }
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_catalog_from_template_metric_filters() {
        let template = r#"
Resources:
  Function:
    Type: AWS::Serverless::Function
  PanicFilter:
    Type: AWS::Logs::MetricFilter
    Properties:
      LogGroupName: /aws/lambda/panther-log-processor
      FilterPattern: '"panic:"'
      MetricTransformations:
        - MetricName: LogProcessorPanics
          MetricNamespace: Panther
          MetricValue: 1
"#;
        let catalog = MetricCatalog::from_template(&load_str(template).unwrap()).unwrap();
        assert_eq!(catalog.len(), 1);
        let entry = catalog.get("LogProcessorPanics").unwrap();
        assert_eq!(entry.namespace, "Panther");
        assert_eq!(entry.statistic, Statistic::Sum);
    }

    #[test]
    fn test_catalog_from_template_rejects_tagged_names() {
        let template = r#"
Resources:
  Filter:
    Type: AWS::Logs::MetricFilter
    Properties:
      MetricTransformations:
        - MetricName: !Sub ${Prefix}Errors
          MetricNamespace: Panther
"#;
        let err = MetricCatalog::from_template(&load_str(template).unwrap()).unwrap_err();
        match err {
            CompileError::TypeMismatch { key_path, found, .. } => {
                assert_eq!(key_path, "Resources.Filter.Properties.MetricTransformations[0].MetricName");
                assert_eq!(found, "tagged function");
            }
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_extend_overrides_earlier_entries() {
        let mut catalog = MetricCatalog::new()
            .with_entry("Errors", MetricCatalogEntry::new("Old", "Errors"))
            .with_entry("Throttles", MetricCatalogEntry::new("AWS/Lambda", "Throttles"));
        catalog.extend(MetricCatalog::new().with_entry("Errors", MetricCatalogEntry::new("New", "Errors")));

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("Errors").unwrap().namespace, "New");
        let names: Vec<&str> = catalog.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Errors", "Throttles"]);
    }
}
