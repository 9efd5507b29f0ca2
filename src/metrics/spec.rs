use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::{Document, Node, Number, Value};
use crate::config::conversion::from_node;
use crate::loader::load_file;
use crate::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

impl Comparison {
    /// `ComparisonOperator` value for the alarm resource.
    pub fn operator(&self) -> &'static str {
        match self {
            Comparison::GreaterThan => "GreaterThanThreshold",
            Comparison::GreaterOrEqual => "GreaterThanOrEqualToThreshold",
            Comparison::LessThan => "LessThanThreshold",
            Comparison::LessOrEqual => "LessThanOrEqualToThreshold",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::GreaterThan => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessThan => "<",
            Comparison::LessOrEqual => "<=",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operator())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TreatMissingData {
    Breaching,
    NotBreaching,
    Ignore,
    Missing,
}

impl TreatMissingData {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreatMissingData::Breaching => "breaching",
            TreatMissingData::NotBreaching => "notBreaching",
            TreatMissingData::Ignore => "ignore",
            TreatMissingData::Missing => "missing",
        }
    }
}

/// One threshold alert on a catalog metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlarmEntry {
    /// Logical name in the metric catalog.
    pub metric: String,
    pub comparison: Comparison,
    /// Kept as written in the spec document, so `1.50` stays `1.50`.
    pub threshold: Number,
    pub evaluation_periods: NonZeroU32,
    pub period_seconds: NonZeroU32,
    #[serde(default)]
    pub treat_missing_data: Option<TreatMissingData>,
    /// Extra alarm properties, written after the generated ones.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl AlarmEntry {
    pub fn new(
        metric: impl Into<String>,
        comparison: Comparison,
        threshold: f64,
        evaluation_periods: NonZeroU32,
        period_seconds: NonZeroU32,
    ) -> Self {
        Self {
            metric: metric.into(),
            comparison,
            threshold: Number::from_f64(threshold),
            evaluation_periods,
            period_seconds,
            treat_missing_data: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_treat_missing_data(mut self, treat: TreatMissingData) -> Self {
        self.treat_missing_data = Some(treat);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }
}

/// The alarms wanted for one template, in output order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmSpec {
    pub template: String,
    pub entries: Vec<AlarmEntry>,
}

impl AlarmSpec {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, entry: AlarmEntry) -> Self {
        self.entries.push(entry);
        self
    }
}

/// Every template's alarm spec from one spec document.
///
/// ```yaml
/// auth:
///   - metric: FailedLogins
///     comparison: GreaterThan
///     threshold: 10
///     evaluation_periods: 1
///     period_seconds: 300
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlarmSpecSet {
    pub specs: Vec<AlarmSpec>,
}

impl AlarmSpecSet {
    pub fn from_document(doc: &Document) -> Result<Self, CompileError> {
        let source = doc.source.as_deref();
        let templates = match &doc.root.value {
            Value::Mapping(entries) => entries,
            Value::Null => return Ok(AlarmSpecSet::default()),
            other => {
                return Err(CompileError::type_mismatch("", "a mapping of template names", other.kind())
                    .with_optional_document(source));
            }
        };

        let mut specs = Vec::with_capacity(templates.len());
        for (template, node) in templates {
            let items: &[Node] = match &node.value {
                Value::Sequence(items) => items.as_slice(),
                Value::Null => &[],
                other => {
                    return Err(CompileError::type_mismatch(template, "a sequence of alarms", other.kind())
                        .with_optional_document(source));
                }
            };

            let mut spec = AlarmSpec::new(template.clone());
            for (i, item) in items.iter().enumerate() {
                let key_path = format!("{}[{}]", template, i);
                let mut entry: AlarmEntry = from_node(item, source, &key_path, "an alarm entry")?;
                // serde only sees the threshold's value, not its text
                if let Some(Value::Number(written)) = item.get_key("threshold").map(|node| &node.value) {
                    entry.threshold = written.clone();
                }
                spec.entries.push(entry);
            }
            specs.push(spec);
        }

        Ok(AlarmSpecSet { specs })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CompileError> {
        let doc = load_file(path)?;
        Self::from_document(&doc)
    }

    pub fn get(&self, template: &str) -> Option<&AlarmSpec> {
        self.specs.iter().find(|s| s.template == template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_str;

    #[test]
    fn test_spec_set_from_document() {
        let doc = load_str(
            r#"
auth:
  - metric: FailedLogins
    comparison: GreaterThan
    threshold: 10
    evaluation_periods: 1
    period_seconds: 300
  - metric: LambdaErrors
    comparison: GreaterOrEqual
    threshold: 0.50
    evaluation_periods: 3
    period_seconds: 60
    treat_missing_data: notBreaching
    properties:
      DatapointsToAlarm: 2
log-analysis: []
"#,
        )
        .unwrap();

        let set = AlarmSpecSet::from_document(&doc).expect("Failed to load alarm specs");
        assert_eq!(set.specs.len(), 2);

        let auth = set.get("auth").unwrap();
        assert_eq!(auth.entries.len(), 2);
        assert_eq!(auth.entries[0].comparison, Comparison::GreaterThan);
        assert_eq!(auth.entries[0].threshold.as_f64(), 10.0);
        assert_eq!(auth.entries[1].threshold.as_str(), "0.50");
        assert_eq!(auth.entries[0].period_seconds.get(), 300);
        assert_eq!(auth.entries[1].treat_missing_data, Some(TreatMissingData::NotBreaching));
        assert_eq!(auth.entries[1].properties["DatapointsToAlarm"], serde_json::json!(2));

        assert!(set.get("log-analysis").unwrap().entries.is_empty());
    }

    #[test]
    fn test_zero_period_is_rejected() {
        let doc = load_str(
            "auth:\n  - metric: FailedLogins\n    comparison: GreaterThan\n    threshold: 1\n    evaluation_periods: 0\n    period_seconds: 60\n",
        )
        .unwrap();
        let err = AlarmSpecSet::from_document(&doc).unwrap_err();
        match err {
            CompileError::TypeMismatch { key_path, .. } => assert_eq!(key_path, "auth[0]"),
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_comparison_is_rejected() {
        let doc = load_str(
            "auth:\n  - metric: FailedLogins\n    comparison: Above\n    threshold: 1\n    evaluation_periods: 1\n    period_seconds: 60\n",
        )
        .unwrap();
        assert!(matches!(
            AlarmSpecSet::from_document(&doc),
            Err(CompileError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_comparison_operator_names() {
        assert_eq!(Comparison::GreaterThan.operator(), "GreaterThanThreshold");
        assert_eq!(Comparison::LessOrEqual.operator(), "LessThanOrEqualToThreshold");
    }
}
