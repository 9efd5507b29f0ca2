use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ast::{Document, Node, Number, Tag, Value};
use crate::export::from_json_value;
use crate::resolver::{interpolate, Interpolated, Substitutions};
use crate::utils::logical_id;
use crate::CompileError;

use super::catalog::{MetricCatalog, MetricCatalogEntry};
use super::spec::{AlarmEntry, AlarmSpec};

const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";
const DEFAULT_DESCRIPTION: &str = "CloudWatch alarms for ${TemplateName}";

/// Properties the generator writes itself, in output order.
const GENERATED_PROPERTIES: &[&str] = &[
    "AlarmName",
    "AlarmDescription",
    "Namespace",
    "MetricName",
    "Dimensions",
    "Statistic",
    "Period",
    "EvaluationPeriods",
    "Threshold",
    "ComparisonOperator",
    "TreatMissingData",
    "AlarmActions",
    "OKActions",
];

/// Settings shared by every generated alarm document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlarmOptions {
    /// Document description. Defaults to `CloudWatch alarms for ${TemplateName}`.
    pub description: Option<String>,
    /// Prepended to every alarm name.
    pub name_prefix: String,
    /// Parameter holding the topic notified on alarm state changes.
    pub topic_parameter: Option<String>,
    /// Values for `${Name}` references besides `TemplateName`.
    pub variables: IndexMap<String, String>,
}

impl AlarmOptions {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn with_topic_parameter(mut self, name: impl Into<String>) -> Self {
        self.topic_parameter = Some(name.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

/// Builds standalone alarm documents from a read-only catalog.
#[derive(Debug, Clone, Copy)]
pub struct AlarmGenerator<'a> {
    pub(super) catalog: &'a MetricCatalog,
    pub(super) options: &'a AlarmOptions,
}

impl<'a> AlarmGenerator<'a> {
    pub fn new(catalog: &'a MetricCatalog, options: &'a AlarmOptions) -> Self {
        Self { catalog, options }
    }

    /// Generate the alarm document for one template.
    ///
    /// Every entry is checked against the catalog before anything is built,
    /// so a failing spec produces no document at all. Resource ids depend
    /// only on the template and metric names, and repeated runs over the same
    /// inputs give byte-identical output.
    ///
    /// # Errors
    /// - `UnknownMetric` for an entry naming a metric missing from the catalog
    /// - `InvalidSpec` for an extra property that collides with a generated
    ///   one, or a malformed `${...}` reference
    pub fn generate(&self, spec: &AlarmSpec) -> Result<Document, CompileError> {
        let resolved = self.validate(spec)?;
        let vars = self.substitutions(&spec.template);

        let mut resources: Vec<(String, Node)> = Vec::new();
        let mut filters: HashMap<&str, String> = HashMap::new();
        let mut taken: HashSet<String> = HashSet::new();

        for (i, (entry, metric)) in spec.entries.iter().zip(resolved).enumerate() {
            let base = logical_id(&[&spec.template, &entry.metric]);

            let filter_id = match &metric.log_filter {
                Some(filter) => {
                    if let Some(id) = filters.get(entry.metric.as_str()) {
                        Some(id.clone())
                    } else {
                        let id = unique_id(&mut taken, &format!("{}MetricFilter", base));
                        let log_group = self.interpolate(&filter.log_group, &vars, spec, i)?;
                        debug!(template = %spec.template, resource = %id, "generated metric filter");
                        resources.push((id.clone(), metric_filter(metric, log_group, &filter.pattern, &filter.value)));
                        filters.insert(entry.metric.as_str(), id.clone());
                        Some(id)
                    }
                }
                None => None,
            };

            let alarm_id = unique_id(&mut taken, &format!("{}Alarm", base));
            let properties = self.alarm_properties(spec, i, entry, metric, &vars)?;

            let mut resource = vec![("Type".to_string(), Node::string("AWS::CloudWatch::Alarm"))];
            if let Some(filter_id) = filter_id {
                resource.push(("DependsOn".to_string(), Node::string(filter_id)));
            }
            resource.push(("Properties".to_string(), Node::mapping(properties)));

            debug!(template = %spec.template, resource = %alarm_id, metric = %entry.metric, "generated alarm");
            resources.push((alarm_id, Node::mapping(resource)));
        }

        let description = self.options.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION);
        let mut root = vec![
            (
                "AWSTemplateFormatVersion".to_string(),
                Node::string(TEMPLATE_FORMAT_VERSION),
            ),
            (
                "Description".to_string(),
                self.interpolate(description, &vars, spec, usize::MAX)?,
            ),
        ];
        if let Some(topic) = &self.options.topic_parameter {
            let parameter = Node::mapping(vec![
                ("Type".to_string(), Node::string("String")),
                (
                    "Description".to_string(),
                    Node::string("SNS topic notified when an alarm changes state"),
                ),
            ]);
            root.push(("Parameters".to_string(), Node::mapping(vec![(topic.clone(), parameter)])));
        }
        root.push(("Resources".to_string(), Node::mapping(resources)));

        info!(
            template = %spec.template,
            alarms = spec.entries.len(),
            filters = filters.len(),
            "generated alarm template"
        );
        Ok(Document::new(Node::mapping(root)))
    }

    /// Look up every entry's metric and check extra properties, before any
    /// resource is built.
    fn validate(&self, spec: &AlarmSpec) -> Result<Vec<&'a MetricCatalogEntry>, CompileError> {
        let mut resolved = Vec::with_capacity(spec.entries.len());
        for (i, entry) in spec.entries.iter().enumerate() {
            let metric = self
                .catalog
                .get(&entry.metric)
                .ok_or_else(|| CompileError::UnknownMetric {
                    template: spec.template.clone(),
                    metric: entry.metric.clone(),
                    key_path: format!("{}[{}].metric", spec.template, i),
                })?;

            if let Some(name) = entry
                .properties
                .keys()
                .find(|name| GENERATED_PROPERTIES.contains(&name.as_str()))
            {
                return Err(CompileError::InvalidSpec {
                    template: spec.template.clone(),
                    key_path: format!("{}[{}].properties.{}", spec.template, i, name),
                    message: format!("`{}` is generated and cannot be overridden", name),
                });
            }
            resolved.push(metric);
        }
        Ok(resolved)
    }

    fn substitutions(&self, template: &str) -> Substitutions {
        let mut vars: Substitutions = self.options.variables.iter().collect();
        vars.insert("TemplateName", template);
        vars
    }

    /// Interpolate `text`; `entry` is `usize::MAX` for document-level text.
    fn interpolate(&self, text: &str, vars: &Substitutions, spec: &AlarmSpec, entry: usize) -> Result<Node, CompileError> {
        interpolate(text, vars)
            .map(Interpolated::into_node)
            .map_err(|e| {
                let key_path = if entry == usize::MAX {
                    "Description".to_string()
                } else {
                    format!("{}[{}]", spec.template, entry)
                };
                let message = match e {
                    CompileError::Parse { message, .. } => message,
                    other => other.to_string(),
                };
                CompileError::InvalidSpec {
                    template: spec.template.clone(),
                    key_path,
                    message,
                }
            })
    }

    fn alarm_properties(
        &self,
        spec: &AlarmSpec,
        index: usize,
        entry: &AlarmEntry,
        metric: &MetricCatalogEntry,
        vars: &Substitutions,
    ) -> Result<Vec<(String, Node)>, CompileError> {
        let name = format!("{}{}-{}", self.options.name_prefix, spec.template, entry.metric);
        let description = format!(
            "{} {} {} for {} period(s) of {}s in {}",
            entry.metric,
            entry.comparison.symbol(),
            entry.threshold,
            entry.evaluation_periods,
            entry.period_seconds,
            spec.template
        );

        let mut props = vec![
            ("AlarmName".to_string(), self.interpolate(&name, vars, spec, index)?),
            ("AlarmDescription".to_string(), Node::string(description)),
            ("Namespace".to_string(), Node::string(&metric.namespace)),
            ("MetricName".to_string(), Node::string(&metric.metric_name)),
        ];

        if !metric.dimensions.is_empty() {
            let mut dimensions = Vec::with_capacity(metric.dimensions.len());
            for (dim_name, template) in &metric.dimensions {
                dimensions.push(Node::mapping(vec![
                    ("Name".to_string(), Node::string(dim_name)),
                    ("Value".to_string(), self.interpolate(template, vars, spec, index)?),
                ]));
            }
            props.push(("Dimensions".to_string(), Node::sequence(dimensions)));
        }

        props.push(("Statistic".to_string(), Node::string(metric.statistic.as_str())));
        props.push(("Period".to_string(), count(entry.period_seconds.get())));
        props.push(("EvaluationPeriods".to_string(), count(entry.evaluation_periods.get())));
        props.push((
            "Threshold".to_string(),
            Node::new(Value::Number(entry.threshold.clone())),
        ));
        props.push(("ComparisonOperator".to_string(), Node::string(entry.comparison.operator())));

        if let Some(treat) = entry.treat_missing_data {
            props.push(("TreatMissingData".to_string(), Node::string(treat.as_str())));
        }
        if let Some(topic) = &self.options.topic_parameter {
            let actions = || Node::sequence(vec![Node::tagged(Tag::Ref, Node::string(topic))]);
            props.push(("AlarmActions".to_string(), actions()));
            props.push(("OKActions".to_string(), actions()));
        }

        for (key, value) in &entry.properties {
            props.push((key.clone(), from_json_value(value)));
        }
        Ok(props)
    }
}

fn count(n: u32) -> Node {
    Node::new(Value::Number(Number::from_u64(u64::from(n))))
}

fn unique_id(taken: &mut HashSet<String>, base: &str) -> String {
    let mut id = base.to_string();
    let mut ordinal = 2;
    while taken.contains(&id) {
        id = format!("{}{}", base, ordinal);
        ordinal += 1;
    }
    taken.insert(id.clone());
    id
}

fn metric_filter(metric: &MetricCatalogEntry, log_group: Node, pattern: &str, value: &str) -> Node {
    let transformation = Node::mapping(vec![
        ("MetricName".to_string(), Node::string(&metric.metric_name)),
        ("MetricNamespace".to_string(), Node::string(&metric.namespace)),
        ("MetricValue".to_string(), Node::string(value)),
    ]);

    Node::mapping(vec![
        ("Type".to_string(), Node::string("AWS::Logs::MetricFilter")),
        (
            "Properties".to_string(),
            Node::mapping(vec![
                ("LogGroupName".to_string(), log_group),
                ("FilterPattern".to_string(), Node::string(pattern)),
                ("MetricTransformations".to_string(), Node::sequence(vec![transformation])),
            ]),
        ),
    ])
}
