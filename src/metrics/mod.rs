//! Alarm template generation from a metric catalog and per-template alarm specs.

mod batch;
mod catalog;
mod generator;
mod spec;

pub use batch::{BatchMode, BatchOutcome, GeneratedTemplate};
pub use catalog::{LogFilter, MetricCatalog, MetricCatalogEntry, Statistic};
pub use generator::{AlarmGenerator, AlarmOptions};
pub use spec::{AlarmEntry, AlarmSpec, AlarmSpecSet, Comparison, TreatMissingData};
