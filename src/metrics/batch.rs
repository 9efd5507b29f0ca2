use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ast::Document;
use crate::CompileError;

use super::generator::AlarmGenerator;
use super::spec::AlarmSpec;

/// What a batch does after a template fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Keep the documents before the first failure and stop there.
    #[default]
    FailFast,
    /// Keep every success and collect every failure.
    BestEffort,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTemplate {
    pub template: String,
    pub document: Document,
}

/// Documents and failures of one batch, both in spec order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub generated: Vec<GeneratedTemplate>,
    pub failures: Vec<CompileError>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Process exit code: 0 when every template generated, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

impl AlarmGenerator<'_> {
    /// Generate every spec on the rayon pool.
    ///
    /// Templates are independent, so they all run; the mode only decides
    /// which results are kept. Output order always follows `specs`.
    pub fn generate_all(&self, specs: &[AlarmSpec], mode: BatchMode) -> BatchOutcome {
        let results: Vec<Result<Document, CompileError>> =
            specs.par_iter().map(|spec| self.generate(spec)).collect();

        let mut outcome = BatchOutcome::default();
        for (spec, result) in specs.iter().zip(results) {
            match result {
                Ok(document) => outcome.generated.push(GeneratedTemplate {
                    template: spec.template.clone(),
                    document,
                }),
                Err(e) => match mode {
                    BatchMode::FailFast => {
                        outcome.failures.push(e);
                        break;
                    }
                    BatchMode::BestEffort => {
                        warn!(template = %spec.template, error = %e, "alarm generation failed");
                        outcome.failures.push(e);
                    }
                },
            }
        }

        info!(
            templates = specs.len(),
            generated = outcome.generated.len(),
            failed = outcome.failures.len(),
            "alarm batch finished"
        );
        outcome
    }
}
