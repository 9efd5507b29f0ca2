pub mod access;
pub mod ast;
pub mod config;
pub mod embed;
pub mod error;
pub mod export;
pub mod lexer;
pub mod loader;
pub mod metrics;
pub mod parser;
pub mod resolver;
pub mod utils;

pub use access::{KeyPath, Segment};
pub use ast::{Comments, Document, Node, Number, Tag, Value};
pub use config::CompilerConfig;
pub use embed::{embed_api_definitions, ApiShape, EmbedOptions, EmbedReport, EmbeddedDefinition};
pub use error::CompileError;
pub use loader::{dump, dump_as, dump_json, load_file, load_str, write_file, Format};
pub use metrics::{
    AlarmEntry, AlarmGenerator, AlarmOptions, AlarmSpec, AlarmSpecSet, BatchMode, BatchOutcome,
    Comparison, GeneratedTemplate, LogFilter, MetricCatalog, MetricCatalogEntry, Statistic,
    TreatMissingData,
};
