//! YAML include expansion and variable substitution.
//!
//! The processor walks a YAML document, replaces `INCLUDE` directives
//! with the processed content of their targets (optionally filtered by a
//! JMESPath `QUERY`, scoped by `VARIABLES`, spliced by `MERGE`), and
//! substitutes `$NAME` / `${NAME}` tokens and `YP_TIME_*` date-time
//! expressions in scalar strings.
//!
//! ```no_run
//! use yamlweave_core::Processor;
//!
//! let mut processor = Processor::new();
//! processor.variables.insert("NAME".to_string(), "Earth".to_string());
//! let schema = processor.process_file("job.yaml", Some("out.yaml"))?;
//! # Ok::<(), yamlweave_core::ProcessError>(())
//! ```

pub mod document;
pub mod errors;
pub mod include;
pub mod preprocess;
pub mod processor;
pub mod query;
pub mod schema;
pub mod scope;
pub mod vars;

pub use errors::ProcessError;
pub use preprocess::Preprocessor;
pub use processor::Processor;

/// The crate version, for CLI `--version` style reporting.
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
