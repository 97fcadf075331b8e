//! Error types for document processing.

use std::path::PathBuf;

use thiserror::Error;

use crate::vars::DateMathError;

/// Any failure raised while processing a document tree.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("include not found: {target} (searched: {})", .searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    IncludeNotFound {
        target: String,
        searched: Vec<PathBuf>,
    },

    #[error("circular include of {path} (chain: {})", .chain.join(" -> "))]
    IncludeCycle { path: String, chain: Vec<String> },

    #[error("bad include directive: {message}")]
    Directive { message: String },

    #[error("cannot merge include {target}: {message}")]
    Merge { target: String, message: String },

    #[error("query failed: {expr}: {message}")]
    Query { expr: String, message: String },

    #[error("unbound variable: {name}")]
    UnboundVariable { name: String },

    #[error("{text}: bad substitution expression")]
    CastPosition { text: String },

    #[error("{token}: bad substitution value: {value}")]
    CastValue { token: String, value: String },

    #[error("bad date-time variable: {name}")]
    DateTime {
        name: String,
        #[source]
        source: DateMathError,
    },

    #[error("cannot read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot serialise output")]
    Dump(#[source] serde_yaml::Error),
}
