//! The top-level processing surface.
//!
//! A [`Processor`] carries the whole configuration for a run: include
//! search paths and overrides, root variables, the unbound-token
//! placeholder, the time instants and format table, and the query
//! evaluator. Processing never mutates the configuration, so one
//! processor can serve many documents.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local};
use serde_yaml::Value;
use tracing::info;

use crate::document::loader::{load_path, parse_document, read_input};
use crate::errors::ProcessError;
use crate::include::{Resolver, SearchPath};
use crate::query::{JmespathEvaluator, QueryEvaluator};
use crate::schema::{extract_schema_location, resolve_schema_location};
use crate::scope::Scope;
use crate::vars::DEFAULT_TIME_FORMAT;

pub struct Processor {
    /// Expand include directives. When off, directives pass through.
    pub is_process_include: bool,
    /// Substitute variable and date-time tokens in strings.
    pub is_process_variable: bool,
    /// Directories searched for relative include targets, in order.
    pub include_paths: Vec<PathBuf>,
    /// In-memory include table, consulted before the filesystem.
    pub include_overrides: HashMap<String, Value>,
    /// Root-scope variable bindings.
    pub variables: HashMap<String, String>,
    /// Stand-in for unbound tokens; `None` makes them hard errors.
    pub unbound_placeholder: Option<String>,
    /// Base prepended to relative schema pragma locations.
    pub schema_prefix: Option<String>,
    /// The instant behind `YP_TIME_NOW`.
    pub time_now: DateTime<FixedOffset>,
    /// The instant behind `YP_TIME_REF`; defaults to `time_now`.
    pub time_ref: DateTime<FixedOffset>,
    /// Named output formats; the empty-string key is the default.
    pub time_formats: HashMap<String, String>,
    query: Box<dyn QueryEvaluator>,
}

impl Processor {
    #[must_use]
    pub fn new() -> Self {
        let now = Local::now().fixed_offset();
        let mut time_formats = HashMap::new();
        time_formats.insert(String::new(), DEFAULT_TIME_FORMAT.to_string());
        Self {
            is_process_include: true,
            is_process_variable: true,
            include_paths: Vec::new(),
            include_overrides: HashMap::new(),
            variables: HashMap::new(),
            unbound_placeholder: None,
            schema_prefix: None,
            time_now: now,
            time_ref: now,
            time_formats,
            query: Box::new(JmespathEvaluator),
        }
    }

    /// Swap in a different query language.
    #[must_use]
    pub fn with_query_evaluator(mut self, query: Box<dyn QueryEvaluator>) -> Self {
        self.query = query;
        self
    }

    /// Process a parsed document. `root_file` anchors relative include
    /// targets and joins the cycle check, so a file including itself
    /// fails on the first directive.
    pub fn process_value(
        &self,
        root: Value,
        root_file: Option<&Path>,
    ) -> Result<Value, ProcessError> {
        let root_file = match root_file {
            Some(path) => Some(path.canonicalize().map_err(|source| ProcessError::Io {
                path: path.display().to_string(),
                source,
            })?),
            None => None,
        };
        let mut pending: Vec<String> = root_file
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        let scope = Scope::root(self.variables.clone());
        let resolver = Resolver {
            search: SearchPath {
                include_paths: self.include_paths.clone(),
            },
            overrides: &self.include_overrides,
            query: &*self.query,
            time_now: self.time_now,
            time_ref: self.time_ref,
            time_formats: &self.time_formats,
            unbound_placeholder: self.unbound_placeholder.as_deref(),
            is_process_include: self.is_process_include,
            is_process_variable: self.is_process_variable,
        };
        resolver.resolve_node(root, root_file.as_deref(), &scope, &mut pending)
    }

    /// Process a named input (`-` for stdin) and write the result to the
    /// named output (`-` or `None` for stdout). Returns the resolved
    /// schema location when the input carries a schema pragma.
    pub fn process_file(
        &self,
        in_filename: &str,
        out_filename: Option<&str>,
    ) -> Result<Option<String>, ProcessError> {
        let (text, in_path) = if in_filename == "-" {
            read_input(in_filename)?
        } else {
            let found = SearchPath {
                include_paths: self.include_paths.clone(),
            }
            .find(in_filename, None)?;
            let text = load_path(&found)?;
            (text, Some(found))
        };
        let schema_location = extract_schema_location(&text)
            .map(|location| resolve_schema_location(&location, self.schema_prefix.as_deref()));

        let origin = in_path
            .as_deref()
            .map_or_else(|| "-".to_string(), |path| path.display().to_string());
        let root = parse_document(&text, &origin)?;
        let processed = self.process_value(root, in_path.as_deref())?;
        let dumped = serde_yaml::to_string(&processed).map_err(ProcessError::Dump)?;

        match out_filename {
            Some(name) if name != "-" => {
                fs::write(name, &dumped).map_err(|source| ProcessError::Io {
                    path: name.to_string(),
                    source,
                })?;
                info!(input = %origin, output = %name, "processed");
            }
            _ => {
                print!("{dumped}");
                info!(input = %origin, "processed to stdout");
            }
        }
        Ok(schema_location)
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}
