//! Recursive include resolution.
//!
//! The resolver walks a document tree, replaces include directives with
//! the processed content of their targets, substitutes variables in
//! scalars, and splices `MERGE` includes into the enclosing collection.
//! A pending stack of include identities catches circular includes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::document::directive::{classify, kind, IncludeDirective};
use crate::document::loader::{load_path, parse_document};
use crate::errors::ProcessError;
use crate::query::QueryEvaluator;
use crate::scope::Scope;
use crate::vars::substitute::{substitute, substitute_to_string, VarContext};

/// Where include targets are looked up. Relative targets are tried
/// against the including file's directory, the working directory, then
/// each configured include path in order.
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    pub include_paths: Vec<PathBuf>,
}

impl SearchPath {
    pub fn find(
        &self,
        target: &str,
        current_file: Option<&Path>,
    ) -> Result<PathBuf, ProcessError> {
        let expanded = shellexpand::tilde(target);
        let path = Path::new(expanded.as_ref());
        if path.is_absolute() {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(ProcessError::IncludeNotFound {
                target: target.to_string(),
                searched: vec![path.to_path_buf()],
            });
        }
        let mut roots = Vec::new();
        if let Some(parent) = current_file.and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                roots.push(parent.to_path_buf());
            }
        }
        roots.push(PathBuf::from("."));
        roots.extend(self.include_paths.iter().cloned());

        let mut searched = Vec::new();
        for root in roots {
            let candidate = root.join(expanded.as_ref());
            if candidate.exists() {
                return Ok(candidate);
            }
            searched.push(candidate);
        }
        Err(ProcessError::IncludeNotFound {
            target: target.to_string(),
            searched,
        })
    }
}

/// One processing pass over a document tree. Holds the settings shared
/// by every recursion step; per-branch state (the current file, the
/// variable scope, the pending-include stack) travels as arguments.
pub(crate) struct Resolver<'a> {
    pub search: SearchPath,
    pub overrides: &'a HashMap<String, Value>,
    pub query: &'a dyn QueryEvaluator,
    pub time_now: DateTime<FixedOffset>,
    pub time_ref: DateTime<FixedOffset>,
    pub time_formats: &'a HashMap<String, String>,
    pub unbound_placeholder: Option<&'a str>,
    pub is_process_include: bool,
    pub is_process_variable: bool,
}

impl Resolver<'_> {
    fn var_context<'s>(&'s self, scope: &'s Scope) -> VarContext<'s> {
        VarContext {
            scope,
            time_now: self.time_now,
            time_ref: self.time_ref,
            time_formats: self.time_formats,
            unbound_placeholder: self.unbound_placeholder,
        }
    }

    fn classify_if_enabled(
        &self,
        value: &Value,
    ) -> Result<Option<IncludeDirective>, ProcessError> {
        match value {
            Value::Mapping(mapping) if self.is_process_include => classify(mapping),
            _ => Ok(None),
        }
    }

    pub fn resolve_node(
        &self,
        node: Value,
        current: Option<&Path>,
        scope: &Scope,
        pending: &mut Vec<String>,
    ) -> Result<Value, ProcessError> {
        match node {
            Value::Mapping(mapping) => {
                if self.is_process_include {
                    if let Some(directive) = classify(&mapping)? {
                        if directive.merge {
                            return Err(ProcessError::Merge {
                                target: directive.target,
                                message: "no enclosing collection to merge into"
                                    .to_string(),
                            });
                        }
                        return self.resolve_directive(&directive, current, scope, pending);
                    }
                }
                self.resolve_mapping(mapping, current, scope, pending)
            }
            Value::Sequence(items) => self.resolve_sequence(items, current, scope, pending),
            Value::String(text) => self.resolve_scalar(&text, scope),
            other => Ok(other),
        }
    }

    fn resolve_mapping(
        &self,
        mapping: Mapping,
        current: Option<&Path>,
        scope: &Scope,
        pending: &mut Vec<String>,
    ) -> Result<Value, ProcessError> {
        let mut out = Mapping::with_capacity(mapping.len());
        let mut merges: Vec<(String, Mapping)> = Vec::new();
        for (key, value) in mapping {
            if let Some(directive) = self.classify_if_enabled(&value)? {
                let included = self.resolve_directive(&directive, current, scope, pending)?;
                if directive.merge {
                    // The entry's own key is consumed by the splice.
                    match included {
                        Value::Mapping(entries) => merges.push((directive.target, entries)),
                        Value::Null => {}
                        other => {
                            return Err(ProcessError::Merge {
                                target: directive.target,
                                message: format!(
                                    "cannot merge {} into a mapping",
                                    kind(&other)
                                ),
                            })
                        }
                    }
                } else {
                    out.insert(key, included);
                }
                continue;
            }
            // Only values are substituted; keys pass through verbatim.
            let value = self.resolve_node(value, current, scope, pending)?;
            out.insert(key, value);
        }
        // Merged entries land after the literals and win key conflicts.
        for (_, entries) in merges {
            for (key, value) in entries {
                out.insert(key, value);
            }
        }
        Ok(Value::Mapping(out))
    }

    fn resolve_sequence(
        &self,
        items: Vec<Value>,
        current: Option<&Path>,
        scope: &Scope,
        pending: &mut Vec<String>,
    ) -> Result<Value, ProcessError> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            if let Some(directive) = self.classify_if_enabled(&item)? {
                let included = self.resolve_directive(&directive, current, scope, pending)?;
                if directive.merge {
                    match included {
                        Value::Sequence(spliced) => out.extend(spliced),
                        Value::Null => {}
                        other => {
                            return Err(ProcessError::Merge {
                                target: directive.target,
                                message: format!(
                                    "cannot merge {} into a sequence",
                                    kind(&other)
                                ),
                            })
                        }
                    }
                } else {
                    out.push(included);
                }
                continue;
            }
            out.push(self.resolve_node(item, current, scope, pending)?);
        }
        Ok(Value::Sequence(out))
    }

    fn resolve_scalar(&self, text: &str, scope: &Scope) -> Result<Value, ProcessError> {
        if !self.is_process_variable {
            return Ok(Value::String(text.to_string()));
        }
        substitute(text, &self.var_context(scope))
    }

    fn resolve_directive(
        &self,
        directive: &IncludeDirective,
        current: Option<&Path>,
        scope: &Scope,
        pending: &mut Vec<String>,
    ) -> Result<Value, ProcessError> {
        let ctx = self.var_context(scope);
        let target = if self.is_process_variable {
            substitute_to_string(&directive.target, &ctx)?
        } else {
            directive.target.clone()
        };

        // The directive's own variables are evaluated in the parent
        // scope, then overlaid for the included content.
        let mut additions = HashMap::with_capacity(directive.variables.len());
        for (name, raw) in &directive.variables {
            let value = if self.is_process_variable {
                substitute_to_string(raw, &ctx)?
            } else {
                raw.clone()
            };
            additions.insert(name.clone(), value);
        }
        let child_scope = scope.overlay(additions);

        let (identity, content, next_current) =
            if let Some(content) = self.overrides.get(&target) {
                debug!(%target, "include from override table");
                (target.clone(), content.clone(), current.map(Path::to_path_buf))
            } else {
                let found = self.search.find(&target, current)?;
                let canonical =
                    found.canonicalize().map_err(|source| ProcessError::Io {
                        path: found.display().to_string(),
                        source,
                    })?;
                debug!(%target, path = %canonical.display(), "include from file");
                let text = load_path(&canonical)?;
                let origin = canonical.display().to_string();
                let content = parse_document(&text, &origin)?;
                (origin, content, Some(canonical))
            };

        if pending.iter().any(|entry| entry == &identity) {
            return Err(ProcessError::IncludeCycle {
                path: identity,
                chain: pending.clone(),
            });
        }
        pending.push(identity);
        let processed =
            self.resolve_node(content, next_current.as_deref(), &child_scope, pending);
        pending.pop();
        let processed = processed?;

        match &directive.query {
            Some(expr) => self.query.query(expr, &processed),
            None => Ok(processed),
        }
    }
}
