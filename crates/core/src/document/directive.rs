//! Include-directive detection.
//!
//! A mapping is an include directive when it carries an `INCLUDE` key.
//! The directive mapping is consumed whole: it is replaced by the
//! included (and processed) content, optionally filtered by `QUERY`,
//! scoped by `VARIABLES`, and spliced into the parent by `MERGE`.

use serde_yaml::{Mapping, Value};
use tracing::warn;

use crate::errors::ProcessError;

pub const INCLUDE_KEY: &str = "INCLUDE";
pub const QUERY_KEY: &str = "QUERY";
pub const VARIABLES_KEY: &str = "VARIABLES";
pub const MERGE_KEY: &str = "MERGE";

/// A classified include directive, extracted from a mapping before any
/// of its parts are substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeDirective {
    pub target: String,
    pub query: Option<String>,
    /// Scoped variables in document order, values still unsubstituted.
    pub variables: Vec<(String, String)>,
    pub merge: bool,
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn directive_error(key: &str, value: &Value, expected: &str) -> ProcessError {
    ProcessError::Directive {
        message: format!("{key} must be {expected}, not {}", kind(value)),
    }
}

/// Classify a mapping: `Ok(None)` when it has no `INCLUDE` key, a
/// directive when it does, or an error when the directive is malformed.
/// Keys outside the reserved set are ignored with a warning.
pub fn classify(mapping: &Mapping) -> Result<Option<IncludeDirective>, ProcessError> {
    let Some(target_value) = mapping.get(INCLUDE_KEY) else {
        return Ok(None);
    };
    let target = scalar_to_string(target_value)
        .ok_or_else(|| directive_error(INCLUDE_KEY, target_value, "a scalar"))?;

    let query = match mapping.get(QUERY_KEY) {
        None | Some(Value::Null) => None,
        Some(Value::String(expr)) if expr.is_empty() => None,
        Some(Value::String(expr)) => Some(expr.clone()),
        Some(other) => return Err(directive_error(QUERY_KEY, other, "a string")),
    };

    let mut variables = Vec::new();
    match mapping.get(VARIABLES_KEY) {
        None | Some(Value::Null) => {}
        Some(Value::Mapping(entries)) => {
            for (key, value) in entries {
                let name = scalar_to_string(key)
                    .ok_or_else(|| directive_error(VARIABLES_KEY, key, "scalar-keyed"))?;
                let value = scalar_to_string(value).ok_or_else(|| {
                    ProcessError::Directive {
                        message: format!(
                            "{VARIABLES_KEY}.{name} must be a scalar, not {}",
                            kind(value)
                        ),
                    }
                })?;
                variables.push((name, value));
            }
        }
        Some(other) => return Err(directive_error(VARIABLES_KEY, other, "a mapping")),
    }

    let merge = match mapping.get(MERGE_KEY) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(other) => return Err(directive_error(MERGE_KEY, other, "a boolean")),
    };

    let extras: Vec<&str> = mapping
        .keys()
        .filter_map(Value::as_str)
        .filter(|key| {
            !matches!(*key, INCLUDE_KEY | QUERY_KEY | VARIABLES_KEY | MERGE_KEY)
        })
        .collect();
    if !extras.is_empty() {
        warn!(target = %target, keys = ?extras, "ignoring extra keys in include directive");
    }

    Ok(Some(IncludeDirective {
        target,
        query,
        variables,
        merge,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn plain_mapping_is_not_a_directive() {
        assert_eq!(classify(&mapping("a: 1\nb: 2")).unwrap(), None);
    }

    #[test]
    fn include_key_makes_a_directive() {
        let directive = classify(&mapping("INCLUDE: extra.yaml")).unwrap().unwrap();
        assert_eq!(directive.target, "extra.yaml");
        assert_eq!(directive.query, None);
        assert!(directive.variables.is_empty());
        assert!(!directive.merge);
    }

    #[test]
    fn full_directive_is_classified() {
        let directive = classify(&mapping(
            "INCLUDE: extra.yaml\nQUERY: 'items[0]'\nVARIABLES:\n  NAME: Venus\n  COUNT: 3\nMERGE: true",
        ))
        .unwrap()
        .unwrap();
        assert_eq!(directive.target, "extra.yaml");
        assert_eq!(directive.query.as_deref(), Some("items[0]"));
        assert_eq!(
            directive.variables,
            vec![
                ("NAME".to_string(), "Venus".to_string()),
                ("COUNT".to_string(), "3".to_string()),
            ]
        );
        assert!(directive.merge);
    }

    #[test]
    fn non_scalar_target_is_rejected() {
        let err = classify(&mapping("INCLUDE: [a, b]")).unwrap_err();
        assert!(matches!(err, ProcessError::Directive { .. }));
    }

    #[test]
    fn non_string_query_is_rejected() {
        let err = classify(&mapping("INCLUDE: x.yaml\nQUERY: 42")).unwrap_err();
        assert!(matches!(err, ProcessError::Directive { .. }));
    }

    #[test]
    fn nested_variables_are_rejected() {
        let err =
            classify(&mapping("INCLUDE: x.yaml\nVARIABLES:\n  A:\n    B: 1")).unwrap_err();
        assert!(matches!(err, ProcessError::Directive { .. }));
    }

    #[test]
    fn extra_keys_are_tolerated() {
        let directive = classify(&mapping("INCLUDE: x.yaml\nNOTE: hi"))
            .unwrap()
            .unwrap();
        assert_eq!(directive.target, "x.yaml");
    }
}
