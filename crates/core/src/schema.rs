//! Schema-association pragmas.
//!
//! A document may name its schema on the first line, either with a
//! shebang-style `#!URI` pragma or the language-server convention
//! `# yaml-language-server: $schema=URI`. Both lines are ordinary YAML
//! comments, so extraction never alters parsing; the location is
//! resolved and reported alongside the processed output.

use std::path::Path;

use serde_json::json;
use serde_yaml::Value;
use url::Url;

use crate::errors::ProcessError;

const SHEBANG_PRAGMA: &str = "#!";
const LANGUAGE_SERVER_PRAGMA: &str = "# yaml-language-server:";

/// Pull the schema location out of the document's first line, if one of
/// the recognised pragmas is present.
#[must_use]
pub fn extract_schema_location(text: &str) -> Option<String> {
    let first_line = text.lines().next()?.trim_end();
    if let Some(rest) = first_line.strip_prefix(LANGUAGE_SERVER_PRAGMA) {
        let rest = rest.trim_start();
        let location = rest.strip_prefix("$schema=")?.trim();
        return (!location.is_empty()).then(|| location.to_string());
    }
    if let Some(location) = first_line.strip_prefix(SHEBANG_PRAGMA) {
        let location = location.trim();
        return (!location.is_empty()).then(|| location.to_string());
    }
    None
}

/// Resolve a pragma location: full URLs and existing local paths pass
/// through as-is, anything else is prefixed with the configured base
/// when one is set.
#[must_use]
pub fn resolve_schema_location(location: &str, prefix: Option<&str>) -> String {
    if Url::parse(location).is_ok() || Path::new(location).exists() {
        return location.to_string();
    }
    match prefix {
        Some(prefix) => format!("{prefix}{location}"),
        None => location.to_string(),
    }
}

/// A one-line JSON Schema document referencing the resolved location,
/// suitable for driving an external validator.
#[must_use]
pub fn schema_ref_document(location: &str) -> serde_json::Value {
    json!({ "$ref": location })
}

/// Hook for plugging in an actual validator implementation.
pub trait SchemaValidator {
    fn validate(&self, schema_location: &str, data: &Value) -> Result<(), ProcessError>;
}
