//! Reading and parsing YAML input.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::errors::ProcessError;

/// Read the named input; `-` means standard input. Returns the text and
/// the originating path, when there is one.
pub fn read_input(filename: &str) -> Result<(String, Option<PathBuf>), ProcessError> {
    if filename == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|source| ProcessError::Io {
                path: "-".to_string(),
                source,
            })?;
        return Ok((text, None));
    }
    let path = PathBuf::from(filename);
    let text = load_path(&path)?;
    Ok((text, Some(path)))
}

pub fn load_path(path: &Path) -> Result<String, ProcessError> {
    fs::read_to_string(path).map_err(|source| ProcessError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Parse a YAML document. An empty or comment-only document is the null
/// value, not an error.
pub fn parse_document(text: &str, origin: &str) -> Result<Value, ProcessError> {
    match serde_yaml::from_str(text) {
        Ok(value) => Ok(value),
        Err(source) => {
            let only_comments = text
                .lines()
                .all(|line| line.trim().is_empty() || line.trim_start().starts_with('#'));
            if only_comments {
                Ok(Value::Null)
            } else {
                Err(ProcessError::Parse {
                    path: origin.to_string(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_a_mapping() {
        let value = parse_document("a: 1\nb: two", "<test>").unwrap();
        assert_eq!(value["a"], Value::Number(1.into()));
        assert_eq!(value["b"], Value::String("two".to_string()));
    }

    #[test]
    fn empty_and_comment_only_documents_are_null() {
        assert_eq!(parse_document("", "<test>").unwrap(), Value::Null);
        assert_eq!(
            parse_document("# just a comment\n\n", "<test>").unwrap(),
            Value::Null
        );
    }

    #[test]
    fn broken_yaml_is_a_parse_error() {
        let err = parse_document("a: [1, 2", "<test>").unwrap_err();
        assert!(matches!(err, ProcessError::Parse { .. }));
    }

    #[test]
    fn reads_a_file_with_its_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "hello: world").unwrap();
        let (text, path) = read_input(file.path().to_str().unwrap()).unwrap();
        assert!(text.contains("hello"));
        assert_eq!(path.as_deref(), Some(file.path()));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_input("/no/such/file.yaml").unwrap_err();
        assert!(matches!(err, ProcessError::Io { .. }));
    }
}
