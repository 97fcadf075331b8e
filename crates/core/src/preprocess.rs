//! Line-level preprocessing.
//!
//! Runs before YAML parsing: any line of the form
//! `DIRECT_INCLUDE=<filename>` is replaced verbatim by the named file's
//! content. Unlike include directives this splices raw text, so it can
//! inject anchor and alias definitions that must live in the same
//! document as their references.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::document::loader::{load_path, read_input};
use crate::errors::ProcessError;

const DIRECT_INCLUDE_KEY: &str = "DIRECT_INCLUDE=";

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("valid regex"))
}

/// Splices `DIRECT_INCLUDE=` lines, expanding `$NAME` / `${NAME}` in the
/// filename from the replacement table. Unknown names stay verbatim.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    pub replacements: HashMap<String, String>,
}

impl Preprocessor {
    fn expand(&self, text: &str) -> String {
        variable_pattern()
            .replace_all(text, |caps: &Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .expect("name group")
                    .as_str();
                match self.replacements.get(name) {
                    Some(value) => value.clone(),
                    None => caps.get(0).expect("match").as_str().to_string(),
                }
            })
            .into_owned()
    }

    pub fn process_text(&self, text: &str) -> Result<String, ProcessError> {
        let mut out = String::new();
        for line in text.lines() {
            if let Some(target) = line.strip_prefix(DIRECT_INCLUDE_KEY) {
                let filename = self.expand(target.trim());
                debug!(%filename, "direct include");
                let content = load_path(Path::new(&filename))?;
                out.push_str(&content);
                if !content.ends_with('\n') {
                    out.push('\n');
                }
            } else {
                out.push_str(line);
                out.push('\n');
            }
        }
        Ok(out)
    }

    /// Preprocess a named input (`-` for stdin) to the named output
    /// (`-` or `None` for stdout).
    pub fn process_file(
        &self,
        in_filename: &str,
        out_filename: Option<&str>,
    ) -> Result<(), ProcessError> {
        let (text, _) = read_input(in_filename)?;
        let processed = self.process_text(&text)?;
        match out_filename {
            Some(name) if name != "-" => {
                fs::write(name, &processed).map_err(|source| ProcessError::Io {
                    path: name.to_string(),
                    source,
                })?;
            }
            _ => print!("{processed}"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn replacements(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn splices_the_named_file() {
        let mut anchors = NamedTempFile::new().unwrap();
        write!(anchors, "_defaults: &defaults\n  retries: 3\n").unwrap();
        let text = format!(
            "DIRECT_INCLUDE={}\njob:\n  <<: *defaults\n",
            anchors.path().display()
        );
        let out = Preprocessor::default().process_text(&text).unwrap();
        assert!(out.starts_with("_defaults: &defaults\n  retries: 3\n"));
        assert!(out.ends_with("job:\n  <<: *defaults\n"));
    }

    #[test]
    fn expands_variables_in_the_filename() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "spliced: yes\n").unwrap();
        let dir = file.path().parent().unwrap().display().to_string();
        let name = file.path().file_name().unwrap().to_str().unwrap().to_string();
        let preprocessor = Preprocessor {
            replacements: replacements(&[("DIR", &dir), ("NAME", &name)]),
        };
        let out = preprocessor
            .process_text("DIRECT_INCLUDE=${DIR}/$NAME\n")
            .unwrap();
        assert_eq!(out, "spliced: yes\n");
    }

    #[test]
    fn unknown_variables_stay_verbatim() {
        let preprocessor = Preprocessor::default();
        assert_eq!(preprocessor.expand("${NOPE}/x"), "${NOPE}/x");
    }

    #[test]
    fn other_lines_pass_through() {
        let out = Preprocessor::default()
            .process_text("a: 1\nb: 2\n")
            .unwrap();
        assert_eq!(out, "a: 1\nb: 2\n");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Preprocessor::default()
            .process_text("DIRECT_INCLUDE=/no/such/file\n")
            .unwrap_err();
        assert!(matches!(err, ProcessError::Io { .. }));
    }
}
