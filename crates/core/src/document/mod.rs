//! Document model: YAML loading and include-directive classification.

pub mod directive;
pub mod loader;

pub use directive::{
    classify, IncludeDirective, INCLUDE_KEY, MERGE_KEY, QUERY_KEY, VARIABLES_KEY,
};
pub use loader::{load_path, parse_document, read_input};
