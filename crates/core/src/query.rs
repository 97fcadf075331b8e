//! Query filtering of included content.
//!
//! The evaluator is a trait so callers can swap the query language; the
//! default speaks JMESPath. Queries run against fully processed content,
//! so filters see substituted values, not raw tokens.

use serde_yaml::Value;

use crate::errors::ProcessError;

pub trait QueryEvaluator {
    /// Apply `expr` to `data`. A non-matching query yields null; only a
    /// malformed expression is an error.
    fn query(&self, expr: &str, data: &Value) -> Result<Value, ProcessError>;
}

/// The default evaluator, backed by the `jmespath` crate.
#[derive(Debug, Default)]
pub struct JmespathEvaluator;

fn query_error(expr: &str, message: impl ToString) -> ProcessError {
    ProcessError::Query {
        expr: expr.to_string(),
        message: message.to_string(),
    }
}

impl QueryEvaluator for JmespathEvaluator {
    fn query(&self, expr: &str, data: &Value) -> Result<Value, ProcessError> {
        let compiled = jmespath::compile(expr).map_err(|e| query_error(expr, e))?;
        let json = serde_json::to_value(data).map_err(|e| query_error(expr, e))?;
        let subject =
            jmespath::Variable::from_serializable(&json).map_err(|e| query_error(expr, e))?;
        let result = compiled.search(subject).map_err(|e| query_error(expr, e))?;
        serde_yaml::to_value(&*result).map_err(|e| query_error(expr, e))
    }
}
