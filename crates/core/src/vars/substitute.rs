//! Variable substitution in scalar strings.
//!
//! Tokens are `$NAME` or `${NAME}`. A backslash escapes the token
//! (`\$NAME` renders as `$NAME`); backslash runs halve, so `\\$NAME`
//! renders one backslash followed by the substituted value. The braced
//! form accepts a cast suffix (`${NAME.int}`, `${NAME.float}`,
//! `${NAME.bool}`) which replaces the scalar with a typed value and is
//! only legal when the token spans the whole string on its own.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde_yaml::Value;

use crate::errors::ProcessError;
use crate::scope::Scope;
use crate::vars::datemath;

/// Placeholder value that keeps unbound tokens verbatim instead of
/// replacing them.
pub const UNBOUND_ORIGINAL: &str = "YP_ORIGINAL";

/// Everything a single substitution pass needs to resolve a name.
pub struct VarContext<'a> {
    pub scope: &'a Scope,
    pub time_now: DateTime<FixedOffset>,
    pub time_ref: DateTime<FixedOffset>,
    pub time_formats: &'a HashMap<String, String>,
    pub unbound_placeholder: Option<&'a str>,
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"\\*\$(?:\{([A-Za-z_][A-Za-z0-9_]*(?:\.(?:int|float|bool)\b)?)\}|([A-Za-z_][A-Za-z0-9_]*(?:\.(?:int|float|bool)\b)?))",
        )
        .expect("valid regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cast {
    Int,
    Float,
    Bool,
}

fn parse_name(name: &str) -> (&str, Option<Cast>) {
    if let Some(base) = name.strip_suffix(".int") {
        (base, Some(Cast::Int))
    } else if let Some(base) = name.strip_suffix(".float") {
        (base, Some(Cast::Float))
    } else if let Some(base) = name.strip_suffix(".bool") {
        (base, Some(Cast::Bool))
    } else {
        (name, None)
    }
}

struct Occurrence<'t> {
    start: usize,
    end: usize,
    slashes: usize,
    token: &'t str,
    name: &'t str,
}

enum Resolution {
    Value(String),
    KeepOriginal,
}

fn resolve(name: &str, ctx: &VarContext) -> Result<Resolution, ProcessError> {
    if let Some(value) = ctx.scope.lookup(name) {
        return Ok(Resolution::Value(value.to_string()));
    }
    if let Some(result) =
        datemath::evaluate(name, ctx.time_now, ctx.time_ref, ctx.time_formats)
    {
        return match result {
            Ok(rendered) => Ok(Resolution::Value(rendered)),
            Err(source) => Err(ProcessError::DateTime {
                name: name.to_string(),
                source,
            }),
        };
    }
    match ctx.unbound_placeholder {
        Some(UNBOUND_ORIGINAL) => Ok(Resolution::KeepOriginal),
        Some(placeholder) => Ok(Resolution::Value(placeholder.to_string())),
        None => Err(ProcessError::UnboundVariable {
            name: name.to_string(),
        }),
    }
}

fn apply_cast(cast: Cast, token: &str, value: &str) -> Result<Value, ProcessError> {
    match cast {
        Cast::Int => value
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| ProcessError::CastValue {
                token: token.to_string(),
                value: value.to_string(),
            }),
        Cast::Float => value
            .parse::<f64>()
            .map(|f| Value::Number(serde_yaml::Number::from(f)))
            .map_err(|_| ProcessError::CastValue {
                token: token.to_string(),
                value: value.to_string(),
            }),
        Cast::Bool => match value.to_ascii_lowercase().as_str() {
            "yes" | "true" | "1" => Ok(Value::Bool(true)),
            "no" | "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(ProcessError::CastValue {
                token: token.to_string(),
                value: value.to_string(),
            }),
        },
    }
}

/// Substitute every token in `text`. Returns a string value unless the
/// whole string is a single cast token, in which case the result carries
/// the cast type.
pub fn substitute(text: &str, ctx: &VarContext) -> Result<Value, ProcessError> {
    let mut occurrences = Vec::new();
    for caps in token_pattern().captures_iter(text) {
        let whole = caps.get(0).expect("match");
        let name = caps.get(1).or_else(|| caps.get(2)).expect("name group");
        let dollar = text[whole.start()..whole.end()]
            .find('$')
            .expect("token contains dollar")
            + whole.start();
        occurrences.push(Occurrence {
            start: whole.start(),
            end: whole.end(),
            slashes: dollar - whole.start(),
            token: &text[dollar..whole.end()],
            name: name.as_str(),
        });
    }
    if occurrences.is_empty() {
        return Ok(Value::String(text.to_string()));
    }

    // Active cast tokens are only legal standing alone.
    let active_cast = occurrences.iter().find_map(|occ| {
        let (base, cast) = parse_name(occ.name);
        (occ.slashes % 2 == 0).then_some(())?;
        cast.map(|cast| (occ, base, cast))
    });
    if let Some((occ, base, cast)) = active_cast {
        if occurrences.len() != 1
            || occ.slashes != 0
            || occ.start != 0
            || occ.end != text.len()
        {
            return Err(ProcessError::CastPosition {
                text: text.to_string(),
            });
        }
        return match resolve(base, ctx)? {
            Resolution::Value(value) => apply_cast(cast, occ.token, &value),
            Resolution::KeepOriginal => Ok(Value::String(text.to_string())),
        };
    }

    let mut out = String::new();
    let mut cursor = 0;
    for occ in &occurrences {
        out.push_str(&text[cursor..occ.start]);
        if occ.slashes % 2 == 1 {
            // Escaped: halve the backslashes, keep the token verbatim.
            out.push_str(&"\\".repeat(occ.slashes / 2));
            out.push_str(occ.token);
        } else {
            match resolve(occ.name, ctx)? {
                Resolution::Value(value) => {
                    out.push_str(&"\\".repeat(occ.slashes / 2));
                    out.push_str(&value);
                }
                Resolution::KeepOriginal => out.push_str(&text[occ.start..occ.end]),
            }
        }
        cursor = occ.end;
    }
    out.push_str(&text[cursor..]);
    Ok(Value::String(out))
}

/// Substitute tokens in a string that must stay a string, such as an
/// include target or a scoped-variable value.
pub fn substitute_to_string(text: &str, ctx: &VarContext) -> Result<String, ProcessError> {
    match substitute(text, ctx)? {
        Value::String(out) => Ok(out),
        _ => Err(ProcessError::CastPosition {
            text: text.to_string(),
        }),
    }
}
