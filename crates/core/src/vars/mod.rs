//! Variable and date-time substitution.

pub mod datemath;
pub mod substitute;

pub use datemath::{
    parse_instant, strftime_with_colon_z, DateMathError, DEFAULT_TIME_FORMAT,
    TIME_NOW_PREFIX, TIME_REF_PREFIX,
};
pub use substitute::{substitute, substitute_to_string, VarContext, UNBOUND_ORIGINAL};
