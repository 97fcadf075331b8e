use std::env;

use color_eyre::eyre::{eyre, Result, WrapErr};
use tracing::{error, info};
use yamlweave_core::vars::parse_instant;
use yamlweave_core::Processor;

use crate::ProcessArgs;

const INCLUDE_PATH_ENV: &str = "YP_INCLUDE_PATH";
const TIME_REF_ENV: &str = "YP_TIME_REF_VALUE";
const SCHEMA_PREFIX_ENV: &str = "YP_SCHEMA_PREFIX";
const TIME_FORMAT_ENV: &str = "YP_TIME_FORMAT";
const TIME_FORMAT_ENV_PREFIX: &str = "YP_TIME_FORMAT_";

fn is_format_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Build a [`Processor`] from the environment and command line, then run
/// it. Flags beat environment variables where both are given.
pub fn run(args: &ProcessArgs) -> Result<()> {
    let mut processor = Processor::new();
    processor.is_process_include = !args.no_process_include;
    processor.is_process_variable = !args.no_process_variable;

    if let Ok(paths) = env::var(INCLUDE_PATH_ENV) {
        processor.include_paths.extend(env::split_paths(&paths));
    }
    processor.include_paths.extend(args.include.iter().cloned());

    if !args.no_environment {
        processor.variables.extend(env::vars());
    }
    for name in &args.undefine {
        processor.variables.remove(name);
    }
    for define in &args.define {
        let (name, value) = define
            .split_once('=')
            .ok_or_else(|| eyre!("--define {define}: expected NAME=VALUE"))?;
        processor.variables.insert(name.to_string(), value.to_string());
    }

    processor.unbound_placeholder = args.unbound_placeholder.clone();
    processor.schema_prefix = args
        .schema_prefix
        .clone()
        .or_else(|| env::var(SCHEMA_PREFIX_ENV).ok());

    if let Some(text) = args
        .time_ref
        .clone()
        .or_else(|| env::var(TIME_REF_ENV).ok())
    {
        processor.time_ref =
            parse_instant(&text).wrap_err_with(|| format!("bad reference time: {text}"))?;
    }

    for (key, value) in env::vars() {
        if key == TIME_FORMAT_ENV {
            processor.time_formats.insert(String::new(), value);
        } else if let Some(name) = key.strip_prefix(TIME_FORMAT_ENV_PREFIX) {
            processor.time_formats.insert(name.to_string(), value);
        }
    }
    for spec in &args.time_format {
        match spec.split_once('=') {
            Some((name, format)) if is_format_name(name) => {
                processor.time_formats.insert(name.to_string(), format.to_string())
            }
            _ => processor.time_formats.insert(String::new(), spec.clone()),
        };
    }

    match processor.process_file(&args.in_file, args.out_file.as_deref()) {
        Ok(Some(schema)) => {
            info!(%schema, "document declares a schema");
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(error) => {
            error!(input = %args.in_file, "processing failed");
            Err(error.into())
        }
    }
}
