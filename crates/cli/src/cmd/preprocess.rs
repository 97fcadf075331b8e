use std::collections::HashMap;
use std::env;

use color_eyre::eyre::{eyre, Result};
use yamlweave_core::Preprocessor;

use crate::PreprocessArgs;

pub fn run(args: &PreprocessArgs) -> Result<()> {
    let mut replacements: HashMap<String, String> = HashMap::new();
    if !args.no_environment {
        replacements.extend(env::vars());
    }
    for define in &args.define {
        let (name, value) = define
            .split_once('=')
            .ok_or_else(|| eyre!("--define {define}: expected NAME=VALUE"))?;
        replacements.insert(name.to_string(), value.to_string());
    }

    let preprocessor = Preprocessor { replacements };
    preprocessor.process_file(&args.in_file, args.out_file.as_deref())?;
    Ok(())
}
