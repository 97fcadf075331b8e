mod cmd;
mod logging;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "yamlweave",
    version,
    about = "Expand YAML include files and substitute variable and date-time expressions"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Expand include directives and substitute variables
    Process(ProcessArgs),

    /// Splice DIRECT_INCLUDE= lines before any YAML parsing
    Preprocess(PreprocessArgs),
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Input file, `-` for standard input
    #[arg(default_value = "-")]
    pub in_file: String,

    /// Output file, `-` or absent for standard output
    pub out_file: Option<String>,

    /// Directory to search for include targets (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    pub include: Vec<PathBuf>,

    /// Define a variable (repeatable)
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
    pub define: Vec<String>,

    /// Undefine a variable (repeatable)
    #[arg(short = 'U', long = "undefine", value_name = "NAME")]
    pub undefine: Vec<String>,

    /// Do not import environment variables as definitions
    #[arg(short = 'i', long = "no-environment")]
    pub no_environment: bool,

    /// Stand-in for unbound variables; YP_ORIGINAL keeps tokens verbatim
    #[arg(long, value_name = "VALUE")]
    pub unbound_placeholder: Option<String>,

    /// Leave include directives untouched
    #[arg(long)]
    pub no_process_include: bool,

    /// Leave variable tokens untouched
    #[arg(long)]
    pub no_process_variable: bool,

    /// Base prepended to relative schema pragma locations
    #[arg(long, value_name = "PREFIX")]
    pub schema_prefix: Option<String>,

    /// Date-time output format, optionally named (repeatable)
    #[arg(long = "time-format", value_name = "[NAME=]FORMAT")]
    pub time_format: Vec<String>,

    /// Reference instant for YP_TIME_REF variables
    #[arg(long = "time-ref", value_name = "INSTANT")]
    pub time_ref: Option<String>,
}

#[derive(Debug, Args)]
pub struct PreprocessArgs {
    /// Input file, `-` for standard input
    #[arg(default_value = "-")]
    pub in_file: String,

    /// Output file, `-` or absent for standard output
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub out_file: Option<String>,

    /// Define a replacement (repeatable)
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
    pub define: Vec<String>,

    /// Do not import environment variables as replacements
    #[arg(short = 'i', long = "no-environment")]
    pub no_environment: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Process(args) => cmd::process::run(&args),
        Commands::Preprocess(args) => cmd::preprocess::run(&args),
    }
}
