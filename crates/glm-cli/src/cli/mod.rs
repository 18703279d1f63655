mod commands;
mod config;
mod helpers;
mod logging;

use clap::{ArgAction, Parser};
use glm_core::domain::{GlmError, GlmErrorKind};

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let reported = error.as_glm_error();
            eprintln!("{}", reported.diagnostic_line());
            eprintln!("{}", reported.fatal_exit_line());
            reported.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("glmkit".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            logging::init(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "glmkit",
    version,
    about = "Build and check General Lake Model configuration files"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Convert a JSON namelist mapping into a validated glm3.nml
    JsonToNml(commands::JsonToNmlArgs),
    /// Convert a namelist file into a JSON mapping
    NmlToJson(commands::NmlToJsonArgs),
    /// Parse and validate a namelist file
    Validate(commands::ValidateArgs),
    /// Derive a height/area profile for a truncated-pyramid basin
    Morphometry(commands::MorphometryArgs),
    /// Write an outflow boundary file
    Outflows(commands::OutflowsArgs),
    /// Write a catchment inflow file from meteorological precipitation
    Inflows(commands::InflowsArgs),
    /// Build a namelist and boundary files from a JSON project file
    Build(commands::BuildArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::JsonToNml(args) => commands::run_json_to_nml_command(args),
        CliCommand::NmlToJson(args) => commands::run_nml_to_json_command(args),
        CliCommand::Validate(args) => commands::run_validate_command(args),
        CliCommand::Morphometry(args) => commands::run_morphometry_command(args),
        CliCommand::Outflows(args) => commands::run_outflows_command(args),
        CliCommand::Inflows(args) => commands::run_inflows_command(args),
        CliCommand::Build(args) => commands::run_build_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(GlmError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<GlmError> for CliError {
    fn from(error: GlmError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_glm_error(&self) -> GlmError {
        match self {
            Self::Usage(message) => {
                GlmError::new(GlmErrorKind::InvalidParameter, message.trim_end())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => GlmError::io(format!("{error:#}")),
        }
    }
}
