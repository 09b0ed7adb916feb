//! Command-line interface for the place hierarchy passes.
#![forbid(unsafe_code)]

use std::io::{self, Write};

use clap::{Parser, Subcommand};

mod error;
mod fs;
mod init;
mod resolve;

pub use error::CliError;

use init::InitArgs;
use resolve::ResolveArgs;

const ARG_DATABASE: &str = "database";
const ENV_INIT_DATABASE: &str = "PLACETREE_CMDS_INIT_DATABASE";
const ENV_RESOLVE_DATABASE: &str = "PLACETREE_CMDS_RESOLVE_DATABASE";

/// Run the placetree CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    dispatch(cli.command, &mut out)
}

fn dispatch(command: Command, out: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Init(args) => init::run_init(&args.into_config()?),
        Command::Resolve(args) => {
            let config = args.into_config()?;
            resolve::run_resolve(&config, out).map(drop)
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "placetree",
    about = "Build the place hierarchy of an imported feature database",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the feature schema in a new or existing database.
    Init(InitArgs),
    /// Resolve parents and linked places.
    Resolve(ResolveArgs),
}

#[cfg(test)]
mod tests;
