//! `init` command: create a database with the feature schema.

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use placetree_core::initialise_schema;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{ARG_DATABASE, CliError, ENV_INIT_DATABASE, fs};

/// CLI arguments for the `init` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "init",
    long_about = "Create the feature tables, the relation member table and \
                 the schema version marker. Running it against an existing \
                 database only checks the schema version.",
    about = "Initialise a feature database"
)]
#[ortho_config(prefix = "PLACETREE")]
pub(crate) struct InitArgs {
    /// Path to the SQLite feature database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

impl InitArgs {
    pub(crate) fn into_config(self) -> Result<InitConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        InitConfig::try_from(merged)
    }
}

/// Resolved `init` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InitConfig {
    pub(crate) database: Utf8PathBuf,
}

impl TryFrom<InitArgs> for InitConfig {
    type Error = CliError;

    fn try_from(args: InitArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_INIT_DATABASE,
        })?;
        Ok(Self { database })
    }
}

pub(crate) fn run_init(config: &InitConfig) -> Result<(), CliError> {
    let path = &config.database;
    fs::ensure_parent_dir(path).map_err(|source| CliError::CreateParentDirectory {
        path: path.clone(),
        source,
    })?;
    let mut connection = Connection::open(path).map_err(|source| CliError::OpenDatabase {
        path: path.clone(),
        source,
    })?;
    initialise_schema(&mut connection).map_err(|source| CliError::InitialiseSchema {
        path: path.clone(),
        source,
    })?;
    info!("initialised feature schema in {path}");
    Ok(())
}
