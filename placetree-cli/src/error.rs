//! Error types emitted by the placetree CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use placetree_core::{ParseFeatureKindError, SchemaError, SqliteFeatureStoreError};
use placetree_hierarchy::ResolveError;
use thiserror::Error;

/// Errors emitted by the placetree CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// `--kinds` named something other than a feature table.
    #[error("invalid --kinds entry: {0}")]
    InvalidKind(#[from] ParseFeatureKindError),
    /// The database path does not exist.
    #[error("database {path:?} does not exist; run `placetree init` first")]
    MissingDatabase { path: Utf8PathBuf },
    /// The database path exists but is not a file.
    #[error("database path {path:?} exists but is not a file")]
    DatabaseNotFile { path: Utf8PathBuf },
    /// Inspecting the database path failed.
    #[error("failed to inspect database path {path:?}: {source}")]
    InspectDatabase {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Creating the parent directory of a new database failed.
    #[error("failed to create parent directory for {path:?}: {source}")]
    CreateParentDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Opening or creating a database for initialisation failed.
    #[error("failed to open database at {path:?}: {source}")]
    OpenDatabase {
        path: Utf8PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    /// Creating or validating the schema failed.
    #[error("failed to initialise schema in {path:?}: {source}")]
    InitialiseSchema {
        path: Utf8PathBuf,
        #[source]
        source: SchemaError,
    },
    /// Opening the feature store failed.
    #[error(transparent)]
    OpenStore(#[from] SqliteFeatureStoreError),
    /// A resolution pass aborted.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Serializing the summary failed.
    #[error("failed to serialize resolve summary: {0}")]
    SerializeSummary(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
