//! `resolve` command: run the hierarchy passes over a feature database.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::warn;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use placetree_core::{FeatureKind, SqliteFeatureStore};
use placetree_hierarchy::{
    LinkReport, LinkResolver, ParentReport, ParentResolver, ParentResolverConfig,
};
use serde::{Deserialize, Serialize};

use crate::{ARG_DATABASE, CliError, ENV_RESOLVE_DATABASE, fs};

/// CLI arguments for the `resolve` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "resolve",
    long_about = "Assign parents to unresolved features and cross-link \
                 relation polygons with their label and admin centre \
                 members. Both passes only touch outstanding rows, so the \
                 command can be rerun after new features are imported.",
    about = "Resolve parents and linked places"
)]
#[ortho_config(prefix = "PLACETREE")]
pub(crate) struct ResolveArgs {
    /// Path to the SQLite feature database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Skip parent resolution.
    #[arg(long)]
    #[serde(default)]
    pub(crate) skip_parents: bool,
    /// Skip linked places resolution.
    #[arg(long)]
    #[serde(default)]
    pub(crate) skip_links: bool,
    /// Comma-separated feature kinds for parent resolution, in order.
    #[arg(long, value_name = "kinds")]
    #[serde(default)]
    pub(crate) kinds: Option<String>,
}

impl ResolveArgs {
    pub(crate) fn into_config(self) -> Result<ResolveConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ResolveConfig::try_from(merged)
    }
}

/// Resolved `resolve` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolveConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) parents: Option<ParentResolverConfig>,
    pub(crate) links: bool,
}

impl ResolveConfig {
    pub(crate) fn validate_database(&self) -> Result<(), CliError> {
        require_file(&self.database)
    }
}

fn require_file(path: &Utf8Path) -> Result<(), CliError> {
    match fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::DatabaseNotFile {
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingDatabase {
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectDatabase {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse_kinds(raw: &str) -> Result<Vec<FeatureKind>, CliError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.parse::<FeatureKind>().map_err(CliError::from))
        .collect()
}

impl TryFrom<ResolveArgs> for ResolveConfig {
    type Error = CliError;

    fn try_from(args: ResolveArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_RESOLVE_DATABASE,
        })?;
        let parents = if args.skip_parents {
            None
        } else {
            Some(match args.kinds.as_deref() {
                Some(raw) => ParentResolverConfig::with_kinds(parse_kinds(raw)?),
                None => ParentResolverConfig::default(),
            })
        };
        Ok(Self {
            database,
            parents,
            links: !args.skip_links,
        })
    }
}

/// Reports of the passes that ran; skipped passes serialize as `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct ResolveSummary {
    pub(crate) parents: Option<ParentReport>,
    pub(crate) links: Option<LinkReport>,
}

pub(crate) fn run_resolve(
    config: &ResolveConfig,
    out: &mut dyn Write,
) -> Result<ResolveSummary, CliError> {
    config.validate_database()?;
    let mut store = SqliteFeatureStore::open(&config.database)?;
    let mut summary = ResolveSummary::default();

    if let Some(parents) = &config.parents {
        let mut resolver = ParentResolver::with_config(&mut store, parents.clone());
        summary.parents = Some(resolver.resolve_parents()?);
    }
    if config.links {
        summary.links = Some(LinkResolver::new(&mut store).resolve_links()?);
    }
    if summary == ResolveSummary::default() {
        warn!("both passes were skipped; nothing to do");
    }

    serde_json::to_writer_pretty(&mut *out, &summary).map_err(CliError::SerializeSummary)?;
    writeln!(out).map_err(CliError::WriteOutput)?;
    Ok(summary)
}
