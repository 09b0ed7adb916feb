//! SQLite schema for feature and relation member tables.

use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

use crate::FeatureKind;

/// Version recorded in `placetree_schema_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Table holding rows of `kind`.
pub(crate) const fn table_name(kind: FeatureKind) -> &'static str {
    match kind {
        FeatureKind::Polygon => "osm_polygon",
        FeatureKind::Linestring => "osm_linestring",
        FeatureKind::Point => "osm_point",
        FeatureKind::Housenumber => "osm_housenumber",
    }
}

/// Initialise the feature schema inside an existing SQLite database.
///
/// Creates one table per feature kind with an identical column set, the
/// relation member table, lookup indexes, and records the schema version.
/// Running it again on an up-to-date database is a no-op; a database
/// carrying another version is rejected.
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use placetree_core::initialise_schema;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("create schema");
///
/// let version: i64 = conn
///     .query_row("SELECT version FROM placetree_schema_version", [], |row| row.get(0))
///     .expect("read schema version");
/// assert_eq!(version, 1);
/// ```
pub fn initialise_schema(connection: &mut Connection) -> Result<(), SchemaError> {
    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_feature_tables(&transaction)?;
    create_member_table(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_feature_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    for kind in FeatureKind::ALL {
        let table = table_name(kind);
        run_migration_step(
            transaction,
            create_step(kind),
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY,
                    osm_id INTEGER NOT NULL,
                    name TEXT,
                    type TEXT,
                    place_rank INTEGER CHECK (place_rank BETWEEN 0 AND 30),
                    geometry TEXT,
                    geometry_center TEXT,
                    parent_id INTEGER,
                    linked INTEGER NOT NULL DEFAULT 0 CHECK (linked IN (0, 1)),
                    linked_osm_ids TEXT NOT NULL DEFAULT '[]'
                )"
            ),
        )?;
        run_migration_step(
            transaction,
            index_step(kind),
            &format!("CREATE INDEX IF NOT EXISTS idx_{table}_osm_id ON {table}(osm_id)"),
        )?;
    }
    Ok(())
}

const fn create_step(kind: FeatureKind) -> &'static str {
    match kind {
        FeatureKind::Polygon => "create osm_polygon",
        FeatureKind::Linestring => "create osm_linestring",
        FeatureKind::Point => "create osm_point",
        FeatureKind::Housenumber => "create osm_housenumber",
    }
}

const fn index_step(kind: FeatureKind) -> &'static str {
    match kind {
        FeatureKind::Polygon => "index osm_polygon",
        FeatureKind::Linestring => "index osm_linestring",
        FeatureKind::Point => "index osm_point",
        FeatureKind::Housenumber => "index osm_housenumber",
    }
}

fn create_member_table(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create osm_relation_member",
        "CREATE TABLE IF NOT EXISTS osm_relation_member (
            osm_id INTEGER NOT NULL,
            member_id INTEGER NOT NULL,
            member_type INTEGER NOT NULL CHECK (member_type IN (0, 1, 2)),
            role TEXT NOT NULL DEFAULT ''
        )",
    )?;
    run_migration_step(
        transaction,
        "index osm_relation_member",
        "CREATE INDEX IF NOT EXISTS idx_osm_relation_member_role
            ON osm_relation_member(osm_id, role)",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS placetree_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM placetree_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO placetree_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| SchemaError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration { step, source })
}

/// Errors raised when initialising the feature schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A DDL statement or version bookkeeping query failed.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Name of the failed step.
        step: &'static str,
        /// Error reported by SQLite.
        #[source]
        source: SqliteError,
    },
    /// The database was created by an incompatible schema version.
    #[error(
        "expected placetree schema version {expected} but found {found}; apply migrations before retrying"
    )]
    VersionMismatch {
        /// Version this build understands.
        expected: i64,
        /// Version recorded in the database.
        found: i64,
    },
}
