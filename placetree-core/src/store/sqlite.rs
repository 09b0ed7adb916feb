//! SQLite-backed store over the feature tables.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use geo::Point;
use log::{debug, warn};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params, params_from_iter};
use thiserror::Error;

use crate::{
    Feature, FeatureId, FeatureKey, FeatureKind, FeatureUpdate, LinkedOsmIds, MemberType, OsmId,
    PlaceRank, RelationMember,
};

use super::encoding::{decode_geometry, decode_linked_ids, decode_point};
use super::schema::{SCHEMA_VERSION, SchemaError, table_name};
use super::{ArrayColumn, PolygonIndex, SpatialStore, StoreError};

/// SQLite limits bound parameters per statement to 999 by default. The store
/// chunks `IN` queries to remain below that ceiling.
const SQLITE_MAX_VARIABLE_NUMBER: usize = 999;

const FEATURE_COLUMNS: &str = "id, osm_id, name, type, place_rank, geometry, geometry_center, \
                               parent_id, linked, linked_osm_ids";

/// Error raised when opening a feature database.
#[derive(Debug, Error)]
pub enum SqliteFeatureStoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// The database has no schema version table.
    #[error("database has not been initialised with the placetree schema")]
    MissingSchema,
    /// The database schema is incompatible with this build.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Reading polygon rows for the spatial index failed.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

/// Read-write feature store backed by SQLite tables and an in-memory R\*-tree.
///
/// The R\*-tree is built from polygon envelopes when the store opens. The
/// resolvers never change geometry, so the index stays valid for the
/// lifetime of the store; call [`reindex`](Self::reindex) after editing
/// polygon geometry through another connection.
pub struct SqliteFeatureStore {
    connection: Connection,
    index: PolygonIndex,
}

impl fmt::Debug for SqliteFeatureStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteFeatureStore")
            .field("indexed_polygons", &self.index.len())
            .finish_non_exhaustive()
    }
}

impl SqliteFeatureStore {
    /// Open an initialised feature database for reading and writing.
    pub fn open<P>(database_path: P) -> Result<Self, SqliteFeatureStoreError>
    where
        P: AsRef<Path>,
    {
        let database_path = database_path.as_ref();
        let connection =
            Connection::open_with_flags(database_path, OpenFlags::SQLITE_OPEN_READ_WRITE)
                .map_err(|source| SqliteFeatureStoreError::OpenDatabase {
                    path: database_path.to_path_buf(),
                    source,
                })?;
        Self::from_connection(connection)
    }

    /// Wrap an existing connection, validating its schema and indexing
    /// polygons.
    pub fn from_connection(connection: Connection) -> Result<Self, SqliteFeatureStoreError> {
        ensure_schema(&connection)?;
        let mut store = Self {
            connection,
            index: PolygonIndex::default(),
        };
        store.reindex()?;
        Ok(store)
    }

    /// Rebuild the polygon index from the database.
    pub fn reindex(&mut self) -> Result<(), SqliteFeatureStoreError> {
        let polygons = select_features(
            &self.connection,
            FeatureKind::Polygon,
            "geometry IS NOT NULL",
        )?;
        self.index = PolygonIndex::build(&polygons);
        debug!("indexed {} polygon envelopes", self.index.len());
        Ok(())
    }

    /// Number of polygons in the spatial index.
    #[must_use]
    pub fn indexed_polygons(&self) -> usize {
        self.index.len()
    }

    /// Release the underlying connection.
    #[must_use]
    pub fn into_connection(self) -> Connection {
        self.connection
    }
}

impl SpatialStore for SqliteFeatureStore {
    fn unresolved_features(&self, kind: FeatureKind) -> Result<Vec<Feature>, StoreError> {
        select_features(&self.connection, kind, "parent_id IS NULL")
            .map_err(|err| StoreError::unavailable("list unresolved features", err))
    }

    fn query_containing_polygons(&self, point: Point<f64>) -> Result<Vec<Feature>, StoreError> {
        let candidates = self.index.candidates(point);
        let mut polygons = Vec::with_capacity(candidates.len());
        for chunk in candidates.chunks(SQLITE_MAX_VARIABLE_NUMBER) {
            let rows = load_polygons_chunk(&self.connection, chunk)
                .map_err(|err| StoreError::unavailable("load candidate polygons", err))?;
            polygons.extend(rows.into_iter().filter(|polygon| self.contains(polygon, point)));
        }
        polygons.sort_unstable_by_key(|polygon| polygon.id);
        Ok(polygons)
    }

    fn relation_members(&self) -> Result<Vec<RelationMember>, StoreError> {
        load_relation_members(&self.connection)
            .map_err(|err| StoreError::unavailable("list relation members", err))
    }

    fn polygons_with_osm_id(&self, osm_id: OsmId) -> Result<Vec<FeatureKey>, StoreError> {
        let load = || -> rusqlite::Result<Vec<FeatureKey>> {
            let mut statement = self
                .connection
                .prepare_cached("SELECT id FROM osm_polygon WHERE osm_id = ?1 ORDER BY id")?;
            let ids = statement.query_map([osm_id], |row| row.get::<_, FeatureId>(0))?;
            ids.map(|id| id.map(FeatureKey::polygon)).collect()
        };
        load().map_err(|err| StoreError::unavailable("look up relation polygons", err))
    }

    fn linked_osm_id_union(&self) -> Result<LinkedOsmIds, StoreError> {
        let load = || -> rusqlite::Result<LinkedOsmIds> {
            let mut statement = self.connection.prepare(
                "SELECT id, linked_osm_ids FROM osm_polygon WHERE linked_osm_ids <> '[]'",
            )?;
            let mut rows = statement.query([])?;
            let mut union = LinkedOsmIds::default();
            while let Some(row) = rows.next()? {
                let key = FeatureKey::polygon(row.get(0)?);
                let text: String = row.get(1)?;
                union.merge(&decode_linked_ids(key, &text));
            }
            Ok(union)
        };
        load().map_err(|err| StoreError::unavailable("collect linked osm ids", err))
    }

    fn unlinked_points(&self) -> Result<Vec<Feature>, StoreError> {
        select_features(&self.connection, FeatureKind::Point, "linked = 0")
            .map_err(|err| StoreError::unavailable("list unlinked points", err))
    }

    fn update(&mut self, key: FeatureKey, update: FeatureUpdate) -> Result<(), StoreError> {
        let table = table_name(key.kind);
        let changed = self
            .connection
            .execute(
                &format!(
                    "UPDATE {table}
                     SET parent_id = COALESCE(?2, parent_id), linked = COALESCE(?3, linked)
                     WHERE id = ?1"
                ),
                params![key.id, update.parent_id, update.linked],
            )
            .map_err(|err| StoreError::unavailable("update feature", err))?;
        if changed == 0 {
            return Err(StoreError::MissingFeature { key });
        }
        Ok(())
    }

    fn array_append_unique(
        &mut self,
        key: FeatureKey,
        column: ArrayColumn,
        value: OsmId,
    ) -> Result<bool, StoreError> {
        if key.kind != FeatureKind::Polygon {
            return Err(StoreError::UnsupportedColumn {
                kind: key.kind,
                column,
            });
        }
        let name = column.name();
        let appended = self
            .connection
            .execute(
                &format!(
                    "UPDATE osm_polygon
                     SET {name} = json_insert({name}, '$[#]', ?2)
                     WHERE id = ?1
                       AND CASE WHEN json_valid({name}) THEN
                           json_type({name}) = 'array'
                           AND NOT EXISTS (
                               SELECT 1 FROM json_each(osm_polygon.{name}) WHERE value = ?2
                           )
                       ELSE 0 END"
                ),
                params![key.id, value],
            )
            .map_err(|err| StoreError::unavailable("append linked osm id", err))?;
        if appended > 0 {
            return Ok(true);
        }
        // No row changed: the id is missing, already listed, or the stored
        // array cannot be decoded.
        let well_formed: Option<bool> = self
            .connection
            .query_row(
                &format!(
                    "SELECT CASE WHEN json_valid({name}) THEN json_type({name}) = 'array'
                            ELSE 0 END
                     FROM osm_polygon WHERE id = ?1"
                ),
                [key.id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| StoreError::unavailable("append linked osm id", err))?;
        match well_formed {
            Some(true) => Ok(false),
            Some(false) => {
                warn!("skipping osm id {value} for {key}: undecodable {name}");
                Ok(false)
            }
            None => Err(StoreError::MissingFeature { key }),
        }
    }
}

fn ensure_schema(connection: &Connection) -> Result<(), SqliteFeatureStoreError> {
    let has_version_table: bool = connection.query_row(
        "SELECT EXISTS (
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'placetree_schema_version'
        )",
        [],
        |row| row.get(0),
    )?;
    if !has_version_table {
        return Err(SqliteFeatureStoreError::MissingSchema);
    }
    let found: Option<i64> = connection
        .query_row(
            "SELECT version FROM placetree_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    match found {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }
        .into()),
        None => Err(SqliteFeatureStoreError::MissingSchema),
    }
}

fn select_features(
    connection: &Connection,
    kind: FeatureKind,
    filter: &str,
) -> rusqlite::Result<Vec<Feature>> {
    let table = table_name(kind);
    let mut statement = connection.prepare(&format!(
        "SELECT {FEATURE_COLUMNS} FROM {table} WHERE {filter} ORDER BY id"
    ))?;
    let rows = statement.query_map([], |row| feature_from_row(kind, row))?;
    rows.collect()
}

fn load_polygons_chunk(connection: &Connection, ids: &[FeatureId]) -> rusqlite::Result<Vec<Feature>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let query = format!("SELECT {FEATURE_COLUMNS} FROM osm_polygon WHERE id IN ({placeholders})");
    let mut statement = connection.prepare(&query)?;
    let rows = statement.query_map(params_from_iter(ids.iter()), |row| {
        feature_from_row(FeatureKind::Polygon, row)
    })?;
    rows.collect()
}

fn feature_from_row(kind: FeatureKind, row: &Row<'_>) -> rusqlite::Result<Feature> {
    let id: FeatureId = row.get(0)?;
    let key = FeatureKey::new(kind, id);
    let place_rank = row
        .get::<_, Option<i64>>(4)?
        .and_then(|raw| match PlaceRank::try_from(raw) {
            Ok(rank) => Some(rank),
            Err(err) => {
                warn!("ignoring place_rank on {key}: {err}");
                None
            }
        });
    let geometry_text: Option<String> = row.get(5)?;
    let center_text: Option<String> = row.get(6)?;
    let linked_text: String = row.get(9)?;

    Ok(Feature {
        id,
        osm_id: row.get(1)?,
        kind,
        name: row.get(2)?,
        feature_type: row.get(3)?,
        place_rank,
        geometry: decode_geometry(key, "geometry", geometry_text.as_deref()),
        geometry_center: decode_point(key, center_text.as_deref()),
        parent_id: row.get(7)?,
        linked: row.get(8)?,
        linked_osm_ids: decode_linked_ids(key, &linked_text),
    })
}

fn load_relation_members(connection: &Connection) -> rusqlite::Result<Vec<RelationMember>> {
    let mut statement = connection.prepare(
        "SELECT osm_id, member_id, member_type, role FROM osm_relation_member ORDER BY rowid",
    )?;
    let mut rows = statement.query([])?;
    let mut members = Vec::new();
    while let Some(row) = rows.next()? {
        let osm_id: OsmId = row.get(0)?;
        let member_id: OsmId = row.get(1)?;
        let code: i64 = row.get(2)?;
        let role: String = row.get(3)?;
        match MemberType::try_from(code) {
            Ok(member_type) => {
                members.push(RelationMember::new(osm_id, member_id, member_type, role));
            }
            Err(err) => warn!("skipping member {member_id} of relation {osm_id}: {err}"),
        }
    }
    Ok(members)
}
