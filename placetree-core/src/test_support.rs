//! Fixture builders shared by unit, integration and behaviour tests.

use geo::{Polygon, polygon};

use crate::{Feature, FeatureKind, PlaceRank};

#[cfg(feature = "store-sqlite")]
pub use sqlite_fixtures::{FixtureError, write_relation_members, write_sqlite_features};

/// Axis-aligned rectangle with corners `(min_x, min_y)` and `(max_x, max_y)`.
#[must_use]
pub fn square(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
    polygon![
        (x: min_x, y: min_y),
        (x: max_x, y: min_y),
        (x: max_x, y: max_y),
        (x: min_x, y: max_y),
    ]
}

/// Polygon row covering `square(min, min, max, max)` with an optional rank.
///
/// # Panics
///
/// Panics when `rank` exceeds [`PlaceRank::MAX`].
#[must_use]
pub fn region(id: u64, osm_id: i64, rank: Option<u8>, min: f64, max: f64) -> Feature {
    let feature =
        Feature::new(FeatureKind::Polygon, id, osm_id).with_geometry(square(min, min, max, max));
    match rank {
        Some(raw) => feature.with_place_rank(checked_rank(raw)),
        None => feature,
    }
}

/// Row of `kind` placed at `(x, y)` through its `geometry_center`.
///
/// # Panics
///
/// Panics when `rank` exceeds [`PlaceRank::MAX`].
#[must_use]
pub fn located(kind: FeatureKind, id: u64, osm_id: i64, rank: Option<u8>, x: f64, y: f64) -> Feature {
    let feature = Feature::new(kind, id, osm_id).with_center(geo::Point::new(x, y));
    match rank {
        Some(raw) => feature.with_place_rank(checked_rank(raw)),
        None => feature,
    }
}

fn checked_rank(raw: u8) -> PlaceRank {
    match PlaceRank::new(raw) {
        Ok(rank) => rank,
        Err(err) => panic!("fixture rank: {err}"),
    }
}

#[cfg(feature = "store-sqlite")]
mod sqlite_fixtures {
    use std::path::Path;

    use rusqlite::{Connection, params};
    use thiserror::Error;

    use crate::store::encoding::{encode_geometry, encode_linked_ids, encode_point};
    use crate::store::schema::table_name;
    use crate::{Feature, RelationMember, SchemaError, initialise_schema};

    /// Errors raised while writing fixture databases.
    #[derive(Debug, Error)]
    pub enum FixtureError {
        /// Creating the schema failed.
        #[error(transparent)]
        Schema(#[from] SchemaError),
        /// Writing rows failed.
        #[error(transparent)]
        Database(#[from] rusqlite::Error),
        /// Encoding `linked_osm_ids` failed.
        #[error(transparent)]
        Encode(#[from] serde_json::Error),
    }

    /// Initialise the schema at `path` and insert `features`.
    pub fn write_sqlite_features(path: &Path, features: &[Feature]) -> Result<(), FixtureError> {
        let mut connection = Connection::open(path)?;
        initialise_schema(&mut connection)?;
        let transaction = connection.transaction()?;
        for feature in features {
            let table = table_name(feature.kind);
            transaction.execute(
                &format!(
                    "INSERT INTO {table} (id, osm_id, name, type, place_rank, geometry,
                        geometry_center, parent_id, linked, linked_osm_ids)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    feature.id,
                    feature.osm_id,
                    feature.name,
                    feature.feature_type,
                    feature.place_rank.map(u8::from),
                    feature.geometry.as_ref().map(encode_geometry),
                    feature.geometry_center.map(encode_point),
                    feature.parent_id,
                    feature.linked,
                    encode_linked_ids(&feature.linked_osm_ids)?,
                ],
            )?;
        }
        transaction.commit()?;
        Ok(())
    }

    /// Initialise the schema at `path` and insert relation member records.
    pub fn write_relation_members(
        path: &Path,
        members: &[RelationMember],
    ) -> Result<(), FixtureError> {
        let mut connection = Connection::open(path)?;
        initialise_schema(&mut connection)?;
        let transaction = connection.transaction()?;
        for member in members {
            transaction.execute(
                "INSERT INTO osm_relation_member (osm_id, member_id, member_type, role)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    member.osm_id,
                    member.member_id,
                    member.member_type.code(),
                    member.role,
                ],
            )?;
        }
        transaction.commit()?;
        Ok(())
    }
}
