//! Spatial store boundary used by the hierarchy passes.
//!
//! The [`SpatialStore`] trait is the only way the resolvers read and write
//! features. It exposes containment queries backed by an R\*-tree over polygon
//! envelopes, narrow row updates, and a set-union update for array columns.

use std::error::Error as StdError;
use std::fmt;

use geo::{Contains, Point};
use thiserror::Error;

use crate::{Feature, FeatureKey, FeatureKind, FeatureUpdate, LinkedOsmIds, OsmId, RelationMember};

mod memory;
mod spatial_index;

#[cfg(feature = "store-sqlite")]
pub(crate) mod encoding;
#[cfg(feature = "store-sqlite")]
pub(crate) mod schema;
#[cfg(feature = "store-sqlite")]
mod sqlite;

pub use memory::MemoryStore;
pub use spatial_index::PolygonIndex;

#[cfg(feature = "store-sqlite")]
pub use schema::{SCHEMA_VERSION, SchemaError, initialise_schema};
#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteFeatureStore, SqliteFeatureStoreError};

/// Array-typed columns that support [`SpatialStore::array_append_unique`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayColumn {
    /// `linked_osm_ids` on polygon rows.
    LinkedOsmIds,
}

impl ArrayColumn {
    /// Column name in storage.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LinkedOsmIds => "linked_osm_ids",
        }
    }
}

impl fmt::Display for ArrayColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Boxed source error raised by a store backend.
pub type BackendError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised by [`SpatialStore`] operations.
///
/// Every variant is fatal for the running pass. Row-level problems such as
/// undecodable geometry are logged by the store and never surface here.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not complete a read or write.
    #[error("spatial store failed to {operation}")]
    Unavailable {
        /// Short description of the failed operation.
        operation: &'static str,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// An update targeted a row that does not exist.
    #[error("feature {key} does not exist")]
    MissingFeature {
        /// Address of the missing row.
        key: FeatureKey,
    },
    /// An array update targeted a kind that does not carry the column.
    #[error("{kind} rows do not carry the {column} column")]
    UnsupportedColumn {
        /// Kind of the targeted row.
        kind: FeatureKind,
        /// Requested column.
        column: ArrayColumn,
    },
}

impl StoreError {
    /// Wrap a backend failure.
    pub fn unavailable(operation: &'static str, source: impl Into<BackendError>) -> Self {
        Self::Unavailable {
            operation,
            source: source.into(),
        }
    }
}

/// Read/write access to features and relation members.
///
/// Implementers index polygon geometries spatially so that
/// [`query_containing_polygons`](Self::query_containing_polygons) does not
/// scan every polygon. Coordinates are planar; containment excludes the
/// polygon boundary.
///
/// # Examples
///
/// ```rust
/// use geo::{Point, polygon};
/// use placetree_core::{Feature, FeatureKind, MemoryStore, SpatialStore};
///
/// let region = Feature::new(FeatureKind::Polygon, 1, 10).with_geometry(
///     polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)],
/// );
/// let store = MemoryStore::with_features([region]);
///
/// let found = store
///     .query_containing_polygons(Point::new(2.0, 2.0))
///     .expect("query store");
/// assert_eq!(found.len(), 1);
/// ```
pub trait SpatialStore {
    /// Rows of `kind` whose `parent_id` is unset, ordered by id.
    fn unresolved_features(&self, kind: FeatureKind) -> Result<Vec<Feature>, StoreError>;

    /// Polygon rows whose geometry contains `point`, ordered by id.
    fn query_containing_polygons(&self, point: Point<f64>) -> Result<Vec<Feature>, StoreError>;

    /// Whether `polygon`'s geometry strictly contains `point`.
    ///
    /// Rows without geometry contain nothing.
    fn contains(&self, polygon: &Feature, point: Point<f64>) -> bool {
        polygon
            .geometry
            .as_ref()
            .is_some_and(|geometry| geometry.contains(&point))
    }

    /// Every relation member record.
    fn relation_members(&self) -> Result<Vec<RelationMember>, StoreError>;

    /// Keys of polygon rows representing the relation `osm_id`.
    fn polygons_with_osm_id(&self, osm_id: OsmId) -> Result<Vec<FeatureKey>, StoreError>;

    /// Union of `linked_osm_ids` across all polygon rows.
    fn linked_osm_id_union(&self) -> Result<LinkedOsmIds, StoreError>;

    /// Point rows whose `linked` flag is not set, ordered by id.
    fn unlinked_points(&self) -> Result<Vec<Feature>, StoreError>;

    /// Apply a field update to one row.
    fn update(&mut self, key: FeatureKey, update: FeatureUpdate) -> Result<(), StoreError>;

    /// Add `value` to an array column unless already present.
    ///
    /// Returns `true` when the value was appended.
    fn array_append_unique(
        &mut self,
        key: FeatureKey,
        column: ArrayColumn,
        value: OsmId,
    ) -> Result<bool, StoreError>;
}

impl<T> SpatialStore for &mut T
where
    T: SpatialStore + ?Sized,
{
    fn unresolved_features(&self, kind: FeatureKind) -> Result<Vec<Feature>, StoreError> {
        (**self).unresolved_features(kind)
    }

    fn query_containing_polygons(&self, point: Point<f64>) -> Result<Vec<Feature>, StoreError> {
        (**self).query_containing_polygons(point)
    }

    fn contains(&self, polygon: &Feature, point: Point<f64>) -> bool {
        (**self).contains(polygon, point)
    }

    fn relation_members(&self) -> Result<Vec<RelationMember>, StoreError> {
        (**self).relation_members()
    }

    fn polygons_with_osm_id(&self, osm_id: OsmId) -> Result<Vec<FeatureKey>, StoreError> {
        (**self).polygons_with_osm_id(osm_id)
    }

    fn linked_osm_id_union(&self) -> Result<LinkedOsmIds, StoreError> {
        (**self).linked_osm_id_union()
    }

    fn unlinked_points(&self) -> Result<Vec<Feature>, StoreError> {
        (**self).unlinked_points()
    }

    fn update(&mut self, key: FeatureKey, update: FeatureUpdate) -> Result<(), StoreError> {
        (**self).update(key, update)
    }

    fn array_append_unique(
        &mut self,
        key: FeatureKey,
        column: ArrayColumn,
        value: OsmId,
    ) -> Result<bool, StoreError> {
        (**self).array_append_unique(key, column, value)
    }
}
