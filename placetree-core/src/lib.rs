//! Core domain types for the placetree hierarchy builder.
//!
//! Features are rows addressed by a [`FeatureKey`]: polygons, linestrings,
//! points and house numbers sharing one shape. The [`SpatialStore`] trait is
//! the boundary the hierarchy passes read and write through; this crate ships
//! an in-memory implementation and, behind the `store-sqlite` feature, a
//! SQLite implementation with its schema.
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod feature;
mod links;
mod relation;
mod store;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use feature::{
    Feature, FeatureId, FeatureKey, FeatureKind, FeatureUpdate, OsmId, ParseFeatureKindError,
    PlaceRank, PlaceRankError,
};
pub use links::LinkedOsmIds;
pub use relation::{LinkRole, MemberType, RelationMember, UnknownMemberType};
pub use store::{ArrayColumn, BackendError, MemoryStore, PolygonIndex, SpatialStore, StoreError};

#[cfg(feature = "store-sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "store-sqlite")))]
pub use store::{
    SCHEMA_VERSION, SchemaError, SqliteFeatureStore, SqliteFeatureStoreError, initialise_schema,
};
