//! Facade crate for the placetree hierarchy engine.
//!
//! This crate re-exports the feature model, the store seam and both
//! resolution passes. The SQLite store sits behind the `store-sqlite`
//! feature.

#![forbid(unsafe_code)]

pub use placetree_core::{
    ArrayColumn, BackendError, Feature, FeatureId, FeatureKey, FeatureKind, FeatureUpdate,
    LinkRole, LinkedOsmIds, MemberType, MemoryStore, OsmId, PlaceRank, RelationMember,
    SpatialStore, StoreError,
};

#[cfg(feature = "store-sqlite")]
pub use placetree_core::{
    SCHEMA_VERSION, SchemaError, SqliteFeatureStore, SqliteFeatureStoreError, initialise_schema,
};

#[cfg(feature = "test-support")]
pub use placetree_core::test_support;

pub use placetree_hierarchy::{
    LinkPlan, LinkReport, LinkResolver, MembersAttached, ParentReport, ParentResolver,
    ParentResolverConfig, Pass, ResolveError, Resolution, select_parent,
};
