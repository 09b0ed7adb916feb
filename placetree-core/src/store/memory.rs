//! In-memory `SpatialStore` implementation.

use std::collections::BTreeMap;

use geo::Point;

use crate::{
    Feature, FeatureKey, FeatureKind, FeatureUpdate, LinkedOsmIds, OsmId, RelationMember,
};

use super::{ArrayColumn, PolygonIndex, SpatialStore, StoreError};

/// Spatial store holding every row in memory.
///
/// Polygon envelopes are indexed in a [`PolygonIndex`]; other queries scan
/// the ordered row map. Suited to tests and small extracts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    features: BTreeMap<FeatureKey, Feature>,
    members: Vec<RelationMember>,
    index: PolygonIndex,
}

impl MemoryStore {
    /// Create a store from a collection of features.
    ///
    /// A later feature replaces an earlier one with the same key.
    pub fn with_features<I>(features: I) -> Self
    where
        I: IntoIterator<Item = Feature>,
    {
        let features: BTreeMap<FeatureKey, Feature> = features
            .into_iter()
            .map(|feature| (feature.key(), feature))
            .collect();
        let index = PolygonIndex::build(features.values());
        Self {
            features,
            members: Vec::new(),
            index,
        }
    }

    /// Add relation member records.
    #[must_use]
    pub fn with_members<I>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = RelationMember>,
    {
        self.members.extend(members);
        self
    }

    /// Insert or replace a single row.
    pub fn insert_feature(&mut self, feature: Feature) -> Option<Feature> {
        if feature.kind == FeatureKind::Polygon {
            self.index.insert(&feature);
        }
        self.features.insert(feature.key(), feature)
    }

    /// Add one relation member record.
    pub fn insert_member(&mut self, member: RelationMember) {
        self.members.push(member);
    }

    /// Look up a row by key.
    #[must_use]
    pub fn feature(&self, key: FeatureKey) -> Option<&Feature> {
        self.features.get(&key)
    }

    /// Iterate over every row in key order.
    pub fn features(&self) -> impl Iterator<Item = &Feature> + '_ {
        self.features.values()
    }

    fn of_kind(&self, kind: FeatureKind) -> impl Iterator<Item = &Feature> + '_ {
        self.features
            .values()
            .filter(move |feature| feature.kind == kind)
    }
}

impl SpatialStore for MemoryStore {
    fn unresolved_features(&self, kind: FeatureKind) -> Result<Vec<Feature>, StoreError> {
        Ok(self
            .of_kind(kind)
            .filter(|feature| feature.parent_id.is_none())
            .cloned()
            .collect())
    }

    fn query_containing_polygons(&self, point: Point<f64>) -> Result<Vec<Feature>, StoreError> {
        Ok(self
            .index
            .candidates(point)
            .into_iter()
            .filter_map(|id| self.features.get(&FeatureKey::polygon(id)))
            .filter(|polygon| self.contains(polygon, point))
            .cloned()
            .collect())
    }

    fn relation_members(&self) -> Result<Vec<RelationMember>, StoreError> {
        Ok(self.members.clone())
    }

    fn polygons_with_osm_id(&self, osm_id: OsmId) -> Result<Vec<FeatureKey>, StoreError> {
        Ok(self
            .of_kind(FeatureKind::Polygon)
            .filter(|polygon| polygon.osm_id == osm_id)
            .map(Feature::key)
            .collect())
    }

    fn linked_osm_id_union(&self) -> Result<LinkedOsmIds, StoreError> {
        let mut union = LinkedOsmIds::default();
        for polygon in self.of_kind(FeatureKind::Polygon) {
            union.merge(&polygon.linked_osm_ids);
        }
        Ok(union)
    }

    fn unlinked_points(&self) -> Result<Vec<Feature>, StoreError> {
        Ok(self
            .of_kind(FeatureKind::Point)
            .filter(|point| !point.linked)
            .cloned()
            .collect())
    }

    fn update(&mut self, key: FeatureKey, update: FeatureUpdate) -> Result<(), StoreError> {
        let feature = self
            .features
            .get_mut(&key)
            .ok_or(StoreError::MissingFeature { key })?;
        update.apply_to(feature);
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
        let feature = self
            .features
            .get_mut(&key)
            .ok_or(StoreError::MissingFeature { key })?;
        match column {
            ArrayColumn::LinkedOsmIds => Ok(feature.linked_osm_ids.insert(value)),
        }
    }
}
