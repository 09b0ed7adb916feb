//! R\*-tree over polygon bounding boxes.
//!
//! The index narrows a point query to the polygons whose envelope covers the
//! point. Callers still run the exact containment test on the candidates.

use std::fmt;

use geo::{BoundingRect, Point};
use rstar::{AABB, RTree, RTreeObject};

use crate::{Feature, FeatureId, FeatureKind};

/// Envelope entry stored in the tree.
#[derive(Debug, Clone, PartialEq)]
struct IndexedPolygon {
    id: FeatureId,
    envelope: AABB<[f64; 2]>,
}

impl IndexedPolygon {
    fn from_feature(feature: &Feature) -> Option<Self> {
        let rect = feature.geometry.as_ref()?.bounding_rect()?;
        let (min, max) = (rect.min(), rect.max());
        if ![min.x, min.y, max.x, max.y].iter().all(|value| value.is_finite()) {
            return None;
        }
        Some(Self {
            id: feature.id,
            envelope: AABB::from_corners([min.x, min.y], [max.x, max.y]),
        })
    }
}

impl RTreeObject for IndexedPolygon {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index of polygon envelopes keyed by polygon id.
///
/// Polygons without a usable geometry are left out; they cannot contain any
/// point.
#[derive(Default)]
pub struct PolygonIndex {
    tree: RTree<IndexedPolygon>,
}

impl fmt::Debug for PolygonIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolygonIndex")
            .field("entries", &self.tree.size())
            .finish()
    }
}

impl PolygonIndex {
    /// Bulk-load an index from polygon rows. Rows of other kinds are ignored.
    pub fn build<'a, I>(features: I) -> Self
    where
        I: IntoIterator<Item = &'a Feature>,
    {
        let entries = features
            .into_iter()
            .filter(|feature| feature.kind == FeatureKind::Polygon)
            .filter_map(IndexedPolygon::from_feature)
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Add or replace the envelope of one polygon row.
    ///
    /// Returns `false` when the row is not an indexable polygon.
    pub fn insert(&mut self, feature: &Feature) -> bool {
        self.remove(feature.id);
        if feature.kind != FeatureKind::Polygon {
            return false;
        }
        match IndexedPolygon::from_feature(feature) {
            Some(entry) => {
                self.tree.insert(entry);
                true
            }
            None => false,
        }
    }

    /// Drop the envelope stored for `id`, if any.
    pub fn remove(&mut self, id: FeatureId) -> bool {
        let stale: Vec<IndexedPolygon> = self
            .tree
            .iter()
            .filter(|entry| entry.id == id)
            .cloned()
            .collect();
        let removed = !stale.is_empty();
        for entry in stale {
            self.tree.remove(&entry);
        }
        removed
    }

    /// Ids of polygons whose envelope covers `point`, ascending.
    ///
    /// Envelope edges count as covering; the exact test decides boundary
    /// cases.
    #[must_use]
    pub fn candidates(&self, point: Point<f64>) -> Vec<FeatureId> {
        let envelope = AABB::from_point([point.x(), point.y()]);
        let mut ids: Vec<FeatureId> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Number of indexed polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index holds no polygons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Polygon, polygon};
    use rstest::{fixture, rstest};

    fn square(min: f64, max: f64) -> Polygon<f64> {
        polygon![(x: min, y: min), (x: max, y: min), (x: max, y: max), (x: min, y: max)]
    }

    #[fixture]
    fn nested() -> Vec<Feature> {
        vec![
            Feature::new(FeatureKind::Polygon, 1, 100).with_geometry(square(0.0, 10.0)),
            Feature::new(FeatureKind::Polygon, 2, 200).with_geometry(square(2.0, 4.0)),
            Feature::new(FeatureKind::Polygon, 3, 300).with_geometry(square(20.0, 30.0)),
        ]
    }

    #[rstest]
    fn candidates_cover_the_point(nested: Vec<Feature>) {
        let index = PolygonIndex::build(&nested);
        assert_eq!(index.len(), 3);
        assert_eq!(index.candidates(Point::new(3.0, 3.0)), vec![1, 2]);
        assert_eq!(index.candidates(Point::new(25.0, 25.0)), vec![3]);
        assert!(index.candidates(Point::new(-1.0, 15.0)).is_empty());
    }

    #[rstest]
    fn rows_without_geometry_or_of_other_kinds_are_skipped() {
        let features = vec![
            Feature::new(FeatureKind::Polygon, 1, 100),
            Feature::new(FeatureKind::Linestring, 2, 200).with_geometry(square(0.0, 1.0)),
        ];
        let index = PolygonIndex::build(&features);
        assert!(index.is_empty());
    }

    #[rstest]
    fn insert_replaces_existing_envelope(nested: Vec<Feature>) {
        let mut index = PolygonIndex::build(&nested);
        let moved = Feature::new(FeatureKind::Polygon, 2, 200).with_geometry(square(40.0, 50.0));
        assert!(index.insert(&moved));
        assert_eq!(index.len(), 3);
        assert_eq!(index.candidates(Point::new(3.0, 3.0)), vec![1]);
        assert_eq!(index.candidates(Point::new(45.0, 45.0)), vec![2]);
    }

    #[rstest]
    fn remove_reports_whether_an_entry_existed(nested: Vec<Feature>) {
        let mut index = PolygonIndex::build(&nested);
        assert!(index.remove(3));
        assert!(!index.remove(3));
        assert_eq!(index.len(), 2);
    }
}
