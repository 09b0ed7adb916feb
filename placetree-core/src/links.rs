//! Set of osm ids that a polygon absorbs as aliases.

use std::collections::BTreeSet;

use crate::OsmId;

/// Ordered, duplicate-free set of osm ids.
///
/// Accumulation is a set union: merging is commutative and idempotent, so
/// partial sets built independently combine to the same result in any order.
///
/// # Examples
/// ```
/// use placetree_core::LinkedOsmIds;
///
/// let mut ids = LinkedOsmIds::default();
/// assert!(ids.insert(43));
/// assert!(!ids.insert(43));
///
/// let other: LinkedOsmIds = [7, 43].into_iter().collect();
/// ids.merge(&other);
/// assert_eq!(ids.iter().collect::<Vec<_>>(), vec![7, 43]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct LinkedOsmIds(BTreeSet<OsmId>);

impl LinkedOsmIds {
    /// Add an id, returning `true` if it was not present yet.
    pub fn insert(&mut self, id: OsmId) -> bool {
        self.0.insert(id)
    }

    /// Whether the id is part of the set.
    #[must_use]
    pub fn contains(&self, id: OsmId) -> bool {
        self.0.contains(&id)
    }

    /// Union `other` into `self`, returning how many ids were new.
    pub fn merge(&mut self, other: &Self) -> usize {
        let before = self.0.len();
        self.0.extend(other.0.iter().copied());
        self.0.len() - before
    }

    /// Number of ids in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no ids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = OsmId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<OsmId> for LinkedOsmIds {
    fn from_iter<I: IntoIterator<Item = OsmId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<OsmId> for LinkedOsmIds {
    fn extend<I: IntoIterator<Item = OsmId>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for LinkedOsmIds {
    type Item = OsmId;
    type IntoIter = std::collections::btree_set::IntoIter<OsmId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
