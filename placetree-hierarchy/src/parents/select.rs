//! Parent selection among containing polygons.

use std::cmp::Ordering;

use placetree_core::{Feature, FeatureId, PlaceRank};

/// A containing polygon considered as a parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentCandidate {
    /// Polygon id.
    pub id: FeatureId,
    /// Polygon rank; unranked polygons order below every ranked one.
    pub place_rank: Option<PlaceRank>,
    /// Unsigned polygon area, used to break rank ties.
    pub area: f64,
}

impl ParentCandidate {
    /// Candidate describing a polygon row.
    #[must_use]
    pub fn from_feature(polygon: &Feature) -> Self {
        Self {
            id: polygon.id,
            place_rank: polygon.place_rank,
            area: polygon.area(),
        }
    }

    /// Whether this candidate may parent a feature of rank `child`.
    ///
    /// A ranked child accepts only strictly broader ranked polygons; an
    /// unranked child accepts any polygon.
    #[must_use]
    pub fn admits(&self, child: Option<PlaceRank>) -> bool {
        match child {
            Some(child) => self.place_rank.is_some_and(|rank| rank < child),
            None => true,
        }
    }

    /// Precedence between two admissible candidates. `Greater` wins.
    ///
    /// Higher rank wins, then smaller area, then smaller id.
    fn precedence(&self, other: &Self) -> Ordering {
        self.place_rank
            .cmp(&other.place_rank)
            .then_with(|| other.area.total_cmp(&self.area))
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Choose the parent of a feature ranked `child` among `candidates`.
///
/// Candidates the child does not admit are dropped; the nearest ancestor,
/// i.e. the highest remaining rank, wins. Returns `None` when nothing
/// qualifies.
///
/// # Examples
/// ```
/// use placetree_core::PlaceRank;
/// use placetree_hierarchy::{ParentCandidate, select_parent};
///
/// let rank = |value| PlaceRank::new(value).ok();
/// let state = ParentCandidate { id: 2, place_rank: rank(8), area: 100.0 };
/// let county = ParentCandidate { id: 3, place_rank: rank(16), area: 10.0 };
///
/// let parent = select_parent(rank(20), [state, county]);
/// assert_eq!(parent.map(|candidate| candidate.id), Some(3));
/// assert_eq!(select_parent(rank(8), [state, county]), None);
/// ```
pub fn select_parent<I>(child: Option<PlaceRank>, candidates: I) -> Option<ParentCandidate>
where
    I: IntoIterator<Item = ParentCandidate>,
{
    candidates
        .into_iter()
        .filter(|candidate| candidate.admits(child))
        .max_by(ParentCandidate::precedence)
}
