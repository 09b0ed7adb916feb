//! Feature rows and the keys used to address them.

use std::fmt;
use std::str::FromStr;

use geo::{Area, Centroid, Geometry, Point};
use thiserror::Error;

use crate::LinkedOsmIds;

/// External OpenStreetMap identifier. Values may repeat across feature kinds.
pub type OsmId = i64;

/// Internal row identifier, unique within a [`FeatureKind`].
pub type FeatureId = u64;

/// Kind of mapped feature. Each kind lives in its own table and id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FeatureKind {
    /// Closed areas carrying full geometry; the only valid parents.
    Polygon,
    /// Ways such as streets.
    Linestring,
    /// Nodes such as town centres.
    Point,
    /// Address points.
    Housenumber,
}

impl FeatureKind {
    /// Every kind, in the order the hierarchy pass visits them.
    pub const ALL: [Self; 4] = [
        Self::Polygon,
        Self::Point,
        Self::Linestring,
        Self::Housenumber,
    ];

    /// Lower-case name used in logs, configuration and the CLI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Polygon => "polygon",
            Self::Linestring => "linestring",
            Self::Point => "point",
            Self::Housenumber => "housenumber",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`FeatureKind`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown feature kind {0:?}; expected polygon, linestring, point or housenumber")]
pub struct ParseFeatureKindError(pub String);

impl FromStr for FeatureKind {
    type Err = ParseFeatureKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "polygon" => Ok(Self::Polygon),
            "linestring" => Ok(Self::Linestring),
            "point" => Ok(Self::Point),
            "housenumber" => Ok(Self::Housenumber),
            other => Err(ParseFeatureKindError(other.to_owned())),
        }
    }
}

/// Address of a feature row: its kind plus its per-kind id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureKey {
    /// Table the row belongs to.
    pub kind: FeatureKind,
    /// Row identifier within that table.
    pub id: FeatureId,
}

impl FeatureKey {
    /// Build a key from its parts.
    #[must_use]
    pub const fn new(kind: FeatureKind, id: FeatureId) -> Self {
        Self { kind, id }
    }

    /// Key of a polygon row.
    #[must_use]
    pub const fn polygon(id: FeatureId) -> Self {
        Self::new(FeatureKind::Polygon, id)
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// Administrative significance of a place. Lower values are broader places.
///
/// # Examples
/// ```
/// use placetree_core::PlaceRank;
///
/// let country = PlaceRank::new(4).expect("valid rank");
/// let city = PlaceRank::new(16).expect("valid rank");
/// assert!(country < city);
/// assert!(PlaceRank::new(31).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct PlaceRank(u8);

/// Error returned when a rank falls outside `0..=PlaceRank::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("place rank {0} is outside 0..={max}", max = PlaceRank::MAX)]
pub struct PlaceRankError(pub i64);

impl PlaceRank {
    /// Highest rank assigned to any place.
    pub const MAX: u8 = 30;

    /// Validate and wrap a raw rank.
    pub const fn new(rank: u8) -> Result<Self, PlaceRankError> {
        if rank > Self::MAX {
            return Err(PlaceRankError(rank as i64));
        }
        Ok(Self(rank))
    }

    /// Raw numeric rank.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for PlaceRank {
    type Error = PlaceRankError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i64> for PlaceRank {
    type Error = PlaceRankError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| PlaceRankError(value))
            .and_then(Self::new)
    }
}

impl From<PlaceRank> for u8 {
    fn from(rank: PlaceRank) -> Self {
        rank.0
    }
}

impl fmt::Display for PlaceRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A named geographic thing: polygon, linestring, point or house number.
///
/// All kinds share this shape. Polygons carry full geometry; the other kinds
/// usually carry only `geometry_center`.
///
/// # Examples
/// ```
/// use geo::{Point, polygon};
/// use placetree_core::{Feature, FeatureKind, PlaceRank};
///
/// let state = Feature::new(FeatureKind::Polygon, 2, 200)
///     .with_place_rank(PlaceRank::new(8).expect("valid rank"))
///     .with_geometry(polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)]);
/// assert_eq!(state.representative_point(), Some(Point::new(2.0, 2.0)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Row identifier within the kind's table.
    pub id: FeatureId,
    /// External source identifier.
    pub osm_id: OsmId,
    /// Table the row belongs to.
    pub kind: FeatureKind,
    /// Display name, if any.
    pub name: Option<String>,
    /// Free-form category such as `city` or `street`.
    pub feature_type: Option<String>,
    /// Administrative rank; `None` for features without significance.
    pub place_rank: Option<PlaceRank>,
    /// Full geometry; absent for most point-like kinds.
    pub geometry: Option<Geometry<f64>>,
    /// Precomputed representative point.
    pub geometry_center: Option<Point<f64>>,
    /// Id of the containing polygon chosen as parent.
    pub parent_id: Option<FeatureId>,
    /// Whether this point is an alias of a polygon.
    pub linked: bool,
    /// Osm ids of features that are aliases of this polygon.
    pub linked_osm_ids: LinkedOsmIds,
}

impl Feature {
    /// Construct a bare feature with no geometry, rank or links.
    #[must_use]
    pub fn new(kind: FeatureKind, id: FeatureId, osm_id: OsmId) -> Self {
        Self {
            id,
            osm_id,
            kind,
            name: None,
            feature_type: None,
            place_rank: None,
            geometry: None,
            geometry_center: None,
            parent_id: None,
            linked: false,
            linked_osm_ids: LinkedOsmIds::default(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the free-form category.
    #[must_use]
    pub fn with_type(mut self, feature_type: impl Into<String>) -> Self {
        self.feature_type = Some(feature_type.into());
        self
    }

    /// Set the administrative rank.
    #[must_use]
    pub fn with_place_rank(mut self, rank: PlaceRank) -> Self {
        self.place_rank = Some(rank);
        self
    }

    /// Set the full geometry.
    #[must_use]
    pub fn with_geometry(mut self, geometry: impl Into<Geometry<f64>>) -> Self {
        self.geometry = Some(geometry.into());
        self
    }

    /// Set the representative point.
    #[must_use]
    pub fn with_center(mut self, center: Point<f64>) -> Self {
        self.geometry_center = Some(center);
        self
    }

    /// Set an existing parent.
    #[must_use]
    pub fn with_parent(mut self, parent_id: FeatureId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Replace the linked osm id set.
    #[must_use]
    pub fn with_linked_osm_ids(mut self, ids: impl IntoIterator<Item = OsmId>) -> Self {
        self.linked_osm_ids = ids.into_iter().collect();
        self
    }

    /// Address of this row.
    #[must_use]
    pub const fn key(&self) -> FeatureKey {
        FeatureKey::new(self.kind, self.id)
    }

    /// Point used for containment queries.
    ///
    /// Returns `geometry_center` when present, otherwise the centroid of
    /// `geometry`. `None` means the row is degenerate: no center, an empty
    /// geometry, or non-finite coordinates.
    #[must_use]
    pub fn representative_point(&self) -> Option<Point<f64>> {
        self.geometry_center
            .or_else(|| self.geometry.as_ref().and_then(|geometry| geometry.centroid()))
            .filter(|point| point.x().is_finite() && point.y().is_finite())
    }

    /// Unsigned area of the geometry, zero when absent.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.geometry
            .as_ref()
            .map_or(0.0, |geometry| geometry.unsigned_area())
    }
}

/// Field changes applied through [`crate::SpatialStore::update`].
///
/// Only the hierarchy fields are writable; `None` leaves a column untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureUpdate {
    /// New parent polygon id.
    pub parent_id: Option<FeatureId>,
    /// New linked flag.
    pub linked: Option<bool>,
}

impl FeatureUpdate {
    /// Update that assigns a parent.
    #[must_use]
    pub const fn parent(parent_id: FeatureId) -> Self {
        Self {
            parent_id: Some(parent_id),
            linked: None,
        }
    }

    /// Update that marks a point as linked.
    #[must_use]
    pub const fn linked() -> Self {
        Self {
            parent_id: None,
            linked: Some(true),
        }
    }

    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.parent_id.is_none() && self.linked.is_none()
    }

    /// Apply the update to an in-memory row.
    pub fn apply_to(&self, feature: &mut Feature) {
        if let Some(parent_id) = self.parent_id {
            feature.parent_id = Some(parent_id);
        }
        if let Some(linked) = self.linked {
            feature.linked = linked;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon, line_string, polygon};
    use rstest::rstest;

    fn square() -> Polygon<f64> {
        polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)]
    }

    #[rstest]
    fn center_takes_precedence_over_centroid() {
        let feature = Feature::new(FeatureKind::Polygon, 1, 10)
            .with_geometry(square())
            .with_center(Point::new(1.0, 3.0));
        assert_eq!(feature.representative_point(), Some(Point::new(1.0, 3.0)));
    }

    #[rstest]
    fn centroid_used_without_center() {
        let feature = Feature::new(FeatureKind::Linestring, 1, 10)
            .with_geometry(line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0)]);
        assert_eq!(feature.representative_point(), Some(Point::new(1.0, 0.0)));
    }

    #[rstest]
    fn empty_geometry_has_no_point() {
        let feature = Feature::new(FeatureKind::Linestring, 1, 10)
            .with_geometry(LineString::<f64>::new(Vec::new()));
        assert_eq!(feature.representative_point(), None);
        assert_eq!(Feature::new(FeatureKind::Point, 2, 11).representative_point(), None);
    }

    #[rstest]
    fn non_finite_center_is_rejected() {
        let feature = Feature::new(FeatureKind::Point, 1, 10).with_center(Point::new(f64::NAN, 0.0));
        assert_eq!(feature.representative_point(), None);
    }

    #[rstest]
    #[case(0, true)]
    #[case(30, true)]
    #[case(31, false)]
    fn place_rank_bounds(#[case] raw: u8, #[case] valid: bool) {
        assert_eq!(PlaceRank::new(raw).is_ok(), valid);
    }

    #[rstest]
    fn place_rank_rejects_negative_storage_values() {
        assert_eq!(PlaceRank::try_from(-1_i64), Err(PlaceRankError(-1)));
    }

    #[rstest]
    #[case("polygon", FeatureKind::Polygon)]
    #[case("linestring", FeatureKind::Linestring)]
    #[case(" point ", FeatureKind::Point)]
    #[case("housenumber", FeatureKind::Housenumber)]
    fn feature_kind_parses(#[case] raw: &str, #[case] expected: FeatureKind) {
        assert_eq!(raw.parse::<FeatureKind>(), Ok(expected));
    }

    #[rstest]
    fn feature_kind_rejects_unknown_names() {
        assert!("relation".parse::<FeatureKind>().is_err());
    }

    #[rstest]
    fn update_leaves_untouched_fields() {
        let mut feature = Feature::new(FeatureKind::Point, 1, 10).with_parent(5);
        FeatureUpdate::linked().apply_to(&mut feature);
        assert_eq!(feature.parent_id, Some(5));
        assert!(feature.linked);
    }
}
