//! Parent resolution: attach every feature to its nearest containing ancestor.

mod select;

use log::{debug, info, warn};
use placetree_core::{Feature, FeatureId, FeatureKind, FeatureUpdate, SpatialStore};
use serde::Serialize;

use crate::error::{Pass, ResolveError};

pub use select::{ParentCandidate, select_parent};

/// Configuration for [`ParentResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentResolverConfig {
    kinds: Vec<FeatureKind>,
}

impl Default for ParentResolverConfig {
    fn default() -> Self {
        Self {
            kinds: FeatureKind::ALL.to_vec(),
        }
    }
}

impl ParentResolverConfig {
    /// Process only `kinds`, in the given order. Repeated kinds are dropped so
    /// no row is visited twice in one pass.
    #[must_use]
    pub fn with_kinds<I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = FeatureKind>,
    {
        let mut unique = Vec::new();
        for kind in kinds {
            if !unique.contains(&kind) {
                unique.push(kind);
            }
        }
        Self { kinds: unique }
    }

    /// Kinds processed by the pass, in order.
    #[must_use]
    pub fn kinds(&self) -> &[FeatureKind] {
        &self.kinds
    }
}

/// Outcome of resolving one feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A parent was chosen.
    Resolved(FeatureId),
    /// No containing polygon qualified; `parent_id` stays unset.
    Unmatched,
    /// The feature has no usable representative point.
    Malformed,
}

/// Counters reported by [`ParentResolver::resolve_parents`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParentReport {
    /// Features without a parent that were visited.
    pub examined: usize,
    /// Features that received a parent.
    pub resolved: usize,
    /// Features left without a parent because nothing qualified.
    pub unmatched: usize,
    /// Features skipped for lacking a representative point.
    pub malformed: usize,
}

impl ParentReport {
    fn record(&mut self, resolution: Resolution) {
        self.examined += 1;
        match resolution {
            Resolution::Resolved(_) => self.resolved += 1,
            Resolution::Unmatched => self.unmatched += 1,
            Resolution::Malformed => self.malformed += 1,
        }
    }

    /// Add the counters of `other` to `self`.
    pub const fn absorb(&mut self, other: Self) {
        self.examined += other.examined;
        self.resolved += other.resolved;
        self.unmatched += other.unmatched;
        self.malformed += other.malformed;
    }
}

/// Assigns `parent_id` to features that lack one.
///
/// Each configured kind is processed as its own partition. Only rows whose
/// `parent_id` is unset are visited, so running the pass again changes
/// nothing.
///
/// # Examples
/// ```
/// use geo::{Point, polygon};
/// use placetree_core::{Feature, FeatureKey, FeatureKind, MemoryStore, PlaceRank};
/// use placetree_hierarchy::ParentResolver;
///
/// let city = Feature::new(FeatureKind::Polygon, 1, 10)
///     .with_place_rank(PlaceRank::new(16).expect("valid rank"))
///     .with_geometry(polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)]);
/// let street = Feature::new(FeatureKind::Linestring, 1, 20).with_center(Point::new(2.0, 2.0));
///
/// let mut resolver = ParentResolver::new(MemoryStore::with_features([city, street]));
/// let report = resolver.resolve_parents().expect("resolve parents");
/// assert_eq!(report.resolved, 1);
///
/// let store = resolver.into_store();
/// let street = store.feature(FeatureKey::new(FeatureKind::Linestring, 1));
/// assert_eq!(street.and_then(|row| row.parent_id), Some(1));
/// ```
#[derive(Debug)]
pub struct ParentResolver<S> {
    store: S,
    config: ParentResolverConfig,
}

impl<S> ParentResolver<S>
where
    S: SpatialStore,
{
    /// Construct a resolver processing every kind.
    pub fn new(store: S) -> Self {
        Self::with_config(store, ParentResolverConfig::default())
    }

    /// Construct a resolver with explicit configuration.
    pub const fn with_config(store: S, config: ParentResolverConfig) -> Self {
        Self { store, config }
    }

    /// Borrow the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Release the underlying store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Resolve parents for every configured kind.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Store`] when the store fails; rows written
    /// before the failure keep their parent.
    pub fn resolve_parents(&mut self) -> Result<ParentReport, ResolveError> {
        let mut report = ParentReport::default();
        for kind in self.config.kinds.clone() {
            report.absorb(self.resolve_kind(kind)?);
        }
        info!(
            "parent resolution finished: {} examined, {} resolved, {} unmatched, {} malformed",
            report.examined, report.resolved, report.unmatched, report.malformed
        );
        Ok(report)
    }

    /// Resolve parents for the unparented rows of one kind.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Store`] when the store fails.
    pub fn resolve_kind(&mut self, kind: FeatureKind) -> Result<ParentReport, ResolveError> {
        let features = self
            .store
            .unresolved_features(kind)
            .map_err(ResolveError::store(Pass::Parents))?;
        let mut report = ParentReport::default();
        for feature in &features {
            let resolution = self.resolve_feature(feature)?;
            if let Resolution::Resolved(parent_id) = resolution {
                self.store
                    .update(feature.key(), FeatureUpdate::parent(parent_id))
                    .map_err(ResolveError::store(Pass::Parents))?;
            }
            report.record(resolution);
        }
        debug!(
            "{kind}: {} examined, {} resolved",
            report.examined, report.resolved
        );
        Ok(report)
    }

    /// Decide the parent of one feature without writing it.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Store`] when the containment query fails.
    pub fn resolve_feature(&self, feature: &Feature) -> Result<Resolution, ResolveError> {
        let key = feature.key();
        let Some(point) = feature.representative_point() else {
            warn!("skipping {key}: no usable center or geometry");
            return Ok(Resolution::Malformed);
        };
        let containing = self
            .store
            .query_containing_polygons(point)
            .map_err(ResolveError::store(Pass::Parents))?;
        let candidates = containing
            .iter()
            .filter(|polygon| polygon.key() != key && may_enclose(polygon, feature))
            .map(ParentCandidate::from_feature);
        match select_parent(feature.place_rank, candidates) {
            Some(parent) => {
                debug!("{key}: parent polygon#{}", parent.id);
                Ok(Resolution::Resolved(parent.id))
            }
            None => {
                debug!("{key}: no qualifying parent among {} polygons", containing.len());
                Ok(Resolution::Unmatched)
            }
        }
    }
}

/// Whether `polygon` may sit above `feature` without closing a cycle.
///
/// An unranked polygon nests under an unranked polygon only when that one is
/// larger, with equal areas ordered by id. Ranked parents always descend in
/// rank, so every parent chain terminates.
fn may_enclose(polygon: &Feature, feature: &Feature) -> bool {
    if feature.kind != FeatureKind::Polygon || feature.place_rank.is_some() {
        return true;
    }
    if polygon.place_rank.is_some() {
        return true;
    }
    polygon
        .area()
        .total_cmp(&feature.area())
        .then_with(|| polygon.id.cmp(&feature.id))
        .is_gt()
}
