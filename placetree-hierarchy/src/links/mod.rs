//! Linked places resolution.
//!
//! Relation members with a `label` or `admin_center` role are aliases of the
//! relation's polygon. Stage A records each alias osm id on the polygon;
//! stage B flags the point rows carrying one of those ids so consumers can
//! drop the duplicate.

use std::collections::BTreeMap;

use log::{debug, info};
use placetree_core::{
    ArrayColumn, FeatureUpdate, LinkedOsmIds, OsmId, RelationMember, SpatialStore,
};
use serde::Serialize;

use crate::error::{Pass, ResolveError};

/// Alias ids to attach, keyed by owning relation osm id.
///
/// Plans built over separate slices of the member list combine with
/// [`merge`](Self::merge), a set union, so the order of combination does not
/// matter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPlan {
    attachments: BTreeMap<OsmId, LinkedOsmIds>,
    members_seen: usize,
    members_ignored: usize,
}

impl LinkPlan {
    /// Fold members into a plan.
    pub fn build<'a, I>(members: I) -> Self
    where
        I: IntoIterator<Item = &'a RelationMember>,
    {
        let mut plan = Self::default();
        for member in members {
            plan.add(member);
        }
        plan
    }

    /// Record one member. Returns `false` when its role is not a link role.
    pub fn add(&mut self, member: &RelationMember) -> bool {
        self.members_seen += 1;
        if member.link_role().is_none() {
            self.members_ignored += 1;
            return false;
        }
        self.attachments
            .entry(member.osm_id)
            .or_default()
            .insert(member.member_id);
        true
    }

    /// Union `other` into `self`.
    pub fn merge(&mut self, other: Self) {
        self.members_seen += other.members_seen;
        self.members_ignored += other.members_ignored;
        for (relation, ids) in other.attachments {
            self.attachments.entry(relation).or_default().merge(&ids);
        }
    }

    /// Alias ids planned for the relation `osm_id`.
    #[must_use]
    pub fn ids_for(&self, osm_id: OsmId) -> Option<&LinkedOsmIds> {
        self.attachments.get(&osm_id)
    }

    /// Relations with at least one alias, ascending by osm id.
    pub fn relations(&self) -> impl Iterator<Item = (OsmId, &LinkedOsmIds)> + '_ {
        self.attachments.iter().map(|(osm_id, ids)| (*osm_id, ids))
    }

    /// Whether the plan attaches nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    /// Members folded into the plan.
    #[must_use]
    pub const fn members_seen(&self) -> usize {
        self.members_seen
    }

    /// Members dropped for an unrecognised role.
    #[must_use]
    pub const fn members_ignored(&self) -> usize {
        self.members_ignored
    }
}

/// Proof that stage A finished; required to start stage B.
///
/// Only [`LinkResolver::attach_members`] and [`LinkResolver::apply_plan`]
/// produce it.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "pass the token to LinkResolver::flag_linked_points"]
pub struct MembersAttached {
    report: LinkReport,
}

impl MembersAttached {
    /// Stage A counters; `points_linked` is still zero.
    pub const fn report(&self) -> &LinkReport {
        &self.report
    }
}

/// Counters reported by [`LinkResolver::resolve_links`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    /// Relation members read.
    pub members_seen: usize,
    /// Members ignored for an unrecognised role.
    pub members_ignored: usize,
    /// Relations with link members but no polygon row.
    pub relations_without_polygon: usize,
    /// Osm ids newly added to a polygon's `linked_osm_ids`.
    pub ids_added: usize,
    /// Points newly flagged as linked.
    pub points_linked: usize,
}

/// Cross-links relation polygons with their label and admin centre members.
///
/// # Examples
/// ```
/// use geo::polygon;
/// use placetree_core::{
///     Feature, FeatureKey, FeatureKind, MemberType, MemoryStore, RelationMember,
/// };
/// use placetree_hierarchy::LinkResolver;
///
/// let store = MemoryStore::with_features([
///     Feature::new(FeatureKind::Polygon, 1, 1337)
///         .with_geometry(polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0)]),
///     Feature::new(FeatureKind::Point, 1, 43),
/// ])
/// .with_members([RelationMember::new(1337, 43, MemberType::Node, "label")]);
///
/// let mut resolver = LinkResolver::new(store);
/// let token = resolver.attach_members().expect("stage A");
/// let report = resolver.flag_linked_points(token).expect("stage B");
/// assert_eq!((report.ids_added, report.points_linked), (1, 1));
///
/// let store = resolver.into_store();
/// let point = store.feature(FeatureKey::new(FeatureKind::Point, 1));
/// assert!(point.is_some_and(|row| row.linked));
/// ```
#[derive(Debug)]
pub struct LinkResolver<S> {
    store: S,
}

impl<S> LinkResolver<S>
where
    S: SpatialStore,
{
    /// Construct a resolver over `store`.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Release the underlying store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Run stage A then stage B.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Store`] when the store fails.
    pub fn resolve_links(&mut self) -> Result<LinkReport, ResolveError> {
        let attached = self.attach_members()?;
        let report = self.flag_linked_points(attached)?;
        info!(
            "link resolution finished: {} members, {} ignored, {} relations without polygon, \
             {} ids added, {} points linked",
            report.members_seen,
            report.members_ignored,
            report.relations_without_polygon,
            report.ids_added,
            report.points_linked
        );
        Ok(report)
    }

    /// Stage A: plan from every stored relation member and apply the plan.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Store`] when the store fails.
    pub fn attach_members(&mut self) -> Result<MembersAttached, ResolveError> {
        let members = self
            .store
            .relation_members()
            .map_err(ResolveError::store(Pass::Links))?;
        self.apply_plan(&LinkPlan::build(&members))
    }

    /// Stage A with a caller-built plan, e.g. one merged from partitions.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Store`] when the store fails.
    pub fn apply_plan(&mut self, plan: &LinkPlan) -> Result<MembersAttached, ResolveError> {
        let mut report = LinkReport {
            members_seen: plan.members_seen(),
            members_ignored: plan.members_ignored(),
            ..LinkReport::default()
        };
        for (relation, ids) in plan.relations() {
            let polygons = self
                .store
                .polygons_with_osm_id(relation)
                .map_err(ResolveError::store(Pass::Links))?;
            if polygons.is_empty() {
                debug!("relation {relation} has no polygon; ignoring {} members", ids.len());
                report.relations_without_polygon += 1;
                continue;
            }
            for key in polygons {
                for id in ids.iter() {
                    let added = self
                        .store
                        .array_append_unique(key, ArrayColumn::LinkedOsmIds, id)
                        .map_err(ResolveError::store(Pass::Links))?;
                    if added {
                        debug!("{key}: linked osm id {id}");
                        report.ids_added += 1;
                    }
                }
            }
        }
        Ok(MembersAttached { report })
    }

    /// Stage B: flag every unlinked point whose osm id a polygon lists.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Store`] when the store fails.
    pub fn flag_linked_points(
        &mut self,
        attached: MembersAttached,
    ) -> Result<LinkReport, ResolveError> {
        let mut report = attached.report;
        let linked_ids = self
            .store
            .linked_osm_id_union()
            .map_err(ResolveError::store(Pass::Links))?;
        if linked_ids.is_empty() {
            return Ok(report);
        }
        let points = self
            .store
            .unlinked_points()
            .map_err(ResolveError::store(Pass::Links))?;
        for point in points.iter().filter(|point| linked_ids.contains(point.osm_id)) {
            self.store
                .update(point.key(), FeatureUpdate::linked())
                .map_err(ResolveError::store(Pass::Links))?;
            debug!("{}: linked", point.key());
            report.points_linked += 1;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use placetree_core::test_support::{located, region};
    use placetree_core::{FeatureKey, FeatureKind, MemberType, MemoryStore};
    use rstest::{fixture, rstest};

    fn member(osm_id: OsmId, member_id: OsmId, role: &str) -> RelationMember {
        RelationMember::new(osm_id, member_id, MemberType::Node, role)
    }

    #[fixture]
    fn relation_store() -> MemoryStore {
        MemoryStore::with_features([
            region(1, 1337, Some(8), 0.0, 10.0),
            region(2, 2000, Some(12), 0.0, 5.0),
            located(FeatureKind::Point, 1, 43, Some(8), 5.0, 5.0),
            located(FeatureKind::Point, 2, 44, Some(12), 1.0, 1.0),
            located(FeatureKind::Point, 3, 45, None, 2.0, 2.0),
        ])
        .with_members([
            member(1337, 43, "label"),
            member(2000, 44, "admin_center"),
            member(1337, 45, "outer"),
            member(9999, 46, "label"),
        ])
    }

    #[rstest]
    fn plan_keeps_link_roles_only() {
        let members = [member(1, 10, "label"), member(1, 11, "inner"), member(2, 12, "admin_center")];
        let plan = LinkPlan::build(&members);
        assert_eq!(plan.members_seen(), 3);
        assert_eq!(plan.members_ignored(), 1);
        assert_eq!(
            plan.ids_for(1).map(|ids| ids.iter().collect::<Vec<_>>()),
            Some(vec![10])
        );
        assert_eq!(plan.relations().count(), 2);
    }

    #[rstest]
    fn merged_partitions_equal_the_whole() {
        let members = [
            member(1, 10, "label"),
            member(1, 11, "admin_center"),
            member(2, 12, "label"),
            member(1, 10, "label"),
        ];
        let whole = LinkPlan::build(&members);
        let (left, right) = members.split_at(2);
        let mut forward = LinkPlan::build(left);
        forward.merge(LinkPlan::build(right));
        let mut backward = LinkPlan::build(right);
        backward.merge(LinkPlan::build(left));

        assert_eq!(forward, whole);
        assert_eq!(backward, whole);
    }

    #[rstest]
    fn resolves_both_stages(relation_store: MemoryStore) {
        let mut resolver = LinkResolver::new(relation_store);
        let report = resolver.resolve_links().expect("resolve links");
        assert_eq!(
            report,
            LinkReport {
                members_seen: 4,
                members_ignored: 1,
                relations_without_polygon: 1,
                ids_added: 2,
                points_linked: 2,
            }
        );

        let store = resolver.into_store();
        let polygon = store.feature(FeatureKey::polygon(1)).expect("polygon row");
        assert_eq!(polygon.linked_osm_ids.iter().collect::<Vec<_>>(), vec![43]);
        let point = |id| store.feature(FeatureKey::new(FeatureKind::Point, id)).map(|row| row.linked);
        assert_eq!(point(1), Some(true));
        assert_eq!(point(2), Some(true));
        assert_eq!(point(3), Some(false));
    }

    #[rstest]
    fn rerun_adds_nothing(relation_store: MemoryStore) {
        let mut resolver = LinkResolver::new(relation_store);
        resolver.resolve_links().expect("first run");
        let second = resolver.resolve_links().expect("second run");
        assert_eq!((second.ids_added, second.points_linked), (0, 0));
    }

    #[rstest]
    fn stage_a_report_is_carried_into_stage_b(relation_store: MemoryStore) {
        let mut resolver = LinkResolver::new(relation_store);
        let attached = resolver.attach_members().expect("stage A");
        assert_eq!(attached.report().ids_added, 2);
        assert_eq!(attached.report().points_linked, 0);
        let report = resolver.flag_linked_points(attached).expect("stage B");
        assert_eq!(report.ids_added, 2);
    }

    #[rstest]
    fn preexisting_links_flag_points_without_members() {
        let store = MemoryStore::with_features([
            region(1, 1, None, 0.0, 4.0).with_linked_osm_ids([1337]),
            located(FeatureKind::Point, 1, 1337, None, 2.0, 2.0),
        ]);
        let mut resolver = LinkResolver::new(store);
        let report = resolver.resolve_links().expect("resolve links");
        assert_eq!(report.points_linked, 1);
        assert_eq!(report.ids_added, 0);
    }
}
