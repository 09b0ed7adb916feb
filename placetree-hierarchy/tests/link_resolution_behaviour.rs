//! Behavioural coverage for linked places resolution.

use std::cell::RefCell;

use placetree_core::test_support::{located, region};
use placetree_core::{FeatureKey, FeatureKind, MemberType, MemoryStore, RelationMember};
use placetree_hierarchy::{LinkReport, LinkResolver};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

/// Store the scenario builds up.
#[fixture]
pub fn store() -> RefCell<MemoryStore> {
    RefCell::new(MemoryStore::default())
}

/// Report returned by the last pass.
#[fixture]
pub fn report() -> RefCell<Option<LinkReport>> {
    RefCell::new(None)
}

fn recorded(report: &RefCell<Option<LinkReport>>) -> LinkReport {
    let Some(outcome) = *report.borrow() else {
        panic!("links must be resolved first");
    };
    outcome
}

fn point_linked(store: &RefCell<MemoryStore>, id: u64) -> bool {
    let binding = store.borrow();
    let Some(point) = binding.feature(FeatureKey::new(FeatureKind::Point, id)) else {
        panic!("point {id} should exist");
    };
    point.linked
}

fn linked_ids(store: &RefCell<MemoryStore>, id: u64) -> Vec<i64> {
    let binding = store.borrow();
    let Some(polygon) = binding.feature(FeatureKey::polygon(id)) else {
        panic!("polygon {id} should exist");
    };
    polygon.linked_osm_ids.iter().collect()
}

#[given("polygon {id:u64} represents relation {osm_id:i64}")]
fn relation_polygon(store: &RefCell<MemoryStore>, id: u64, osm_id: i64) {
    store
        .borrow_mut()
        .insert_feature(region(id, osm_id, Some(8), 0.0, 4.0));
}

#[given("polygon {id:u64} represents relation {osm_id:i64} and already lists {linked:i64}")]
fn linked_polygon(store: &RefCell<MemoryStore>, id: u64, osm_id: i64, linked: i64) {
    store
        .borrow_mut()
        .insert_feature(region(id, osm_id, Some(8), 0.0, 4.0).with_linked_osm_ids([linked]));
}

#[given("relation {osm_id:i64} has node member {member_id:i64} with role \"{role}\"")]
fn node_member(store: &RefCell<MemoryStore>, osm_id: i64, member_id: i64, role: String) {
    store
        .borrow_mut()
        .insert_member(RelationMember::new(osm_id, member_id, MemberType::Node, role));
}

#[given("point {id:u64} has osm id {osm_id:i64}")]
fn point_with_osm_id(store: &RefCell<MemoryStore>, id: u64, osm_id: i64) {
    store
        .borrow_mut()
        .insert_feature(located(FeatureKind::Point, id, osm_id, None, 1.0, 1.0));
}

#[when("links are resolved")]
fn resolve(store: &RefCell<MemoryStore>, report: &RefCell<Option<LinkReport>>) {
    let mut binding = store.borrow_mut();
    let mut resolver = LinkResolver::new(&mut *binding);
    let outcome = resolver
        .resolve_links()
        .unwrap_or_else(|err| panic!("link resolution failed: {err}"));
    *report.borrow_mut() = Some(outcome);
}

#[then("polygon {id:u64} lists the linked osm ids {expected:i64}")]
fn lists_linked_id(store: &RefCell<MemoryStore>, id: u64, expected: i64) {
    assert_eq!(linked_ids(store, id), vec![expected]);
}

#[then("polygon {id:u64} lists no linked osm ids")]
fn lists_nothing(store: &RefCell<MemoryStore>, id: u64) {
    assert!(linked_ids(store, id).is_empty());
}

#[then("point {id:u64} is linked")]
fn is_linked(store: &RefCell<MemoryStore>, id: u64) {
    assert!(point_linked(store, id));
}

#[then("point {id:u64} is not linked")]
fn is_not_linked(store: &RefCell<MemoryStore>, id: u64) {
    assert!(!point_linked(store, id));
}

#[then("the link report counts {ignored:usize} ignored members")]
fn counts_ignored(report: &RefCell<Option<LinkReport>>, ignored: usize) {
    assert_eq!(recorded(report).members_ignored, ignored);
}

#[then("the link report counts {missing:usize} relations without a polygon")]
fn counts_missing_polygons(report: &RefCell<Option<LinkReport>>, missing: usize) {
    assert_eq!(recorded(report).relations_without_polygon, missing);
}

#[scenario(path = "tests/features/link_resolution.feature", index = 0)]
fn label_member_is_recorded(store: RefCell<MemoryStore>, report: RefCell<Option<LinkReport>>) {
    let _ = (store, report);
}

#[scenario(path = "tests/features/link_resolution.feature", index = 1)]
fn admin_centre_member_is_recorded(
    store: RefCell<MemoryStore>,
    report: RefCell<Option<LinkReport>>,
) {
    let _ = (store, report);
}

#[scenario(path = "tests/features/link_resolution.feature", index = 2)]
fn other_roles_are_ignored(store: RefCell<MemoryStore>, report: RefCell<Option<LinkReport>>) {
    let _ = (store, report);
}

#[scenario(path = "tests/features/link_resolution.feature", index = 3)]
fn named_point_is_linked(store: RefCell<MemoryStore>, report: RefCell<Option<LinkReport>>) {
    let _ = (store, report);
}

#[scenario(path = "tests/features/link_resolution.feature", index = 4)]
fn members_without_polygon_change_nothing(
    store: RefCell<MemoryStore>,
    report: RefCell<Option<LinkReport>>,
) {
    let _ = (store, report);
}
