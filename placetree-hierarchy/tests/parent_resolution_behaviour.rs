//! Behavioural coverage for parent resolution.

use std::cell::RefCell;

use geo::Point;
use placetree_core::test_support::{located, region};
use placetree_core::{Feature, FeatureKey, FeatureKind, MemoryStore, PlaceRank};
use placetree_hierarchy::{ParentReport, ParentResolver};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

/// Store the scenario builds up.
#[fixture]
pub fn store() -> RefCell<MemoryStore> {
    RefCell::new(MemoryStore::default())
}

/// Report returned by the last pass.
#[fixture]
pub fn report() -> RefCell<Option<ParentReport>> {
    RefCell::new(None)
}

fn kind(name: &str) -> FeatureKind {
    name.parse()
        .unwrap_or_else(|err| panic!("scenario names an invalid kind: {err}"))
}

fn rank(value: u8) -> PlaceRank {
    PlaceRank::new(value).unwrap_or_else(|err| panic!("scenario rank: {err}"))
}

fn parent_of(store: &RefCell<MemoryStore>, key: FeatureKey) -> Option<u64> {
    let binding = store.borrow();
    let Some(feature) = binding.feature(key) else {
        panic!("{key} should exist");
    };
    feature.parent_id
}

#[given("polygon {id:u64} with rank {value:u8} spans {min:f64} to {max:f64}")]
fn ranked_polygon(store: &RefCell<MemoryStore>, id: u64, value: u8, min: f64, max: f64) {
    store
        .borrow_mut()
        .insert_feature(region(id, 1000 + i64::from(value), Some(value), min, max));
}

#[given("unranked polygon {id:u64} spans {min:f64} to {max:f64}")]
fn unranked_polygon(store: &RefCell<MemoryStore>, id: u64, min: f64, max: f64) {
    store
        .borrow_mut()
        .insert_feature(region(id, 2000, None, min, max));
}

#[given("{name} {id:u64} with rank {value:u8} is centred at {x:f64} {y:f64}")]
fn ranked_centre(store: &RefCell<MemoryStore>, name: String, id: u64, value: u8, x: f64, y: f64) {
    store
        .borrow_mut()
        .insert_feature(located(kind(&name), id, 3000, Some(value), x, y));
}

#[given("unranked {name} {id:u64} is centred at {x:f64} {y:f64}")]
fn unranked_centre(store: &RefCell<MemoryStore>, name: String, id: u64, x: f64, y: f64) {
    store
        .borrow_mut()
        .insert_feature(located(kind(&name), id, 4000, None, x, y));
}

#[given("point {id:u64} with rank {value:u8} has geometry at {x:f64} {y:f64}")]
fn point_geometry(store: &RefCell<MemoryStore>, id: u64, value: u8, x: f64, y: f64) {
    let feature = Feature::new(FeatureKind::Point, id, 5000)
        .with_place_rank(rank(value))
        .with_geometry(Point::new(x, y));
    store.borrow_mut().insert_feature(feature);
}

#[given("{name} {id:u64} has no location")]
fn without_location(store: &RefCell<MemoryStore>, name: String, id: u64) {
    store
        .borrow_mut()
        .insert_feature(Feature::new(kind(&name), id, 6000));
}

#[when("parents are resolved")]
fn resolve(store: &RefCell<MemoryStore>, report: &RefCell<Option<ParentReport>>) {
    let mut binding = store.borrow_mut();
    let mut resolver = ParentResolver::new(&mut *binding);
    let outcome = resolver
        .resolve_parents()
        .unwrap_or_else(|err| panic!("parent resolution failed: {err}"));
    *report.borrow_mut() = Some(outcome);
}

#[then("{name} {id:u64} has parent {parent:u64}")]
fn has_parent(store: &RefCell<MemoryStore>, name: String, id: u64, parent: u64) {
    let key = FeatureKey::new(kind(&name), id);
    assert_eq!(parent_of(store, key), Some(parent));
}

#[then("{name} {id:u64} has no parent")]
fn has_no_parent(store: &RefCell<MemoryStore>, name: String, id: u64) {
    let key = FeatureKey::new(kind(&name), id);
    assert_eq!(parent_of(store, key), None);
}

#[then("the report counts {malformed:usize} malformed")]
fn counts_malformed(report: &RefCell<Option<ParentReport>>, malformed: usize) {
    let Some(outcome) = *report.borrow() else {
        panic!("parents must be resolved first");
    };
    assert_eq!(outcome.malformed, malformed);
}

#[then("the report counts {resolved:usize} resolved and {unmatched:usize} unmatched")]
fn counts_outcomes(report: &RefCell<Option<ParentReport>>, resolved: usize, unmatched: usize) {
    let Some(outcome) = *report.borrow() else {
        panic!("parents must be resolved first");
    };
    assert_eq!((outcome.resolved, outcome.unmatched), (resolved, unmatched));
}

#[scenario(path = "tests/features/parent_resolution.feature", index = 0)]
fn unranked_polygon_attaches_to_cover(
    store: RefCell<MemoryStore>,
    report: RefCell<Option<ParentReport>>,
) {
    let _ = (store, report);
}

#[scenario(path = "tests/features/parent_resolution.feature", index = 1)]
fn ranked_polygon_attaches_to_nearest_rank(
    store: RefCell<MemoryStore>,
    report: RefCell<Option<ParentReport>>,
) {
    let _ = (store, report);
}

#[scenario(path = "tests/features/parent_resolution.feature", index = 2)]
fn narrower_cover_leaves_point_unparented(
    store: RefCell<MemoryStore>,
    report: RefCell<Option<ParentReport>>,
) {
    let _ = (store, report);
}

#[scenario(path = "tests/features/parent_resolution.feature", index = 3)]
fn streets_and_house_numbers_attach(
    store: RefCell<MemoryStore>,
    report: RefCell<Option<ParentReport>>,
) {
    let _ = (store, report);
}

#[scenario(path = "tests/features/parent_resolution.feature", index = 4)]
fn geometry_stands_in_for_center(
    store: RefCell<MemoryStore>,
    report: RefCell<Option<ParentReport>>,
) {
    let _ = (store, report);
}

#[scenario(path = "tests/features/parent_resolution.feature", index = 5)]
fn rows_without_location_are_malformed(
    store: RefCell<MemoryStore>,
    report: RefCell<Option<ParentReport>>,
) {
    let _ = (store, report);
}

#[scenario(path = "tests/features/parent_resolution.feature", index = 6)]
fn identical_unranked_polygons_nest_one_way(
    store: RefCell<MemoryStore>,
    report: RefCell<Option<ParentReport>>,
) {
    let _ = (store, report);
}
