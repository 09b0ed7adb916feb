//! Place hierarchy passes over a [`SpatialStore`](placetree_core::SpatialStore).
//!
//! [`ParentResolver`] gives every feature without a parent the containing
//! polygon with the nearest broader rank. [`LinkResolver`] records the label
//! and admin centre members of each relation on the relation's polygon and
//! flags the matching points as linked.
//!
//! The passes write disjoint columns and may run in either order. Both are
//! idempotent: rerunning a finished or interrupted pass only completes the
//! work still outstanding.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
mod links;
mod parents;

pub use error::{Pass, ResolveError};
pub use links::{LinkPlan, LinkReport, LinkResolver, MembersAttached};
pub use parents::{
    ParentCandidate, ParentReport, ParentResolver, ParentResolverConfig, Resolution, select_parent,
};
