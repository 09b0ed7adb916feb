//! Errors raised by the hierarchy passes.

use std::fmt;

use placetree_core::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Pass that was running when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pass {
    /// Parent resolution.
    Parents,
    /// Linked places resolution.
    Links,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Parents => "parent resolution",
            Self::Links => "link resolution",
        })
    }
}

/// Errors returned by [`ParentResolver`](crate::ParentResolver) and
/// [`LinkResolver`](crate::LinkResolver).
///
/// Store failures are fatal for the running pass. Rows already written stay
/// written; rerunning the pass picks up where it stopped.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The spatial store failed a read or write.
    #[error("{pass} aborted: {source}")]
    Store {
        /// Pass that was running.
        pass: Pass,
        /// Store failure.
        #[source]
        source: StoreError,
    },
}

impl ResolveError {
    pub(crate) fn store(pass: Pass) -> impl Fn(StoreError) -> Self {
        move |source| Self::Store { pass, source }
    }

    /// Pass that failed.
    #[must_use]
    pub const fn pass(&self) -> Pass {
        match self {
            Self::Store { pass, .. } => *pass,
        }
    }
}
