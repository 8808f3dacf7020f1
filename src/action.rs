use std::{
    fmt::{Debug, Display},
    sync::atomic::{AtomicU64, Ordering},
};

use crate::Timestamp;

/// What happened to a record, as seen by a subscriber.
///
/// The tag, not the record position alone, decides how far a subscriber
/// must re-derive its own cache.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum Action {
    /// Appended after the current tail.
    AddNew,
    /// Inserted strictly before the current tail (late arrival).
    AddOld,
    /// Replaced at an existing timestamp with a different value.
    Update,
    /// Removed at an existing timestamp.
    Delete,
    /// Every position at or after the timestamp may have changed, including
    /// the number of records. Produced by manual rebuilds.
    Rebuild,
}

impl Action {
    /// `true` for actions that change the number or order of records.
    #[inline]
    #[must_use]
    pub fn is_structural(self) -> bool {
        !matches!(self, Self::Update)
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Identifies one cascade of notifications.
///
/// Every accepted provider mutation and every manual rebuild draws a fresh
/// revision, forwarded unchanged by each stage it reaches.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct Revision(u64);

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

impl Revision {
    pub(crate) fn next() -> Self {
        Self(NEXT_REVISION.fetch_add(1, Ordering::Relaxed))
    }
}

/// A single notification delivered to subscribers.
///
/// `index` and `timestamp` locate the record in the publisher's cache after
/// the mutation was applied; for [`Action::Delete`] they describe the
/// removed record.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Mutation {
    pub action: Action,
    pub index: usize,
    pub timestamp: Timestamp,
    pub revision: Revision,
    /// First position of the publisher's cache re-derived in this cascade,
    /// never after `index`.
    pub from: usize,
}

impl Mutation {
    pub(crate) fn new(
        action: Action,
        index: usize,
        timestamp: Timestamp,
        revision: Revision,
    ) -> Self {
        Self {
            action,
            index,
            timestamp,
            revision,
            from: index,
        }
    }

    /// Marks every position from `from` as re-derived in this cascade.
    #[must_use]
    pub(crate) fn re_derived_from(self, from: usize) -> Self {
        Self {
            from: from.min(self.index),
            ..self
        }
    }
}

impl Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(t={}, #{})", self.action, self.timestamp, self.index)
    }
}
