//! Canonical collection and the reconciliation engine that owns it.
//!
//! The engine is the only writer of a view's collection. Every change,
//! whether it came from a page fetch, a stream event or an optimistic edit,
//! funnels through [`ReconciliationEngine::apply`] or
//! [`ReconciliationEngine::seed`].

use std::collections::HashMap;

use tracing::debug;

use crate::model::Record;

/// A change to a single record, as produced by the event decoder.
///
/// Every create/update-family wire event carries a full snapshot, so the
/// engine only needs these three operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<R> {
    Created(R),
    Updated(R),
    Deleted {
        id: String,
        /// Final snapshot, when the payload carried one
        record: Option<R>,
    },
}

impl<R: Record> Change<R> {
    /// Identifier the change targets.
    pub fn id(&self) -> &str {
        match self {
            Self::Created(record) | Self::Updated(record) => record.id(),
            Self::Deleted { id, .. } => id,
        }
    }
}

/// Outcome of applying a change.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied<R> {
    /// The id was not present and now is.
    Inserted,
    /// The id was present; holds the overwritten value.
    Replaced(R),
    /// The id was removed; holds the removed value.
    Removed(R),
    /// Deletion of an id that was not present.
    Absent,
}

/// Owner of a canonical `id -> record` collection.
#[derive(Debug, Clone)]
pub struct ReconciliationEngine<R> {
    records: HashMap<String, R>,
    revision: u64,
}

impl<R: Record> Default for ReconciliationEngine<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> ReconciliationEngine<R> {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            revision: 0,
        }
    }

    /// Replace the whole collection with a freshly fetched set.
    ///
    /// Nothing from the previous contents survives, so records from an
    /// earlier page or filter cannot leak into the new view.
    pub fn seed<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = R>,
    {
        self.records = records
            .into_iter()
            .map(|record| (record.id().to_string(), record))
            .collect();
        self.revision += 1;
        debug!(entity = R::ENTITY, count = self.records.len(), "Seeded collection");
    }

    /// Apply one change.
    ///
    /// Creates and updates overwrite unconditionally (last applied wins);
    /// deleting a missing id is a no-op. Idempotent per event.
    pub fn apply(&mut self, change: Change<R>) -> Applied<R> {
        let applied = match change {
            Change::Created(record) | Change::Updated(record) => self.insert(record),
            Change::Deleted { id, .. } => self.take(&id),
        };
        self.revision += 1;
        applied
    }

    /// Upsert a full record.
    pub fn upsert(&mut self, record: R) -> Applied<R> {
        self.apply(Change::Updated(record))
    }

    /// Remove a record by id.
    pub fn remove(&mut self, id: &str) -> Applied<R> {
        self.apply(Change::Deleted {
            id: id.to_string(),
            record: None,
        })
    }

    fn insert(&mut self, record: R) -> Applied<R> {
        match self.records.insert(record.id().to_string(), record) {
            Some(previous) => Applied::Replaced(previous),
            None => Applied::Inserted,
        }
    }

    fn take(&mut self, id: &str) -> Applied<R> {
        self.records.remove(id).map_or(Applied::Absent, Applied::Removed)
    }

    /// Look up a record.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&R> {
        self.records.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over the current records (unordered).
    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.records.values()
    }

    /// Monotonic counter bumped on every write; a changed revision is the
    /// signal to re-derive the materialized view.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Drop all records (view teardown).
    pub fn clear(&mut self) {
        self.records.clear();
        self.revision += 1;
    }
}
