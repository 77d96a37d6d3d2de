//! Persistence contracts the curation logic depends on.
//!
//! Implementations own all query semantics (ordering, upserts, atomic
//! swaps). Callers only ever see plain value records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entry::{Entry, EntryId, NewEntry};
use crate::error::StoreError;
use crate::title::AllocatorState;

pub trait EntryStore: Send + Sync {
    /// Every stored entry, in insertion order.
    fn list_all(&self) -> Result<Vec<Entry>, StoreError>;

    fn get(&self, id: EntryId) -> Result<Option<Entry>, StoreError>;

    fn insert(&self, entry: NewEntry) -> Result<Entry, StoreError>;

    /// Returns `false` when no entry had this id.
    fn delete_by_id(&self, id: EntryId) -> Result<bool, StoreError>;

    /// Remove every entry whose title starts with `prefix`, returning how many
    /// were removed.
    fn delete_by_title_prefix(&self, prefix: &str) -> Result<usize, StoreError>;
}

pub trait AllocatorStore: Send + Sync {
    /// Current allocator state, created with defaults on first access.
    fn load(&self) -> Result<AllocatorState, StoreError>;

    /// Atomically replace the state with `new_state` iff it still equals
    /// `expected`. Returns whether the swap happened.
    fn compare_and_swap(
        &self,
        expected: &AllocatorState,
        new_state: &AllocatorState,
    ) -> Result<bool, StoreError>;
}

/// The site-wide banner shown above the feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteMessage {
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

pub trait MessageStore: Send + Sync {
    fn current(&self) -> Result<Option<SiteMessage>, StoreError>;

    fn set(&self, message: SiteMessage) -> Result<(), StoreError>;
}
