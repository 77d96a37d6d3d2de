//! Operator-facing operations: adding, listing and removing curated entries,
//! the site message and playlist previews.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::entry::{DisplayItem, Entry, EntryId, EntryKind, NewEntry, VisibilityWindow};
use crate::error::{Error, Result, ValidationError};
use crate::expand::{ExpansionDepth, PlaylistExpander};
use crate::provider::PlaylistProvider;
use crate::reference::parse_reference;
use crate::store::{AllocatorStore, EntryStore, MessageStore, SiteMessage};
use crate::title::TitleAllocator;

/// Input of the add-entry operation. Timestamps must carry an offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddEntry {
    pub title: String,
    /// A YouTube URL or bare id.
    pub reference: String,
    pub kind: EntryKind,
    #[serde(default)]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddedEntry {
    pub entry: Entry,
    pub title_advanced: bool,
}

pub struct Curator<S, P> {
    store: Arc<S>,
    allocator: TitleAllocator<S>,
    expander: PlaylistExpander<P>,
}

impl<S, P> Clone for Curator<S, P> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            allocator: self.allocator.clone(),
            expander: self.expander.clone(),
        }
    }
}

/// Delete every entry whose title starts with `prefix`.
///
/// Only needs the entry store, so the CLI can clean up without a provider.
pub fn purge<S: EntryStore>(store: &S, prefix: &str) -> Result<usize> {
    if prefix.is_empty() {
        return Err(ValidationError::EmptyPrefix.into());
    }

    let removed = store.delete_by_title_prefix(prefix)?;
    info!(removed, "purged entries");

    Ok(removed)
}

impl<S, P> Curator<S, P>
where
    S: EntryStore + AllocatorStore + MessageStore,
    P: PlaylistProvider,
{
    pub fn new(store: Arc<S>, allocator: TitleAllocator<S>, expander: PlaylistExpander<P>) -> Self {
        Self {
            store,
            allocator,
            expander,
        }
    }

    pub fn allocator(&self) -> &TitleAllocator<S> {
        &self.allocator
    }

    /// Validate, allocate a title, then store a new entry.
    ///
    /// Every validation rule is checked before the title counter can move, so a
    /// rejected request leaves no trace. Titles are stored trimmed, custom ones
    /// included.
    #[instrument(skip_all, fields(kind = ?request.kind))]
    pub fn add_entry(&self, request: AddEntry) -> Result<AddedEntry> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }

        let external_id = parse_reference(&request.reference, request.kind)?;
        let window = VisibilityWindow::new(request.scheduled_start, request.scheduled_expiry)?;

        let allocation = self.allocator.suggest_and_maybe_advance(title)?;

        let inserted = self.store.insert(NewEntry {
            title: allocation.title,
            external_id,
            kind: request.kind,
            added_at: Utc::now(),
            window,
        });

        let entry = match inserted {
            Ok(entry) => entry,
            Err(e) => {
                if allocation.advanced {
                    warn!(error = %e, "title counter advanced but entry insert failed");
                }
                return Err(e.into());
            }
        };

        info!(entry_id = %entry.id, title = %entry.title, external_id = %entry.external_id, "added entry");

        Ok(AddedEntry {
            entry,
            title_advanced: allocation.advanced,
        })
    }

    /// All entries, newest first.
    pub fn list_entries(&self) -> Result<Vec<Entry>> {
        let mut entries = self.store.list_all()?;
        entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));

        Ok(entries)
    }

    #[instrument(skip(self))]
    pub fn delete_entry(&self, id: EntryId) -> Result<()> {
        if !self.store.delete_by_id(id)? {
            return Err(Error::NotFound(id));
        }

        info!(entry_id = %id, "deleted entry");
        Ok(())
    }

    /// Delete every entry whose title starts with `prefix`.
    #[instrument(skip(self))]
    pub fn purge(&self, prefix: &str) -> Result<usize> {
        purge(self.store.as_ref(), prefix)
    }

    pub fn message(&self) -> Result<Option<SiteMessage>> {
        Ok(self.store.current()?)
    }

    pub fn set_message(&self, content: &str) -> Result<SiteMessage> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }

        let message = SiteMessage {
            content: content.to_string(),
            updated_at: Utc::now(),
        };
        self.store.set(message.clone())?;
        info!("updated site message");

        Ok(message)
    }

    /// The first `limit` members of a playlist entry, regardless of its
    /// schedule.
    pub async fn preview(&self, id: EntryId, limit: usize) -> Result<Vec<DisplayItem>> {
        let entry = self.store.get(id)?.ok_or(Error::NotFound(id))?;
        if entry.kind != EntryKind::Playlist {
            return Err(Error::NotAPlaylist(id));
        }

        Ok(self
            .expander
            .expand_with_depth(&entry, ExpansionDepth::Preview(limit))
            .await)
    }
}
