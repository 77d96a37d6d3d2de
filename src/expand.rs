use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::entry::{DisplayItem, Entry, EntryKind};
use crate::error::ProviderError;
use crate::provider::PlaylistProvider;

pub const DEFAULT_EXPANSION_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_PAGES: usize = 20;

/// How much of a playlist to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionDepth {
    /// Every member, up to the expander's page limit.
    Full,
    /// Only the first `n` members.
    Preview(usize),
}

/// Turns playlist entries into one [DisplayItem] per member video.
///
/// A playlist that cannot be fetched in time degrades to a single item
/// pointing at the playlist itself.
pub struct PlaylistExpander<P> {
    provider: Arc<P>,
    timeout: Duration,
    max_pages: usize,
}

impl<P> Clone for PlaylistExpander<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            timeout: self.timeout,
            max_pages: self.max_pages,
        }
    }
}

impl<P: PlaylistProvider> PlaylistExpander<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_EXPANSION_TIMEOUT,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;

        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);

        self
    }

    pub async fn expand(&self, entry: &Entry) -> Vec<DisplayItem> {
        self.expand_with_depth(entry, ExpansionDepth::Full).await
    }

    pub async fn expand_with_depth(&self, entry: &Entry, depth: ExpansionDepth) -> Vec<DisplayItem> {
        if entry.kind == EntryKind::Video {
            return vec![DisplayItem::from_entry(entry)];
        }

        match self.fetch(entry, depth).await {
            Ok(items) => items,
            Err(e) => {
                warn!(
                    entry_id = %entry.id,
                    playlist = %entry.external_id,
                    error = %e,
                    "playlist expansion failed, showing playlist link instead"
                );
                vec![DisplayItem::from_entry(entry)]
            }
        }
    }

    async fn fetch(
        &self,
        entry: &Entry,
        depth: ExpansionDepth,
    ) -> Result<Vec<DisplayItem>, ProviderError> {
        let (pages, limit) = match depth {
            ExpansionDepth::Full => (self.max_pages, usize::MAX),
            ExpansionDepth::Preview(n) => {
                let per_page = self.provider.members_per_page().max(1);
                (n.div_ceil(per_page).clamp(1, self.max_pages), n)
            }
        };

        let members = tokio::time::timeout(
            self.timeout,
            self.provider.fetch_members(&entry.external_id, pages),
        )
        .await
        .map_err(|_| ProviderError::Timeout(self.timeout))??;

        debug!(entry_id = %entry.id, members = members.len(), "expanded playlist");

        Ok(members
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(position, member)| DisplayItem {
                entry_id: entry.id,
                external_id: member.external_id,
                title: member.title,
                kind: EntryKind::Video,
                window: entry.window,
                position: Some(position),
            })
            .collect())
    }
}
