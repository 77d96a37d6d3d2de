use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::entry::{DisplayItem, Entry};
use crate::error::StoreError;
use crate::expand::PlaylistExpander;
use crate::provider::PlaylistProvider;
use crate::store::EntryStore;
use crate::visibility::is_visible;

pub const DEFAULT_PAGE_SIZE: usize = 5;

/// One page of the public feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedPage {
    pub items: Vec<DisplayItem>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Build one page of the feed from the full curated list.
///
/// Entries are ordered newest first, filtered against a single `now`,
/// expanded, flattened and only then paginated, so page boundaries fall on
/// displayed videos rather than on curated entries. `page` is 1-based; 0 is
/// treated as 1 and a page past the end comes back empty.
pub async fn assemble<P: PlaylistProvider>(
    expander: &PlaylistExpander<P>,
    mut entries: Vec<Entry>,
    now: DateTime<Utc>,
    page: usize,
    page_size: usize,
) -> FeedPage {
    let page = page.max(1);
    let page_size = page_size.max(1);

    // Stable, so entries added at the same instant keep insertion order.
    entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));

    let visible: Vec<&Entry> = entries.iter().filter(|e| is_visible(e, now)).collect();

    // Each expansion carries its own timeout; join_all keeps input order.
    let expanded = join_all(visible.iter().map(|entry| expander.expand(entry))).await;
    let items: Vec<DisplayItem> = expanded.into_iter().flatten().collect();

    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size);

    let start = (page - 1).saturating_mul(page_size);
    let items: Vec<DisplayItem> = items.into_iter().skip(start).take(page_size).collect();

    debug!(
        entries = entries.len(),
        visible = visible.len(),
        total_items,
        page,
        "assembled feed page"
    );

    FeedPage {
        items,
        page,
        page_size,
        total_items,
        total_pages,
    }
}

/// Serves feed pages straight from an entry store.
pub struct FeedAssembler<S, P> {
    store: Arc<S>,
    expander: PlaylistExpander<P>,
    page_size: usize,
}

impl<S, P> Clone for FeedAssembler<S, P> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            expander: self.expander.clone(),
            page_size: self.page_size,
        }
    }
}

impl<S: EntryStore, P: PlaylistProvider> FeedAssembler<S, P> {
    pub fn new(store: Arc<S>, expander: PlaylistExpander<P>) -> Self {
        Self {
            store,
            expander,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);

        self
    }

    #[instrument(skip(self))]
    pub async fn page(&self, page: usize) -> Result<FeedPage, StoreError> {
        self.page_at(page, Utc::now()).await
    }

    pub async fn page_at(&self, page: usize, now: DateTime<Utc>) -> Result<FeedPage, StoreError> {
        let entries = self.store.list_all()?;

        Ok(assemble(&self.expander, entries, now, page, self.page_size).await)
    }
}
