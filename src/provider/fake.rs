use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::provider::{PlaylistMember, PlaylistProvider};

/// In-process provider for tests. Unknown playlists fail with NotFound,
/// playlists marked slow never answer in time.
pub(crate) struct FakeProvider {
    per_page: usize,
    playlists: HashMap<String, Vec<PlaylistMember>>,
    slow: HashSet<String>,
    requests: Mutex<Vec<(String, usize)>>,
}

impl FakeProvider {
    pub(crate) fn new() -> Self {
        Self {
            per_page: 50,
            playlists: HashMap::new(),
            slow: HashSet::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page;
        self
    }

    /// Register `id` with members `"{id}-1" .. "{id}-{count}"`.
    pub(crate) fn playlist(mut self, id: &str, count: usize) -> Self {
        let members = (1..=count)
            .map(|n| PlaylistMember {
                external_id: format!("{id}-{n}"),
                title: format!("{id} part {n}"),
            })
            .collect();
        self.playlists.insert(id.to_string(), members);
        self
    }

    pub(crate) fn slow(mut self, id: &str) -> Self {
        self.slow.insert(id.to_string());
        self
    }

    /// Every `(playlist_id, max_pages)` requested so far.
    pub(crate) fn requests(&self) -> Vec<(String, usize)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlaylistProvider for FakeProvider {
    fn members_per_page(&self) -> usize {
        self.per_page
    }

    async fn fetch_members(
        &self,
        playlist_id: &str,
        max_pages: usize,
    ) -> Result<Vec<PlaylistMember>, ProviderError> {
        self.requests
            .lock()
            .unwrap()
            .push((playlist_id.to_string(), max_pages));

        if self.slow.contains(playlist_id) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }

        let members = self
            .playlists
            .get(playlist_id)
            .ok_or_else(|| ProviderError::NotFound(playlist_id.to_string()))?;

        Ok(members
            .iter()
            .take(max_pages.saturating_mul(self.per_page))
            .cloned()
            .collect())
    }
}
