use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

pub mod youtube;

#[cfg(test)]
pub(crate) mod fake;

/// A single video inside an external playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistMember {
    pub external_id: String,
    pub title: String,
}

/// Source of playlist membership. Implementations only read.
#[async_trait]
pub trait PlaylistProvider: Send + Sync {
    /// How many members one provider page holds.
    fn members_per_page(&self) -> usize;

    /// Fetch the members of `playlist_id`, following at most `max_pages`
    /// provider pages.
    async fn fetch_members(
        &self,
        playlist_id: &str,
        max_pages: usize,
    ) -> Result<Vec<PlaylistMember>, ProviderError>;
}
