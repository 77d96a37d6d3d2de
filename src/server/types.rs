use serde::{Deserialize, Serialize};

use crate::feed::FeedPage;
use crate::store::SiteMessage;
use crate::title::AllocatorState;

pub(crate) const DEFAULT_PREVIEW_LIMIT: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FeedQueryParams {
    pub page: Option<String>,
}

impl FeedQueryParams {
    /// Anything that is not a positive integer means the first page.
    pub(crate) fn page(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|page| page.trim().parse::<usize>().ok())
            .filter(|page| *page >= 1)
            .unwrap_or(1)
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PreviewQueryParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RebaseTitles {
    pub prefix: String,
    pub counter: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateMessage {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct FeedResponse {
    #[serde(flatten)]
    pub page: FeedPage,
    pub message: Option<SiteMessage>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NextTitle {
    pub title: String,
    #[serde(flatten)]
    pub state: AllocatorState,
}
