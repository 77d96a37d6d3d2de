use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::ProviderError;
use crate::provider::{PlaylistMember, PlaylistProvider};

/// Default YouTube Data API v3 base URL
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Largest `maxResults` the playlistItems endpoint accepts
pub const MAX_RESULTS_PER_PAGE: usize = 50;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Playlist provider backed by the YouTube Data API `playlistItems` endpoint.
#[derive(Debug, Clone)]
pub struct YouTubeProvider {
    client: Client,
    api_base: String,
    api_key: Option<String>,
}

pub struct YouTubeConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl YouTubeProvider {
    pub fn new(config: YouTubeConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("tubefeed/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client, config))
    }

    /// Build around an existing client, e.g. to share a connection pool.
    pub fn with_client(client: Client, config: YouTubeConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        }
    }

    async fn fetch_page(
        &self,
        api_key: &str,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage, ProviderError> {
        let max_results = MAX_RESULTS_PER_PAGE.to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("maxResults", max_results.as_str()),
            ("playlistId", playlist_id),
            ("key", api_key),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .client
            .get(format!("{}/playlistItems", self.api_base))
            .query(&query)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(playlist_id.to_string()));
        }

        response
            .error_for_status()?
            .json::<PlaylistItemsPage>()
            .await
            .map_err(|e| {
                if e.is_decode() {
                    ProviderError::Malformed(e.to_string())
                } else {
                    ProviderError::Http(e)
                }
            })
    }
}

#[async_trait]
impl PlaylistProvider for YouTubeProvider {
    fn members_per_page(&self) -> usize {
        MAX_RESULTS_PER_PAGE
    }

    #[instrument(skip(self))]
    async fn fetch_members(
        &self,
        playlist_id: &str,
        max_pages: usize,
    ) -> Result<Vec<PlaylistMember>, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;

        let mut members = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 0..max_pages {
            let items = self
                .fetch_page(api_key, playlist_id, page_token.as_deref())
                .await?;

            debug!(page, items = items.items.len(), "fetched playlist page");

            members.extend(items.items.into_iter().filter_map(|item| {
                let video_id = item.snippet.resource_id.video_id?;
                Some(PlaylistMember {
                    external_id: video_id,
                    title: item.snippet.title,
                })
            }));

            match items.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(members)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsPage {
    next_page_token: Option<String>,
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}
