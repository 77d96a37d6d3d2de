use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Stable identifier of a curated entry. Assigned by the store, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Video,
    Playlist,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Video => "video",
            EntryKind::Playlist => "playlist",
        }
    }
}

impl std::str::FromStr for EntryKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(EntryKind::Video),
            "playlist" => Ok(EntryKind::Playlist),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

/// Scheduling bounds for an entry. Either side may be open.
///
/// `starts_at` is inclusive, `expires_at` is exclusive. A window can only be
/// built through [VisibilityWindow::new], which rejects an expiry that is not
/// strictly after the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VisibilityWindow {
    starts_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
}

impl VisibilityWindow {
    pub fn new(
        starts_at: Option<DateTime<Utc>>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ValidationError> {
        if let (Some(start), Some(expiry)) = (starts_at, expires_at) {
            if expiry <= start {
                return Err(ValidationError::ExpiryNotAfterStart { start, expiry });
            }
        }

        Ok(Self {
            starts_at,
            expires_at,
        })
    }

    /// A window with neither bound set.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        self.starts_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_unbounded(&self) -> bool {
        self.starts_at.is_none() && self.expires_at.is_none()
    }
}

/// A curated reference to an externally hosted video or playlist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub id: EntryId,
    pub title: String,
    pub external_id: String,
    pub kind: EntryKind,
    pub added_at: DateTime<Utc>,
    pub window: VisibilityWindow,
}

/// An entry that has passed validation but has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub title: String,
    pub external_id: String,
    pub kind: EntryKind,
    pub added_at: DateTime<Utc>,
    pub window: VisibilityWindow,
}

/// One individually displayable item of the public feed.
///
/// Produced per request and never stored. Expanded playlist members carry the
/// window and id of the playlist entry that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayItem {
    pub entry_id: EntryId,
    pub external_id: String,
    pub title: String,
    pub kind: EntryKind,
    pub window: VisibilityWindow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl DisplayItem {
    /// Wrap an entry as-is. Used for plain videos and for playlists that could
    /// not be expanded.
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            entry_id: entry.id,
            external_id: entry.external_id.clone(),
            title: entry.title.clone(),
            kind: entry.kind,
            window: entry.window,
            position: None,
        }
    }
}
