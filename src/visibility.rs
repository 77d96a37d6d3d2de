use chrono::{DateTime, Utc};

use crate::entry::{Entry, VisibilityWindow};

impl VisibilityWindow {
    /// Whether `now` falls inside the window. Start is inclusive, expiry is
    /// exclusive.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let started = self.starts_at().map_or(true, |start| start <= now);
        let not_expired = self.expires_at().map_or(true, |expiry| expiry > now);

        started && not_expired
    }
}

/// Decide if an entry is publicly visible at `now`.
///
/// Callers assembling a feed must capture `now` once and reuse it for every
/// entry of the pass.
pub fn is_visible(entry: &Entry, now: DateTime<Utc>) -> bool {
    entry.window.contains(now)
}
