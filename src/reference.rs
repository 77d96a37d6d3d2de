//! Extraction of YouTube ids from whatever the operator pasted into the add form.

use url::Url;

use crate::entry::EntryKind;
use crate::error::ValidationError;

const VIDEO_ID_LEN: usize = 11;

/// Resolve `reference` (a YouTube URL or a bare id) to the provider id of a
/// video or playlist.
pub fn parse_reference(reference: &str, kind: EntryKind) -> Result<String, ValidationError> {
    let reference = reference.trim();
    let invalid = || ValidationError::InvalidReference(reference.to_string());

    let url = match parse_url(reference) {
        Some(url) => url,
        None => {
            return match kind {
                EntryKind::Video if is_video_id(reference) => Ok(reference.to_string()),
                EntryKind::Playlist if is_playlist_id(reference) => Ok(reference.to_string()),
                _ => Err(invalid()),
            }
        }
    };

    let host = youtube_host(&url).ok_or_else(invalid)?;

    let id = match kind {
        EntryKind::Video => video_id(&url, host),
        EntryKind::Playlist => query_value(&url, "list").filter(|id| is_playlist_id(id)),
    };

    id.ok_or_else(invalid)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Host {
    /// youtube.com and its mobile and privacy-enhanced variants.
    Site,
    /// youtu.be share links, where the id is the first path segment.
    Short,
}

fn youtube_host(url: &Url) -> Option<Host> {
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(&host);

    match host {
        "youtube.com" | "youtube-nocookie.com" => Some(Host::Site),
        "youtu.be" => Some(Host::Short),
        _ => None,
    }
}

fn parse_url(reference: &str) -> Option<Url> {
    if let Ok(url) = Url::parse(reference) {
        return Some(url);
    }

    // "youtube.com/watch?v=..." without a scheme
    if reference.contains('/') || reference.contains('.') {
        return Url::parse(&format!("https://{reference}")).ok();
    }

    None
}

fn video_id(url: &Url, host: Host) -> Option<String> {
    if let Some(id) = query_value(url, "v") {
        return Some(id).filter(|id| is_video_id(id));
    }

    let mut segments = url.path_segments()?;

    let candidate = match host {
        Host::Short => segments.next(),
        Host::Site => match segments.next() {
            Some("embed") | Some("shorts") | Some("live") => segments.next(),
            _ => None,
        },
    };

    candidate.filter(|id| is_video_id(id)).map(str::to_string)
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_video_id(id: &str) -> bool {
    id.len() == VIDEO_ID_LEN && id.chars().all(is_id_char)
}

fn is_playlist_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(is_id_char)
}
