use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Where a descriptor's playback reference comes from.
///
/// Parsed case-insensitively from the caller's source tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum SourceSystem {
    YouTube,
    #[default]
    Plex,
    Other(String),
}

impl SourceSystem {
    pub fn parse(tag: &str) -> Self {
        let tag = tag.trim();
        if tag.eq_ignore_ascii_case("youtube") {
            Self::YouTube
        } else if tag.eq_ignore_ascii_case("plex") {
            Self::Plex
        } else {
            Self::Other(tag.to_ascii_lowercase())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::YouTube => "youtube",
            Self::Plex => "plex",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for SourceSystem {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied track metadata. The core only ever borrows it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackDescriptor {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub release_date: Option<String>,
    pub artwork_url: Option<String>,
    /// URI or identifier handed to the backend loader.
    #[serde(alias = "url")]
    pub playback_url: String,
    pub artist_url: Option<String>,
    /// Pre-formatted duration, e.g. `"3:45"`.
    pub duration_display: Option<String>,
    pub studio: Option<String>,
    #[serde(alias = "source")]
    pub source_system: SourceSystem,
}

impl TrackDescriptor {
    pub fn new(playback_url: impl Into<String>, source_system: SourceSystem) -> Self {
        Self {
            playback_url: playback_url.into(),
            source_system,
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    /// Best label for log lines: the title when present, the reference otherwise.
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.playback_url)
    }
}

/// Opaque backend playback handle (an encoded track for Lavalink-like engines).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendHandle(Arc<str>);

impl BackendHandle {
    pub fn new(raw: impl Into<Arc<str>>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of loading a descriptor through the backend. Lives only until the
/// queue item is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTrack {
    pub identifier: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub artwork_uri: Option<String>,
    pub handle: BackendHandle,
}

/// Back-reference from a queue item to the loaded track it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackReference {
    identifier: String,
    handle: BackendHandle,
}

impl TrackReference {
    pub fn new(loaded: &LoadedTrack) -> Self {
        Self {
            identifier: loaded.identifier.clone(),
            handle: loaded.handle.clone(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn handle(&self) -> &BackendHandle {
        &self.handle
    }
}

/// The unit stored in a session queue. Fields are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub(super) title: String,
    pub(super) artist: String,
    pub(super) album: Option<String>,
    pub(super) release_date: Option<String>,
    pub(super) artwork: String,
    pub(super) url: String,
    pub(super) artist_url: Option<String>,
    pub(super) duration: Option<String>,
    pub(super) studio: Option<String>,
    pub(super) requested_by: String,
    pub(super) reference: TrackReference,
}

impl QueueItem {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    pub fn release_date(&self) -> Option<&str> {
        self.release_date.as_deref()
    }

    pub fn artwork(&self) -> &str {
        &self.artwork
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn artist_url(&self) -> Option<&str> {
        self.artist_url.as_deref()
    }

    pub fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    pub fn studio(&self) -> Option<&str> {
        self.studio.as_deref()
    }

    pub fn requested_by(&self) -> &str {
        &self.requested_by
    }

    pub fn reference(&self) -> &TrackReference {
        &self.reference
    }

    /// `"Title by Artist"`, used for result labels and log lines.
    pub fn display(&self) -> String {
        format!("{} by {}", self.title, self.artist)
    }
}
