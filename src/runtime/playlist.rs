use std::path::Path;

use serde::Deserialize;

use allegro::backend::{ChannelId, GuildId};
use allegro::track::TrackDescriptor;

#[derive(Debug, thiserror::Error)]
pub enum PlaylistError {
    #[error("cannot read playlist {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid playlist: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Playlist file fed to a dry run.
///
/// ```toml
/// guild = 1
/// requested_by = "alice"
///
/// [[tracks]]
/// title = "Song"
/// artist = "Band"
/// url = "https://www.youtube.com/watch?v=..."
/// source = "YouTube"
/// unavailable = true   # the simulated backend cannot load this one
/// ```
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Playlist {
    pub guild: GuildId,
    pub requested_by: String,
    pub voice_channel: ChannelId,
    pub text_channel: Option<ChannelId>,
    pub tracks: Vec<PlaylistEntry>,
}

impl Default for Playlist {
    fn default() -> Self {
        Self {
            guild: 1,
            requested_by: "dry-run".to_string(),
            voice_channel: 1,
            text_channel: None,
            tracks: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PlaylistEntry {
    #[serde(flatten)]
    pub descriptor: TrackDescriptor,
    #[serde(default)]
    pub unavailable: bool,
}

impl Playlist {
    pub fn load(path: &Path) -> Result<Self, PlaylistError> {
        let raw = std::fs::read_to_string(path).map_err(|source| PlaylistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, PlaylistError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn descriptors(&self) -> Vec<TrackDescriptor> {
        self.tracks.iter().map(|t| t.descriptor.clone()).collect()
    }

    /// References the simulated backend should be able to load.
    pub fn loadable(&self) -> impl Iterator<Item = &str> {
        self.tracks
            .iter()
            .filter(|t| !t.unavailable)
            .map(|t| t.descriptor.playback_url.as_str())
    }
}
