//! Queue item construction.
//!
//! Descriptor metadata wins over whatever the backend reported; the backend
//! only fills gaps. Title and artist never end up empty.

use super::model::{
    LoadedTrack, QueueItem, TrackDescriptor, TrackReference, UNKNOWN_ARTIST, UNKNOWN_TITLE,
};

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

fn pick(primary: Option<&str>, fallback: Option<&str>) -> Option<String> {
    non_blank(primary)
        .or_else(|| non_blank(fallback))
        .map(str::to_string)
}

/// Merge `descriptor` and `loaded` into a queue item stamped with `requested_by`.
pub fn build_queue_item(
    descriptor: &TrackDescriptor,
    loaded: &LoadedTrack,
    requested_by: &str,
) -> QueueItem {
    QueueItem {
        title: pick(descriptor.title.as_deref(), loaded.title.as_deref())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        artist: pick(descriptor.artist.as_deref(), loaded.author.as_deref())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        album: pick(descriptor.album.as_deref(), None),
        release_date: pick(descriptor.release_date.as_deref(), None),
        artwork: pick(
            descriptor.artwork_url.as_deref(),
            loaded.artwork_uri.as_deref(),
        )
        .unwrap_or_default(),
        url: descriptor.playback_url.clone(),
        artist_url: pick(descriptor.artist_url.as_deref(), None),
        duration: pick(descriptor.duration_display.as_deref(), None),
        studio: pick(descriptor.studio.as_deref(), None),
        requested_by: requested_by.to_string(),
        reference: TrackReference::new(loaded),
    }
}
