use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::{SearchMode, StreamingBackend};

use super::model::{LoadedTrack, SourceSystem, TrackDescriptor};

/// Outcome of resolving one descriptor. A miss is a value, not an error:
/// callers count it and move on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Loaded(LoadedTrack),
    Unresolved { attempts: usize },
}

impl Resolution {
    pub fn into_loaded(self) -> Option<LoadedTrack> {
        match self {
            Self::Loaded(t) => Some(t),
            Self::Unresolved { .. } => None,
        }
    }
}

/// Loads descriptors through the backend with a per-source fallback chain.
#[derive(Clone)]
pub struct TrackResolver {
    backend: Arc<dyn StreamingBackend>,
}

impl TrackResolver {
    pub fn new(backend: Arc<dyn StreamingBackend>) -> Self {
        Self { backend }
    }

    /// Load modes tried in order for `source`.
    ///
    /// YouTube references are often stale video ids, so a keyword search on the
    /// same reference follows the direct load. Other sources hand out canonical
    /// references and get a single direct attempt.
    pub fn strategy(source: &SourceSystem) -> &'static [SearchMode] {
        match source {
            SourceSystem::YouTube => &[SearchMode::Direct, SearchMode::KeywordSearch],
            SourceSystem::Plex | SourceSystem::Other(_) => &[SearchMode::Direct],
        }
    }

    pub async fn resolve(
        &self,
        descriptor: &TrackDescriptor,
        cancel: &CancellationToken,
    ) -> Resolution {
        debug!(
            title = descriptor.label(),
            source = %descriptor.source_system,
            "Loading track"
        );

        let mut attempts = 0;
        for &mode in Self::strategy(&descriptor.source_system) {
            if cancel.is_cancelled() {
                break;
            }
            attempts += 1;

            let loaded = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                r = self.backend.load_track(&descriptor.playback_url, mode) => Some(r),
            };
            let Some(result) = loaded else {
                break;
            };

            match result {
                Ok(Some(track)) => return Resolution::Loaded(track),
                Ok(None) => {
                    debug!(title = descriptor.label(), ?mode, "No result for track");
                }
                Err(e) => {
                    warn!(
                        title = descriptor.label(),
                        ?mode,
                        error = %e,
                        "Backend failed to load track"
                    );
                }
            }
        }

        Resolution::Unresolved { attempts }
    }
}
