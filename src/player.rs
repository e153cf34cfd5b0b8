//! Command handlers: the entry points a chat front end calls.
//!
//! Each handler acquires the guild's session through the registry, performs
//! one action through the session actor and reports exactly one outcome or
//! one [`PlayerError`].

mod outcome;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backend::{RepeatMode, StreamingBackend};
use crate::config::Settings;
use crate::error::{Operation, PlayerError, Result};
use crate::ingest::{IngestReport, Ingestor};
use crate::session::{PauseToggle, PlaybackInfo, RequestContext, SessionRegistry};
use crate::track::{TrackDescriptor, TrackResolver, build_queue_item};

pub use outcome::{PlayOutcome, RepeatOutcome, SkipOutcome, StopOutcome};

/// Shown when the skipped item carried no title.
const FALLBACK_SKIP_TITLE: &str = "the current track";

pub struct PlayerService {
    registry: SessionRegistry,
    resolver: TrackResolver,
    ingestor: Ingestor,
}

impl PlayerService {
    pub fn new(backend: Arc<dyn StreamingBackend>, settings: &Settings) -> Self {
        let resolver = TrackResolver::new(backend.clone());
        Self {
            registry: SessionRegistry::new(backend, settings.player.clone()),
            ingestor: Ingestor::new(resolver.clone(), &settings.ingest),
            resolver,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Resolve one track and play it, or append it when something is already playing.
    pub async fn play_track(
        &self,
        ctx: &RequestContext,
        descriptor: &TrackDescriptor,
    ) -> Result<PlayOutcome> {
        let session = self.registry.acquire(ctx, true, Operation::Play).await?;

        let Some(loaded) = self
            .resolver
            .resolve(descriptor, &CancellationToken::new())
            .await
            .into_loaded()
        else {
            return Err(PlayerError::TrackUnavailable {
                title: descriptor.label().to_string(),
            });
        };

        let item = build_queue_item(descriptor, &loaded, &ctx.user_name);
        let track = item.display();
        let placement = session.play_or_enqueue(item, Operation::Play).await?;

        let outcome = PlayOutcome { placement, track };
        debug!(guild = ctx.guild, user = %ctx.user_name, "{outcome}");
        Ok(outcome)
    }

    /// Bulk import into the guild's queue, joining voice when needed.
    pub async fn enqueue(
        &self,
        ctx: &RequestContext,
        descriptors: &[TrackDescriptor],
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        let session = self.registry.acquire(ctx, true, Operation::Queue).await?;
        let report = self
            .ingestor
            .enqueue(&session, descriptors, &ctx.user_name, cancel)
            .await;
        debug!(guild = ctx.guild, user = %ctx.user_name, "{report}");
        Ok(report)
    }

    pub async fn toggle_pause_resume(&self, ctx: &RequestContext) -> Result<PauseToggle> {
        let session = self.registry.acquire(ctx, false, Operation::Pause).await?;
        let toggle = session.toggle_pause().await?;
        debug!(guild = ctx.guild, user = %ctx.user_name, "{}", toggle.label());
        Ok(toggle)
    }

    pub async fn skip(&self, ctx: &RequestContext) -> Result<SkipOutcome> {
        let session = self.registry.acquire(ctx, false, Operation::Skip).await?;
        let previous = session.skip().await?;

        let skipped = previous
            .map(|item| item.title().to_string())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_SKIP_TITLE.to_string());
        let outcome = SkipOutcome { skipped };
        debug!(guild = ctx.guild, user = %ctx.user_name, "{outcome}");
        Ok(outcome)
    }

    pub async fn set_repeat_mode(
        &self,
        ctx: &RequestContext,
        mode: RepeatMode,
    ) -> Result<RepeatOutcome> {
        let session = self.registry.acquire(ctx, false, Operation::Repeat).await?;
        session.set_repeat_mode(mode).await?;

        let outcome = RepeatOutcome { mode };
        debug!(guild = ctx.guild, user = %ctx.user_name, "{outcome}");
        Ok(outcome)
    }

    /// Stop playback and clear the queue; with `disconnect` also leave the voice channel.
    pub async fn stop(&self, ctx: &RequestContext, disconnect: bool) -> Result<StopOutcome> {
        let session = self.registry.acquire(ctx, false, Operation::Stop).await?;
        session.stop(disconnect).await?;
        if disconnect {
            self.registry.evict(ctx.guild);
        }

        let outcome = StopOutcome {
            disconnected: disconnect,
        };
        debug!(guild = ctx.guild, user = %ctx.user_name, "{outcome}");
        Ok(outcome)
    }

    /// Fresh playback snapshot of the guild's session.
    pub async fn now_playing(&self, ctx: &RequestContext) -> Result<PlaybackInfo> {
        let session = self.registry.acquire(ctx, false, Operation::Connect).await?;
        session.refresh().await
    }
}
