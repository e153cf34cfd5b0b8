use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::BackendError;
use crate::config::IngestSettings;
use crate::error::{Operation, PlayerError};
use crate::session::{Placement, SessionHandle};
use crate::track::{Resolution, TrackDescriptor, TrackResolver, build_queue_item};

use super::retry::RetryPacing;

/// Imports above this size announce themselves at info level.
const LONG_RUN_THRESHOLD: usize = 10;

/// Result of one bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Items that ended up in the session, recoveries included.
    pub added: usize,
    pub total: usize,
    /// This run started playback with its first item.
    pub started: bool,
    /// Labels of the items that were given up on.
    pub dropped: Vec<String>,
    /// The run stopped early; items inserted before that stay queued.
    pub cancelled: bool,
    /// The session went away mid-run; the unprocessed items are in `dropped`.
    pub session_closed: bool,
}

impl IngestReport {
    pub fn summary(&self) -> String {
        if self.added > 0 {
            format!("Added {} of {} tracks to the queue", self.added, self.total)
        } else {
            "No tracks were added to the queue.".to_string()
        }
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Why a run ended before working through its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Halt {
    Cancelled,
    SessionClosed,
}

fn check(cancel: &CancellationToken) -> Result<(), Halt> {
    if cancel.is_cancelled() {
        Err(Halt::Cancelled)
    } else {
        Ok(())
    }
}

async fn wait(duration: Duration, cancel: &CancellationToken) -> Result<(), Halt> {
    if duration.is_zero() {
        return check(cancel);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Halt::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// The player behind `session` is gone, so later commands cannot land either.
fn session_gone(err: &PlayerError) -> bool {
    matches!(
        err,
        PlayerError::NoActiveSession { .. }
            | PlayerError::Session {
                source: BackendError::Disconnected,
                ..
            }
    )
}

struct RunState<'a> {
    total: usize,
    added: usize,
    started: bool,
    failed: Vec<&'a TrackDescriptor>,
    dropped: Vec<String>,
}

impl<'a> RunState<'a> {
    fn new(total: usize) -> Self {
        Self {
            total,
            added: 0,
            started: false,
            failed: Vec::new(),
            dropped: Vec::new(),
        }
    }

    fn finish(self, halt: Option<Halt>) -> IngestReport {
        let mut dropped = self.dropped;
        dropped.extend(self.failed.iter().map(|d| d.label().to_string()));
        IngestReport {
            added: self.added,
            total: self.total,
            started: self.started,
            dropped,
            cancelled: halt == Some(Halt::Cancelled),
            session_closed: halt == Some(Halt::SessionClosed),
        }
    }
}

/// Feeds descriptor lists into a session in paced batches.
#[derive(Clone)]
pub struct Ingestor {
    resolver: TrackResolver,
    batch_size: usize,
    item_delay: Duration,
    batch_delay: Duration,
    retry_delay: Duration,
    retry_gap: Duration,
    pacing: RetryPacing,
}

impl Ingestor {
    pub fn new(resolver: TrackResolver, settings: &IngestSettings) -> Self {
        Self {
            resolver,
            batch_size: settings.batch_size.max(1),
            item_delay: Duration::from_millis(settings.item_delay_ms),
            batch_delay: Duration::from_millis(settings.batch_delay_ms),
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            retry_gap: Duration::from_millis(settings.retry_gap_ms),
            pacing: RetryPacing::from_settings(settings),
        }
    }

    /// Resolve `descriptors` in order and push them into `session`.
    ///
    /// The first loaded item starts playback when the session is idle; every
    /// later one is appended. Items that failed get one more try after the
    /// main pass, provided at least one item made it in. A session that
    /// closes mid-run ends the run; nothing after that point is attempted.
    pub async fn enqueue(
        &self,
        session: &SessionHandle,
        descriptors: &[TrackDescriptor],
        requested_by: &str,
        cancel: &CancellationToken,
    ) -> IngestReport {
        let guild = session.guild();
        let total = descriptors.len();
        if total > LONG_RUN_THRESHOLD {
            info!(guild, total, requested_by, "Starting bulk queue import");
        }

        let mut run = RunState::new(total);
        let halt = self
            .run(session, descriptors, requested_by, cancel, &mut run)
            .await
            .err();
        let report = run.finish(halt);

        match halt {
            Some(Halt::Cancelled) => {
                info!(guild, added = report.added, total, "Queue import cancelled");
            }
            Some(Halt::SessionClosed) => {
                info!(
                    guild,
                    added = report.added,
                    total,
                    "Session closed, abandoning queue import"
                );
            }
            None => {}
        }
        debug!(
            guild,
            added = report.added,
            total,
            dropped = report.dropped.len(),
            "Queue import finished"
        );
        report
    }

    async fn run<'a>(
        &self,
        session: &SessionHandle,
        descriptors: &'a [TrackDescriptor],
        requested_by: &str,
        cancel: &CancellationToken,
        run: &mut RunState<'a>,
    ) -> Result<(), Halt> {
        let guild = session.guild();
        let batch_count = descriptors.len().div_ceil(self.batch_size);

        for (index, batch) in descriptors.chunks(self.batch_size).enumerate() {
            debug!(guild, batch = index + 1, of = batch_count, "Processing batch");
            for (offset, descriptor) in batch.iter().enumerate() {
                let outcome = self
                    .ingest_one(session, descriptor, requested_by, cancel, run)
                    .await;
                if outcome == Err(Halt::SessionClosed) {
                    let next = index * self.batch_size + offset + 1;
                    run.failed.extend(descriptors[next..].iter());
                }
                outcome?;
                wait(self.item_delay, cancel).await?;
            }
            if index + 1 < batch_count {
                wait(self.batch_delay, cancel).await?;
            }
        }

        if run.failed.is_empty() {
            return Ok(());
        }
        if run.added == 0 {
            warn!(guild, total = run.total, "No track could be loaded, skipping retry");
            return Ok(());
        }
        self.recover(session, requested_by, cancel, run).await
    }

    async fn ingest_one<'a>(
        &self,
        session: &SessionHandle,
        descriptor: &'a TrackDescriptor,
        requested_by: &str,
        cancel: &CancellationToken,
        run: &mut RunState<'a>,
    ) -> Result<(), Halt> {
        let guild = session.guild();
        check(cancel)?;
        if session.is_closed() {
            run.failed.push(descriptor);
            return Err(Halt::SessionClosed);
        }

        let loaded = match self.resolver.resolve(descriptor, cancel).await {
            Resolution::Loaded(track) => track,
            Resolution::Unresolved { attempts } => {
                check(cancel)?;
                warn!(guild, title = descriptor.label(), attempts, "Failed to load track");
                run.failed.push(descriptor);
                return Ok(());
            }
        };

        let item = build_queue_item(descriptor, &loaded, requested_by);
        let title = item.display();
        check(cancel)?;

        let placed = if run.started {
            session.enqueue(item).await.map(|()| Placement::Queued)
        } else {
            session.play_or_enqueue(item, Operation::Queue).await
        };
        match placed {
            Ok(Placement::Started) => {
                run.started = true;
                run.added += 1;
                info!(guild, track = %title, requested_by, "Playing");
            }
            Ok(Placement::Queued) => {
                run.added += 1;
                debug!(guild, track = %title, "Queued");
            }
            Err(e) if session_gone(&e) => {
                warn!(guild, track = %title, error = %e, "Session lost while queueing");
                run.failed.push(descriptor);
                return Err(Halt::SessionClosed);
            }
            Err(e) => {
                warn!(guild, track = %title, error = %e, "Failed to queue track");
                run.failed.push(descriptor);
            }
        }
        Ok(())
    }

    async fn recover(
        &self,
        session: &SessionHandle,
        requested_by: &str,
        cancel: &CancellationToken,
        run: &mut RunState<'_>,
    ) -> Result<(), Halt> {
        let mut pending: VecDeque<_> = std::mem::take(&mut run.failed).into();
        info!(guild = session.guild(), count = pending.len(), "Retrying failed tracks");

        let mut attempt = 0u32;
        let outcome = loop {
            let Some(&descriptor) = pending.front() else {
                break Ok(());
            };
            let recovered = match self
                .retry_one(session, descriptor, attempt, requested_by, cancel, run)
                .await
            {
                Ok(recovered) => recovered,
                Err(halt) => break Err(halt),
            };
            pending.pop_front();
            attempt += 1;
            if recovered {
                if let Err(halt) = wait(self.retry_gap, cancel).await {
                    break Err(halt);
                }
            }
        };

        run.failed.extend(pending);
        outcome
    }

    /// One recovery attempt. `Ok(true)` when the item made it into the queue.
    async fn retry_one(
        &self,
        session: &SessionHandle,
        descriptor: &TrackDescriptor,
        attempt: u32,
        requested_by: &str,
        cancel: &CancellationToken,
        run: &mut RunState<'_>,
    ) -> Result<bool, Halt> {
        let guild = session.guild();
        wait(self.pacing.delay(self.retry_delay, attempt), cancel).await?;
        if session.is_closed() {
            return Err(Halt::SessionClosed);
        }

        let resolution = self.resolver.resolve(descriptor, cancel).await;
        check(cancel)?;
        let Resolution::Loaded(loaded) = resolution else {
            warn!(guild, title = descriptor.label(), attempt, "Dropping track after retry");
            run.dropped.push(descriptor.label().to_string());
            return Ok(false);
        };

        let item = build_queue_item(descriptor, &loaded, requested_by);
        let title = item.display();
        match session.enqueue(item).await {
            Ok(()) => {
                run.added += 1;
                debug!(guild, track = %title, attempt, "Recovered track");
                Ok(true)
            }
            Err(e) if session_gone(&e) => {
                warn!(guild, track = %title, error = %e, "Session lost during retry");
                Err(Halt::SessionClosed)
            }
            Err(e) => {
                warn!(guild, track = %title, error = %e, "Dropping track after retry");
                run.dropped.push(descriptor.label().to_string());
                Ok(false)
            }
        }
    }
}
