//! Capability surface of the external streaming backend.
//!
//! The core never talks to an engine directly; it consumes these traits.
//! `StreamingBackend` covers session retrieval and track loading,
//! `PlayerSession` is the per-guild player the session actor owns.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::track::{LoadedTrack, QueueItem};

pub type GuildId = u64;
pub type ChannelId = u64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(String),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("player is no longer connected")]
    Disconnected,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PlayerState {
    #[default]
    Idle,
    Playing,
    Paused,
    Disconnected,
}

impl PlayerState {
    /// Playing or paused: there is a current track.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    None,
    /// Repeat the current track when it ends.
    Track,
    /// Wrap around to the start of the queue.
    Queue,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SearchMode {
    /// Treat the reference as a canonical URI/identifier.
    Direct,
    /// Treat the reference as keywords for the backend's search provider.
    KeywordSearch,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JoinPolicy {
    /// Create or join a session when none exists.
    Join,
    /// Only retrieve an existing session.
    NoJoin,
}

/// Options applied once when the backend creates a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub disconnect_on_stop: bool,
    pub self_deaf: bool,
    pub inactivity_timeout: Duration,
    pub default_volume: f32,
    pub text_channel: Option<ChannelId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub guild: GuildId,
    pub voice_channel: ChannelId,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PlayOptions {
    /// Append instead of interrupting when something is already playing.
    pub no_replace: bool,
}

pub enum Retrieval {
    /// A brand-new session was created for this request.
    Created(Box<dyn PlayerSession>),
    /// The backend already had a live session for the guild.
    Existing(Box<dyn PlayerSession>),
    UserNotInChannel,
    BotNotConnected,
}

impl fmt::Debug for Retrieval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(_) => f.write_str("Created(..)"),
            Self::Existing(_) => f.write_str("Existing(..)"),
            Self::UserNotInChannel => f.write_str("UserNotInChannel"),
            Self::BotNotConnected => f.write_str("BotNotConnected"),
        }
    }
}

#[async_trait]
pub trait StreamingBackend: Send + Sync {
    async fn retrieve_session(
        &self,
        request: &SessionRequest,
        config: &SessionConfig,
        policy: JoinPolicy,
    ) -> Result<Retrieval, BackendError>;

    /// `Ok(None)` means the backend found nothing for `reference` in `mode`.
    async fn load_track(
        &self,
        reference: &str,
        mode: SearchMode,
    ) -> Result<Option<LoadedTrack>, BackendError>;
}

/// Extra hook offered by players that drive a now-playing widget.
#[async_trait]
pub trait SupportsVisualRefresh: Send {
    /// `full` also regenerates artwork, not only the controls.
    async fn refresh_visual(&mut self, full: bool) -> Result<(), BackendError>;
}

#[async_trait]
pub trait PlayerSession: Send {
    fn state(&self) -> PlayerState;
    fn repeat_mode(&self) -> RepeatMode;
    fn set_repeat_mode(&mut self, mode: RepeatMode);
    fn current(&self) -> Option<QueueItem>;
    fn queue_len(&self) -> usize;
    fn volume(&self) -> f32;
    fn is_connected(&self) -> bool;

    async fn set_volume(&mut self, volume: f32) -> Result<(), BackendError>;
    async fn play(&mut self, item: QueueItem, options: PlayOptions) -> Result<(), BackendError>;
    async fn pause(&mut self) -> Result<(), BackendError>;
    async fn resume(&mut self) -> Result<(), BackendError>;
    async fn skip(&mut self, count: usize) -> Result<(), BackendError>;
    async fn stop(&mut self) -> Result<(), BackendError>;
    async fn disconnect(&mut self) -> Result<(), BackendError>;
    async fn queue_add(&mut self, item: QueueItem) -> Result<(), BackendError>;
    async fn queue_clear(&mut self) -> Result<(), BackendError>;

    fn visual_refresh(&mut self) -> Option<&mut dyn SupportsVisualRefresh> {
        None
    }
}
