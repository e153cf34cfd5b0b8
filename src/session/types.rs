//! Session-related small types: commands, replies and the shared snapshot.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::backend::{BackendError, ChannelId, GuildId, PlayerState, RepeatMode};
use crate::error::{Operation, PlayerError};
use crate::track::QueueItem;

/// Who is asking, and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub guild: GuildId,
    pub user_id: u64,
    pub user_name: String,
    /// Voice channel the requester currently sits in.
    pub voice_channel: Option<ChannelId>,
    /// Text channel the command came from; becomes the session's announcement channel.
    pub text_channel: Option<ChannelId>,
}

/// Where an item ended up after a start-or-append request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Placement {
    Started,
    Queued,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PauseToggle {
    Paused,
    Resumed,
}

impl PauseToggle {
    pub fn label(self) -> &'static str {
        match self {
            Self::Paused => "Paused",
            Self::Resumed => "Resumed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Playback state published by the session actor after every command.
pub struct PlaybackInfo {
    pub state: PlayerState,
    pub repeat: RepeatMode,
    /// Item currently loaded in the player (if any).
    pub current: Option<QueueItem>,
    /// Items waiting after the current one.
    pub queue_len: usize,
    pub volume: f32,
    pub connected: bool,
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;

/// Failure raised inside the actor before the caller attaches an operation.
#[derive(Debug)]
pub(crate) enum CmdError {
    NoActiveTrack,
    /// The actor is gone: the player disconnected or timed out.
    Closed,
    Backend(BackendError),
}

impl From<BackendError> for CmdError {
    fn from(e: BackendError) -> Self {
        Self::Backend(e)
    }
}

impl CmdError {
    pub(crate) fn during(self, operation: Operation) -> PlayerError {
        match self {
            Self::NoActiveTrack => PlayerError::NoActiveTrack { operation },
            Self::Closed => PlayerError::NoActiveSession { operation },
            Self::Backend(e) => PlayerError::session(operation, e),
        }
    }
}

pub(crate) type Reply<T> = oneshot::Sender<Result<T, CmdError>>;

#[derive(Debug)]
pub(crate) enum SessionCmd {
    /// Re-read the player and publish a fresh snapshot.
    Refresh { reply: Reply<PlaybackInfo> },
    SetVolume { volume: f32, reply: Reply<()> },
    /// Start `item` if the player is idle, append it otherwise. Never replaces.
    PlayOrEnqueue { item: QueueItem, reply: Reply<Placement> },
    /// Append `item` to the queue.
    Enqueue { item: QueueItem, reply: Reply<()> },
    /// Pause when playing, resume when paused.
    TogglePause { reply: Reply<PauseToggle> },
    /// Skip the current item; replies with the item that was skipped.
    Skip { reply: Reply<Option<QueueItem>> },
    SetRepeat { mode: RepeatMode, reply: Reply<()> },
    /// Stop, clear the queue, then optionally disconnect.
    Stop { disconnect: bool, reply: Reply<()> },
}
