use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::{mpsc, oneshot};

use crate::backend::{ChannelId, GuildId, PlayerSession, RepeatMode};
use crate::error::{Operation, Result};
use crate::track::QueueItem;

use super::actor::spawn_session_actor;
use super::types::{
    CmdError, PauseToggle, Placement, PlaybackHandle, PlaybackInfo, Reply, SessionCmd,
};

/// Cheap, cloneable handle to one guild's playback session.
///
/// Every mutation is forwarded to the session actor and applied in arrival
/// order, so concurrent commands for the same guild never interleave inside
/// a single player operation.
#[derive(Clone)]
pub struct SessionHandle {
    guild: GuildId,
    tx: mpsc::UnboundedSender<SessionCmd>,
    playback: PlaybackHandle,
    text_channel: Arc<OnceLock<ChannelId>>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("guild", &self.guild)
            .field("text_channel", &self.text_channel.get())
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl SessionHandle {
    pub(super) fn spawn(
        guild: GuildId,
        player: Box<dyn PlayerSession>,
        text_channel: Option<ChannelId>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<SessionCmd>();
        let playback: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo::default()));

        spawn_session_actor(guild, player, rx, playback.clone());

        let handle = Self {
            guild,
            tx,
            playback,
            text_channel: Arc::new(OnceLock::new()),
        };
        if let Some(channel) = text_channel {
            handle.bind_text_channel(channel);
        }
        handle
    }

    pub fn guild(&self) -> GuildId {
        self.guild
    }

    /// Channel used for now-playing announcements, fixed by the first
    /// command that carried one.
    pub fn text_channel(&self) -> Option<ChannelId> {
        self.text_channel.get().copied()
    }

    /// Returns `false` if a channel was already bound.
    pub fn bind_text_channel(&self, channel: ChannelId) -> bool {
        self.text_channel.set(channel).is_ok()
    }

    /// Last snapshot published by the actor; does not touch the player.
    pub fn playback(&self) -> PlaybackInfo {
        self.playback
            .lock()
            .map(|info| info.clone())
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        operation: Operation,
        make: impl FnOnce(Reply<T>) -> SessionCmd,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| CmdError::Closed.during(operation))?;
        match rx.await {
            Ok(r) => r.map_err(|e| e.during(operation)),
            Err(_) => Err(CmdError::Closed.during(operation)),
        }
    }

    /// Re-read the player state through the actor.
    pub async fn refresh(&self) -> Result<PlaybackInfo> {
        self.request(Operation::Connect, |reply| SessionCmd::Refresh { reply })
            .await
    }

    /// Still owned by a running actor and connected on the backend side.
    pub async fn is_live(&self) -> bool {
        !self.is_closed() && self.refresh().await.is_ok_and(|info| info.connected)
    }

    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        self.request(Operation::Connect, |reply| SessionCmd::SetVolume { volume, reply })
            .await
    }

    /// Start `item` when the player is idle, append it otherwise.
    ///
    /// Failures are reported under `operation`.
    pub async fn play_or_enqueue(
        &self,
        item: QueueItem,
        operation: Operation,
    ) -> Result<Placement> {
        self.request(operation, |reply| SessionCmd::PlayOrEnqueue { item, reply })
            .await
    }

    pub async fn enqueue(&self, item: QueueItem) -> Result<()> {
        self.request(Operation::Queue, |reply| SessionCmd::Enqueue { item, reply })
            .await
    }

    pub async fn toggle_pause(&self) -> Result<PauseToggle> {
        self.request(Operation::Pause, |reply| SessionCmd::TogglePause { reply })
            .await
    }

    /// Returns the item that was playing before the skip.
    pub async fn skip(&self) -> Result<Option<QueueItem>> {
        self.request(Operation::Skip, |reply| SessionCmd::Skip { reply })
            .await
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        self.request(Operation::Repeat, |reply| SessionCmd::SetRepeat { mode, reply })
            .await
    }

    pub async fn stop(&self, disconnect: bool) -> Result<()> {
        self.request(Operation::Stop, |reply| SessionCmd::Stop { disconnect, reply })
            .await
    }
}
