use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, info};

use crate::backend::{
    ChannelId, GuildId, JoinPolicy, Retrieval, SessionConfig, SessionRequest, StreamingBackend,
};
use crate::config::PlayerSettings;
use crate::error::{Operation, PlayerError, Result};

use super::handle::SessionHandle;
use super::types::RequestContext;

/// Volume applied to every freshly created session.
pub const DEFAULT_VOLUME: f32 = 0.20;

/// What the registry remembers about one guild.
#[derive(Default)]
struct SlotState {
    handle: Option<SessionHandle>,
    /// Set on creation, cleared once the default volume is applied.
    volume_pending: bool,
}

impl SlotState {
    async fn apply_default_volume(&mut self, handle: &SessionHandle) -> Result<()> {
        if self.volume_pending {
            handle.set_volume(DEFAULT_VOLUME).await?;
            self.volume_pending = false;
        }
        Ok(())
    }
}

type Slot = Arc<tokio::sync::Mutex<SlotState>>;

/// Hands out the single live session of each guild.
///
/// Each guild has its own slot; acquisition holds that slot across one
/// backend retrieve call, so two commands for the same guild cannot both
/// create a player while other guilds proceed untouched.
pub struct SessionRegistry {
    backend: Arc<dyn StreamingBackend>,
    settings: PlayerSettings,
    slots: Mutex<HashMap<GuildId, Slot>>,
}

impl SessionRegistry {
    pub fn new(backend: Arc<dyn StreamingBackend>, settings: PlayerSettings) -> Self {
        Self {
            backend,
            settings,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, guild: GuildId) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(guild).or_default().clone()
    }

    pub fn session_config(&self, text_channel: Option<ChannelId>) -> SessionConfig {
        SessionConfig {
            disconnect_on_stop: self.settings.disconnect_on_stop,
            self_deaf: self.settings.self_deaf,
            inactivity_timeout: self.settings.inactivity_timeout(),
            default_volume: DEFAULT_VOLUME,
            text_channel,
        }
    }

    /// Return the live session for `ctx.guild`, creating one when `join_voice` allows it.
    pub async fn acquire(
        &self,
        ctx: &RequestContext,
        join_voice: bool,
        operation: Operation,
    ) -> Result<SessionHandle> {
        let Some(voice_channel) = ctx.voice_channel else {
            return Err(PlayerError::UserNotPresent);
        };
        let guild = ctx.guild;

        let slot = self.slot(guild);
        let mut state = slot.lock().await;

        if let Some(handle) = state.handle.clone() {
            if handle.is_live().await {
                if let Some(channel) = ctx.text_channel {
                    handle.bind_text_channel(channel);
                }
                state.apply_default_volume(&handle).await?;
                return Ok(handle);
            }
            debug!(guild, "Dropping stale session");
            state.handle = None;
        }

        let request = SessionRequest {
            guild,
            voice_channel,
        };
        let policy = if join_voice {
            JoinPolicy::Join
        } else {
            JoinPolicy::NoJoin
        };
        let config = self.session_config(ctx.text_channel);

        let retrieval = self
            .backend
            .retrieve_session(&request, &config, policy)
            .await
            .map_err(|e| {
                error!(guild, error = %e, "Failed to retrieve player");
                PlayerError::session(Operation::Connect, e)
            })?;

        let (player, created) = match retrieval {
            Retrieval::Created(player) => (player, true),
            Retrieval::Existing(player) => (player, false),
            Retrieval::UserNotInChannel => return Err(PlayerError::UserNotPresent),
            Retrieval::BotNotConnected => return Err(PlayerError::NoActiveSession { operation }),
        };

        let handle = SessionHandle::spawn(guild, player, ctx.text_channel);
        state.handle = Some(handle.clone());
        if created {
            state.volume_pending = true;
            info!(
                guild,
                voice_channel,
                requested_by = %ctx.user_name,
                "Created new player session"
            );
        }
        state.apply_default_volume(&handle).await?;
        Ok(handle)
    }

    /// Forget `guild`'s session; the next acquisition goes back to the backend.
    pub fn evict(&self, guild: GuildId) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.remove(&guild).is_some() {
            debug!(guild, "Evicted session");
        }
    }

    /// Guilds with a registry entry, live or not.
    pub fn tracked_guilds(&self) -> Vec<GuildId> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let mut guilds: Vec<_> = slots.keys().copied().collect();
        guilds.sort_unstable();
        guilds
    }
}
