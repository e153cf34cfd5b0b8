use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::backend::{BackendError, GuildId, PlayOptions, PlayerSession, PlayerState};

use super::types::{CmdError, PauseToggle, Placement, PlaybackHandle, PlaybackInfo, SessionCmd};

fn snapshot(player: &dyn PlayerSession) -> PlaybackInfo {
    PlaybackInfo {
        state: player.state(),
        repeat: player.repeat_mode(),
        current: player.current(),
        queue_len: player.queue_len(),
        volume: player.volume(),
        connected: player.is_connected(),
    }
}

fn publish(player: &dyn PlayerSession, playback: &PlaybackHandle) -> PlaybackInfo {
    let info = snapshot(player);
    if let Ok(mut shared) = playback.lock() {
        *shared = info.clone();
    }
    info
}

async fn refresh_visual(player: &mut dyn PlayerSession, guild: GuildId, full: bool) {
    if let Some(visual) = player.visual_refresh() {
        if let Err(e) = visual.refresh_visual(full).await {
            warn!(guild, error = %e, "Visual player refresh failed");
        }
    }
}

async fn play_or_enqueue(
    player: &mut dyn PlayerSession,
    item: crate::track::QueueItem,
) -> Result<Placement, BackendError> {
    // Decided here, between two commands, so nothing can interleave with the check.
    if player.state().is_active() {
        player.queue_add(item).await?;
        Ok(Placement::Queued)
    } else {
        player.play(item, PlayOptions { no_replace: true }).await?;
        Ok(Placement::Started)
    }
}

async fn toggle_pause(player: &mut dyn PlayerSession) -> Result<PauseToggle, CmdError> {
    match player.state() {
        PlayerState::Paused => {
            player.resume().await?;
            Ok(PauseToggle::Resumed)
        }
        PlayerState::Playing => {
            player.pause().await?;
            Ok(PauseToggle::Paused)
        }
        PlayerState::Idle | PlayerState::Disconnected => Err(CmdError::NoActiveTrack),
    }
}

async fn skip(
    player: &mut dyn PlayerSession,
) -> Result<Option<crate::track::QueueItem>, CmdError> {
    if !player.state().is_active() {
        return Err(CmdError::NoActiveTrack);
    }
    let skipped = player.current();
    player.skip(1).await?;
    Ok(skipped)
}

async fn stop(player: &mut dyn PlayerSession, disconnect: bool) -> Result<(), BackendError> {
    player.stop().await?;
    player.queue_clear().await?;
    if disconnect {
        player.disconnect().await?;
    }
    Ok(())
}

/// Owns `player` for the lifetime of the session and applies commands one at a time.
///
/// The task ends when every handle is dropped or the player reports that it
/// is no longer connected (explicit disconnect or backend inactivity timeout).
pub(super) fn spawn_session_actor(
    guild: GuildId,
    mut player: Box<dyn PlayerSession>,
    mut rx: UnboundedReceiver<SessionCmd>,
    playback: PlaybackHandle,
) -> JoinHandle<()> {
    publish(&*player, &playback);

    tokio::spawn(async move {
        while let Some(cmd) = rx.recv().await {
            trace!(guild, ?cmd, "Session command");
            match cmd {
                SessionCmd::Refresh { reply } => {
                    let info = publish(&*player, &playback);
                    let _ = reply.send(Ok(info));
                }
                SessionCmd::SetVolume { volume, reply } => {
                    let r = player.set_volume(volume).await.map_err(CmdError::from);
                    let _ = reply.send(r);
                }
                SessionCmd::PlayOrEnqueue { item, reply } => {
                    let r = play_or_enqueue(&mut *player, item)
                        .await
                        .map_err(CmdError::from);
                    let _ = reply.send(r);
                }
                SessionCmd::Enqueue { item, reply } => {
                    let r = player.queue_add(item).await.map_err(CmdError::from);
                    let _ = reply.send(r);
                }
                SessionCmd::TogglePause { reply } => {
                    let r = toggle_pause(&mut *player).await;
                    if r.is_ok() {
                        refresh_visual(&mut *player, guild, false).await;
                    }
                    let _ = reply.send(r);
                }
                SessionCmd::Skip { reply } => {
                    let r = skip(&mut *player).await;
                    let _ = reply.send(r);
                }
                SessionCmd::SetRepeat { mode, reply } => {
                    player.set_repeat_mode(mode);
                    refresh_visual(&mut *player, guild, true).await;
                    let _ = reply.send(Ok(()));
                }
                SessionCmd::Stop { disconnect, reply } => {
                    let r = stop(&mut *player, disconnect)
                        .await
                        .map_err(CmdError::from);
                    let _ = reply.send(r);
                }
            }

            let info = publish(&*player, &playback);
            if !info.connected {
                debug!(guild, "Player disconnected, closing session");
                break;
            }
        }
    })
}
