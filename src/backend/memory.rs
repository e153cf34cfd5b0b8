//! In-process streaming backend.
//!
//! Keeps a scripted catalogue of loadable references and a player per guild.
//! Used by the dry-run binary and by the tests, which inspect the call
//! counters and per-guild player state through [`MemoryBackend::snapshot`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::track::{BackendHandle, LoadedTrack, QueueItem};

use super::types::{
    BackendError, GuildId, JoinPolicy, PlayOptions, PlayerSession, PlayerState, RepeatMode,
    Retrieval, SearchMode, SessionConfig, SessionRequest, StreamingBackend, SupportsVisualRefresh,
};

/// A loaded track whose title and identifier are both `reference`.
pub fn stub_track(reference: &str) -> LoadedTrack {
    LoadedTrack {
        identifier: reference.to_string(),
        title: Some(reference.to_string()),
        author: None,
        artwork_uri: None,
        handle: BackendHandle::new(format!("enc:{reference}")),
    }
}

#[derive(Debug, Default)]
struct PlayerData {
    state: PlayerState,
    repeat: RepeatMode,
    current: Option<QueueItem>,
    queue: VecDeque<QueueItem>,
    volume: f32,
    connected: bool,
    config: Option<SessionConfig>,
    refreshes: Vec<bool>,
    fail_next_adds: usize,
    fail_next_volumes: usize,
}

/// Read-only view of one guild's player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub state: PlayerState,
    pub repeat: RepeatMode,
    pub current: Option<String>,
    pub queued: Vec<String>,
    pub volume: f32,
    pub connected: bool,
    pub config: Option<SessionConfig>,
    /// One entry per visual refresh; `true` for full refreshes.
    pub refreshes: Vec<bool>,
}

#[derive(Debug, Default)]
struct Catalogue {
    direct: HashMap<String, LoadedTrack>,
    search: HashMap<String, LoadedTrack>,
    /// Remaining loads that must come back empty, per reference.
    misses: HashMap<String, usize>,
    /// Remaining loads that must fail with a backend error, per reference.
    errors: HashMap<String, usize>,
    loads: Vec<(String, SearchMode)>,
}

#[derive(Debug, Default)]
struct Sessions {
    players: HashMap<GuildId, Arc<Mutex<PlayerData>>>,
    created: usize,
    retrievals: usize,
    user_absent: bool,
    retrieval_error: Option<BackendError>,
    /// Volume changes that fail on the next player created.
    volume_failures: usize,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    catalogue: Mutex<Catalogue>,
    sessions: Mutex<Sessions>,
    visual_refresh: bool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking test must not cascade into every other assertion.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Players created by this backend expose [`SupportsVisualRefresh`].
    pub fn with_visual_refresh(mut self) -> Self {
        self.visual_refresh = true;
        self
    }

    /// Make every reference in `refs` loadable directly.
    pub fn with_tracks<'a>(self, refs: impl IntoIterator<Item = &'a str>) -> Self {
        for r in refs {
            self.add_track(r, stub_track(r));
        }
        self
    }

    pub fn add_track(&self, reference: &str, track: LoadedTrack) {
        lock(&self.catalogue)
            .direct
            .insert(reference.to_string(), track);
    }

    /// Only reachable through [`SearchMode::KeywordSearch`].
    pub fn add_search_result(&self, reference: &str, track: LoadedTrack) {
        lock(&self.catalogue)
            .search
            .insert(reference.to_string(), track);
    }

    /// The next `times` loads of `reference` find nothing, whatever the catalogue says.
    pub fn miss_loads(&self, reference: &str, times: usize) {
        lock(&self.catalogue)
            .misses
            .insert(reference.to_string(), times);
    }

    /// The next `times` loads of `reference` fail with a backend error.
    pub fn fail_loads(&self, reference: &str, times: usize) {
        lock(&self.catalogue)
            .errors
            .insert(reference.to_string(), times);
    }

    pub fn set_user_absent(&self, absent: bool) {
        lock(&self.sessions).user_absent = absent;
    }

    pub fn fail_retrievals(&self, error: Option<BackendError>) {
        lock(&self.sessions).retrieval_error = error;
    }

    /// The next `times` queue insertions on `guild`'s player fail.
    pub fn fail_queue_adds(&self, guild: GuildId, times: usize) {
        if let Some(p) = lock(&self.sessions).players.get(&guild) {
            lock(p).fail_next_adds = times;
        }
    }

    /// The next player created rejects its first `times` volume changes.
    pub fn fail_volume_changes(&self, times: usize) {
        lock(&self.sessions).volume_failures = times;
    }

    /// Simulate the inactivity timeout or an external kick.
    pub fn drop_connection(&self, guild: GuildId) {
        if let Some(p) = lock(&self.sessions).players.get(&guild) {
            let mut p = lock(p);
            p.connected = false;
            p.state = PlayerState::Disconnected;
        }
    }

    pub fn load_calls(&self) -> Vec<(String, SearchMode)> {
        lock(&self.catalogue).loads.clone()
    }

    pub fn sessions_created(&self) -> usize {
        lock(&self.sessions).created
    }

    pub fn retrieval_calls(&self) -> usize {
        lock(&self.sessions).retrievals
    }

    pub fn snapshot(&self, guild: GuildId) -> Option<PlayerView> {
        let sessions = lock(&self.sessions);
        let p = lock(sessions.players.get(&guild)?);
        Some(PlayerView {
            state: p.state,
            repeat: p.repeat,
            current: p.current.as_ref().map(|i| i.title().to_string()),
            queued: p.queue.iter().map(|i| i.title().to_string()).collect(),
            volume: p.volume,
            connected: p.connected,
            config: p.config.clone(),
            refreshes: p.refreshes.clone(),
        })
    }
}

#[async_trait]
impl StreamingBackend for MemoryBackend {
    async fn retrieve_session(
        &self,
        request: &SessionRequest,
        config: &SessionConfig,
        policy: JoinPolicy,
    ) -> Result<Retrieval, BackendError> {
        let mut sessions = lock(&self.sessions);
        sessions.retrievals += 1;
        if let Some(e) = sessions.retrieval_error.clone() {
            return Err(e);
        }
        if sessions.user_absent {
            return Ok(Retrieval::UserNotInChannel);
        }

        let live = sessions
            .players
            .get(&request.guild)
            .filter(|p| lock(p).connected)
            .cloned();
        if let Some(data) = live {
            return Ok(Retrieval::Existing(Box::new(MemorySession {
                data,
                visual_refresh: self.visual_refresh,
            })));
        }

        match policy {
            JoinPolicy::NoJoin => Ok(Retrieval::BotNotConnected),
            JoinPolicy::Join => {
                let data = Arc::new(Mutex::new(PlayerData {
                    volume: 1.0,
                    connected: true,
                    config: Some(config.clone()),
                    fail_next_volumes: std::mem::take(&mut sessions.volume_failures),
                    ..PlayerData::default()
                }));
                sessions.players.insert(request.guild, data.clone());
                sessions.created += 1;
                Ok(Retrieval::Created(Box::new(MemorySession {
                    data,
                    visual_refresh: self.visual_refresh,
                })))
            }
        }
    }

    async fn load_track(
        &self,
        reference: &str,
        mode: SearchMode,
    ) -> Result<Option<LoadedTrack>, BackendError> {
        let mut cat = lock(&self.catalogue);
        cat.loads.push((reference.to_string(), mode));

        if let Some(left) = cat.errors.get_mut(reference).filter(|n| **n > 0) {
            *left -= 1;
            return Err(BackendError::Request(format!("load of {reference} timed out")));
        }
        if let Some(left) = cat.misses.get_mut(reference).filter(|n| **n > 0) {
            *left -= 1;
            return Ok(None);
        }

        let table = match mode {
            SearchMode::Direct => &cat.direct,
            SearchMode::KeywordSearch => &cat.search,
        };
        Ok(table.get(reference).cloned())
    }
}

/// Player handed out by [`MemoryBackend`]; shares its data with the backend.
struct MemorySession {
    data: Arc<Mutex<PlayerData>>,
    visual_refresh: bool,
}

impl MemorySession {
    fn data(&self) -> MutexGuard<'_, PlayerData> {
        lock(&self.data)
    }

    fn ensure_connected(&self) -> Result<MutexGuard<'_, PlayerData>, BackendError> {
        let d = self.data();
        if d.connected {
            Ok(d)
        } else {
            Err(BackendError::Disconnected)
        }
    }
}

#[async_trait]
impl PlayerSession for MemorySession {
    fn state(&self) -> PlayerState {
        self.data().state
    }

    fn repeat_mode(&self) -> RepeatMode {
        self.data().repeat
    }

    fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.data().repeat = mode;
    }

    fn current(&self) -> Option<QueueItem> {
        self.data().current.clone()
    }

    fn queue_len(&self) -> usize {
        self.data().queue.len()
    }

    fn volume(&self) -> f32 {
        self.data().volume
    }

    fn is_connected(&self) -> bool {
        self.data().connected
    }

    async fn set_volume(&mut self, volume: f32) -> Result<(), BackendError> {
        let mut d = self.ensure_connected()?;
        if d.fail_next_volumes > 0 {
            d.fail_next_volumes -= 1;
            return Err(BackendError::Request("volume update timed out".into()));
        }
        d.volume = volume.clamp(0.0, 1.0);
        Ok(())
    }

    async fn play(&mut self, item: QueueItem, options: PlayOptions) -> Result<(), BackendError> {
        let mut d = self.ensure_connected()?;
        if options.no_replace && d.state.is_active() {
            d.queue.push_back(item);
        } else {
            d.current = Some(item);
            d.state = PlayerState::Playing;
        }
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), BackendError> {
        let mut d = self.ensure_connected()?;
        if d.state != PlayerState::Playing {
            return Err(BackendError::Rejected("player is not playing".into()));
        }
        d.state = PlayerState::Paused;
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), BackendError> {
        let mut d = self.ensure_connected()?;
        if d.state != PlayerState::Paused {
            return Err(BackendError::Rejected("player is not paused".into()));
        }
        d.state = PlayerState::Playing;
        Ok(())
    }

    async fn skip(&mut self, count: usize) -> Result<(), BackendError> {
        let mut d = self.ensure_connected()?;
        let mut next = None;
        for _ in 0..count.max(1) {
            next = d.queue.pop_front();
        }
        d.state = if next.is_some() {
            PlayerState::Playing
        } else {
            PlayerState::Idle
        };
        d.current = next;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), BackendError> {
        let mut d = self.ensure_connected()?;
        d.current = None;
        d.state = PlayerState::Idle;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), BackendError> {
        let mut d = self.data();
        d.current = None;
        d.queue.clear();
        d.connected = false;
        d.state = PlayerState::Disconnected;
        Ok(())
    }

    async fn queue_add(&mut self, item: QueueItem) -> Result<(), BackendError> {
        let mut d = self.ensure_connected()?;
        if d.fail_next_adds > 0 {
            d.fail_next_adds -= 1;
            return Err(BackendError::Request("queue insert dropped".into()));
        }
        d.queue.push_back(item);
        Ok(())
    }

    async fn queue_clear(&mut self) -> Result<(), BackendError> {
        self.ensure_connected()?.queue.clear();
        Ok(())
    }

    fn visual_refresh(&mut self) -> Option<&mut dyn SupportsVisualRefresh> {
        if self.visual_refresh { Some(self) } else { None }
    }
}

#[async_trait]
impl SupportsVisualRefresh for MemorySession {
    async fn refresh_visual(&mut self, full: bool) -> Result<(), BackendError> {
        self.data().refreshes.push(full);
        Ok(())
    }
}
