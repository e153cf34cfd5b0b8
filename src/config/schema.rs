use std::time::Duration;

use serde::Deserialize;

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/allegro/config.toml` or `~/.config/allegro/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `ALLEGRO__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub player: PlayerSettings,
    pub ingest: IngestSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Seconds of silence before the backend tears a session down.
    pub inactivity_timeout_secs: u64,
    /// Join voice channels deafened.
    pub self_deaf: bool,
    /// Leave the voice channel whenever playback is stopped.
    pub disconnect_on_stop: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: 120,
            self_deaf: true,
            disconnect_on_stop: false,
        }
    }
}

impl PlayerSettings {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Number of tracks resolved per batch.
    pub batch_size: usize,
    /// Pause after every track (milliseconds).
    pub item_delay_ms: u64,
    /// Extra pause between two batches (milliseconds).
    pub batch_delay_ms: u64,
    /// Base wait before each recovery attempt (milliseconds).
    pub retry_delay_ms: u64,
    /// Pause after a recovered track (milliseconds).
    pub retry_gap_ms: u64,
    /// How the wait before a recovery attempt evolves.
    pub retry_pacing: RetryPacingSetting,
    /// Upper bound for exponential pacing (milliseconds).
    pub retry_max_delay_ms: u64,
    /// Random extra wait added under exponential pacing (milliseconds).
    pub retry_jitter_ms: u64,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batch_size: 3,
            item_delay_ms: 100,
            batch_delay_ms: 300,
            retry_delay_ms: 500,
            retry_gap_ms: 300,
            retry_pacing: RetryPacingSetting::Fixed,
            retry_max_delay_ms: 4_000,
            retry_jitter_ms: 250,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryPacingSetting {
    #[serde(alias = "constant")]
    Fixed,
    #[serde(alias = "backoff", alias = "exponential-backoff")]
    Exponential,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive; `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
