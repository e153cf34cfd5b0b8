use std::time::Duration;

use rand::Rng;

use crate::config::{IngestSettings, RetryPacingSetting};

/// Wait applied before each attempt of the recovery pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum RetryPacing {
    /// Same wait before every attempt.
    #[default]
    Fixed,
    /// Base wait doubled per attempt, clamped to `max`, plus up to `jitter`.
    Exponential { max: Duration, jitter: Duration },
}

impl RetryPacing {
    pub fn from_settings(settings: &IngestSettings) -> Self {
        match settings.retry_pacing {
            RetryPacingSetting::Fixed => Self::Fixed,
            RetryPacingSetting::Exponential => Self::Exponential {
                max: Duration::from_millis(settings.retry_max_delay_ms),
                jitter: Duration::from_millis(settings.retry_jitter_ms),
            },
        }
    }

    /// Wait before the `attempt`-th retry (zero-based) of a pass.
    pub fn delay(&self, base: Duration, attempt: u32) -> Duration {
        match *self {
            Self::Fixed => base,
            Self::Exponential { max, jitter } => {
                let scaled = base
                    .checked_mul(2u32.saturating_pow(attempt))
                    .unwrap_or(max)
                    .min(max);
                scaled + random_jitter(jitter)
            }
        }
    }
}

fn random_jitter(max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}
