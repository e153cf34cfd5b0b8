//! Caller-facing errors of the player service.

use std::fmt;

use crate::backend::BackendError;

/// The player operation a failure belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    Connect,
    Play,
    Queue,
    Pause,
    Skip,
    Repeat,
    Stop,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "Connect",
            Self::Play => "Play",
            Self::Queue => "Queue",
            Self::Pause => "Pause",
            Self::Skip => "Skip",
            Self::Repeat => "Repeat",
            Self::Stop => "Stop",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("You must be in a voice channel to use the music player.")]
    UserNotPresent,

    #[error("{operation}: no active player found")]
    NoActiveSession { operation: Operation },

    #[error("{operation}: no track is currently playing")]
    NoActiveTrack { operation: Operation },

    #[error("Failed to load track: {title}")]
    TrackUnavailable { title: String },

    #[error("{operation} failed: {source}")]
    Session {
        operation: Operation,
        #[source]
        source: BackendError,
    },
}

impl PlayerError {
    pub(crate) fn session(operation: Operation, source: BackendError) -> Self {
        Self::Session { operation, source }
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::NoActiveSession { operation }
            | Self::NoActiveTrack { operation }
            | Self::Session { operation, .. } => Some(*operation),
            Self::TrackUnavailable { .. } => Some(Operation::Play),
            Self::UserNotPresent => None,
        }
    }

    /// Only backend failures may clear up on their own; the rest need the user to act.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Session { .. })
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
