use std::fmt;

use crate::backend::RepeatMode;
use crate::session::Placement;

/// Result of a single-track play request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOutcome {
    pub placement: Placement,
    /// "Title by Artist" of the requested track.
    pub track: String,
}

impl PlayOutcome {
    pub fn label(&self) -> String {
        match self.placement {
            Placement::Started => format!("Playing: {}", self.track),
            Placement::Queued => format!("Queued: {}", self.track),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipOutcome {
    pub skipped: String,
}

impl SkipOutcome {
    pub fn label(&self) -> String {
        format!("Skipped {}.", self.skipped)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RepeatOutcome {
    pub mode: RepeatMode,
}

impl RepeatOutcome {
    pub fn label(&self) -> &'static str {
        match self.mode {
            RepeatMode::None => "Repeat mode disabled",
            RepeatMode::Track => "Now repeating current track",
            RepeatMode::Queue => "Now repeating the entire queue",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StopOutcome {
    pub disconnected: bool,
}

impl StopOutcome {
    pub fn label(&self) -> &'static str {
        if self.disconnected {
            "Stopped and disconnected"
        } else {
            "Stopped"
        }
    }
}

macro_rules! display_label {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.label())
            }
        })*
    };
}

display_label!(PlayOutcome, SkipOutcome, RepeatOutcome, StopOutcome);
