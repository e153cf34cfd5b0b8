//! Per-guild playback sessions.
//!
//! `registry` guarantees one live session per guild, `actor` owns the backend
//! player and applies commands in order, `handle` is the cloneable front end
//! the rest of the crate talks to.

mod actor;
mod handle;
mod registry;
mod types;

pub use handle::SessionHandle;
pub use registry::{DEFAULT_VOLUME, SessionRegistry};
pub use types::{PauseToggle, Placement, PlaybackHandle, PlaybackInfo, RequestContext};
