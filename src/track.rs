//! Track metadata: caller descriptors, backend-loaded tracks and queue items.
//!
//! `resolver` turns a descriptor into a loaded track through the backend,
//! `builder` merges both into the immutable item stored in a session queue.

mod builder;
mod model;
mod resolver;

pub use builder::build_queue_item;
pub use model::*;
pub use resolver::{Resolution, TrackResolver};
