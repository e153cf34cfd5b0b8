//! Streaming backend capabilities consumed by the core.
//!
//! `types` defines the traits and value types, `memory` is an in-process
//! implementation used for dry runs and tests.

pub mod memory;
mod types;

pub use types::*;
