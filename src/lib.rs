//! Per-guild playback sessions over a remote streaming backend.
//!
//! A [`player::PlayerService`] turns chat commands into session commands.
//! Each guild's player is owned by one session actor, so concurrent
//! commands never interleave inside a player operation, and bulk imports
//! go through the paced [`ingest::Ingestor`].

pub mod backend;
pub mod config;
pub mod error;
pub mod ingest;
pub mod player;
pub mod session;
pub mod track;

pub use error::{Operation, PlayerError};
