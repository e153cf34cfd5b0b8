//! Settings for sessions, ingestion pacing and logging.
//!
//! `schema` holds the serde types with their defaults, `load` layers the
//! optional TOML file and `ALLEGRO__*` environment overrides on top.

mod load;
mod schema;

pub use load::{default_config_path, resolve_config_path};
pub use schema::*;
