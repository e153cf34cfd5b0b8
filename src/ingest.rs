//! Bulk queue imports.
//!
//! `batch` walks the descriptors in fixed-size batches with pacing delays and
//! runs the single recovery pass, `retry` decides how long that pass waits
//! before each attempt.

mod batch;
mod retry;

pub use batch::{IngestReport, Ingestor};
pub use retry::RetryPacing;

#[cfg(test)]
mod tests;
