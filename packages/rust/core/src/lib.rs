//! Batch orchestration for recipepull.
//!
//! This crate ties the Rakuten client, the checkpoint store, and the recipe
//! publisher together into the resumable pull batch (`PullBatch::run`).

pub mod pipeline;
pub mod sources;
