//! Shared types, error model, and configuration for recipepull.
//!
//! This crate is the foundation depended on by all other recipepull crates.
//! It provides:
//! - [`RecipePullError`] is the unified error type
//! - Domain types ([`Category`], [`CategoryTaxonomy`], [`TraversalProgress`], ...)
//! - Configuration ([`AppConfig`] and its sections, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_RAKUTEN_ENDPOINT, PullBatchConfig, RakutenApiConfig, RecipeDbConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{RecipePullError, Result};
pub use types::{
    Category, CategoryLevel, CategoryTaxonomy, LevelCursor, RankingDocument, RecipeDocument,
    RecipeRanking, RecipeSummary, TraversalProgress,
};
