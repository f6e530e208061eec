//! Application configuration for recipepull.
//!
//! The config file defaults to `~/.recipepull/recipepull.toml`; `-c` points
//! the CLI elsewhere. Files ending in `.json` are read as JSON so existing
//! batch configs keep working.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{RecipePullError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "recipepull.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".recipepull";

/// Public Rakuten Web Service API root.
pub const DEFAULT_RAKUTEN_ENDPOINT: &str = "https://app.rakuten.co.jp/services/api/";

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Top-level application config. Loaded once and passed down explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pull_batch: PullBatchConfig,

    #[serde(default)]
    pub rakuten_api: RakutenApiConfig,

    #[serde(default)]
    pub recipe_db: RecipeDbConfig,
}

/// `[pull_batch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullBatchConfig {
    /// Where the traversal checkpoint lives between runs.
    #[serde(default = "default_progress_filepath")]
    pub progress_filepath: PathBuf,

    /// Keep going past a recipe the store rejects instead of aborting.
    #[serde(default)]
    pub skip_failed_recipes: bool,
}

impl Default for PullBatchConfig {
    fn default() -> Self {
        Self {
            progress_filepath: default_progress_filepath(),
            skip_failed_recipes: false,
        }
    }
}

fn default_progress_filepath() -> PathBuf {
    PathBuf::from("recipepull.progress.json")
}

/// `[rakuten_api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RakutenApiConfig {
    /// Application id. When empty, read from the env var named by `app_id_env`.
    #[serde(default)]
    pub app_id: String,

    #[serde(default = "default_app_id_env")]
    pub app_id_env: String,

    /// Mandatory pause before every ranking fetch.
    #[serde(default = "default_call_interval")]
    pub call_interval_sec: u64,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for RakutenApiConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_id_env: default_app_id_env(),
            call_interval_sec: default_call_interval(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout(),
        }
    }
}

impl RakutenApiConfig {
    /// The inter-call pause as a [`Duration`].
    pub fn call_interval(&self) -> Duration {
        Duration::from_secs(self.call_interval_sec)
    }

    /// Resolve the application id from the config or the environment.
    pub fn resolve_app_id(&self) -> Result<String> {
        if !self.app_id.is_empty() {
            return Ok(self.app_id.clone());
        }
        let var_name = &self.app_id_env;
        match std::env::var(var_name) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Err(RecipePullError::config(format!(
                "Rakuten application id not found. Set rakuten_api.app_id or the {var_name} environment variable."
            ))),
        }
    }
}

fn default_app_id_env() -> String {
    "RAKUTEN_APP_ID".into()
}
fn default_call_interval() -> u64 {
    1
}
fn default_endpoint() -> String {
    DEFAULT_RAKUTEN_ENDPOINT.into()
}
fn default_timeout() -> u64 {
    30
}

/// `[recipe_db]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDbConfig {
    /// `host[:port]` of the document store.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_index")]
    pub index: String,

    #[serde(default = "default_recipe_doctype")]
    pub recipe_doctype: String,

    #[serde(default = "default_ranking_doctype")]
    pub ranking_doctype: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for RecipeDbConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            index: default_index(),
            recipe_doctype: default_recipe_doctype(),
            ranking_doctype: default_ranking_doctype(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_host() -> String {
    "localhost:9200".into()
}
fn default_index() -> String {
    "recipes".into()
}
fn default_recipe_doctype() -> String {
    "recipe".into()
}
fn default_ranking_doctype() -> String {
    "ranking".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.recipepull/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RecipePullError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the default config file (`~/.recipepull/recipepull.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the config from the default location. Returns defaults if absent.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the config from a specific file path (TOML, or JSON for `.json`).
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RecipePullError::io(path, e))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).map_err(|e| {
            RecipePullError::config(format!("failed to parse {}: {e}", path.display()))
        })
    } else {
        toml::from_str(&content).map_err(|e| {
            RecipePullError::config(format!("failed to parse {}: {e}", path.display()))
        })
    }
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RecipePullError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| RecipePullError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RecipePullError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configs the batch cannot run with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    config.rakuten_api.resolve_app_id()?;

    Url::parse(&config.rakuten_api.endpoint).map_err(|e| {
        RecipePullError::config(format!(
            "invalid rakuten_api.endpoint '{}': {e}",
            config.rakuten_api.endpoint
        ))
    })?;

    let db = &config.recipe_db;
    for (name, value) in [
        ("recipe_db.host", &db.host),
        ("recipe_db.index", &db.index),
        ("recipe_db.recipe_doctype", &db.recipe_doctype),
        ("recipe_db.ranking_doctype", &db.ranking_doctype),
    ] {
        if value.trim().is_empty() {
            return Err(RecipePullError::config(format!("{name} must not be empty")));
        }
    }

    if config.pull_batch.progress_filepath.as_os_str().is_empty() {
        return Err(RecipePullError::config(
            "pull_batch.progress_filepath must not be empty",
        ));
    }

    Ok(())
}
