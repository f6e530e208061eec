//! The resumable pull batch: taxonomy → per-category ranking → recipe store.
//!
//! Levels are walked strictly large → medium → small. After each category is
//! fully published the checkpoint is rewritten, so a restart resumes at the
//! next category. Once the small level is exhausted the checkpoint is removed.

use std::time::{Duration, Instant};

use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;
use uuid::Uuid;

use recipepull_checkpoint::CheckpointStore;
use recipepull_publisher::recipe_document;
use recipepull_shared::{
    AppConfig, Category, CategoryLevel, RankingDocument, RecipePullError, RecipeSummary, Result,
    TraversalProgress,
};

use crate::sources::{DocumentSink, RecipeSource};

// ---------------------------------------------------------------------------
// Options & results
// ---------------------------------------------------------------------------

/// What to do when a single recipe cannot be published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecipeFailurePolicy {
    /// Abort the whole batch; the category is retried on the next run.
    #[default]
    Abort,
    /// Log it, leave it out of the ranking, and carry on.
    Skip,
}

/// Runtime options for [`PullBatch`].
#[derive(Debug, Clone)]
pub struct PullOptions {
    /// Pause before every ranking fetch.
    pub call_interval: Duration,
    pub failure_policy: RecipeFailurePolicy,
}

impl From<&AppConfig> for PullOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            call_interval: config.rakuten_api.call_interval(),
            failure_policy: if config.pull_batch.skip_failed_recipes {
                RecipeFailurePolicy::Skip
            } else {
                RecipeFailurePolicy::Abort
            },
        }
    }
}

/// Result of one [`PullBatch::run`].
#[derive(Debug, Clone)]
pub struct PullSummary {
    pub run_id: Uuid,
    /// Whether the run continued from an existing checkpoint.
    pub resumed: bool,
    /// Categories processed by this run (not counting earlier runs).
    pub categories_processed: usize,
    /// Categories whose ranking came back empty.
    pub empty_categories: usize,
    pub recipes_published: usize,
    /// Recipes left out under [`RecipeFailurePolicy::Skip`].
    pub recipes_skipped: usize,
    pub elapsed: Duration,
}

/// Outcome of a single category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryOutcome {
    /// The ranking had no recipes; nothing was published.
    Empty,
    Published {
        /// Ids in the published ranking document, in rank order.
        recipes: Vec<u64>,
        skipped: usize,
    },
}

/// Batch lifecycle, for logging and progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Uninitialized,
    Seeded,
    Traversing(CategoryLevel),
    Completed,
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Seeded => f.write_str("seeded"),
            Self::Traversing(level) => write!(f, "traversing {level}"),
            Self::Completed => f.write_str("completed"),
        }
    }
}

/// Progress callback for reporting batch status.
pub trait PullProgress: Send + Sync {
    /// Called on every state transition.
    fn state(&self, state: BatchState);
    /// Called before a category's ranking is fetched.
    fn category_started(&self, level: CategoryLevel, index: usize, total: usize, name: &str);
    /// Called after each recipe document is stored.
    fn recipe_published(&self, recipe_id: u64, title: &str);
    /// Called when the batch completes.
    fn done(&self, summary: &PullSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl PullProgress for SilentProgress {
    fn state(&self, _state: BatchState) {}
    fn category_started(&self, _level: CategoryLevel, _index: usize, _total: usize, _name: &str) {}
    fn recipe_published(&self, _recipe_id: u64, _title: &str) {}
    fn done(&self, _summary: &PullSummary) {}
}

// ---------------------------------------------------------------------------
// PullBatch
// ---------------------------------------------------------------------------

/// The traversal engine. Owns the in-memory progress for the duration of a run.
pub struct PullBatch<'a, S, D> {
    source: &'a S,
    sink: &'a D,
    store: &'a CheckpointStore,
    options: PullOptions,
}

impl<'a, S: RecipeSource, D: DocumentSink> PullBatch<'a, S, D> {
    pub fn new(
        source: &'a S,
        sink: &'a D,
        store: &'a CheckpointStore,
        options: PullOptions,
    ) -> Self {
        Self {
            source,
            sink,
            store,
            options,
        }
    }

    /// Run (or resume) the batch to completion.
    ///
    /// 1. Load the checkpoint, or seed the taxonomy with one "list all" call
    /// 2. Walk large, medium, small from each level's resume index
    /// 3. Save the checkpoint after every category
    /// 4. Remove the checkpoint once everything is published
    ///
    /// Any error aborts immediately and leaves the last checkpoint in place.
    pub async fn run(&self, progress: &dyn PullProgress) -> Result<PullSummary> {
        let run_id = Uuid::now_v7();
        let span = info_span!("pull_batch", %run_id, checkpoint = %self.store.path().display());
        self.run_inner(run_id, progress).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, progress: &dyn PullProgress) -> Result<PullSummary> {
        let start = Instant::now();
        info!("start pull batch");

        let (mut state, resumed) = match self.store.load()? {
            Some(state) => {
                info!(
                    large = state.completed_count(CategoryLevel::Large),
                    medium = state.completed_count(CategoryLevel::Medium),
                    small = state.completed_count(CategoryLevel::Small),
                    "resuming from checkpoint"
                );
                (state, true)
            }
            None => {
                transition(progress, BatchState::Uninitialized);
                let taxonomy = self.source.list_all_categories().await?;
                info!(
                    large = taxonomy.large.len(),
                    medium = taxonomy.medium.len(),
                    small = taxonomy.small.len(),
                    "category taxonomy fetched"
                );
                (TraversalProgress::new(taxonomy), false)
            }
        };
        transition(progress, BatchState::Seeded);

        let mut summary = PullSummary {
            run_id,
            resumed,
            categories_processed: 0,
            empty_categories: 0,
            recipes_published: 0,
            recipes_skipped: 0,
            elapsed: Duration::ZERO,
        };

        for level in CategoryLevel::ALL {
            transition(progress, BatchState::Traversing(level));
            self.pull_level(level, &mut state, &mut summary, progress)
                .await?;
        }

        transition(progress, BatchState::Completed);
        self.store.delete()?;

        summary.elapsed = start.elapsed();
        info!(
            categories = summary.categories_processed,
            empty = summary.empty_categories,
            recipes = summary.recipes_published,
            skipped = summary.recipes_skipped,
            elapsed_ms = summary.elapsed.as_millis(),
            "pull batch finished"
        );
        progress.done(&summary);

        Ok(summary)
    }

    /// Process one level from its resume index, checkpointing after each category.
    async fn pull_level(
        &self,
        level: CategoryLevel,
        state: &mut TraversalProgress,
        summary: &mut PullSummary,
        progress: &dyn PullProgress,
    ) -> Result<()> {
        let categories = state.categories.level(level).to_vec();
        let total = categories.len();
        let first = state.resume_index(level);

        if first >= total {
            debug!(%level, total, "level already complete");
            return Ok(());
        }

        for (index, category) in categories.iter().enumerate().skip(first) {
            progress.category_started(level, index, total, &category.name);

            let category_id = ranking_category_id(level, category)?;
            let outcome = self
                .pull_category(&category_id, &category.name, progress)
                .await?;

            summary.categories_processed += 1;
            match outcome {
                CategoryOutcome::Empty => summary.empty_categories += 1,
                CategoryOutcome::Published { recipes, skipped } => {
                    summary.recipes_published += recipes.len();
                    summary.recipes_skipped += skipped;
                }
            }

            state.mark_completed(level, index);
            self.store.save(state)?;
            debug!(%level, index, "checkpoint saved");
        }

        Ok(())
    }

    /// Pause, fetch one category's ranking, and publish it.
    ///
    /// Safe to repeat: every write is an upsert keyed by id.
    pub async fn pull_category(
        &self,
        category_id: &str,
        category_name: &str,
        progress: &dyn PullProgress,
    ) -> Result<CategoryOutcome> {
        tokio::time::sleep(self.options.call_interval).await;

        let ranking = self.source.fetch_ranking(category_id).await?;
        if ranking.recipes.is_empty() {
            info!(category = %category_id, name = %category_name, "recipe not found");
            return Ok(CategoryOutcome::Empty);
        }

        let mut published = Vec::with_capacity(ranking.recipes.len());
        let mut skipped = 0;

        for recipe in &ranking.recipes {
            info!(id = recipe.id, title = %recipe.title, "post recipe");
            match self.publish_recipe(recipe).await {
                Ok(()) => {
                    progress.recipe_published(recipe.id, &recipe.title);
                    published.push(recipe.id);
                }
                Err(e) if self.options.failure_policy == RecipeFailurePolicy::Skip => {
                    warn!(id = recipe.id, error = %e, "recipe not published, leaving it out of the ranking");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            category = %category_id,
            name = %category_name,
            recipes = ?published,
            "post ranking"
        );
        let document = RankingDocument {
            concept: category_name.to_string(),
            recipes: published,
        };
        self.sink.publish_ranking(category_id, &document).await?;

        Ok(CategoryOutcome::Published {
            recipes: document.recipes,
            skipped,
        })
    }

    async fn publish_recipe(&self, recipe: &RecipeSummary) -> Result<()> {
        let document = recipe_document(recipe)?;
        self.sink.publish_recipe(recipe.id, &document).await
    }
}

fn transition(progress: &dyn PullProgress, state: BatchState) {
    debug!(%state, "batch state");
    progress.state(state);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The id the ranking endpoint expects for a category.
///
/// Large categories use their own id. Medium and small categories are nested
/// upstream (`10-275`, `10-275-516`), and that composite id is the last path
/// segment of the category URL.
pub fn ranking_category_id(level: CategoryLevel, category: &Category) -> Result<String> {
    if level == CategoryLevel::Large {
        return Ok(category.id.clone());
    }

    let path = match Url::parse(&category.url) {
        Ok(url) => url.path().to_string(),
        Err(_) => category
            .url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            RecipePullError::validation(format!(
                "{level} category '{}' has no id in its url '{}'",
                category.name, category.url
            ))
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
