//! Seams between the batch and its HTTP collaborators.
//!
//! The batch only needs "list every category", "rank one category", and
//! "store one document". Keeping those behind traits lets the state machine be
//! exercised with in-memory fakes.

use recipepull_publisher::RecipeDbPublisher;
use recipepull_rakuten::{CategoryFilter, RakutenClient};
use recipepull_shared::{
    CategoryTaxonomy, RankingDocument, RecipeDocument, RecipeRanking, Result,
};

/// Where categories and rankings come from.
#[allow(async_fn_in_trait)]
pub trait RecipeSource {
    /// Every category at every level, in a single call.
    async fn list_all_categories(&self) -> Result<CategoryTaxonomy>;

    /// Ranked recipes for one category. An empty list is a valid answer.
    async fn fetch_ranking(&self, category_id: &str) -> Result<RecipeRanking>;
}

/// Where published documents go. Both operations must be idempotent upserts.
#[allow(async_fn_in_trait)]
pub trait DocumentSink {
    async fn publish_recipe(&self, recipe_id: u64, document: &RecipeDocument) -> Result<()>;

    async fn publish_ranking(&self, category_id: &str, document: &RankingDocument) -> Result<()>;
}

impl RecipeSource for RakutenClient {
    async fn list_all_categories(&self) -> Result<CategoryTaxonomy> {
        self.list_categories(CategoryFilter::All).await
    }

    async fn fetch_ranking(&self, category_id: &str) -> Result<RecipeRanking> {
        RakutenClient::fetch_ranking(self, category_id).await
    }
}

impl DocumentSink for RecipeDbPublisher {
    async fn publish_recipe(&self, recipe_id: u64, document: &RecipeDocument) -> Result<()> {
        RecipeDbPublisher::publish_recipe(self, recipe_id, document).await
    }

    async fn publish_ranking(&self, category_id: &str, document: &RankingDocument) -> Result<()> {
        RecipeDbPublisher::publish_ranking(self, category_id, document).await
    }
}
