//! Publishes recipe and ranking documents to the recipe store.
//!
//! Every document is upserted by id at `{index}/{doctype}/{id}`, so
//! re-publishing after a crash overwrites with identical content.

use std::time::Duration;

use recipepull_shared::{
    RankingDocument, RecipeDbConfig, RecipeDocument, RecipePullError, RecipeSummary, Result,
};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

/// User-Agent string for store requests.
const USER_AGENT: &str = concat!("recipepull/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Document transforms
// ---------------------------------------------------------------------------

/// Build the stored form of a ranked recipe.
pub fn recipe_document(recipe: &RecipeSummary) -> Result<RecipeDocument> {
    Ok(RecipeDocument {
        materials: recipe.materials.clone(),
        title: recipe.title.clone(),
        description: recipe.description.clone(),
        image_url: secure_image_url(&recipe.large_image_url)?,
        detail_url: recipe.url.clone(),
    })
}

/// Force an image URL onto `https`, whatever scheme the API returned.
pub fn secure_image_url(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Ok(String::new());
    }

    let parsed = match Url::parse(raw) {
        Err(url::ParseError::RelativeUrlWithoutBase) if raw.starts_with("//") => {
            Url::parse(&format!("https:{raw}"))
        }
        other => other,
    };
    let mut url = parsed
        .map_err(|e| RecipePullError::validation(format!("invalid image url '{raw}': {e}")))?;
    url.set_scheme("https").map_err(|()| {
        RecipePullError::validation(format!("image url '{raw}' cannot use https"))
    })?;

    Ok(url.into())
}

// ---------------------------------------------------------------------------
// RecipeDbPublisher
// ---------------------------------------------------------------------------

/// HTTP publisher bound to one store host and index.
#[derive(Debug, Clone)]
pub struct RecipeDbPublisher {
    client: Client,
    base: Url,
    index: String,
    recipe_doctype: String,
    ranking_doctype: String,
}

impl RecipeDbPublisher {
    /// Build a publisher from the `[recipe_db]` config section.
    pub fn new(config: &RecipeDbConfig) -> Result<Self> {
        let raw = if config.host.contains("://") {
            config.host.clone()
        } else {
            format!("http://{}/", config.host)
        };
        let base = Url::parse(&raw).map_err(|e| {
            RecipePullError::config(format!("invalid recipe_db.host '{}': {e}", config.host))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RecipePullError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            index: config.index.clone(),
            recipe_doctype: config.recipe_doctype.clone(),
            ranking_doctype: config.ranking_doctype.clone(),
        })
    }

    /// Upsert one recipe document under its recipe id.
    #[instrument(skip(self, document), fields(title = %document.title))]
    pub async fn publish_recipe(&self, recipe_id: u64, document: &RecipeDocument) -> Result<()> {
        let url = self.document_url(&self.recipe_doctype, &recipe_id.to_string())?;
        self.put_json(url, document).await
    }

    /// Upsert one category's ranking document under its category id.
    #[instrument(skip(self, document), fields(concept = %document.concept))]
    pub async fn publish_ranking(
        &self,
        category_id: &str,
        document: &RankingDocument,
    ) -> Result<()> {
        let url = self.document_url(&self.ranking_doctype, category_id)?;
        self.put_json(url, document).await
    }

    /// `{base}/{index}/{doctype}/{id}`, each part percent-encoded as one segment.
    fn document_url(&self, doctype: &str, id: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                RecipePullError::config(format!("recipe_db.host '{}' cannot be a base", self.base))
            })?
            .pop_if_empty()
            .push(&self.index)
            .push(doctype)
            .push(id);
        Ok(url)
    }

    async fn put_json<T: Serialize>(&self, url: Url, document: &T) -> Result<()> {
        let shown = url.to_string();

        let response = self
            .client
            .put(url)
            .json(document)
            .send()
            .await
            .map_err(|e| RecipePullError::Transport(format!("{shown}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "(failed to read)".into());
            return Err(RecipePullError::Publish {
                url: shown,
                status: status.as_u16(),
                body,
            });
        }

        debug!(url = %shown, status = status.as_u16(), "document stored");
        Ok(())
    }
}
