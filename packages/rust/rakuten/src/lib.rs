//! Client for the Rakuten Recipe API.
//!
//! Two read-only queries are used by the batch: the category list (which can
//! return all three category levels in a single response) and the per-category
//! ranking of top recipes.

use std::time::Duration;

use recipepull_shared::{
    CategoryLevel, CategoryTaxonomy, RakutenApiConfig, RecipePullError, RecipeRanking, Result,
};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

const CATEGORY_LIST_PATH: &str = "Recipe/CategoryList/";
const CATEGORY_LIST_VERSION: &str = "20121121";
const CATEGORY_RANKING_PATH: &str = "Recipe/CategoryRanking/";
const CATEGORY_RANKING_VERSION: &str = "20121121";

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("recipepull/", env!("CARGO_PKG_VERSION"));

/// Which levels a category-list query should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    /// No `categoryType` filter; every level in one response.
    All,
    /// A single level.
    Only(CategoryLevel),
}

#[derive(Debug, Deserialize)]
struct CategoryListResponse {
    result: CategoryTaxonomy,
}

// ---------------------------------------------------------------------------
// RakutenClient
// ---------------------------------------------------------------------------

/// HTTP client bound to one API endpoint and application id.
#[derive(Debug, Clone)]
pub struct RakutenClient {
    client: Client,
    endpoint: Url,
    app_id: String,
}

impl RakutenClient {
    /// Build a client from the `[rakuten_api]` config section.
    pub fn new(config: &RakutenApiConfig) -> Result<Self> {
        let app_id = config.resolve_app_id()?;

        // `Url::join` drops the last segment of a base without a trailing slash
        let mut raw = config.endpoint.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let endpoint = Url::parse(&raw).map_err(|e| {
            RecipePullError::config(format!("invalid rakuten_api.endpoint '{raw}': {e}"))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RecipePullError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            app_id,
        })
    }

    /// List categories, either all levels at once or a single level.
    #[instrument(skip(self))]
    pub async fn list_categories(&self, filter: CategoryFilter) -> Result<CategoryTaxonomy> {
        let mut url = self.api_url(CATEGORY_LIST_PATH, CATEGORY_LIST_VERSION)?;
        if let CategoryFilter::Only(level) = filter {
            url.query_pairs_mut()
                .append_pair("categoryType", level.as_str());
        }

        let response: CategoryListResponse = self.get_json(url).await?;
        let taxonomy = response.result;

        debug!(
            large = taxonomy.large.len(),
            medium = taxonomy.medium.len(),
            small = taxonomy.small.len(),
            "category list fetched"
        );

        Ok(taxonomy)
    }

    /// Fetch the recipe ranking for a category. An empty id asks for the
    /// overall ranking. An empty result list is not an error.
    #[instrument(skip(self))]
    pub async fn fetch_ranking(&self, category_id: &str) -> Result<RecipeRanking> {
        let mut url = self.api_url(CATEGORY_RANKING_PATH, CATEGORY_RANKING_VERSION)?;
        if !category_id.is_empty() {
            url.query_pairs_mut().append_pair("categoryId", category_id);
        }

        let ranking: RecipeRanking = self.get_json(url).await?;
        debug!(recipes = ranking.recipes.len(), "ranking fetched");
        Ok(ranking)
    }

    /// `{endpoint}/{path}{version}?applicationId=...`
    fn api_url(&self, path: &str, version: &str) -> Result<Url> {
        let mut url = self
            .endpoint
            .join(&format!("{path}{version}"))
            .map_err(|e| RecipePullError::config(format!("cannot build API url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("applicationId", &self.app_id);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let shown = redacted(&url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RecipePullError::Transport(format!("{shown}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RecipePullError::Transport(format!("{shown}: failed to read body: {e}")))?;

        if status.as_u16() != 200 {
            return Err(RecipePullError::Upstream {
                url: shown,
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| RecipePullError::Decode {
            url: shown,
            message: e.to_string(),
        })
    }
}

/// The URL without its query string, so the application id stays out of logs.
fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> RakutenApiConfig {
        RakutenApiConfig {
            app_id: "test-app".into(),
            endpoint: server.uri(),
            timeout_secs: 5,
            ..RakutenApiConfig::default()
        }
    }

    fn fixture(name: &str) -> String {
        let path = format!("../../../fixtures/json/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn endpoint_without_trailing_slash_keeps_its_path() {
        let config = RakutenApiConfig {
            app_id: "abc".into(),
            endpoint: "https://app.rakuten.co.jp/services/api".into(),
            ..RakutenApiConfig::default()
        };
        let client = RakutenClient::new(&config).unwrap();
        let url = client
            .api_url(CATEGORY_LIST_PATH, CATEGORY_LIST_VERSION)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://app.rakuten.co.jp/services/api/Recipe/CategoryList/20121121?applicationId=abc"
        );
        assert_eq!(
            redacted(&url),
            "https://app.rakuten.co.jp/services/api/Recipe/CategoryList/20121121"
        );
    }

    #[tokio::test]
    async fn list_all_categories_omits_type_filter() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Recipe/CategoryList/20121121"))
            .and(query_param("applicationId", "test-app"))
            .and(query_param_is_missing("categoryType"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(fixture("category_list.fixture.json")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = RakutenClient::new(&config_for(&server)).unwrap();
        let taxonomy = client.list_categories(CategoryFilter::All).await.unwrap();

        assert_eq!(taxonomy.large.len(), 2);
        assert_eq!(taxonomy.medium.len(), 2);
        assert_eq!(taxonomy.small.len(), 1);
        assert_eq!(taxonomy.large[0].id, "10");
        assert_eq!(taxonomy.medium[0].id, "275");
        assert_eq!(taxonomy.small[0].parent_id, "275");
    }

    #[tokio::test]
    async fn list_single_level_sends_type_filter() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Recipe/CategoryList/20121121"))
            .and(query_param("categoryType", "medium"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"result":{"medium":[{"categoryId":275,"categoryName":"牛肉","categoryUrl":"https://recipe.rakuten.co.jp/category/10-275/","parentCategoryId":"10"}]}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = RakutenClient::new(&config_for(&server)).unwrap();
        let taxonomy = client
            .list_categories(CategoryFilter::Only(CategoryLevel::Medium))
            .await
            .unwrap();

        assert!(taxonomy.large.is_empty());
        assert_eq!(taxonomy.medium.len(), 1);
        assert!(taxonomy.small.is_empty());
    }

    #[tokio::test]
    async fn fetch_ranking_passes_category_id() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Recipe/CategoryRanking/20121121"))
            .and(query_param("applicationId", "test-app"))
            .and(query_param("categoryId", "10-275"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(fixture("category_ranking.fixture.json")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = RakutenClient::new(&config_for(&server)).unwrap();
        let ranking = client.fetch_ranking("10-275").await.unwrap();

        assert_eq!(ranking.recipes.len(), 2);
        assert_eq!(ranking.recipes[1].id, 2);
        assert_eq!(ranking.recipes[1].title, "豚の生姜焼き");
    }

    #[tokio::test]
    async fn root_ranking_omits_category_id() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Recipe/CategoryRanking/20121121"))
            .and(query_param_is_missing("categoryId"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"result":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = RakutenClient::new(&config_for(&server)).unwrap();
        let ranking = client.fetch_ranking("").await.unwrap();
        assert!(ranking.recipes.is_empty());
    }

    #[tokio::test]
    async fn non_200_is_an_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Recipe/CategoryRanking/20121121"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_string(r#"{"error":"too_many_requests"}"#),
            )
            .mount(&server)
            .await;

        let client = RakutenClient::new(&config_for(&server)).unwrap();
        let err = client.fetch_ranking("10").await.unwrap_err();

        match err {
            RecipePullError::Upstream { url, status, body } => {
                assert_eq!(status, 429);
                assert!(body.contains("too_many_requests"));
                assert!(!url.contains("test-app"), "application id leaked: {url}");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Recipe/CategoryList/20121121"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let client = RakutenClient::new(&config_for(&server)).unwrap();
        let err = client.list_categories(CategoryFilter::All).await.unwrap_err();
        assert!(matches!(err, RecipePullError::Decode { .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let config = RakutenApiConfig {
            app_id: "abc".into(),
            // Port 9 (discard) on loopback: nothing listens there in CI
            endpoint: "http://127.0.0.1:9/".into(),
            timeout_secs: 2,
            ..RakutenApiConfig::default()
        };
        let client = RakutenClient::new(&config).unwrap();
        let err = client.fetch_ranking("10").await.unwrap_err();
        assert!(matches!(err, RecipePullError::Transport(_)));
    }
}
