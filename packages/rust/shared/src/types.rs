//! Core domain types: the category taxonomy, traversal progress, and the
//! recipe/ranking shapes exchanged with the upstream API and the recipe store.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{RecipePullError, Result};

// ---------------------------------------------------------------------------
// CategoryLevel
// ---------------------------------------------------------------------------

/// One tier of the three-level category hierarchy.
///
/// Declaration order is traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryLevel {
    Large,
    Medium,
    Small,
}

impl CategoryLevel {
    /// All levels in traversal order.
    pub const ALL: [CategoryLevel; 3] = [Self::Large, Self::Medium, Self::Small];

    /// Wire name used by the upstream `categoryType` parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Large => "large",
            Self::Medium => "medium",
            Self::Small => "small",
        }
    }
}

impl std::fmt::Display for CategoryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CategoryLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "large" => Ok(Self::Large),
            "medium" => Ok(Self::Medium),
            "small" => Ok(Self::Small),
            other => Err(format!("unknown category level '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// A single upstream category. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "categoryId", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "categoryName")]
    pub name: String,
    /// Opaque locator; for medium/small categories its last path segment is
    /// the id the ranking endpoint expects.
    #[serde(rename = "categoryUrl", default)]
    pub url: String,
    /// Empty for large categories.
    #[serde(
        rename = "parentCategoryId",
        default,
        deserialize_with = "string_or_number"
    )]
    pub parent_id: String,
}

/// The upstream API sends some ids as strings and others as bare numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}

// ---------------------------------------------------------------------------
// CategoryTaxonomy
// ---------------------------------------------------------------------------

/// Per-level ordered category lists, in the order the API returned them.
///
/// A missing list decodes as empty ("not yet reached").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTaxonomy {
    #[serde(default)]
    pub large: Vec<Category>,
    #[serde(default)]
    pub medium: Vec<Category>,
    #[serde(default)]
    pub small: Vec<Category>,
}

impl CategoryTaxonomy {
    /// Categories at one level.
    pub fn level(&self, level: CategoryLevel) -> &[Category] {
        match level {
            CategoryLevel::Large => &self.large,
            CategoryLevel::Medium => &self.medium,
            CategoryLevel::Small => &self.small,
        }
    }

    /// Total number of categories across all levels.
    pub fn total(&self) -> usize {
        self.large.len() + self.medium.len() + self.small.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

// ---------------------------------------------------------------------------
// TraversalProgress
// ---------------------------------------------------------------------------

/// Index of the last fully published category, per level.
///
/// `None` means nothing at that level is done yet, which is distinct from
/// `Some(0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCursor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small: Option<usize>,
}

impl LevelCursor {
    pub fn get(&self, level: CategoryLevel) -> Option<usize> {
        match level {
            CategoryLevel::Large => self.large,
            CategoryLevel::Medium => self.medium,
            CategoryLevel::Small => self.small,
        }
    }

    pub fn set(&mut self, level: CategoryLevel, index: usize) {
        let slot = match level {
            CategoryLevel::Large => &mut self.large,
            CategoryLevel::Medium => &mut self.medium,
            CategoryLevel::Small => &mut self.small,
        };
        *slot = Some(index);
    }
}

/// The resumable state of a batch run; this is what the checkpoint stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalProgress {
    #[serde(default)]
    pub categories: CategoryTaxonomy,
    #[serde(default)]
    pub last_completed: LevelCursor,
}

impl TraversalProgress {
    /// Fresh progress over a newly fetched taxonomy.
    pub fn new(categories: CategoryTaxonomy) -> Self {
        Self {
            categories,
            last_completed: LevelCursor::default(),
        }
    }

    /// First index at `level` that still needs processing.
    pub fn resume_index(&self, level: CategoryLevel) -> usize {
        self.last_completed.get(level).map_or(0, |i| i + 1)
    }

    /// Number of categories at `level` already published.
    pub fn completed_count(&self, level: CategoryLevel) -> usize {
        self.resume_index(level)
            .min(self.categories.level(level).len())
    }

    /// Record that `index` (and everything before it) at `level` is published.
    pub fn mark_completed(&mut self, level: CategoryLevel, index: usize) {
        debug_assert!(index < self.categories.level(level).len());
        self.last_completed.set(level, index);
    }

    /// True once every category at every level has been published.
    pub fn is_complete(&self) -> bool {
        CategoryLevel::ALL
            .iter()
            .all(|&level| self.is_level_complete(level))
    }

    pub fn is_level_complete(&self, level: CategoryLevel) -> bool {
        self.completed_count(level) == self.categories.level(level).len()
    }

    /// Check the cursor invariants: every recorded index points into its
    /// level, and a level only has progress once all higher levels are done.
    pub fn validate(&self) -> Result<()> {
        for (pos, &level) in CategoryLevel::ALL.iter().enumerate() {
            let Some(index) = self.last_completed.get(level) else {
                continue;
            };

            let len = self.categories.level(level).len();
            if index >= len {
                return Err(RecipePullError::validation(format!(
                    "{level} index {index} out of range ({len} categories)"
                )));
            }

            if let Some(&higher) = CategoryLevel::ALL[..pos]
                .iter()
                .find(|&&higher| !self.is_level_complete(higher))
            {
                return Err(RecipePullError::validation(format!(
                    "{level} has progress but {higher} is not finished"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Upstream recipe shapes
// ---------------------------------------------------------------------------

/// One ranked recipe as returned by the ranking endpoint. Transient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeSummary {
    #[serde(rename = "recipeId")]
    pub id: u64,
    #[serde(rename = "recipeTitle")]
    pub title: String,
    #[serde(rename = "recipeUrl")]
    pub url: String,
    #[serde(rename = "foodImageUrl")]
    pub large_image_url: String,
    #[serde(rename = "mediumImageUrl")]
    pub medium_image_url: String,
    #[serde(rename = "smallImageUrl")]
    pub small_image_url: String,
    pub pickup: i32,
    pub shop: i32,
    pub nickname: String,
    #[serde(rename = "recipeDescription")]
    pub description: String,
    #[serde(rename = "recipeMaterial")]
    pub materials: Vec<String>,
    #[serde(rename = "recipeIndication")]
    pub indication: String,
    #[serde(rename = "recipeCost")]
    pub cost: String,
    #[serde(rename = "recipePublishday")]
    pub publish_day: String,
    pub rank: String,
}

/// Ranking endpoint response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRanking {
    #[serde(rename = "result", default)]
    pub recipes: Vec<RecipeSummary>,
}

// ---------------------------------------------------------------------------
// Published documents
// ---------------------------------------------------------------------------

/// A recipe as stored in the recipe index. One per recipe id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDocument {
    pub materials: Vec<String>,
    pub title: String,
    pub description: String,
    /// Always an `https` URL.
    pub image_url: String,
    pub detail_url: String,
}

/// A category's ranking as stored in the recipe index. One per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingDocument {
    /// Category name.
    pub concept: String,
    /// Recipe ids in rank order.
    pub recipes: Vec<u64>,
}
