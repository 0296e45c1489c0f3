//! What each screen renders, derived from workflow state or backend data.
//!
//! Views hold display-ready strings and routes only; layout and styling
//! belong to the shell.

use plate_core::{ImageHash, RecipeDetail, RecipeFilter, RecipeSummary};
use tracing::warn;

use crate::gateway::{GatewayError, RecipeBackend};
use crate::media::MediaSource;
use crate::routes::Route;
use crate::workflow::FinderState;

pub const LIST_ERROR: &str = "Failed to load recipes. Please try again later.";
pub const LIST_EMPTY: &str = "Oops! No recipes found. Don't worry, your culinary adventure awaits! \
Click the camera icon below to snap a pic of your ingredients and discover delicious possibilities!";
pub const DETAIL_ERROR: &str = "Failed to load recipe. Please try again later.";
pub const DETAIL_NOT_FOUND: &str = "Recipe not found.";

/// Rows of the source picker modal; `None` is the cancel row.
pub const SOURCE_CHOICES: [(&str, Option<MediaSource>); 3] = [
    ("Take Photo", Some(MediaSource::Camera)),
    ("Choose from Library", Some(MediaSource::Library)),
    ("Cancel", None),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinderModal {
    None,
    SourcePicker,
    /// `text` is `None` while the description is loading.
    Description { text: Option<String> },
}

/// Finder screen projection. At most one modal can be open, by construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinderView {
    pub modal: FinderModal,
    pub loading: bool,
    pub error: Option<String>,
}

impl FinderView {
    pub fn project(state: &FinderState) -> Self {
        let (modal, loading, error) = match state {
            FinderState::Idle | FinderState::Capturing { .. } => (FinderModal::None, false, None),
            FinderState::ChoosingSource => (FinderModal::SourcePicker, false, None),
            FinderState::Uploading { .. } => (FinderModal::None, true, None),
            FinderState::AwaitingDescription { .. } => {
                (FinderModal::Description { text: None }, false, None)
            }
            FinderState::Complete { description, .. } => (
                FinderModal::Description {
                    text: Some(description.clone()),
                },
                false,
                None,
            ),
            FinderState::Failed { error } => (FinderModal::None, false, Some(error.to_string())),
        };
        Self {
            modal,
            loading,
            error,
        }
    }
}

/// One card in the recipe list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipeCard {
    pub title: String,
    pub image_url: String,
    pub route: Route,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecipeListView {
    Error(String),
    Empty(String),
    Loaded {
        cards: Vec<RecipeCard>,
        /// "View All Recipes" link, shown only while a filter is active.
        view_all: Option<Route>,
    },
}

impl RecipeListView {
    pub fn from_recipes(
        backend: &dyn RecipeBackend,
        filter: &RecipeFilter,
        recipes: Vec<RecipeSummary>,
    ) -> Self {
        if recipes.is_empty() {
            return RecipeListView::Empty(LIST_EMPTY.to_string());
        }
        let cards = recipes
            .into_iter()
            .map(|r| RecipeCard {
                image_url: backend.image_url(&r.image_path),
                route: Route::detail(r.image_hash),
                title: r.title,
            })
            .collect();
        RecipeListView::Loaded {
            cards,
            view_all: (!filter.is_empty()).then(Route::home),
        }
    }
}

pub async fn load_recipe_list(backend: &dyn RecipeBackend, filter: &RecipeFilter) -> RecipeListView {
    match backend.list_recipes(filter).await {
        Ok(recipes) => RecipeListView::from_recipes(backend, filter, recipes),
        Err(e) => {
            warn!("error fetching recipes: {e}");
            RecipeListView::Error(LIST_ERROR.to_string())
        }
    }
}

/// A tag chip that opens the list filtered by that tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagLink {
    pub label: String,
    pub route: Route,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipePage {
    pub image_hash: ImageHash,
    pub title: String,
    pub image_url: String,
    pub tags: Vec<TagLink>,
    /// "Cooking Time: … | Servings: …"
    pub meta_line: String,
    /// "• name: quantity"
    pub ingredient_lines: Vec<String>,
    /// "1. step"
    pub instruction_lines: Vec<String>,
    /// (item, quantity) rows of the shopping cart table.
    pub shopping_rows: Vec<(String, String)>,
}

impl RecipePage {
    pub fn from_detail(backend: &dyn RecipeBackend, detail: RecipeDetail) -> Self {
        let summary = &detail.summary;

        let mut tags = Vec::new();
        if !summary.cuisine.is_empty() {
            tags.push(TagLink {
                label: summary.cuisine.clone(),
                route: Route::RecipeList {
                    filter: RecipeFilter::by_cuisine(&summary.cuisine),
                },
            });
        }
        if !summary.dietary_preference.is_empty() {
            tags.push(TagLink {
                label: summary.dietary_preference.clone(),
                route: Route::RecipeList {
                    filter: RecipeFilter::by_dietary_preference(&summary.dietary_preference),
                },
            });
        }

        Self {
            image_hash: summary.image_hash.clone(),
            title: summary.title.clone(),
            image_url: backend.image_url(&summary.image_path),
            tags,
            meta_line: format!(
                "Cooking Time: {} | Servings: {}",
                detail.cooking_time, detail.servings
            ),
            ingredient_lines: detail
                .ingredients
                .iter()
                .map(|(name, qty)| format!("• {name}: {qty}"))
                .collect(),
            instruction_lines: detail
                .instructions
                .iter()
                .enumerate()
                .map(|(i, step)| format!("{}. {step}", i + 1))
                .collect(),
            shopping_rows: detail
                .shopping_cart
                .iter()
                .map(|(item, qty)| (item.to_string(), qty.to_string()))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecipeDetailView {
    Error(String),
    NotFound(String),
    Loaded(Box<RecipePage>),
}

pub async fn load_recipe_detail(backend: &dyn RecipeBackend, image_hash: &ImageHash) -> RecipeDetailView {
    match backend.get_recipe(image_hash).await {
        Ok(detail) => RecipeDetailView::Loaded(Box::new(RecipePage::from_detail(backend, detail))),
        Err(GatewayError::NotFound(_)) => RecipeDetailView::NotFound(DETAIL_NOT_FOUND.to_string()),
        Err(e) => {
            warn!("error fetching recipe {image_hash}: {e}");
            RecipeDetailView::Error(DETAIL_ERROR.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::InMemoryBackend;
    use crate::workflow::FinderError;
    use plate_core::{CaptureId, Quantities, RecipeSummary};

    fn recipe(hash: &str, cuisine: &str, diet: &str) -> RecipeDetail {
        RecipeDetail {
            summary: RecipeSummary {
                image_hash: ImageHash::from_str(hash),
                title: format!("Recipe {hash}"),
                cuisine: cuisine.into(),
                dietary_preference: diet.into(),
                image_path: format!("uploads/{hash}.jpg"),
            },
            ingredients: Quantities::try_from_pairs([("rice", "2 cups"), ("egg", "3")]).unwrap(),
            instructions: vec!["Cook rice".into(), "Fry eggs".into()],
            shopping_cart: Quantities::try_from_pairs([("eggs", "1 dozen")]).unwrap(),
            cooking_time: "20 minutes".into(),
            servings: "2".into(),
        }
    }

    #[test]
    fn finder_modals_follow_state() {
        let hash = ImageHash::from_str("x");
        let cases = [
            (FinderState::Idle, FinderModal::None, false),
            (FinderState::ChoosingSource, FinderModal::SourcePicker, false),
            (
                FinderState::Uploading {
                    capture_id: CaptureId::new(),
                },
                FinderModal::None,
                true,
            ),
            (
                FinderState::AwaitingDescription {
                    image_hash: hash.clone(),
                },
                FinderModal::Description { text: None },
                false,
            ),
            (
                FinderState::Complete {
                    image_hash: hash.clone(),
                    description: "Curry".into(),
                },
                FinderModal::Description {
                    text: Some("Curry".into()),
                },
                false,
            ),
        ];
        for (state, modal, loading) in cases {
            let view = FinderView::project(&state);
            assert_eq!(view.modal, modal, "{state:?}");
            assert_eq!(view.loading, loading, "{state:?}");
            assert_eq!(view.error, None);
        }
    }

    #[test]
    fn failed_state_renders_inline_error() {
        let view = FinderView::project(&FinderState::Failed {
            error: FinderError::Rejected("No food detected".into()),
        });
        assert_eq!(view.error.as_deref(), Some("No food detected"));
        assert_eq!(view.modal, FinderModal::None);
    }

    #[tokio::test]
    async fn list_links_cards_and_offers_view_all_when_filtered() {
        let backend = InMemoryBackend::default()
            .with_recipe(recipe("a", "Thai", "Vegan"))
            .with_recipe(recipe("b", "Italian", "Vegetarian"));

        let view = load_recipe_list(&backend, &RecipeFilter::by_cuisine("Thai")).await;
        let RecipeListView::Loaded { cards, view_all } = view else {
            panic!("expected cards");
        };
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].image_url, "http://backend.test/uploads/a.jpg");
        assert_eq!(cards[0].route, Route::detail(ImageHash::from_str("a")));
        assert_eq!(view_all, Some(Route::home()));

        let RecipeListView::Loaded { view_all, .. } =
            load_recipe_list(&backend, &RecipeFilter::all()).await
        else {
            panic!("expected cards");
        };
        assert_eq!(view_all, None);
    }

    #[tokio::test]
    async fn empty_list_shows_the_empty_state() {
        let backend = InMemoryBackend::default();
        assert_eq!(
            load_recipe_list(&backend, &RecipeFilter::all()).await,
            RecipeListView::Empty(LIST_EMPTY.into())
        );
    }

    #[tokio::test]
    async fn detail_page_formats_sections_and_tag_links() {
        let backend = InMemoryBackend::default().with_recipe(recipe("a", "Thai", ""));

        let RecipeDetailView::Loaded(page) =
            load_recipe_detail(&backend, &ImageHash::from_str("a")).await
        else {
            panic!("expected a page");
        };
        assert_eq!(page.meta_line, "Cooking Time: 20 minutes | Servings: 2");
        assert_eq!(page.ingredient_lines, ["• rice: 2 cups", "• egg: 3"]);
        assert_eq!(page.instruction_lines, ["1. Cook rice", "2. Fry eggs"]);
        assert_eq!(page.shopping_rows, [("eggs".to_string(), "1 dozen".to_string())]);
        assert_eq!(
            page.tags,
            [TagLink {
                label: "Thai".into(),
                route: Route::RecipeList {
                    filter: RecipeFilter::by_cuisine("Thai")
                }
            }]
        );
    }

    #[tokio::test]
    async fn unknown_recipe_is_not_found() {
        let backend = InMemoryBackend::default();
        assert_eq!(
            load_recipe_detail(&backend, &ImageHash::from_str("missing")).await,
            RecipeDetailView::NotFound(DETAIL_NOT_FOUND.into())
        );
    }
}
