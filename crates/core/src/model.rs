use serde::{Deserialize, Serialize};

use crate::{ImageHash, Quantities};

/// List-view projection of a recipe, as returned by `GET /recipes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSummary {
    /// Identifier; also the hash of the uploaded photo.
    pub image_hash: ImageHash,
    /// Display title.
    pub title: String,
    /// Cuisine tag. Empty when the backend did not classify one.
    #[serde(default)]
    pub cuisine: String,
    /// Dietary preference tag. Empty when unknown.
    #[serde(default)]
    pub dietary_preference: String,
    /// Image path relative to the backend base url.
    #[serde(default)]
    pub image_path: String,
}

/// Full recipe, as returned by `GET /recipes/{hash}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDetail {
    /// Fields shared with the list view.
    #[serde(flatten)]
    pub summary: RecipeSummary,
    /// Ingredient name -> quantity.
    #[serde(default)]
    pub ingredients: Quantities,
    /// Cooking steps in order.
    #[serde(default)]
    pub instructions: Vec<String>,
    /// Item to buy -> quantity.
    #[serde(default)]
    pub shopping_cart: Quantities,
    /// Free-form cooking time, e.g. "30 minutes".
    #[serde(default)]
    pub cooking_time: String,
    /// Free-form serving count, e.g. "4".
    #[serde(default)]
    pub servings: String,
}

impl RecipeDetail {
    /// Identifier of this recipe.
    pub fn image_hash(&self) -> &ImageHash {
        &self.summary.image_hash
    }
}

/// Body of `GET /image-metadata/{hash}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Short description of the recognized dish.
    #[serde(default)]
    pub description: Option<String>,
}
