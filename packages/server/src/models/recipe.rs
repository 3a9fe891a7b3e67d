use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub use super::shared::{ListQuery, Pagination, escape_like};
use super::shared::{double_option, validate_name};
use crate::error::AppError;
use crate::models::tag::TagResponse;
use crate::models::user::UserResponse;

/// Upper bound on recipe cooking time (one week in minutes).
const MAX_COOKING_TIME: i32 = 10_080;

/// One ingredient line in a create/update payload.
#[derive(Deserialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct IngredientAmount {
    /// Ingredient catalogue ID.
    pub id: i32,
    /// Quantity in the ingredient's measurement unit. Must be >= 1.
    pub amount: i32,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateRecipeRequest {
    pub name: String,
    pub text: String,
    /// Cooking time in minutes.
    pub cooking_time: i32,
    /// Tag IDs. Must be non-empty and all valid.
    pub tags: Vec<i32>,
    /// Ingredient lines. Must be non-empty, without duplicate IDs.
    pub ingredients: Vec<IngredientAmount>,
    /// Optional base64 data URL (`data:image/...;base64,...`).
    pub image: Option<String>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateRecipeRequest {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    /// When present, replaces the tag set wholesale.
    pub tags: Option<Vec<i32>>,
    /// When present, replaces the ingredient lines wholesale.
    pub ingredients: Option<Vec<IngredientAmount>>,
    /// Omit to keep, null to clear, data URL to replace.
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
}

impl UpdateRecipeRequest {
    /// True when the payload carries no changes at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.text.is_none()
            && self.cooking_time.is_none()
            && self.tags.is_none()
            && self.ingredients.is_none()
            && self.image.is_none()
    }
}

pub fn validate_create_recipe(req: &CreateRecipeRequest) -> Result<(), AppError> {
    validate_name(&req.name, "Recipe name")?;
    validate_text(&req.text)?;
    validate_cooking_time(req.cooking_time)?;
    validate_tag_ids(&req.tags)?;
    validate_ingredient_amounts(&req.ingredients)?;
    Ok(())
}

pub fn validate_update_recipe(req: &UpdateRecipeRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name(name, "Recipe name")?;
    }
    if let Some(ref text) = req.text {
        validate_text(text)?;
    }
    if let Some(ct) = req.cooking_time {
        validate_cooking_time(ct)?;
    }
    if let Some(ref tags) = req.tags {
        validate_tag_ids(tags)?;
    }
    if let Some(ref ingredients) = req.ingredients {
        validate_ingredient_amounts(ingredients)?;
    }
    Ok(())
}

fn validate_text(text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() || text.len() > 10_000 {
        return Err(AppError::Validation(
            "Description must be non-empty and at most 10000 bytes".into(),
        ));
    }
    Ok(())
}

fn validate_cooking_time(minutes: i32) -> Result<(), AppError> {
    if !(1..=MAX_COOKING_TIME).contains(&minutes) {
        return Err(AppError::Validation(format!(
            "Cooking time must be 1-{MAX_COOKING_TIME} minutes"
        )));
    }
    Ok(())
}

fn validate_tag_ids(tags: &[i32]) -> Result<(), AppError> {
    if tags.is_empty() {
        return Err(AppError::Validation("At least one tag is required".into()));
    }
    let mut seen = HashSet::new();
    for &id in tags {
        if !seen.insert(id) {
            return Err(AppError::Validation(format!("Duplicate tag ID {id}")));
        }
    }
    Ok(())
}

fn validate_ingredient_amounts(ingredients: &[IngredientAmount]) -> Result<(), AppError> {
    if ingredients.is_empty() {
        return Err(AppError::Validation(
            "At least one ingredient is required".into(),
        ));
    }
    let mut seen = HashSet::new();
    for line in ingredients {
        if !seen.insert(line.id) {
            return Err(AppError::Validation(format!(
                "Duplicate ingredient ID {}",
                line.id
            )));
        }
        if line.amount < 1 {
            return Err(AppError::Validation(
                "Ingredient amount must be a positive integer".into(),
            ));
        }
    }
    Ok(())
}

/// One ingredient line of a recipe detail response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct IngredientLineResponse {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full recipe detail.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RecipeResponse {
    pub id: i32,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<IngredientLineResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    /// Absolute URL of the recipe image, if one is set.
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
}

/// Compact recipe form used in favorites, cart, and subscription responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ShortRecipeResponse {
    pub id: i32,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

impl ShortRecipeResponse {
    pub fn from_model(m: crate::entity::recipe::Model, base_url: &str) -> Self {
        let image = m.image.as_deref().map(|hash| image_url(base_url, hash));
        Self {
            id: m.id,
            name: m.name,
            image,
            cooking_time: m.cooking_time,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecipeListResponse {
    pub data: Vec<RecipeResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct RecipeListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Filter by author user ID.
    pub author: Option<i32>,
    /// Comma-separated tag slugs; a recipe matches if it carries any of them.
    pub tags: Option<String>,
    /// Case-insensitive substring filter on the recipe name.
    pub name: Option<String>,
    /// Only recipes the caller has favorited.
    pub is_favorited: Option<bool>,
    /// Only recipes in the caller's shopping cart.
    pub is_in_shopping_cart: Option<bool>,
}

/// Build the public URL for a stored image hash.
pub fn image_url(base_url: &str, hash: &str) -> String {
    format!("{}/api/v1/media/{}", base_url.trim_end_matches('/'), hash)
}
