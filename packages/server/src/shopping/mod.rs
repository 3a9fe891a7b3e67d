//! Shopping-list pipeline: cart aggregation, page layout, PDF rendering.
//!
//! Data flows one way: user id -> aggregated rows -> page plan -> PDF bytes.
//! Everything here is read-only with respect to the database.

pub mod aggregate;
pub mod document;
pub mod plan;

use std::collections::HashMap;

use common::storage::{ContentHash, ImageStore};

pub use aggregate::{AggregatedIngredient, RecipeReference, aggregate};
pub use plan::DocumentPlan;

use crate::error::AppError;

/// Resolve every referenced recipe image to bytes before rendering starts.
///
/// Any unresolvable reference fails the whole request: a shopping list with
/// silently missing thumbnails would be misleading. Recipes without an image
/// are fine and simply get no thumbnail.
pub async fn resolve_images(
    store: &dyn ImageStore,
    recipes: &[RecipeReference],
) -> Result<HashMap<i32, Vec<u8>>, AppError> {
    let mut images = HashMap::new();
    for recipe in recipes {
        let Some(hash_hex) = &recipe.image else {
            continue;
        };
        let hash = ContentHash::from_hex(hash_hex)
            .map_err(|e| AppError::ImageUnresolved(format!("recipe {}: {e}", recipe.id)))?;
        let bytes = store
            .get(&hash)
            .await
            .map_err(|e| AppError::ImageUnresolved(format!("recipe {}: {e}", recipe.id)))?;
        images.insert(recipe.id, bytes);
    }
    Ok(images)
}
