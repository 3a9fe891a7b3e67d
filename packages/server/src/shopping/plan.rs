//! Page layout planning for the shopping-list document.
//!
//! The plan is pure data so page arithmetic can be tested without touching
//! the PDF library. The renderer walks it top to bottom.

use super::aggregate::{AggregatedIngredient, RecipeReference};

/// Ingredient rows per page. A page that fills up starts a fresh one.
pub const INGREDIENTS_PER_PAGE: usize = 14;

/// Gallery entries per page.
pub const RECIPES_PER_PAGE: usize = 2;

/// The full page layout of one shopping-list document.
///
/// Page mapping: the first ingredient page carries the cover heading; the
/// gallery intro page carries the first gallery chunk (or stands alone when
/// the gallery is empty, so an empty cart still yields two pages).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPlan {
    /// Always at least one entry, possibly empty (cover page only).
    pub ingredient_pages: Vec<Vec<AggregatedIngredient>>,
    pub gallery_pages: Vec<Vec<RecipeReference>>,
}

impl DocumentPlan {
    pub fn build(ingredients: Vec<AggregatedIngredient>, recipes: Vec<RecipeReference>) -> Self {
        let mut ingredient_pages: Vec<Vec<_>> = ingredients
            .chunks(INGREDIENTS_PER_PAGE)
            .map(<[_]>::to_vec)
            .collect();
        if ingredient_pages.is_empty() {
            ingredient_pages.push(Vec::new());
        }
        let gallery_pages = recipes
            .chunks(RECIPES_PER_PAGE)
            .map(<[_]>::to_vec)
            .collect();
        Self {
            ingredient_pages,
            gallery_pages,
        }
    }

    /// Total physical pages the renderer will emit.
    pub fn page_count(&self) -> usize {
        self.ingredient_pages.len() + self.gallery_pages.len().max(1)
    }
}

/// Text of one ingredient row as printed on the page.
pub fn ingredient_line(row: &AggregatedIngredient) -> String {
    format!(
        "{} - {}, {}",
        row.name, row.total_amount, row.measurement_unit
    )
}
