//! Cart aggregation: collapse the caller's cart into summed ingredient rows
//! plus the distinct set of recipes that produced them.

use std::collections::{BTreeMap, HashMap, HashSet};

use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::entity::{cart_item, ingredient, recipe, recipe_ingredient};
use crate::error::AppError;

/// A summed ingredient row, grouped by name and measurement unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedIngredient {
    pub name: String,
    pub measurement_unit: String,
    /// Sum of amounts across all cart recipes using this ingredient.
    pub total_amount: i64,
}

/// A recipe that contributed to the aggregation, for the gallery section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeReference {
    pub id: i32,
    pub name: String,
    /// Content hash of the recipe image, if one is set.
    pub image: Option<String>,
}

/// One raw ingredient line before grouping.
#[derive(Debug, Clone)]
pub struct IngredientLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Load the user's cart and aggregate it.
///
/// Cart rows whose recipe has since been deleted carry a null recipe id and
/// are skipped. Recipes are returned once each, ordered by id, regardless of
/// how their images compare.
pub async fn aggregate(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<(Vec<AggregatedIngredient>, Vec<RecipeReference>), AppError> {
    let recipe_ids: Vec<i32> = cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .filter(cart_item::Column::RecipeId.is_not_null())
        .select_only()
        .column(cart_item::Column::RecipeId)
        .into_tuple::<Option<i32>>()
        .all(db)
        .await?
        .into_iter()
        .flatten()
        .collect();

    if recipe_ids.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let references: Vec<RecipeReference> = recipe::Entity::find()
        .filter(recipe::Column::Id.is_in(recipe_ids.clone()))
        .order_by_asc(recipe::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|m| RecipeReference {
            id: m.id,
            name: m.name,
            image: m.image,
        })
        .collect();

    let lines = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids))
        .all(db)
        .await?;

    let ingredient_ids: HashSet<i32> = lines.iter().map(|l| l.ingredient_id).collect();
    let catalogue: HashMap<i32, ingredient::Model> = ingredient::Entity::find()
        .filter(ingredient::Column::Id.is_in(ingredient_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    let raw = lines.into_iter().filter_map(|line| {
        catalogue.get(&line.ingredient_id).map(|ing| IngredientLine {
            name: ing.name.clone(),
            measurement_unit: ing.measurement_unit.clone(),
            amount: line.amount,
        })
    });

    Ok((sum_by_ingredient(raw), references))
}

/// Group lines by (name, unit) and sum their amounts.
///
/// The BTreeMap key gives the output a stable alphabetical order. The same
/// name under two different units stays as two rows.
pub fn sum_by_ingredient(
    lines: impl IntoIterator<Item = IngredientLine>,
) -> Vec<AggregatedIngredient> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for line in lines {
        *totals
            .entry((line.name, line.measurement_unit))
            .or_insert(0) += i64::from(line.amount);
    }
    totals
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| AggregatedIngredient {
            name,
            measurement_unit,
            total_amount,
        })
        .collect()
}
