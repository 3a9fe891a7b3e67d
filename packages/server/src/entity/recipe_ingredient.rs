use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Quantity-annotated ingredient line of a recipe.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe_ingredient")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub recipe_id: i32,
    #[sea_orm(primary_key)]
    pub ingredient_id: i32,
    #[sea_orm(belongs_to, from = "recipe_id", to = "id")]
    pub recipe: BelongsTo<super::recipe::Entity>,
    #[sea_orm(belongs_to, from = "ingredient_id", to = "id")]
    pub ingredient: BelongsTo<super::ingredient::Entity>,

    /// Always a positive integer.
    pub amount: i32,
}

impl ActiveModelBehavior for ActiveModel {}
