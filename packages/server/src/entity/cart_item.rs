use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A recipe queued for shopping.
///
/// Unique per (user, recipe), enforced by an index created at startup.
/// `recipe_id` is nullable: deleting a recipe nulls the reference instead of
/// removing the cart row.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_item")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    pub recipe_id: Option<i32>,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: BelongsTo<super::user::Entity>,
    #[sea_orm(belongs_to, from = "recipe_id", to = "id")]
    pub recipe: BelongsTo<Option<super::recipe::Entity>>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
