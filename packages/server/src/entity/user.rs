use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role granted to new accounts.
pub const DEFAULT_ROLE: &str = ROLE_USER;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";
/// Banned accounts keep their data but are rejected on every authenticated call.
pub const ROLE_BANNED: &str = "banned";

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,

    #[sea_orm(has_many)]
    pub recipes: HasMany<super::recipe::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
