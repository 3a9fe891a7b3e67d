use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscription")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub subscriber_id: i32,
    pub author_id: i32,
    #[sea_orm(belongs_to, from = "subscriber_id", to = "id", relation_enum = "Subscriber")]
    pub subscriber: BelongsTo<super::user::Entity>,
    #[sea_orm(belongs_to, from = "author_id", to = "id", relation_enum = "Author")]
    pub author: BelongsTo<super::user::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
