use sea_orm::*;
use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use tracing::info;

use crate::entity::{cart_item, favorite, subscription, tag};

/// Default tag set seeded on startup. Tags are managed operationally, not
/// through the API, so a fresh database gets a usable set.
const DEFAULT_TAGS: &[(&str, &str, &str)] = &[
    ("Breakfast", "#E26C2D", "breakfast"),
    ("Lunch", "#49B64E", "lunch"),
    ("Dinner", "#8775D2", "dinner"),
];

/// Seed the `tag` table with defaults.
pub async fn seed_tags(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut inserted = 0u32;
    for &(name, color, slug) in DEFAULT_TAGS {
        let model = tag::ActiveModel {
            name: Set(name.to_string()),
            color: Set(color.to_string()),
            slug: Set(slug.to_string()),
            ..Default::default()
        };

        let result = tag::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(tag::Column::Slug)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if inserted > 0 {
        info!("Seeded {} new tags", inserted);
    }

    Ok(())
}

/// Create the unique indexes backing the (user, recipe) and
/// (subscriber, author) uniqueness invariants.
///
/// Schema sync creates tables and single-column uniques from the entity
/// annotations; composite uniques are bootstrapped here.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let statements = [
        Index::create()
            .if_not_exists()
            .unique()
            .name("idx_favorite_user_recipe")
            .table(favorite::Entity)
            .col(favorite::Column::UserId)
            .col(favorite::Column::RecipeId)
            .to_string(PostgresQueryBuilder),
        Index::create()
            .if_not_exists()
            .unique()
            .name("idx_cart_item_user_recipe")
            .table(cart_item::Entity)
            .col(cart_item::Column::UserId)
            .col(cart_item::Column::RecipeId)
            .to_string(PostgresQueryBuilder),
        Index::create()
            .if_not_exists()
            .unique()
            .name("idx_subscription_subscriber_author")
            .table(subscription::Entity)
            .col(subscription::Column::SubscriberId)
            .col(subscription::Column::AuthorId)
            .to_string(PostgresQueryBuilder),
    ];

    for stmt in statements {
        db.execute_unprepared(&stmt).await?;
    }

    info!("Ensured uniqueness indexes exist");
    Ok(())
}
