use axum::{
    Json,
    extract::{Path, Query, State},
};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::ingredient;
use crate::error::{AppError, ErrorBody};
use crate::models::ingredient::{IngredientListQuery, IngredientResponse};
use crate::models::shared::escape_like;
use crate::state::AppState;

/// Cap on ingredient search results; the catalogue is browsed by prefix
/// search from the frontend, never listed in full.
const MAX_RESULTS: u64 = 200;

#[utoipa::path(
    get,
    path = "/api/v1/ingredients",
    tag = "Ingredients",
    operation_id = "listIngredients",
    summary = "Search the ingredient catalogue",
    params(IngredientListQuery),
    responses(
        (status = 200, description = "Matching ingredients, ordered by name", body = Vec<IngredientResponse>),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientListQuery>,
) -> Result<Json<Vec<IngredientResponse>>, AppError> {
    let mut select = ingredient::Entity::find();

    if let Some(ref name) = query.name {
        let term = escape_like(name.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(ingredient::Column::Name)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    let rows = select
        .order_by_asc(ingredient::Column::Name)
        .limit(MAX_RESULTS)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(IngredientResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/ingredients/{id}",
    tag = "Ingredients",
    operation_id = "getIngredient",
    summary = "Get an ingredient by ID",
    params(("id" = i32, Path, description = "Ingredient ID")),
    responses(
        (status = 200, description = "Ingredient details", body = IngredientResponse),
        (status = 404, description = "Ingredient not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<IngredientResponse>, AppError> {
    let model = ingredient::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient not found".into()))?;

    Ok(Json(model.into()))
}
