use axum::{
    Json,
    extract::{Path, State},
};
use sea_orm::*;
use tracing::instrument;

use crate::entity::tag;
use crate::error::{AppError, ErrorBody};
use crate::models::tag::TagResponse;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/tags",
    tag = "Tags",
    operation_id = "listTags",
    summary = "List all tags",
    responses(
        (status = 200, description = "All tags, ordered by id", body = Vec<TagResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagResponse>>, AppError> {
    let tags = tag::Entity::find()
        .order_by_asc(tag::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/tags/{id}",
    tag = "Tags",
    operation_id = "getTag",
    summary = "Get a tag by ID",
    params(("id" = i32, Path, description = "Tag ID")),
    responses(
        (status = 200, description = "Tag details", body = TagResponse),
        (status = 404, description = "Tag not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TagResponse>, AppError> {
    let model = tag::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".into()))?;

    Ok(Json(model.into()))
}
