use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::shopping::{self, DocumentPlan, document};
use crate::state::AppState;

const FILENAME: &str = "shopping_list.pdf";

#[utoipa::path(
    get,
    path = "/api/v1/recipes/download-shopping-cart",
    tag = "Shopping Cart",
    operation_id = "downloadShoppingCart",
    summary = "Download the shopping cart as a PDF",
    description = "Aggregates every ingredient across the cart's recipes (summed per name and unit), followed by a gallery of the recipes with thumbnails hyperlinked to their pages. An empty cart produces a valid document with just the cover and gallery heading.",
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Account banned (PERMISSION_DENIED)", body = ErrorBody),
        (status = 500, description = "A recipe image could not be loaded (IMAGE_UNRESOLVED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn download_shopping_cart(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_not_banned()?;

    let (ingredients, recipes) = shopping::aggregate(&state.db, auth_user.user_id).await?;
    let images = shopping::resolve_images(state.media.as_ref(), &recipes).await?;

    tracing::debug!(
        ingredients = ingredients.len(),
        recipes = recipes.len(),
        "Rendering shopping list"
    );

    let plan = DocumentPlan::build(ingredients, recipes);
    let base_url = state.config.site.base_url.clone();
    let bytes = tokio::task::spawn_blocking(move || document::render(&plan, &images, &base_url))
        .await
        .map_err(|e| AppError::Internal(format!("Render task failed: {e}")))??;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{FILENAME}\""),
            ),
        ],
        bytes,
    ))
}
