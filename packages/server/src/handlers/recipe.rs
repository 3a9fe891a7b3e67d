use std::collections::{HashMap, HashSet};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine as _;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, Query as SeaQuery};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{cart_item, favorite, ingredient, recipe, recipe_ingredient, recipe_tag, tag};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::recipe::*;
use crate::models::shared::escape_like;
use crate::models::tag::TagResponse;
use crate::models::user::UserResponse;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/recipes",
    tag = "Recipes",
    operation_id = "listRecipes",
    summary = "List recipes with filters",
    description = "Newest first. `tags` takes comma-separated slugs and matches recipes carrying any of them. `is_favorited` and `is_in_shopping_cart` only apply to authenticated callers.",
    params(RecipeListQuery),
    responses(
        (status = 200, description = "Paginated recipes", body = RecipeListResponse),
    ),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_recipes(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<RecipeListQuery>,
) -> Result<Json<RecipeListResponse>, AppError> {
    let paging = ListQuery {
        page: query.page,
        limit: query.limit,
    };
    let (page, limit) = paging.page_and_limit();
    let caller = auth_user.as_ref().map(|u| u.user_id);

    let mut select = recipe::Entity::find();

    if let Some(author) = query.author {
        select = select.filter(recipe::Column::AuthorId.eq(author));
    }

    if let Some(ref name) = query.name {
        let term = escape_like(name.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(recipe::Column::Name)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    if let Some(ref tags) = query.tags {
        let slugs: Vec<String> = tags
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !slugs.is_empty() {
            select = select.filter(
                recipe::Column::Id.in_subquery(
                    SeaQuery::select()
                        .column(recipe_tag::Column::RecipeId)
                        .from(recipe_tag::Entity)
                        .and_where(
                            recipe_tag::Column::TagId.in_subquery(
                                SeaQuery::select()
                                    .column(tag::Column::Id)
                                    .from(tag::Entity)
                                    .and_where(tag::Column::Slug.is_in(slugs))
                                    .to_owned(),
                            ),
                        )
                        .to_owned(),
                ),
            );
        }
    }

    // Ownership-scoped filters are meaningless for anonymous callers and
    // yield an empty page instead of leaking everything unfiltered.
    let needs_caller =
        query.is_favorited == Some(true) || query.is_in_shopping_cart == Some(true);
    if needs_caller && caller.is_none() {
        return Ok(Json(RecipeListResponse {
            data: vec![],
            pagination: Pagination {
                page,
                limit,
                total: 0,
                total_pages: 0,
            },
        }));
    }
    if let Some(user_id) = caller {
        if query.is_favorited == Some(true) {
            select = select.filter(
                recipe::Column::Id.in_subquery(
                    SeaQuery::select()
                        .column(favorite::Column::RecipeId)
                        .from(favorite::Entity)
                        .and_where(favorite::Column::UserId.eq(user_id))
                        .to_owned(),
                ),
            );
        }
        if query.is_in_shopping_cart == Some(true) {
            select = select.filter(
                recipe::Column::Id.in_subquery(
                    SeaQuery::select()
                        .column(cart_item::Column::RecipeId)
                        .from(cart_item::Entity)
                        .and_where(cart_item::Column::UserId.eq(user_id))
                        .and_where(cart_item::Column::RecipeId.is_not_null())
                        .to_owned(),
                ),
            );
        }
    }

    let total = select.clone().paginate(&state.db, limit).num_items().await?;
    let total_pages = total.div_ceil(limit);

    let models = select
        .order_by_desc(recipe::Column::CreatedAt)
        .order_by_desc(recipe::Column::Id)
        .offset(Some((page - 1) * limit))
        .limit(Some(limit))
        .all(&state.db)
        .await?;

    let data = build_responses(&state, caller, models).await?;

    Ok(Json(RecipeListResponse {
        data,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages,
        },
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/recipes",
    tag = "Recipes",
    operation_id = "createRecipe",
    summary = "Publish a new recipe",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created", body = RecipeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Account banned (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, name = %payload.name))]
pub async fn create_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateRecipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_not_banned()?;
    validate_create_recipe(&payload)?;

    check_tags_exist(&state.db, &payload.tags).await?;
    check_ingredients_exist(&state.db, &payload.ingredients).await?;

    let image_hash = match payload.image.as_deref() {
        Some(data_url) => Some(store_image(&state, data_url).await?),
        None => None,
    };

    // The blob is stored before the transaction; reclaim it if the insert
    // fails, otherwise it would leak with no row referencing it.
    let model = match persist_new_recipe(&state, &auth_user, &payload, image_hash.clone()).await {
        Ok(model) => model,
        Err(e) => {
            reap_image(&state, image_hash).await;
            return Err(e);
        }
    };

    let response = build_one_response(&state, Some(auth_user.user_id), model).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes/{id}",
    tag = "Recipes",
    operation_id = "getRecipe",
    summary = "Get a recipe by ID",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe details", body = RecipeResponse),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_recipe(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RecipeResponse>, AppError> {
    let model = find_recipe(&state.db, id).await?;
    let caller = auth_user.as_ref().map(|u| u.user_id);
    Ok(Json(build_one_response(&state, caller, model).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/recipes/{id}",
    tag = "Recipes",
    operation_id = "updateRecipe",
    summary = "Update a recipe",
    description = "PATCH semantics: only provided fields change. `tags` and `ingredients` replace the whole set when present. `image` is three-state: omit to keep, null to clear, data URL to replace. Only the author or an admin may update.",
    params(("id" = i32, Path, description = "Recipe ID")),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated", body = RecipeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, user_id = auth_user.user_id))]
pub async fn update_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateRecipeRequest>,
) -> Result<Json<RecipeResponse>, AppError> {
    auth_user.require_not_banned()?;

    let existing = find_recipe(&state.db, id).await?;
    auth_user.require_author_or_admin(existing.author_id)?;
    validate_update_recipe(&payload)?;

    if payload.is_empty() {
        let response = build_one_response(&state, Some(auth_user.user_id), existing).await?;
        return Ok(Json(response));
    }

    if let Some(ref tags) = payload.tags {
        check_tags_exist(&state.db, tags).await?;
    }
    if let Some(ref ingredients) = payload.ingredients {
        check_ingredients_exist(&state.db, ingredients).await?;
    }

    let old_image = existing.image.clone();
    let new_image = match payload.image {
        Some(Some(ref data_url)) => Some(Some(store_image(&state, data_url).await?)),
        Some(None) => Some(None),
        None => None,
    };

    // Same leak guard as on creation: a replacement blob already sits in the
    // store, so a failed transaction must give it back.
    let model = match persist_recipe_update(&state, existing, &payload, &new_image).await {
        Ok(model) => model,
        Err(e) => {
            if let Some(Some(hash)) = new_image {
                reap_image(&state, Some(hash)).await;
            }
            return Err(e);
        }
    };

    if let Some(replaced) = new_image {
        if old_image != replaced {
            reap_image(&state, old_image).await;
        }
    }

    let response = build_one_response(&state, Some(auth_user.user_id), model).await?;
    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{id}",
    tag = "Recipes",
    operation_id = "deleteRecipe",
    summary = "Delete a recipe",
    description = "Removes the recipe with its tag links, ingredient lines, and favorites. Cart rows referencing it keep their place with a nulled reference. Only the author or an admin may delete.",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn delete_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_not_banned()?;

    let existing = find_recipe(&state.db, id).await?;
    auth_user.require_author_or_admin(existing.author_id)?;

    let txn = state.db.begin().await?;

    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(id))
        .exec(&txn)
        .await?;
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(id))
        .exec(&txn)
        .await?;
    favorite::Entity::delete_many()
        .filter(favorite::Column::RecipeId.eq(id))
        .exec(&txn)
        .await?;
    // Keep the cart rows so users can see something dropped out of their cart.
    cart_item::Entity::update_many()
        .filter(cart_item::Column::RecipeId.eq(id))
        .col_expr(cart_item::Column::RecipeId, Expr::value(Option::<i32>::None))
        .exec(&txn)
        .await?;
    recipe::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    reap_image(&state, existing.image).await;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/recipes/{id}/favorite",
    tag = "Recipes",
    operation_id = "addFavorite",
    summary = "Add a recipe to favorites",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Added to favorites", body = ShortRecipeResponse),
        (status = 400, description = "Already favorited (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn add_favorite(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_not_banned()?;

    let model = find_recipe(&state.db, id).await?;

    let row = favorite::ActiveModel {
        user_id: Set(auth_user.user_id),
        recipe_id: Set(id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    row.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Validation("Recipe is already in favorites".into())
        }
        _ => AppError::from(e),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ShortRecipeResponse::from_model(
            model,
            &state.config.site.base_url,
        )),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{id}/favorite",
    tag = "Recipes",
    operation_id = "removeFavorite",
    summary = "Remove a recipe from favorites",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Removed from favorites"),
        (status = 400, description = "Not in favorites (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn remove_favorite(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_not_banned()?;

    let deleted = favorite::Entity::delete_many()
        .filter(favorite::Column::UserId.eq(auth_user.user_id))
        .filter(favorite::Column::RecipeId.eq(id))
        .exec(&state.db)
        .await?;
    if deleted.rows_affected == 0 {
        return Err(AppError::Validation("Recipe is not in favorites".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/recipes/{id}/shopping-cart",
    tag = "Recipes",
    operation_id = "addToCart",
    summary = "Add a recipe to the shopping cart",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Added to the cart", body = ShortRecipeResponse),
        (status = 400, description = "Already in the cart (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn add_to_cart(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_not_banned()?;

    let model = find_recipe(&state.db, id).await?;

    let row = cart_item::ActiveModel {
        user_id: Set(auth_user.user_id),
        recipe_id: Set(Some(id)),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    row.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Validation("Recipe is already in the shopping cart".into())
        }
        _ => AppError::from(e),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ShortRecipeResponse::from_model(
            model,
            &state.config.site.base_url,
        )),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{id}/shopping-cart",
    tag = "Recipes",
    operation_id = "removeFromCart",
    summary = "Remove a recipe from the shopping cart",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Removed from the cart"),
        (status = 400, description = "Not in the cart (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn remove_from_cart(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_not_banned()?;

    let deleted = cart_item::Entity::delete_many()
        .filter(cart_item::Column::UserId.eq(auth_user.user_id))
        .filter(cart_item::Column::RecipeId.eq(id))
        .exec(&state.db)
        .await?;
    if deleted.rows_affected == 0 {
        return Err(AppError::Validation(
            "Recipe is not in the shopping cart".into(),
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn find_recipe(db: &DatabaseConnection, id: i32) -> Result<recipe::Model, AppError> {
    recipe::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".into()))
}

async fn check_tags_exist(db: &DatabaseConnection, ids: &[i32]) -> Result<(), AppError> {
    let found: HashSet<i32> = tag::Entity::find()
        .filter(tag::Column::Id.is_in(ids.to_vec()))
        .select_only()
        .column(tag::Column::Id)
        .into_tuple::<i32>()
        .all(db)
        .await?
        .into_iter()
        .collect();
    for &id in ids {
        if !found.contains(&id) {
            return Err(AppError::Validation(format!("Unknown tag ID {id}")));
        }
    }
    Ok(())
}

async fn check_ingredients_exist(
    db: &DatabaseConnection,
    lines: &[IngredientAmount],
) -> Result<(), AppError> {
    let ids: Vec<i32> = lines.iter().map(|l| l.id).collect();
    let found: HashSet<i32> = ingredient::Entity::find()
        .filter(ingredient::Column::Id.is_in(ids))
        .select_only()
        .column(ingredient::Column::Id)
        .into_tuple::<i32>()
        .all(db)
        .await?
        .into_iter()
        .collect();
    for line in lines {
        if !found.contains(&line.id) {
            return Err(AppError::Validation(format!(
                "Unknown ingredient ID {}",
                line.id
            )));
        }
    }
    Ok(())
}

async fn link_tags(txn: &DatabaseTransaction, recipe_id: i32, tags: &[i32]) -> Result<(), AppError> {
    let rows = tags.iter().map(|&tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(tag_id),
    });
    recipe_tag::Entity::insert_many(rows).exec(txn).await?;
    Ok(())
}

async fn link_ingredients(
    txn: &DatabaseTransaction,
    recipe_id: i32,
    lines: &[IngredientAmount],
) -> Result<(), AppError> {
    let rows = lines.iter().map(|line| recipe_ingredient::ActiveModel {
        recipe_id: Set(recipe_id),
        ingredient_id: Set(line.id),
        amount: Set(line.amount),
    });
    recipe_ingredient::Entity::insert_many(rows).exec(txn).await?;
    Ok(())
}

/// Insert the recipe row and its tag/ingredient links in one transaction.
async fn persist_new_recipe(
    state: &AppState,
    auth_user: &AuthUser,
    payload: &CreateRecipeRequest,
    image_hash: Option<String>,
) -> Result<recipe::Model, AppError> {
    let txn = state.db.begin().await?;

    let new_recipe = recipe::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        text: Set(payload.text.clone()),
        cooking_time: Set(payload.cooking_time),
        image: Set(image_hash),
        author_id: Set(auth_user.user_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let model = new_recipe.insert(&txn).await?;

    link_tags(&txn, model.id, &payload.tags).await?;
    link_ingredients(&txn, model.id, &payload.ingredients).await?;

    txn.commit().await?;
    Ok(model)
}

/// Apply a PATCH payload to the recipe row and replace its link sets in one
/// transaction.
async fn persist_recipe_update(
    state: &AppState,
    existing: recipe::Model,
    payload: &UpdateRecipeRequest,
    new_image: &Option<Option<String>>,
) -> Result<recipe::Model, AppError> {
    let id = existing.id;
    let txn = state.db.begin().await?;

    let mut active: recipe::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(ref text) = payload.text {
        active.text = Set(text.clone());
    }
    if let Some(ct) = payload.cooking_time {
        active.cooking_time = Set(ct);
    }
    if let Some(image) = new_image {
        active.image = Set(image.clone());
    }
    let model = active.update(&txn).await?;

    if let Some(ref tags) = payload.tags {
        recipe_tag::Entity::delete_many()
            .filter(recipe_tag::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;
        link_tags(&txn, id, tags).await?;
    }
    if let Some(ref ingredients) = payload.ingredients {
        recipe_ingredient::Entity::delete_many()
            .filter(recipe_ingredient::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;
        link_ingredients(&txn, id, ingredients).await?;
    }

    txn.commit().await?;
    Ok(model)
}

/// Decode a `data:image/...;base64,...` payload and store it, returning the
/// content hash.
async fn store_image(state: &AppState, data_url: &str) -> Result<String, AppError> {
    let rest = data_url
        .strip_prefix("data:image/")
        .ok_or_else(|| AppError::Validation("Image must be a data:image/... URL".into()))?;
    let (_, encoded) = rest
        .split_once(";base64,")
        .ok_or_else(|| AppError::Validation("Image data URL must be base64-encoded".into()))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::Validation(format!("Invalid base64 image data: {e}")))?;
    if bytes.is_empty() {
        return Err(AppError::Validation("Image data is empty".into()));
    }
    let hash = state.media.put(&bytes).await?;
    Ok(hash.to_hex())
}

/// Drop a stored image once no recipe references its hash anymore. The store
/// deduplicates by content, so another recipe may legitimately still point at
/// the same bytes. Best effort: a failure here only leaks a file.
async fn reap_image(state: &AppState, hash: Option<String>) {
    let Some(hash_hex) = hash else {
        return;
    };
    let still_used = recipe::Entity::find()
        .filter(recipe::Column::Image.eq(&hash_hex))
        .count(&state.db)
        .await;
    match still_used {
        Ok(0) => {
            if let Ok(parsed) = common::storage::ContentHash::from_hex(&hash_hex) {
                if let Err(e) = state.media.delete(&parsed).await {
                    tracing::warn!("Failed to remove unused image {hash_hex}: {e}");
                }
            }
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Image usage check failed for {hash_hex}: {e}"),
    }
}

async fn build_one_response(
    state: &AppState,
    caller: Option<i32>,
    model: recipe::Model,
) -> Result<RecipeResponse, AppError> {
    let mut responses = build_responses(state, caller, vec![model]).await?;
    responses
        .pop()
        .ok_or_else(|| AppError::Internal("Recipe response construction lost the row".into()))
}

/// Assemble full responses for a page of recipes with a fixed number of
/// queries regardless of page size.
async fn build_responses(
    state: &AppState,
    caller: Option<i32>,
    models: Vec<recipe::Model>,
) -> Result<Vec<RecipeResponse>, AppError> {
    use crate::entity::{subscription, user};

    if models.is_empty() {
        return Ok(vec![]);
    }
    let db = &state.db;
    let base_url = &state.config.site.base_url;
    let recipe_ids: Vec<i32> = models.iter().map(|m| m.id).collect();
    let author_ids: Vec<i32> = models.iter().map(|m| m.author_id).collect();

    let tag_links = recipe_tag::Entity::find()
        .filter(recipe_tag::Column::RecipeId.is_in(recipe_ids.clone()))
        .all(db)
        .await?;
    let tag_ids: HashSet<i32> = tag_links.iter().map(|l| l.tag_id).collect();
    let tags_by_id: HashMap<i32, tag::Model> = tag::Entity::find()
        .filter(tag::Column::Id.is_in(tag_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    let ingredient_links = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids.clone()))
        .order_by_asc(recipe_ingredient::Column::IngredientId)
        .all(db)
        .await?;
    let ingredient_ids: HashSet<i32> = ingredient_links.iter().map(|l| l.ingredient_id).collect();
    let ingredients_by_id: HashMap<i32, ingredient::Model> = ingredient::Entity::find()
        .filter(ingredient::Column::Id.is_in(ingredient_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();

    let authors: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(author_ids.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let (favorited, in_cart, subscribed_authors) = match caller {
        Some(user_id) => {
            let favorited: HashSet<i32> = favorite::Entity::find()
                .filter(favorite::Column::UserId.eq(user_id))
                .filter(favorite::Column::RecipeId.is_in(recipe_ids.clone()))
                .select_only()
                .column(favorite::Column::RecipeId)
                .into_tuple::<i32>()
                .all(db)
                .await?
                .into_iter()
                .collect();
            let in_cart: HashSet<i32> = cart_item::Entity::find()
                .filter(cart_item::Column::UserId.eq(user_id))
                .filter(cart_item::Column::RecipeId.is_in(recipe_ids.clone()))
                .select_only()
                .column(cart_item::Column::RecipeId)
                .into_tuple::<Option<i32>>()
                .all(db)
                .await?
                .into_iter()
                .flatten()
                .collect();
            let subscribed: HashSet<i32> = subscription::Entity::find()
                .filter(subscription::Column::SubscriberId.eq(user_id))
                .filter(subscription::Column::AuthorId.is_in(author_ids))
                .select_only()
                .column(subscription::Column::AuthorId)
                .into_tuple::<i32>()
                .all(db)
                .await?
                .into_iter()
                .collect();
            (favorited, in_cart, subscribed)
        }
        None => (HashSet::new(), HashSet::new(), HashSet::new()),
    };

    let mut tags_by_recipe: HashMap<i32, Vec<TagResponse>> = HashMap::new();
    for link in tag_links {
        if let Some(t) = tags_by_id.get(&link.tag_id) {
            tags_by_recipe
                .entry(link.recipe_id)
                .or_default()
                .push(t.clone().into());
        }
    }
    for tags in tags_by_recipe.values_mut() {
        tags.sort_by_key(|t| t.id);
    }

    let mut lines_by_recipe: HashMap<i32, Vec<IngredientLineResponse>> = HashMap::new();
    for link in ingredient_links {
        if let Some(i) = ingredients_by_id.get(&link.ingredient_id) {
            lines_by_recipe
                .entry(link.recipe_id)
                .or_default()
                .push(IngredientLineResponse {
                    id: i.id,
                    name: i.name.clone(),
                    measurement_unit: i.measurement_unit.clone(),
                    amount: link.amount,
                });
        }
    }

    let mut responses = Vec::with_capacity(models.len());
    for m in models {
        let author = authors
            .get(&m.author_id)
            .ok_or_else(|| AppError::Internal(format!("Recipe {} has no author row", m.id)))?;
        responses.push(RecipeResponse {
            id: m.id,
            tags: tags_by_recipe.remove(&m.id).unwrap_or_default(),
            author: UserResponse::from_model(
                author.clone(),
                subscribed_authors.contains(&m.author_id),
            ),
            ingredients: lines_by_recipe.remove(&m.id).unwrap_or_default(),
            is_favorited: favorited.contains(&m.id),
            is_in_shopping_cart: in_cart.contains(&m.id),
            name: m.name,
            image: m.image.as_deref().map(|h| image_url(base_url, h)),
            text: m.text,
            cooking_time: m.cooking_time,
        });
    }
    Ok(responses)
}
