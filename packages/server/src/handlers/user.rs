use std::collections::{HashMap, HashSet};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{recipe, subscription, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::recipe::ShortRecipeResponse;
use crate::models::shared::{ListQuery, Pagination};
use crate::models::user::{
    SubscribedAuthorResponse, SubscriptionListQuery, SubscriptionListResponse, UserListResponse,
    UserResponse,
};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List users",
    params(ListQuery),
    responses(
        (status = 200, description = "Paginated users, ordered by id", body = UserListResponse),
    ),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_users(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    let (page, limit) = query.page_and_limit();

    let select = user::Entity::find().order_by_asc(user::Column::Id);
    let total = select.clone().paginate(&state.db, limit).num_items().await?;
    let total_pages = total.div_ceil(limit);

    let users = select
        .offset(Some((page - 1) * limit))
        .limit(Some(limit))
        .all(&state.db)
        .await?;

    let subscribed = match &auth_user {
        Some(caller) => {
            subscribed_author_ids(&state.db, caller.user_id, users.iter().map(|u| u.id)).await?
        }
        None => HashSet::new(),
    };

    let data = users
        .into_iter()
        .map(|u| {
            let is_subscribed = subscribed.contains(&u.id);
            UserResponse::from_model(u, is_subscribed)
        })
        .collect();

    Ok(Json(UserListResponse {
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
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    operation_id = "getUser",
    summary = "Get a user's public profile",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_user(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    let model = find_user(&state.db, id).await?;

    let is_subscribed = match &auth_user {
        Some(caller) => !subscribed_author_ids(&state.db, caller.user_id, [id])
            .await?
            .is_empty(),
        None => false,
    };

    Ok(Json(UserResponse::from_model(model, is_subscribed)))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/subscribe",
    tag = "Users",
    operation_id = "subscribe",
    summary = "Follow an author",
    params(("id" = i32, Path, description = "Author user ID")),
    responses(
        (status = 201, description = "Subscribed", body = UserResponse),
        (status = 400, description = "Self-subscription or already subscribed (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Author not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(author_id = id, user_id = auth_user.user_id))]
pub async fn subscribe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_not_banned()?;

    if id == auth_user.user_id {
        return Err(AppError::Validation("Cannot subscribe to yourself".into()));
    }

    let author = find_user(&state.db, id).await?;

    let new_sub = subscription::ActiveModel {
        subscriber_id: Set(auth_user.user_id),
        author_id: Set(id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    new_sub
        .insert(&state.db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Validation("Already subscribed to this author".into())
            }
            _ => AppError::from(e),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse::from_model(author, true)),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}/subscribe",
    tag = "Users",
    operation_id = "unsubscribe",
    summary = "Unfollow an author",
    params(("id" = i32, Path, description = "Author user ID")),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 400, description = "Not subscribed (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(author_id = id, user_id = auth_user.user_id))]
pub async fn unsubscribe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_not_banned()?;

    let deleted = subscription::Entity::delete_many()
        .filter(subscription::Column::SubscriberId.eq(auth_user.user_id))
        .filter(subscription::Column::AuthorId.eq(id))
        .exec(&state.db)
        .await?;

    if deleted.rows_affected == 0 {
        return Err(AppError::Validation(
            "Not subscribed to this author".into(),
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/users/subscriptions",
    tag = "Users",
    operation_id = "listSubscriptions",
    summary = "List followed authors with their recipes",
    params(SubscriptionListQuery),
    responses(
        (status = 200, description = "Followed authors, newest subscription first", body = SubscriptionListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_subscriptions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SubscriptionListQuery>,
) -> Result<Json<SubscriptionListResponse>, AppError> {
    let paging = ListQuery {
        page: query.page,
        limit: query.limit,
    };
    let (page, limit) = paging.page_and_limit();
    let recipes_limit = query.recipes_limit.map(|l| l.clamp(1, 100));

    let select = subscription::Entity::find()
        .filter(subscription::Column::SubscriberId.eq(auth_user.user_id))
        .order_by_desc(subscription::Column::CreatedAt);
    let total = select.clone().paginate(&state.db, limit).num_items().await?;
    let total_pages = total.div_ceil(limit);

    let subs = select
        .offset(Some((page - 1) * limit))
        .limit(Some(limit))
        .all(&state.db)
        .await?;

    let author_ids: Vec<i32> = subs.iter().map(|s| s.author_id).collect();
    let authors: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(author_ids.clone()))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut recipes_by_author: HashMap<i32, Vec<recipe::Model>> = HashMap::new();
    for r in recipe::Entity::find()
        .filter(recipe::Column::AuthorId.is_in(author_ids))
        .order_by_desc(recipe::Column::CreatedAt)
        .all(&state.db)
        .await?
    {
        recipes_by_author.entry(r.author_id).or_default().push(r);
    }

    let base_url = &state.config.site.base_url;
    let mut data = Vec::with_capacity(subs.len());
    for sub in subs {
        let Some(author) = authors.get(&sub.author_id) else {
            continue;
        };
        let all_recipes = recipes_by_author.remove(&author.id).unwrap_or_default();
        let recipes_count = all_recipes.len() as u64;
        let shown = match recipes_limit {
            Some(l) => all_recipes.into_iter().take(l as usize).collect::<Vec<_>>(),
            None => all_recipes,
        };
        data.push(SubscribedAuthorResponse {
            id: author.id,
            email: author.email.clone(),
            username: author.username.clone(),
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
            is_subscribed: true,
            recipes: shown
                .into_iter()
                .map(|r| ShortRecipeResponse::from_model(r, base_url))
                .collect(),
            recipes_count,
        });
    }

    Ok(Json(SubscriptionListResponse {
        data,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages,
        },
    }))
}

async fn find_user(db: &DatabaseConnection, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Which of `candidates` the caller is subscribed to.
async fn subscribed_author_ids(
    db: &DatabaseConnection,
    subscriber_id: i32,
    candidates: impl IntoIterator<Item = i32>,
) -> Result<HashSet<i32>, AppError> {
    let ids: Vec<i32> = candidates.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashSet::new());
    }
    let rows: Vec<i32> = subscription::Entity::find()
        .filter(subscription::Column::SubscriberId.eq(subscriber_id))
        .filter(subscription::Column::AuthorId.is_in(ids))
        .select_only()
        .column(subscription::Column::AuthorId)
        .into_tuple::<i32>()
        .all(db)
        .await?;
    Ok(rows.into_iter().collect())
}
