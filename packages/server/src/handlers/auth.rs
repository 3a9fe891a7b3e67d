use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sea_orm::*;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::{
    LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, SetPasswordRequest,
    validate_login_request, validate_register_request, validate_set_password_request,
};
use crate::models::user::UserResponse;
use crate::state::AppState;
use crate::utils::{hash, jwt};

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    operation_id = "register",
    summary = "Create a new account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Email or username taken (EMAIL_TAKEN, USERNAME_TAKEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let email = payload.email.trim().to_lowercase();
    let username = payload.username.trim().to_string();

    if user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(AppError::EmailTaken);
    }
    if user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(AppError::UsernameTaken);
    }

    let password_hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let new_user = user::ActiveModel {
        email: Set(email),
        username: Set(username),
        password: Set(password_hash),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        role: Set(user::DEFAULT_ROLE.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let model = new_user
        .insert(&state.db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                tracing::debug!("Registration race condition caught on insert");
                if detail.contains("email") {
                    AppError::EmailTaken
                } else {
                    AppError::UsernameTaken
                }
            }
            _ => AppError::from(e),
        })?;

    Ok((StatusCode::CREATED, Json(RegisterResponse::from(model))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Obtain a bearer token",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong email or password (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&payload)?;

    let email = payload.email.trim().to_lowercase();

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    let token = jwt::sign(
        user.id,
        &user.username,
        &user.role,
        &state.config.auth.jwt_secret,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    Ok(Json(LoginResponse {
        token,
        username: user.username,
        role: user.role,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    operation_id = "me",
    summary = "Return the calling user's profile",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let model = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    Ok(Json(UserResponse::from_model(model, false)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/set-password",
    tag = "Auth",
    operation_id = "setPassword",
    summary = "Change the calling user's password",
    request_body = SetPasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong current password (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn set_password(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_set_password_request(&payload)?;

    let model = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    let is_valid = hash::verify_password(&payload.current_password, &model.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    let new_hash = hash::hash_password(&payload.new_password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let mut active: user::ActiveModel = model.into();
    active.password = Set(new_hash);
    active.update(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}
