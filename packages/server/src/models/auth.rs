use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Request body for user registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Unique email address used for login.
    #[schema(example = "alice@example.com")]
    pub email: String,
    /// Unique username (1-32 chars, alphanumeric and underscores).
    #[schema(example = "alice_cooks")]
    pub username: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
    #[schema(example = "Alice")]
    pub first_name: String,
    #[schema(example = "Wonder")]
    pub last_name: String,
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    let email = payload.email.trim();
    if email.is_empty() || email.len() > 254 || !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".into()));
    }
    let username = payload.username.trim();
    if username.is_empty() || username.chars().count() > 32 {
        return Err(AppError::Validation(
            "Username must be 1-32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username must contain only letters, digits, and underscores".into(),
        ));
    }
    validate_password(&payload.password)?;
    for (field, value) in [
        ("First name", &payload.first_name),
        ("Last name", &payload.last_name),
    ] {
        let value = value.trim();
        if value.is_empty() || value.chars().count() > 150 {
            return Err(AppError::Validation(format!(
                "{field} must be 1-150 characters"
            )));
        }
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 || password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    Ok(())
}

/// Request body for user login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::Validation("Email must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Request body for a password change.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SetPasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub fn validate_set_password_request(payload: &SetPasswordRequest) -> Result<(), AppError> {
    validate_password(&payload.new_password)?;
    if payload.new_password == payload.current_password {
        return Err(AppError::Validation(
            "New password must differ from the current password".into(),
        ));
    }
    Ok(())
}

/// Successful registration response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    /// ID of the newly created user.
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "alice_cooks")]
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<crate::entity::user::Model> for RegisterResponse {
    fn from(user: crate::entity::user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// Successful login response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token valid for 7 days.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    #[schema(example = "alice_cooks")]
    pub username: String,
    #[schema(example = "user")]
    pub role: String,
}
