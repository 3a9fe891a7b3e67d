use serde::{Deserialize, Serialize};

pub use super::shared::{ListQuery, Pagination};
use crate::entity::user;
use crate::models::recipe::ShortRecipeResponse;

/// Public user profile.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "alice_cooks")]
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the calling user is subscribed to this user.
    pub is_subscribed: bool,
}

impl UserResponse {
    pub fn from_model(m: user::Model, is_subscribed: bool) -> Self {
        Self {
            id: m.id,
            email: m.email,
            username: m.username,
            first_name: m.first_name,
            last_name: m.last_name,
            is_subscribed,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub pagination: Pagination,
}

/// An author the caller follows, with their recipes in short form.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SubscribedAuthorResponse {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Always true in subscription listings.
    pub is_subscribed: bool,
    pub recipes: Vec<ShortRecipeResponse>,
    pub recipes_count: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubscriptionListResponse {
    pub data: Vec<SubscribedAuthorResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct SubscriptionListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Cap on the number of recipes embedded per author (default all, max 100).
    pub recipes_limit: Option<u64>,
}
