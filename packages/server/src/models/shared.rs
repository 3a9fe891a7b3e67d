use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: u64 = 6;

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 6)]
    pub limit: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 8)]
    pub total_pages: u64,
}

/// Common page/limit query parameters.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ListQuery {
    /// Page number (1-based).
    pub page: Option<u64>,
    /// Items per page (1-100, default 6).
    pub limit: Option<u64>,
}

impl ListQuery {
    /// Clamp the raw parameters into a usable (page, limit) pair.
    pub fn page_and_limit(&self) -> (u64, u64) {
        let page = Ord::max(self.page.unwrap_or(1), 1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);
        (page, limit)
    }
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a trimmed display name (1-256 Unicode characters).
pub fn validate_name(name: &str, what: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 256 {
        return Err(AppError::Validation(format!(
            "{what} must be 1-256 characters"
        )));
    }
    Ok(())
}
