use crate::error::app_error::AppError;
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;

/// Pagination parameters for list queries
/// Both page and limit are optional; when neither is provided all results are returned.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct PaginationParams {
    /// Page number (1-indexed).
    pub page: Option<i64>,
    /// Number of items per page.
    pub limit: Option<i64>,
}

impl PaginationParams {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    /// Returns `None` when the caller did not ask for pagination at all.
    pub fn from_query(page: Option<i64>, limit: Option<i64>) -> Result<Option<Self>, AppError> {
        if page.is_none() && limit.is_none() {
            return Ok(None);
        }
        if page.is_some_and(|p| p < 1) {
            return Err(AppError::BadRequest("page must be at least 1".to_string()));
        }
        if limit.is_some_and(|l| l < 1) {
            return Err(AppError::BadRequest("limit must be at least 1".to_string()));
        }

        Ok(Some(Self { page, limit }))
    }

    /// Calculate the SQL OFFSET value based on page and limit
    /// Uses the effective (capped) limit to ensure consistent page boundaries
    pub fn offset(&self) -> Option<i64> {
        self.effective_limit().map(|limit| (self.page.unwrap_or(1) - 1).saturating_mul(limit))
    }

    pub fn effective_limit(&self) -> Option<i64> {
        match self.limit {
            Some(limit) => Some(limit.min(Self::MAX_LIMIT)),
            None if self.page.is_some() => Some(Self::DEFAULT_LIMIT),
            None => None,
        }
    }
}

/// Paginated response wrapper with metadata
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    /// Current page number (1-indexed)
    pub page: i64,
    pub limit: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: i64, limit: i64, total_items: i64) -> Self {
        let total_pages = if limit > 0 {
            total_items / limit + i64::from(total_items % limit != 0)
        } else {
            1
        };

        Self {
            data,
            page,
            limit,
            total_items,
            total_pages,
        }
    }

    /// Wraps a listing fetched with the given (optional) pagination.
    pub fn from_params(data: Vec<T>, params: Option<&PaginationParams>, total_items: i64) -> Self {
        match params {
            Some(params) => {
                let page = params.page.unwrap_or(1);
                let limit = params.effective_limit().unwrap_or(PaginationParams::DEFAULT_LIMIT);
                Self::new(data, page, limit, total_items)
            }
            None => Self::new(data, 1, total_items, total_items),
        }
    }
}
