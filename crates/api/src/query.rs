//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Generic pagination parameters (`?limit=&offset=`).
///
/// Values are clamped via `clamp_limit` / `clamp_offset` before reaching the
/// repository layer.
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query parameters for the per-user order listing.
///
/// `statuses` is a comma-separated list of status names (e.g.
/// `?statuses=draft,published`); an empty or missing value means no status
/// filter.
#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub statuses: Option<String>,
}
