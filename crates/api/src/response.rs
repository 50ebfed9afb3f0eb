//! Shared response envelope types for API handlers.
//!
//! Single-object responses are bare JSON objects; list endpoints use
//! [`Paginated`], which reports the clamped window alongside the total
//! row count so clients can page without a second query.

use serde::Serialize;

/// Paginated list envelope: `{ "items": [...], "pagination": {...} }`.
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

/// The window actually applied by the server plus the total match count.
#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, limit: i64, offset: i64, total: i64) -> Self {
        Self {
            items,
            pagination: PageInfo {
                limit,
                offset,
                total,
            },
        }
    }
}
