//! Pure domain logic shared across the Lawbridge backend.
//!
//! This crate has no database or HTTP dependencies so the order state
//! machine and access guards can be tested in isolation and reused by any
//! future CLI or worker tooling.

pub mod error;
pub mod file_policy;
pub mod order;
pub mod pagination;
pub mod principal;
pub mod types;
