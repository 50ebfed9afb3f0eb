//! Database entity models and their Create/Update DTOs.

pub mod order;
pub mod session;
pub mod user;
