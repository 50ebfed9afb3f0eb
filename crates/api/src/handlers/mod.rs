//! HTTP handlers, grouped per resource. Each module exposes a `router()`
//! that the top-level router nests under its path prefix.

pub mod health;
pub mod orders;
pub mod users;
