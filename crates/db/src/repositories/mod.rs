//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Repositories do not enforce
//! the order state machine; they only re-verify the expected previous state
//! inside conditional updates so concurrent transitions cannot both apply.

pub mod order_repo;
pub mod session_repo;
pub mod user_repo;

pub use order_repo::OrderRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
