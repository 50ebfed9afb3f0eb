//! Authentication primitives: JWT tokens, password hashing, one-time codes.

pub mod code;
pub mod jwt;
pub mod password;
