//! User entity model and DTOs.

use lawbridge_core::principal::Principal;
use lawbridge_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the password hash and SMS code -- NEVER serialize this to API
/// responses directly; build a summary DTO at the API layer instead.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    /// `"customer"` or `"expert"`.
    pub role: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub rating: Option<f64>,
    pub email: Option<String>,
    pub email_confirmed: bool,
    pub email_confirm_code: Option<String>,
    pub password_hash: Option<String>,
    pub sms_code: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// The user's identity as a typed principal.
    ///
    /// Returns `None` if the stored role string is unknown (corrupt data).
    pub fn principal(&self) -> Option<Principal> {
        Principal::from_role(&self.role, self.id)
    }
}

/// DTO for creating an expert account.
#[derive(Debug)]
pub struct CreateExpert {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    /// One-time code mailed to the expert for email confirmation.
    pub email_confirm_code: String,
}

/// DTO for partial profile updates. Only non-`None` fields are applied.
#[derive(Debug, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}
