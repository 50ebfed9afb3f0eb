//! Repository for the `users` table.

use lawbridge_core::principal::{ROLE_CUSTOMER, ROLE_EXPERT};
use lawbridge_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{CreateExpert, UpdateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, role, name, phone, rating, email, email_confirmed, \
                        email_confirm_code, password_hash, sms_code, created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new customer identified by phone number.
    pub async fn create_customer(pool: &PgPool, phone: &str) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (role, phone)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(ROLE_CUSTOMER)
            .bind(phone)
            .fetch_one(pool)
            .await
    }

    /// Insert a new (unconfirmed) expert account, returning the created row.
    pub async fn create_expert(pool: &PgPool, input: &CreateExpert) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (role, name, email, password_hash, email_confirm_code)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(ROLE_EXPERT)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.email_confirm_code)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by phone number (exact match).
    pub async fn find_by_phone(pool: &PgPool, phone: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE phone = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(phone)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Store the current SMS login code for a phone number.
    ///
    /// Returns `true` if a matching user row was updated.
    pub async fn set_sms_code(
        pool: &PgPool,
        phone: &str,
        code: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET sms_code = $2 WHERE phone = $1")
            .bind(phone)
            .bind(code)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear the SMS code after a successful sign-in so it is single-use.
    pub async fn clear_sms_code(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET sms_code = NULL WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Confirm an expert's email by its one-time code.
    ///
    /// Returns the confirmed user, or `None` if no row carries this code.
    pub async fn confirm_email_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users
             SET email_confirmed = true, email_confirm_code = NULL
             WHERE email_confirm_code = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Store a user's aggregate rating.
    ///
    /// Returns `true` if a matching row was updated.
    pub async fn set_rating(pool: &PgPool, id: DbId, rating: f64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET rating = $2 WHERE id = $1")
            .bind(id)
            .bind(rating)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update a user's profile. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update_profile(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                email = COALESCE($4, email)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.phone)
            .bind(&input.email)
            .fetch_optional(pool)
            .await
    }
}
