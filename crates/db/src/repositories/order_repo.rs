//! Repository for the `orders` table.
//!
//! Status transitions are conditional updates: the `WHERE` clause pins the
//! expected previous state and the call returns `None` when the row was not
//! in that state. The guard layer decides up front, but the update is the
//! authoritative check, so two interleaved requests cannot both apply.

use lawbridge_core::file_policy::FileKind;
use lawbridge_core::order::OrderStatus;
use lawbridge_core::types::DbId;
use sqlx::PgPool;

use crate::models::order::{CreateOrder, Order};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, status, customer_id, expert_id, name, description, rating, \
                        document_text, input_file, input_images, result_file, result_images, \
                        vulnerability, created_at, updated_at";

/// Provides CRUD operations and guarded transitions for orders.
pub struct OrderRepo;

impl OrderRepo {
    /// Insert a new draft order, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateOrder) -> Result<Order, sqlx::Error> {
        let query = format!(
            "INSERT INTO orders (customer_id, name, description)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(input.customer_id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find an order by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List published orders, newest first, with the total count of
    /// published rows.
    pub async fn list_published(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<(i64, Vec<Order>), sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM orders
             WHERE status = 'published'
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2"
        );
        let orders = sqlx::query_as::<_, Order>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM orders WHERE status = 'published'")
                .fetch_one(pool)
                .await?;

        Ok((total, orders))
    }

    /// List orders where the user is the customer or the assigned expert,
    /// optionally filtered by status, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        statuses: &[OrderStatus],
        limit: i64,
        offset: i64,
    ) -> Result<(i64, Vec<Order>), sqlx::Error> {
        let status_filter = if statuses.is_empty() {
            ""
        } else {
            " AND status = ANY($2)"
        };
        let status_strs: Vec<String> =
            statuses.iter().map(|s| s.as_str().to_string()).collect();

        let (limit_idx, offset_idx) = if statuses.is_empty() { (2, 3) } else { (3, 4) };
        let query = format!(
            "SELECT {COLUMNS} FROM orders
             WHERE (customer_id = $1 OR expert_id = $1){status_filter}
             ORDER BY created_at DESC
             LIMIT ${limit_idx} OFFSET ${offset_idx}"
        );
        let mut q = sqlx::query_as::<_, Order>(&query).bind(user_id);
        if !statuses.is_empty() {
            q = q.bind(status_strs.clone());
        }
        let orders = q.bind(limit).bind(offset).fetch_all(pool).await?;

        let count_query = format!(
            "SELECT COUNT(*) FROM orders
             WHERE (customer_id = $1 OR expert_id = $1){status_filter}"
        );
        let mut cq = sqlx::query_as::<_, (i64,)>(&count_query).bind(user_id);
        if !statuses.is_empty() {
            cq = cq.bind(status_strs);
        }
        let (total,) = cq.fetch_one(pool).await?;

        Ok((total, orders))
    }

    /// Move an order from one status to another in a single conditional
    /// update.
    ///
    /// Returns `None` when the order no longer is in `from` -- the caller
    /// lost a race and must re-read to report the right rejection.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, sqlx::Error> {
        let query = format!(
            "UPDATE orders SET status = $3
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim a published, unassigned order for an expert.
    ///
    /// The `status = 'published' AND expert_id IS NULL` condition is
    /// evaluated inside the single UPDATE, so exactly one of two racing
    /// claims succeeds; the loser gets `None`.
    pub async fn accept(
        pool: &PgPool,
        id: DbId,
        expert_id: DbId,
    ) -> Result<Option<Order>, sqlx::Error> {
        let query = format!(
            "UPDATE orders SET status = 'handling', expert_id = $2
             WHERE id = $1 AND status = 'published' AND expert_id IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(expert_id)
            .fetch_optional(pool)
            .await
    }

    /// Set the customer's rating while the order is still a draft.
    pub async fn set_rating(
        pool: &PgPool,
        id: DbId,
        rating: f64,
    ) -> Result<Option<Order>, sqlx::Error> {
        let query = format!(
            "UPDATE orders SET rating = $2
             WHERE id = $1 AND status = 'draft'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(rating)
            .fetch_optional(pool)
            .await
    }

    /// Average rating across an expert's rated orders, or `None` if none
    /// of their orders carry a rating yet.
    pub async fn average_rating_for_expert(
        pool: &PgPool,
        expert_id: DbId,
    ) -> Result<Option<f64>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<f64>>(
            "SELECT AVG(rating) FROM orders WHERE expert_id = $1 AND rating IS NOT NULL",
        )
        .bind(expert_id)
        .fetch_one(pool)
        .await
    }

    /// Attach an uploaded file URL to the order's input payload.
    ///
    /// Images append to `input_images` (order preserved); documents
    /// overwrite the single `input_file` slot.
    pub async fn add_input_file(
        pool: &PgPool,
        id: DbId,
        kind: FileKind,
        url: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        let setter = match kind {
            FileKind::Image => "input_images = array_append(input_images, $2)",
            FileKind::Document => "input_file = $2",
        };
        let query = format!(
            "UPDATE orders SET {setter}
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(url)
            .fetch_optional(pool)
            .await
    }

    /// Attach an uploaded file URL to the order's result payload.
    pub async fn add_result_file(
        pool: &PgPool,
        id: DbId,
        kind: FileKind,
        url: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        let setter = match kind {
            FileKind::Image => "result_images = array_append(result_images, $2)",
            FileKind::Document => "result_file = $2",
        };
        let query = format!(
            "UPDATE orders SET {setter}
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(url)
            .fetch_optional(pool)
            .await
    }

    /// Store text extracted from the input images (OCR output).
    pub async fn set_document_text(
        pool: &PgPool,
        id: DbId,
        text: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE orders SET document_text = $2 WHERE id = $1")
            .bind(id)
            .bind(text)
            .execute(pool)
            .await?;
        Ok(())
    }
}
