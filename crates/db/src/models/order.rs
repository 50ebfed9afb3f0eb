//! Order entity model and DTOs.

use lawbridge_core::order::{OrderFacts, OrderStatus, Vulnerability};
use lawbridge_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Full order row from the `orders` table.
///
/// `status` and `vulnerability` are stored as TEXT (pinned by CHECK
/// constraints); parse them with [`Order::status`] / [`Order::vulnerability`]
/// at the boundary so the rest of the code only sees the enums.
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: DbId,
    pub status: String,
    pub customer_id: DbId,
    pub expert_id: Option<DbId>,
    pub name: String,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub document_text: Option<String>,
    pub input_file: Option<String>,
    pub input_images: Vec<String>,
    pub result_file: Option<String>,
    pub result_images: Vec<String>,
    pub vulnerability: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    /// Parse the stored status. A row that fails here violates the CHECK
    /// constraint and is treated as corrupt by callers.
    pub fn status(&self) -> Result<OrderStatus, String> {
        self.status.parse()
    }

    pub fn vulnerability(&self) -> Result<Vulnerability, String> {
        self.vulnerability.parse()
    }

    /// The snapshot the guard layer evaluates.
    pub fn facts(&self) -> Result<OrderFacts, String> {
        Ok(OrderFacts {
            customer_id: self.customer_id,
            expert_id: self.expert_id,
            status: self.status()?,
        })
    }

    /// Whether any document payload or OCR text is present.
    pub fn has_document(&self) -> bool {
        self.document_text.is_some()
            || self.input_file.is_some()
            || !self.input_images.is_empty()
            || self.result_file.is_some()
            || !self.result_images.is_empty()
    }
}

/// DTO for creating a new order (always starts in `draft`).
#[derive(Debug)]
pub struct CreateOrder {
    pub customer_id: DbId,
    pub name: String,
    pub description: Option<String>,
}
