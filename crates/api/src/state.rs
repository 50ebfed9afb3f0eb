use std::sync::Arc;

use lawbridge_notify::mail::MailSender;
use lawbridge_notify::sms::SmsSender;
use lawbridge_storage::ocr::OcrClient;
use lawbridge_storage::s3::S3Storage;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: lawbridge_db::DbPool,
    /// Server configuration (JWT settings, CORS origins, public URL).
    pub config: Arc<ServerConfig>,
    /// S3-compatible object storage for order documents.
    pub storage: Arc<S3Storage>,
    /// SMS gateway for customer login codes.
    pub sms: Arc<SmsSender>,
    /// SMTP mailer for expert email confirmation.
    pub mail: Arc<MailSender>,
    /// Text recognition client; `None` disables OCR entirely.
    pub ocr: Option<Arc<OcrClient>>,
}
