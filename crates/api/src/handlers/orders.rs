//! Handlers for the `/orders` resource: the full order lifecycle from draft
//! to completion, plus document uploads.
//!
//! Every action on an existing order goes through [`check_action`], which
//! layers an identity guard under a status guard. The database write then
//! re-verifies the expected status in the same statement, so a racing caller
//! can never push an order through an illegal transition.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use lawbridge_core::error::CoreError;
use lawbridge_core::file_policy::FileKind;
use lawbridge_core::order::{
    check_action, transition_target, OrderAccessError, OrderAction, OrderStatus, Vulnerability,
};
use lawbridge_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use lawbridge_core::principal::Principal;
use lawbridge_core::types::{DbId, Timestamp};
use lawbridge_db::models::order::{CreateOrder, Order};
use lawbridge_db::repositories::{OrderRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::{OrderListParams, PaginationParams};
use crate::response::Paginated;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /orders/`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Request body for `POST /orders/{id}/rate/`.
#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rating: f64,
}

/// Compact participant info embedded in a full order response.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: DbId,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub rating: Option<f64>,
}

/// The order's document payload: uploaded inputs, expert results, and any
/// recognized text.
#[derive(Debug, Serialize)]
pub struct OrderDocument {
    pub text: Option<String>,
    pub input_file: Option<String>,
    pub input_images: Vec<String>,
    pub result_file: Option<String>,
    pub result_images: Vec<String>,
    pub vulnerability: Vulnerability,
}

/// Full order representation with resolved participants.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: DbId,
    pub status: String,
    pub name: String,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub customer: UserSummary,
    pub expert: Option<UserSummary>,
    pub document: OrderDocument,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Compact order representation for list endpoints (bare participant ids).
#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub id: DbId,
    pub status: String,
    pub name: String,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub customer_id: DbId,
    pub expert_id: Option<DbId>,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/orders/
///
/// The published order feed, newest first. Expert-only: this is the pool
/// experts pick work from.
pub async fn list_published(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<Paginated<OrderSummary>>> {
    require_expert(principal)?;

    let limit = clamp_limit(params.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
    let offset = clamp_offset(params.offset);

    let (total, orders) = OrderRepo::list_published(&state.pool, limit, offset).await?;
    let items = orders.iter().map(order_summary).collect();

    Ok(Json(Paginated::new(items, limit, offset, total)))
}

/// GET /api/v1/orders/self/
///
/// The caller's own orders (as customer or assigned expert), optionally
/// filtered by `?statuses=draft,published`.
pub async fn list_self(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(params): Query<OrderListParams>,
) -> AppResult<Json<Paginated<OrderSummary>>> {
    let statuses = parse_statuses(params.statuses.as_deref())?;
    let limit = clamp_limit(params.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
    let offset = clamp_offset(params.offset);

    let (total, orders) =
        OrderRepo::list_for_user(&state.pool, principal.id(), &statuses, limit, offset).await?;
    let items = orders.iter().map(order_summary).collect();

    Ok(Json(Paginated::new(items, limit, offset, total)))
}

/// POST /api/v1/orders/
///
/// Create a draft order. Customer-only; experts produce results, they do not
/// commission reviews.
pub async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(input): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<OrderResponse>)> {
    let customer_id = require_customer(principal)?;

    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Order name must not be empty".into(),
        )));
    }

    let create_dto = CreateOrder {
        customer_id,
        name: input.name.trim().to_string(),
        description: input.description,
    };
    let order = OrderRepo::create(&state.pool, &create_dto).await?;
    let response = order_response(&state, &order).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/orders/{id}/file/input/
///
/// Multipart upload of a document or image into the order's input payload.
/// Customer owner only. Images append; a document replaces the previous one.
pub async fn upload_input(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<OrderResponse>> {
    load_guarded(&state, id, principal, OrderAction::UploadInput).await?;

    let upload = parse_upload(multipart).await?;
    let url = state
        .storage
        .upload(
            principal.id(),
            &upload.file_name,
            upload.content_type.as_deref(),
            upload.bytes,
        )
        .await?;

    let order = OrderRepo::add_input_file(&state.pool, id, upload.kind, &url)
        .await?
        .ok_or(AppError::OrderAccess(OrderAccessError::NotFound))?;

    let response = order_response(&state, &order).await?;
    Ok(Json(response))
}

/// POST /api/v1/orders/{id}/file/result/
///
/// Multipart upload of the expert's result. Assigned expert only.
pub async fn upload_result(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<OrderResponse>> {
    load_guarded(&state, id, principal, OrderAction::UploadResult).await?;

    let upload = parse_upload(multipart).await?;
    let url = state
        .storage
        .upload(
            principal.id(),
            &upload.file_name,
            upload.content_type.as_deref(),
            upload.bytes,
        )
        .await?;

    let order = OrderRepo::add_result_file(&state.pool, id, upload.kind, &url)
        .await?
        .ok_or(AppError::OrderAccess(OrderAccessError::NotFound))?;

    let response = order_response(&state, &order).await?;
    Ok(Json(response))
}

/// POST /api/v1/orders/{id}/cancel/
///
/// Cancel an order: the customer may while it is draft or published, the
/// assigned expert may while it is handling. Terminal afterwards.
pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<OrderResponse>> {
    let order = load_guarded(&state, id, principal, OrderAction::Cancel).await?;
    let from = parse_status(&order)?;

    let updated = OrderRepo::transition(&state.pool, id, from, OrderStatus::Cancelled)
        .await?
        .ok_or(AppError::OrderAccess(OrderAccessError::WrongStatus))?;

    let response = order_response(&state, &updated).await?;
    Ok(Json(response))
}

/// POST /api/v1/orders/{id}/confirm/
///
/// Publish a draft so experts can see it. If OCR is configured and input
/// images are present, text recognition runs in the background and lands in
/// the order's document text when it finishes.
pub async fn confirm(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<OrderResponse>> {
    load_guarded(&state, id, principal, OrderAction::Confirm).await?;

    let target = expect_target(OrderAction::Confirm)?;
    let updated = OrderRepo::transition(&state.pool, id, OrderStatus::Draft, target)
        .await?
        .ok_or(AppError::OrderAccess(OrderAccessError::WrongStatus))?;

    if let Some(ocr) = &state.ocr {
        if !updated.input_images.is_empty() {
            let ocr = ocr.clone();
            let pool = state.pool.clone();
            let image_urls = updated.input_images.clone();
            tokio::spawn(async move {
                match ocr.extract_all(&image_urls).await {
                    Ok(text) => {
                        if let Err(e) = OrderRepo::set_document_text(&pool, id, &text).await {
                            tracing::error!(order_id = id, error = %e, "failed to store recognized text");
                        }
                    }
                    Err(e) => {
                        tracing::error!(order_id = id, error = %e, "text recognition failed");
                    }
                }
            });
        }
    }

    let response = order_response(&state, &updated).await?;
    Ok(Json(response))
}

/// POST /api/v1/orders/{id}/rate/
///
/// Set the customer's offered rating. Only meaningful while the order is a
/// draft; the conditional update enforces that at write time.
pub async fn rate(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<RateRequest>,
) -> AppResult<Json<OrderResponse>> {
    if !(0.0..=5.0).contains(&input.rating) {
        return Err(AppError::Core(CoreError::Validation(
            "Rating must be between 0 and 5".into(),
        )));
    }

    load_guarded(&state, id, principal, OrderAction::Rate).await?;

    let updated = OrderRepo::set_rating(&state.pool, id, input.rating)
        .await?
        .ok_or(AppError::OrderAccess(OrderAccessError::WrongStatus))?;

    let response = order_response(&state, &updated).await?;
    Ok(Json(response))
}

/// POST /api/v1/orders/{id}/accept/
///
/// An expert claims a published order. The claim is a single conditional
/// update, so of two racing experts exactly one wins; the loser sees the
/// order as gone, same as any already-assigned order.
pub async fn accept(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<OrderResponse>> {
    load_guarded(&state, id, principal, OrderAction::Accept).await?;

    let updated = OrderRepo::accept(&state.pool, id, principal.id())
        .await?
        .ok_or(AppError::OrderAccess(OrderAccessError::NotFound))?;

    let response = order_response(&state, &updated).await?;
    Ok(Json(response))
}

/// POST /api/v1/orders/{id}/complete/
///
/// The customer signs off the expert's finished work: handling → done. If
/// the order carries a rating, the expert's aggregate rating is recomputed
/// from their rated orders.
pub async fn complete(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<OrderResponse>> {
    load_guarded(&state, id, principal, OrderAction::Complete).await?;

    let target = expect_target(OrderAction::Complete)?;
    let updated = OrderRepo::transition(&state.pool, id, OrderStatus::Handling, target)
        .await?
        .ok_or(AppError::OrderAccess(OrderAccessError::WrongStatus))?;

    if let Some(expert_id) = updated.expert_id {
        if let Some(avg) = OrderRepo::average_rating_for_expert(&state.pool, expert_id).await? {
            UserRepo::set_rating(&state.pool, expert_id, avg).await?;
        }
    }

    let response = order_response(&state, &updated).await?;
    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A parsed multipart upload: the slot kind plus the file itself.
struct Upload {
    kind: FileKind,
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// Parse the upload form: a `fileType` text field (`image` or `document`)
/// and a `file` field with the payload.
async fn parse_upload(mut multipart: Multipart) -> AppResult<Upload> {
    let mut kind: Option<FileKind> = None;
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "fileType" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                kind = Some(match text.as_str() {
                    "image" => FileKind::Image,
                    "document" => FileKind::Document,
                    other => {
                        return Err(AppError::BadRequest(format!(
                            "Unknown fileType '{other}'; expected 'image' or 'document'"
                        )))
                    }
                });
            }
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(|ct| ct.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                file = Some((file_name, content_type, data.to_vec()));
            }
            _ => {} // ignore unknown fields
        }
    }

    let kind = kind.ok_or_else(|| AppError::BadRequest("Missing 'fileType' field".into()))?;
    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::BadRequest("Missing 'file' field".into()))?;

    Ok(Upload {
        kind,
        file_name,
        content_type,
        bytes,
    })
}

/// Fetch an order and run both guard layers for `action`, returning the row
/// on success. A missing id and a visibility failure are the same error.
async fn load_guarded(
    state: &AppState,
    id: DbId,
    actor: Principal,
    action: OrderAction,
) -> AppResult<Order> {
    let order = OrderRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::OrderAccess(OrderAccessError::NotFound))?;

    let facts = order
        .facts()
        .map_err(|e| AppError::InternalError(format!("Corrupt order row {id}: {e}")))?;
    check_action(&facts, actor, action)?;

    Ok(order)
}

fn parse_status(order: &Order) -> AppResult<OrderStatus> {
    order
        .status()
        .map_err(|e| AppError::InternalError(format!("Corrupt order row {}: {e}", order.id)))
}

/// The post-transition status for a status-changing action.
fn expect_target(action: OrderAction) -> AppResult<OrderStatus> {
    transition_target(action).ok_or_else(|| {
        AppError::InternalError(format!("Action {action:?} has no transition target"))
    })
}

fn require_customer(principal: Principal) -> AppResult<DbId> {
    match principal {
        Principal::Customer(id) => Ok(id),
        Principal::Expert(_) => Err(AppError::Core(CoreError::Forbidden(
            "Only customers may perform this action".into(),
        ))),
    }
}

fn require_expert(principal: Principal) -> AppResult<DbId> {
    match principal {
        Principal::Expert(id) => Ok(id),
        Principal::Customer(_) => Err(AppError::Core(CoreError::Forbidden(
            "Only experts may perform this action".into(),
        ))),
    }
}

/// Parse a comma-separated status filter (`draft,published`).
fn parse_statuses(raw: Option<&str>) -> AppResult<Vec<OrderStatus>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<OrderStatus>().map_err(|_| {
                AppError::Core(CoreError::Validation(format!("Unknown status '{s}'")))
            })
        })
        .collect()
}

fn order_summary(order: &Order) -> OrderSummary {
    OrderSummary {
        id: order.id,
        status: order.status.clone(),
        name: order.name.clone(),
        description: order.description.clone(),
        rating: order.rating,
        customer_id: order.customer_id,
        expert_id: order.expert_id,
        created_at: order.created_at,
    }
}

fn user_summary(user: &lawbridge_db::models::user::User) -> UserSummary {
    UserSummary {
        id: user.id,
        name: user.name.clone(),
        phone: user.phone.clone(),
        email: user.email.clone(),
        rating: user.rating,
    }
}

/// Build the full order representation with resolved participants.
async fn order_response(state: &AppState, order: &Order) -> AppResult<OrderResponse> {
    let customer = UserRepo::find_by_id(&state.pool, order.customer_id)
        .await?
        .ok_or_else(|| {
            AppError::InternalError(format!(
                "Order {} references missing customer {}",
                order.id, order.customer_id
            ))
        })?;

    let expert = match order.expert_id {
        Some(expert_id) => UserRepo::find_by_id(&state.pool, expert_id).await?,
        None => None,
    };

    let vulnerability = order
        .vulnerability()
        .map_err(|e| AppError::InternalError(format!("Corrupt order row {}: {e}", order.id)))?;

    Ok(OrderResponse {
        id: order.id,
        status: order.status.clone(),
        name: order.name.clone(),
        description: order.description.clone(),
        rating: order.rating,
        customer: user_summary(&customer),
        expert: expert.as_ref().map(user_summary),
        document: OrderDocument {
            text: order.document_text.clone(),
            input_file: order.input_file.clone(),
            input_images: order.input_images.clone(),
            result_file: order.result_file.clone(),
            result_images: order.result_images.clone(),
            vulnerability,
        },
        created_at: order.created_at,
        updated_at: order.updated_at,
    })
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Mount the `/orders` route tree.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_published).post(create))
        .route("/self", get(list_self))
        .route("/{id}/file/input", post(upload_input))
        .route("/{id}/file/result", post(upload_result))
        .route("/{id}/cancel", post(cancel))
        .route("/{id}/confirm", post(confirm))
        .route("/{id}/rate", post(rate))
        .route("/{id}/accept", post(accept))
        .route("/{id}/complete", post(complete))
}
