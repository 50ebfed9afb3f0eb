//! Handlers for the `/user` resource: both signup/signin flows, email
//! confirmation, token refresh, and profile access.
//!
//! Customers authenticate by phone + one-time SMS code; experts by email +
//! password with a mandatory email confirmation step in between.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use lawbridge_core::error::CoreError;
use lawbridge_core::types::{DbId, Timestamp};
use lawbridge_db::models::session::CreateSession;
use lawbridge_db::models::user::{CreateExpert, UpdateUser, User};
use lawbridge_db::repositories::{SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::auth::code::{generate_email_code, generate_sms_code};
use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /user/auth/customer`.
#[derive(Debug, Deserialize)]
pub struct AuthCustomerRequest {
    pub phone: String,
}

/// Request body for `POST /user/signin/customer`.
#[derive(Debug, Deserialize)]
pub struct SigninCustomerRequest {
    pub phone: String,
    pub code: String,
}

/// Request body for `POST /user/signup/expert`.
#[derive(Debug, Deserialize)]
pub struct SignupExpertRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for `POST /user/signin/expert`.
#[derive(Debug, Deserialize)]
pub struct SigninExpertRequest {
    pub email: String,
    pub password: String,
}

/// Request body for `POST /user/token/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Request body for `POST /user/` (partial profile update).
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Safe user representation for API responses.
///
/// Deliberately excludes the password hash and both one-time codes.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub role: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub email_confirmed: bool,
    pub rating: Option<f64>,
    pub created_at: Timestamp,
}

/// Response body for `POST /user/auth/customer`.
#[derive(Debug, Serialize)]
pub struct AuthCustomerResponse {
    pub data: UserResponse,
    /// Whether this request created the account (first contact).
    pub created: bool,
}

/// Successful authentication response returned by both signin flows and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/user/auth/customer
///
/// Get-or-create a customer account by phone number and send a one-time
/// sign-in code over SMS. The SMS send is fire-and-forget; the response does
/// not wait for the gateway.
pub async fn auth_customer(
    State(state): State<AppState>,
    Json(input): Json<AuthCustomerRequest>,
) -> AppResult<Json<AuthCustomerResponse>> {
    let phone = normalize_phone(&input.phone)?;

    let (user, created) = match UserRepo::find_by_phone(&state.pool, &phone).await? {
        Some(user) => (user, false),
        None => (UserRepo::create_customer(&state.pool, &phone).await?, true),
    };

    let code = generate_sms_code();
    UserRepo::set_sms_code(&state.pool, &phone, &code).await?;

    let sms = state.sms.clone();
    tokio::spawn(async move {
        if let Err(e) = sms.send_code(&phone, &code).await {
            tracing::error!(error = %e, "failed to send sign-in code");
        }
    });

    Ok(Json(AuthCustomerResponse {
        data: user_response(&user),
        created,
    }))
}

/// POST /api/v1/user/signin/customer
///
/// Exchange phone + SMS code for access and refresh tokens. The code is
/// single-use: it is cleared on success.
pub async fn signin_customer(
    State(state): State<AppState>,
    Json(input): Json<SigninCustomerRequest>,
) -> AppResult<Json<AuthResponse>> {
    let phone = normalize_phone(&input.phone)?;

    let invalid =
        || AppError::Core(CoreError::Unauthorized("Invalid phone or code".into()));

    let user = UserRepo::find_by_phone(&state.pool, &phone)
        .await?
        .ok_or_else(invalid)?;

    match &user.sms_code {
        Some(code) if *code == input.code => {}
        _ => return Err(invalid()),
    }

    UserRepo::clear_sms_code(&state.pool, user.id).await?;

    let response = create_auth_response(&state, &user).await?;
    Ok(Json(response))
}

/// POST /api/v1/user/signup/expert
///
/// Create an expert account. The account cannot sign in until the emailed
/// confirmation link is followed. Returns 409 if the email is taken.
pub async fn signup_expert(
    State(state): State<AppState>,
    Json(input): Json<SignupExpertRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Name must not be empty".into(),
        )));
    }
    let email = normalize_email(&input.email)?;
    validate_password_strength(&input.password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let hashed = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let confirm_code = generate_email_code();

    let create_dto = CreateExpert {
        name: input.name.trim().to_string(),
        email,
        password_hash: hashed,
        email_confirm_code: confirm_code.clone(),
    };
    let user = UserRepo::create_expert(&state.pool, &create_dto).await?;

    let confirm_url = format!(
        "{}/api/v1/user/register-confirm/{confirm_code}",
        state.config.public_url
    );
    let mail = state.mail.clone();
    let to_email = user.email.clone().unwrap_or_default();
    tokio::spawn(async move {
        if let Err(e) = mail.send_verification(&to_email, &confirm_url).await {
            tracing::error!(error = %e, "failed to send verification email");
        }
    });

    Ok((StatusCode::CREATED, Json(user_response(&user))))
}

/// POST /api/v1/user/signin/expert
///
/// Email + password sign-in. Rejects accounts without a password (customer
/// rows), unconfirmed emails, and bad credentials -- each with a distinct
/// status so clients can prompt accordingly.
pub async fn signin_expert(
    State(state): State<AppState>,
    Json(input): Json<SigninExpertRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = normalize_email(&input.email)?;

    let user = UserRepo::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Invalid email or password".into()))
        })?;

    let Some(password_hash) = &user.password_hash else {
        return Err(AppError::BadRequest(
            "This account does not support password sign-in".into(),
        ));
    };

    if !user.email_confirmed {
        return Err(AppError::Core(CoreError::Forbidden(
            "Email is not confirmed yet".into(),
        )));
    }

    let password_valid = verify_password(&input.password, password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid email or password".into(),
        )));
    }

    let response = create_auth_response(&state, &user).await?;
    Ok(Json(response))
}

/// GET /api/v1/user/register-confirm/{code}
///
/// Confirm an expert's email by the one-time code from the emailed link.
pub async fn register_confirm(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let user = UserRepo::confirm_email_by_code(&state.pool, &code)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest("Invalid or already used confirmation code".into())
        })?;
    Ok(Json(user_response(&user)))
}

/// POST /api/v1/user/token/refresh
///
/// Exchange a valid refresh token for new access + refresh tokens. The old
/// session is revoked (token rotation).
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let token_hash = hash_refresh_token(&input.refresh_token);

    let session = SessionRepo::find_by_refresh_token_hash(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired refresh token".into(),
            ))
        })?;

    SessionRepo::revoke(&state.pool, session.id).await?;

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    let response = create_auth_response(&state, &user).await?;
    Ok(Json(response))
}

/// POST /api/v1/user/logout
///
/// Revoke all sessions for the authenticated user. Returns 204 No Content.
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> AppResult<StatusCode> {
    SessionRepo::revoke_all_for_user(&state.pool, principal.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/user/
///
/// The authenticated user's own profile.
pub async fn me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> AppResult<Json<UserResponse>> {
    let user = UserRepo::find_by_id(&state.pool, principal.id())
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;
    Ok(Json(user_response(&user)))
}

/// POST /api/v1/user/
///
/// Partial profile update: only the provided fields change. Returns 409 if
/// the new phone or email collides with another account.
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(input): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    let email = match input.email {
        Some(e) => Some(normalize_email(&e)?),
        None => None,
    };
    let phone = match input.phone {
        Some(p) => Some(normalize_phone(&p)?),
        None => None,
    };

    let update = UpdateUser {
        name: input.name,
        phone,
        email,
    };
    let user = UserRepo::update_profile(&state.pool, principal.id(), &update)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;
    Ok(Json(user_response(&user)))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strip whitespace and validate the phone shape (digits, optional leading `+`).
fn normalize_phone(phone: &str) -> Result<String, AppError> {
    let phone = phone.trim();
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if digits.len() < 5 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Core(CoreError::Validation(
            "Invalid phone number".into(),
        )));
    }
    Ok(phone.to_string())
}

/// Lowercase and minimally validate an email address.
fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_ascii_lowercase();
    // Full RFC validation is not worth it; the confirmation email is the
    // real check.
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::Core(CoreError::Validation(
            "Invalid email address".into(),
        )));
    }
    Ok(email)
}

/// Build the safe API representation of a user row.
pub fn user_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        role: user.role.clone(),
        name: user.name.clone(),
        phone: user.phone.clone(),
        email: user.email.clone(),
        email_confirmed: user.email_confirmed,
        rating: user.rating,
        created_at: user.created_at,
    }
}

/// Generate access + refresh tokens, persist a session row, and build the response.
async fn create_auth_response(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let principal = user
        .principal()
        .ok_or_else(|| AppError::InternalError(format!("Unknown role for user {}", user.id)))?;

    let access_token = generate_access_token(principal, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let (refresh_plaintext, refresh_hash) = generate_refresh_token();

    let expires_at =
        Utc::now() + chrono::Duration::days(state.config.jwt.refresh_token_expiry_days);

    let session_input = CreateSession {
        user_id: user.id,
        refresh_token_hash: refresh_hash,
        expires_at,
    };
    SessionRepo::create(&state.pool, &session_input).await?;

    let expires_in = state.config.jwt.access_token_expiry_mins * 60;

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh_plaintext,
        expires_in,
        user: user_response(user),
    })
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Mount the `/user` route tree.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/customer", post(auth_customer))
        .route("/signin/customer", post(signin_customer))
        .route("/signup/expert", post(signup_expert))
        .route("/signin/expert", post(signin_expert))
        .route("/register-confirm/{code}", get(register_confirm))
        .route("/token/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/", get(me).post(update_me))
}
