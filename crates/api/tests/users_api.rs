//! HTTP-level integration tests for the `/user` endpoints: customer and
//! expert signup/signin flows, email confirmation, token refresh, and
//! profile access.

mod common;

use axum::http::StatusCode;
use common::{
    assert_error, body_json, get, get_auth, post_json, post_json_auth,
};
use lawbridge_db::repositories::UserRepo;
use sqlx::PgPool;

const PHONE: &str = "+79990001122";

/// Run the get-or-create step and return the stored SMS code.
async fn request_sms_code(app: axum::Router, pool: &PgPool, phone: &str) -> String {
    let response = post_json(
        app,
        "/api/v1/user/auth/customer",
        serde_json::json!({ "phone": phone }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    UserRepo::find_by_phone(pool, phone)
        .await
        .expect("lookup should succeed")
        .expect("customer row should exist")
        .sms_code
        .expect("SMS code should be stored")
}

/// Sign up an expert via the API and return the confirmation code stored for
/// the account.
async fn signup_expert(app: axum::Router, pool: &PgPool, email: &str) -> String {
    let body = serde_json::json!({
        "name": "Expert One",
        "email": email,
        "password": "a-long-enough-password",
    });
    let response = post_json(app, "/api/v1/user/signup/expert", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    UserRepo::find_by_email(pool, email)
        .await
        .expect("lookup should succeed")
        .expect("expert row should exist")
        .email_confirm_code
        .expect("confirmation code should be stored")
}

// ---------------------------------------------------------------------------
// Customer flow
// ---------------------------------------------------------------------------

/// First contact creates the account; the second call reuses it.
#[sqlx::test(migrations = "../db/migrations")]
async fn auth_customer_get_or_create(pool: PgPool) {
    let app = common::build_test_app(pool.clone());

    let response = post_json(
        app.clone(),
        "/api/v1/user/auth/customer",
        serde_json::json!({ "phone": PHONE }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["created"], true);
    assert_eq!(json["data"]["role"], "customer");
    assert_eq!(json["data"]["phone"], PHONE);

    let response = post_json(
        app,
        "/api/v1/user/auth/customer",
        serde_json::json!({ "phone": PHONE }),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["created"], false);
}

/// A malformed phone number is rejected before any account is created.
#[sqlx::test(migrations = "../db/migrations")]
async fn auth_customer_rejects_bad_phone(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/user/auth/customer",
        serde_json::json!({ "phone": "not-a-phone" }),
    )
    .await;
    assert_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
}

/// Phone + correct code yields tokens; the code is single-use.
#[sqlx::test(migrations = "../db/migrations")]
async fn customer_signin_with_sms_code(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let code = request_sms_code(app.clone(), &pool, PHONE).await;

    let response = post_json(
        app.clone(),
        "/api/v1/user/signin/customer",
        serde_json::json!({ "phone": PHONE, "code": code }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["user"]["role"], "customer");

    // Replaying the same code fails: it was cleared on success.
    let response = post_json(
        app,
        "/api/v1/user/signin/customer",
        serde_json::json!({ "phone": PHONE, "code": code }),
    )
    .await;
    assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
}

/// A wrong code never signs in, and the phone is not revealed as unknown vs
/// known (same error either way).
#[sqlx::test(migrations = "../db/migrations")]
async fn customer_signin_wrong_code(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let _code = request_sms_code(app.clone(), &pool, PHONE).await;

    let response = post_json(
        app.clone(),
        "/api/v1/user/signin/customer",
        serde_json::json!({ "phone": PHONE, "code": "0000" }),
    )
    .await;
    assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;

    let response = post_json(
        app,
        "/api/v1/user/signin/customer",
        serde_json::json!({ "phone": "+70000000000", "code": "1234" }),
    )
    .await;
    assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
}

// ---------------------------------------------------------------------------
// Expert flow
// ---------------------------------------------------------------------------

/// Signup, confirm, signin: the full expert onboarding path.
#[sqlx::test(migrations = "../db/migrations")]
async fn expert_signup_confirm_signin(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let code = signup_expert(app.clone(), &pool, "expert@example.com").await;

    // Signin before confirmation is refused.
    let signin_body = serde_json::json!({
        "email": "expert@example.com",
        "password": "a-long-enough-password",
    });
    let response = post_json(app.clone(), "/api/v1/user/signin/expert", signin_body.clone()).await;
    assert_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    // Follow the confirmation link.
    let response = get(app.clone(), &format!("/api/v1/user/register-confirm/{code}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["email_confirmed"], true);

    // The code is single-use.
    let response = get(app.clone(), &format!("/api/v1/user/register-confirm/{code}")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Now signin succeeds.
    let response = post_json(app, "/api/v1/user/signin/expert", signin_body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
    assert_eq!(json["user"]["role"], "expert");
}

/// Email addresses are unique across accounts.
#[sqlx::test(migrations = "../db/migrations")]
async fn expert_signup_duplicate_email(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    signup_expert(app.clone(), &pool, "taken@example.com").await;

    let body = serde_json::json!({
        "name": "Second Expert",
        "email": "Taken@Example.com", // case-insensitive collision
        "password": "another-long-password",
    });
    let response = post_json(app, "/api/v1/user/signup/expert", body).await;
    assert_error(response, StatusCode::CONFLICT, "CONFLICT").await;
}

/// Weak passwords are rejected at signup.
#[sqlx::test(migrations = "../db/migrations")]
async fn expert_signup_weak_password(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = serde_json::json!({
        "name": "Expert",
        "email": "weak@example.com",
        "password": "short",
    });
    let response = post_json(app, "/api/v1/user/signup/expert", body).await;
    assert_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
}

/// Wrong password on a confirmed account is a plain 401.
#[sqlx::test(migrations = "../db/migrations")]
async fn expert_signin_wrong_password(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let code = signup_expert(app.clone(), &pool, "expert@example.com").await;
    let response = get(app.clone(), &format!("/api/v1/user/register-confirm/{code}")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = serde_json::json!({
        "email": "expert@example.com",
        "password": "not-the-password",
    });
    let response = post_json(app, "/api/v1/user/signin/expert", body).await;
    assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
}

// ---------------------------------------------------------------------------
// Token refresh
// ---------------------------------------------------------------------------

/// Refresh rotates the token: the new pair works, the old one is revoked.
#[sqlx::test(migrations = "../db/migrations")]
async fn refresh_token_rotation(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let code = request_sms_code(app.clone(), &pool, PHONE).await;

    let response = post_json(
        app.clone(),
        "/api/v1/user/signin/customer",
        serde_json::json!({ "phone": PHONE, "code": code }),
    )
    .await;
    let json = body_json(response).await;
    let refresh_token = json["refresh_token"].as_str().unwrap().to_string();

    // First refresh succeeds and returns a different token.
    let response = post_json(
        app.clone(),
        "/api/v1/user/token/refresh",
        serde_json::json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let rotated = json["refresh_token"].as_str().unwrap();
    assert_ne!(rotated, refresh_token);

    // The consumed token is dead.
    let response = post_json(
        app,
        "/api/v1/user/token/refresh",
        serde_json::json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Own profile round trip: read, partial update, read back.
#[sqlx::test(migrations = "../db/migrations")]
async fn profile_read_and_update(pool: PgPool) {
    let app = common::build_test_app(pool.clone());

    let user = UserRepo::create_customer(&pool, PHONE)
        .await
        .expect("customer creation should succeed");
    let token = common::token_for(lawbridge_core::principal::Principal::Customer(user.id));

    let response = get_auth(app.clone(), "/api/v1/user", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], user.id);
    assert_eq!(json["phone"], PHONE);
    assert!(json["name"].is_null());

    let response = post_json_auth(
        app.clone(),
        "/api/v1/user",
        &token,
        serde_json::json!({ "name": "Ada" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["name"], "Ada");
    // Unmentioned fields are untouched.
    assert_eq!(json["phone"], PHONE);
}

/// Profile endpoints require a valid token.
#[sqlx::test(migrations = "../db/migrations")]
async fn profile_requires_auth(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get(app.clone(), "/api/v1/user").await;
    assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;

    let response = get_auth(app, "/api/v1/user", "not-a-jwt").await;
    assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
}
