//! Integration tests for the order repository against a real database.
//!
//! Exercises the conditional-update transitions: claim atomicity, terminal
//! states, file append/overwrite semantics, and pagination counts.

use lawbridge_core::file_policy::FileKind;
use lawbridge_core::order::OrderStatus;
use lawbridge_db::models::order::CreateOrder;
use lawbridge_db::repositories::{OrderRepo, UserRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn customer(pool: &PgPool, phone: &str) -> i64 {
    UserRepo::create_customer(pool, phone)
        .await
        .expect("customer creation should succeed")
        .id
}

async fn expert(pool: &PgPool, email: &str) -> i64 {
    UserRepo::create_expert(
        pool,
        &lawbridge_db::models::user::CreateExpert {
            name: "Test Expert".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$fake".to_string(),
            email_confirm_code: format!("code-{email}"),
        },
    )
    .await
    .expect("expert creation should succeed")
    .id
}

async fn draft_order(pool: &PgPool, customer_id: i64, name: &str) -> i64 {
    OrderRepo::create(
        pool,
        &CreateOrder {
            customer_id,
            name: name.to_string(),
            description: Some("review this".to_string()),
        },
    )
    .await
    .expect("order creation should succeed")
    .id
}

// ---------------------------------------------------------------------------
// Creation & round trip
// ---------------------------------------------------------------------------

/// Creating then fetching an order returns identical fields with draft
/// status and empty rating/document.
#[sqlx::test(migrations = "./migrations")]
async fn test_create_then_fetch_round_trip(pool: PgPool) {
    let cid = customer(&pool, "+79990000001").await;
    let id = draft_order(&pool, cid, "contract check").await;

    let order = OrderRepo::find_by_id(&pool, id)
        .await
        .expect("fetch should succeed")
        .expect("order must exist");

    assert_eq!(order.name, "contract check");
    assert_eq!(order.description.as_deref(), Some("review this"));
    assert_eq!(order.customer_id, cid);
    assert_eq!(order.status().unwrap(), OrderStatus::Draft);
    assert_eq!(order.expert_id, None);
    assert_eq!(order.rating, None);
    assert!(!order.has_document());
    assert_eq!(order.vulnerability, "unknown");
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// draft -> published -> handling -> done walks the whole graph.
#[sqlx::test(migrations = "./migrations")]
async fn test_full_lifecycle(pool: PgPool) {
    let cid = customer(&pool, "+79990000002").await;
    let eid = expert(&pool, "lifecycle@test.com").await;
    let id = draft_order(&pool, cid, "lifecycle").await;

    let order = OrderRepo::transition(&pool, id, OrderStatus::Draft, OrderStatus::Published)
        .await
        .unwrap()
        .expect("confirm must apply");
    assert_eq!(order.status().unwrap(), OrderStatus::Published);

    let order = OrderRepo::accept(&pool, id, eid)
        .await
        .unwrap()
        .expect("claim must apply");
    assert_eq!(order.status().unwrap(), OrderStatus::Handling);
    assert_eq!(order.expert_id, Some(eid));

    let order = OrderRepo::transition(&pool, id, OrderStatus::Handling, OrderStatus::Done)
        .await
        .unwrap()
        .expect("complete must apply");
    assert_eq!(order.status().unwrap(), OrderStatus::Done);
}

/// A transition whose expected previous status no longer holds returns None
/// instead of applying.
#[sqlx::test(migrations = "./migrations")]
async fn test_conditional_transition_rejects_stale_state(pool: PgPool) {
    let cid = customer(&pool, "+79990000003").await;
    let id = draft_order(&pool, cid, "stale").await;

    // Cancel the draft.
    let order = OrderRepo::transition(&pool, id, OrderStatus::Draft, OrderStatus::Cancelled)
        .await
        .unwrap()
        .expect("cancel must apply");
    assert_eq!(order.status().unwrap(), OrderStatus::Cancelled);

    // Confirm now expects 'draft' and must not resurrect the order.
    let result = OrderRepo::transition(&pool, id, OrderStatus::Draft, OrderStatus::Published)
        .await
        .unwrap();
    assert!(result.is_none(), "terminal orders must stay terminal");
}

/// The claim is atomic: the second expert's accept finds no matching row.
#[sqlx::test(migrations = "./migrations")]
async fn test_accept_single_winner(pool: PgPool) {
    let cid = customer(&pool, "+79990000004").await;
    let first = expert(&pool, "first@test.com").await;
    let second = expert(&pool, "second@test.com").await;
    let id = draft_order(&pool, cid, "contested").await;

    OrderRepo::transition(&pool, id, OrderStatus::Draft, OrderStatus::Published)
        .await
        .unwrap()
        .expect("confirm must apply");

    let winner = OrderRepo::accept(&pool, id, first).await.unwrap();
    let loser = OrderRepo::accept(&pool, id, second).await.unwrap();

    assert!(winner.is_some(), "first claim must win");
    assert!(loser.is_none(), "second claim must find no matching row");

    let order = OrderRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(order.expert_id, Some(first), "assignee must not be overwritten");
}

/// Rating only applies to drafts.
#[sqlx::test(migrations = "./migrations")]
async fn test_set_rating_draft_only(pool: PgPool) {
    let cid = customer(&pool, "+79990000005").await;
    let id = draft_order(&pool, cid, "rated").await;

    let order = OrderRepo::set_rating(&pool, id, 4.5).await.unwrap();
    assert_eq!(order.expect("rating must apply").rating, Some(4.5));

    OrderRepo::transition(&pool, id, OrderStatus::Draft, OrderStatus::Published)
        .await
        .unwrap()
        .expect("confirm must apply");

    let result = OrderRepo::set_rating(&pool, id, 1.0).await.unwrap();
    assert!(result.is_none(), "rating a published order must not apply");
}

/// The expert aggregate averages only rated orders and lands in the user row
/// via `UserRepo::set_rating`.
#[sqlx::test(migrations = "./migrations")]
async fn test_expert_rating_average(pool: PgPool) {
    let cid = customer(&pool, "+79990000011").await;
    let eid = expert(&pool, "avg@example.com").await;

    // Two rated orders and one unrated, all assigned to the expert.
    for (name, rating) in [("a", Some(3.0)), ("b", Some(5.0)), ("c", None)] {
        let id = draft_order(&pool, cid, name).await;
        if let Some(r) = rating {
            OrderRepo::set_rating(&pool, id, r)
                .await
                .unwrap()
                .expect("rating must apply");
        }
        OrderRepo::transition(&pool, id, OrderStatus::Draft, OrderStatus::Published)
            .await
            .unwrap()
            .expect("confirm must apply");
        OrderRepo::accept(&pool, id, eid)
            .await
            .unwrap()
            .expect("claim must apply");
    }

    let avg = OrderRepo::average_rating_for_expert(&pool, eid).await.unwrap();
    assert_eq!(avg, Some(4.0));

    assert!(UserRepo::set_rating(&pool, eid, 4.0).await.unwrap());
    let user = UserRepo::find_by_id(&pool, eid)
        .await
        .unwrap()
        .expect("expert row");
    assert_eq!(user.rating, Some(4.0));
}

// ---------------------------------------------------------------------------
// Document payloads
// ---------------------------------------------------------------------------

/// Images append in order; a document file overwrites the single slot.
#[sqlx::test(migrations = "./migrations")]
async fn test_file_append_and_overwrite_semantics(pool: PgPool) {
    let cid = customer(&pool, "+79990000006").await;
    let id = draft_order(&pool, cid, "files").await;

    OrderRepo::add_result_file(&pool, id, FileKind::Image, "https://s3/a.png")
        .await
        .unwrap()
        .expect("order must exist");
    let order = OrderRepo::add_result_file(&pool, id, FileKind::Image, "https://s3/b.png")
        .await
        .unwrap()
        .expect("order must exist");
    assert_eq!(
        order.result_images,
        vec!["https://s3/a.png".to_string(), "https://s3/b.png".to_string()],
        "images must append in upload order"
    );

    let order = OrderRepo::add_result_file(&pool, id, FileKind::Document, "https://s3/v1.pdf")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.result_file.as_deref(), Some("https://s3/v1.pdf"));

    let order = OrderRepo::add_result_file(&pool, id, FileKind::Document, "https://s3/v2.pdf")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        order.result_file.as_deref(),
        Some("https://s3/v2.pdf"),
        "a second document upload overwrites the slot"
    );

    // Input and result payloads are independent.
    assert!(order.input_images.is_empty());
    assert!(order.input_file.is_none());
}

/// OCR text lands in document_text without touching the payloads.
#[sqlx::test(migrations = "./migrations")]
async fn test_set_document_text(pool: PgPool) {
    let cid = customer(&pool, "+79990000007").await;
    let id = draft_order(&pool, cid, "ocr").await;

    OrderRepo::set_document_text(&pool, id, "extracted words").await.unwrap();

    let order = OrderRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(order.document_text.as_deref(), Some("extracted words"));
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// The published listing counts only published rows.
#[sqlx::test(migrations = "./migrations")]
async fn test_list_published_counts_published_only(pool: PgPool) {
    let cid = customer(&pool, "+79990000008").await;

    let a = draft_order(&pool, cid, "a").await;
    let _b = draft_order(&pool, cid, "b").await;
    OrderRepo::transition(&pool, a, OrderStatus::Draft, OrderStatus::Published)
        .await
        .unwrap()
        .unwrap();

    let (total, orders) = OrderRepo::list_published(&pool, 10, 0).await.unwrap();
    assert_eq!(total, 1, "drafts must not count toward the published total");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, a);
}

/// The self listing matches by either side and honours the status filter.
#[sqlx::test(migrations = "./migrations")]
async fn test_list_for_user_both_sides_and_filter(pool: PgPool) {
    let cid = customer(&pool, "+79990000009").await;
    let other = customer(&pool, "+79990000010").await;
    let eid = expert(&pool, "lister@test.com").await;

    let mine = draft_order(&pool, cid, "mine").await;
    let claimed = draft_order(&pool, other, "claimed").await;
    OrderRepo::transition(&pool, claimed, OrderStatus::Draft, OrderStatus::Published)
        .await
        .unwrap()
        .unwrap();
    OrderRepo::accept(&pool, claimed, eid).await.unwrap().unwrap();

    // Customer sees only their own order.
    let (total, orders) = OrderRepo::list_for_user(&pool, cid, &[], 10, 0).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(orders[0].id, mine);

    // The expert sees the order they claimed.
    let (total, orders) = OrderRepo::list_for_user(&pool, eid, &[], 10, 0).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(orders[0].id, claimed);

    // Status filter excludes non-matching rows.
    let (total, _) =
        OrderRepo::list_for_user(&pool, cid, &[OrderStatus::Handling], 10, 0)
            .await
            .unwrap();
    assert_eq!(total, 0);
    let (total, _) = OrderRepo::list_for_user(&pool, cid, &[OrderStatus::Draft], 10, 0)
        .await
        .unwrap();
    assert_eq!(total, 1);
}
