//! Tests for the billing grant path

use super::handlers::apply_paid_checkout;
use crate::common::migrations::run_migrations;
use crate::common::AppState;
use crate::services::stripe::CheckoutSessionDetails;
use sqlx::SqlitePool;

async fn state_with_user() -> AppState {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    sqlx::query("INSERT INTO users (id, email) VALUES ('u1', 'creator@example.com')")
        .execute(&pool)
        .await
        .unwrap();
    AppState::for_tests(pool)
}

fn paid_session(session_id: &str, plan: Option<&str>) -> CheckoutSessionDetails {
    let mut object = serde_json::json!({
        "id": session_id,
        "payment_status": "paid",
        "amount_total": 900,
        "customer_details": {"email": "creator@example.com"},
        "metadata": {"user_id": "u1"}
    });
    if let Some(plan) = plan {
        object["metadata"]["plan"] = serde_json::json!(plan);
    }
    serde_json::from_value(object).unwrap()
}

#[tokio::test]
async fn paid_checkout_grants_credits_and_records_purchase() {
    let state = state_with_user().await;
    let session = paid_session("cs_1", Some("pro"));

    let plan = apply_paid_checkout(&state, "u1", &session).await.unwrap();

    assert_eq!(plan.as_str(), "pro");
    assert_eq!(state.credits.balance("u1").await.unwrap(), 100);

    let (count, amount): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(amount_cents), 0) FROM purchases WHERE user_id = 'u1'",
    )
    .fetch_one(&state.db)
    .await
    .unwrap();
    assert_eq!(count, 1);
    assert_eq!(amount, 900);
}

#[tokio::test]
async fn replayed_checkout_grants_only_once() {
    let state = state_with_user().await;
    let session = paid_session("cs_replay", Some("pro"));

    apply_paid_checkout(&state, "u1", &session).await.unwrap();
    // Webhook delivery and verify-payment racing on the same session.
    apply_paid_checkout(&state, "u1", &session).await.unwrap();

    assert_eq!(state.credits.balance("u1").await.unwrap(), 100);

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM purchases WHERE user_id = 'u1'")
            .fetch_one(&state.db)
            .await
            .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn distinct_sessions_each_grant() {
    let state = state_with_user().await;

    apply_paid_checkout(&state, "u1", &paid_session("cs_a", Some("pro")))
        .await
        .unwrap();
    apply_paid_checkout(&state, "u1", &paid_session("cs_b", Some("pro")))
        .await
        .unwrap();

    assert_eq!(state.credits.balance("u1").await.unwrap(), 200);
}

#[tokio::test]
async fn missing_plan_metadata_defaults_to_pro() {
    let state = state_with_user().await;
    let plan = apply_paid_checkout(&state, "u1", &paid_session("cs_np", None))
        .await
        .unwrap();
    assert_eq!(plan.as_str(), "pro");

    let account = state.credits.account("u1").await.unwrap().unwrap();
    assert_eq!(account.subscription_tier, "pro");
}

#[tokio::test]
async fn lifetime_plan_grants_lifetime_credits() {
    let state = state_with_user().await;
    apply_paid_checkout(&state, "u1", &paid_session("cs_l", Some("pro_lifetime")))
        .await
        .unwrap();

    assert_eq!(state.credits.balance("u1").await.unwrap(), 500);
    let account = state.credits.account("u1").await.unwrap().unwrap();
    assert_eq!(account.subscription_tier, "pro_lifetime");
}
