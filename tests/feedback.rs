mod common;

use reqwest::StatusCode;
use serde_json::{Value, json};
use sqlx::PgPool;

use common::{admin_token, register, spawn_app};

async fn submit(
    client: &reqwest::Client,
    address: &str,
    token: Option<&str>,
    body: Value,
) -> reqwest::Response {
    let mut request = client
        .post(format!("{address}/api/feedback/create"))
        .json(&body);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    request.send().await.expect("Failed to submit feedback")
}

async fn submit_ok(client: &reqwest::Client, address: &str, name: &str, rating: i64) -> String {
    let response = submit(
        client,
        address,
        None,
        json!({ "name": name, "rating": rating, "text": format!("{name} says hi") }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    body["data"]["_id"].as_str().unwrap().to_string()
}

async fn set_status(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    id: &str,
    body: Value,
) -> reqwest::Response {
    client
        .patch(format!("{address}/api/feedback/{id}/status"))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[sqlx::test]
async fn anonymous_and_signed_in_submissions(pool: PgPool) {
    let address = spawn_app(pool).await;
    let client = reqwest::Client::new();

    let response = submit(
        &client,
        &address,
        None,
        json!({ "name": "Guest", "rating": 4, "text": "Nice shop" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Feedback submitted successfully");
    assert_eq!(body["data"]["status"], "pending");
    assert!(body["data"]["user"].is_null());

    let member = register(&client, &address, "ann@shop.test", "password123", None).await;
    let response = submit(
        &client,
        &address,
        Some(&member.token),
        json!({ "name": "Ann", "rating": 5, "text": "Great" }),
    )
    .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["user"], member.id.to_string());

    // A bad token is treated as anonymous
    let response = submit(
        &client,
        &address,
        Some("garbage"),
        json!({ "name": "Eve", "rating": 3, "text": "Hmm" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["user"].is_null());
}

#[sqlx::test]
async fn submissions_are_validated(pool: PgPool) {
    let address = spawn_app(pool.clone()).await;
    let client = reqwest::Client::new();

    let cases = [
        (
            json!({ "name": "Guest", "text": "No rating" }),
            "Missing required fields: name, rating, text",
        ),
        (
            json!({ "name": "  ", "rating": 3, "text": "Blank name" }),
            "Missing required fields: name, rating, text",
        ),
        (
            json!({ "name": "Guest", "rating": 6, "text": "Too good" }),
            "Rating must be between 1 and 5",
        ),
        (
            json!({ "name": "Guest", "rating": 0, "text": "Too bad" }),
            "Rating must be between 1 and 5",
        ),
        (
            json!({ "name": "Guest", "rating": 3, "text": "x".repeat(1001) }),
            "Feedback text cannot exceed 1000 characters",
        ),
    ];

    for (body, error) in cases {
        let response = submit(&client, &address, None, body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], error);
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feedback")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test]
async fn only_approved_feedback_is_public(pool: PgPool) {
    let address = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &address).await;

    let approved_low = submit_ok(&client, &address, "Low", 2).await;
    let approved_high = submit_ok(&client, &address, "High", 5).await;
    let rejected = submit_ok(&client, &address, "Spam", 1).await;
    submit_ok(&client, &address, "Waiting", 4).await;

    for id in [&approved_low, &approved_high] {
        let response = set_status(&client, &address, &admin, id, json!({"status": "approved"})).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    set_status(&client, &address, &admin, &rejected, json!({"status": "rejected"})).await;

    let body: Value = client
        .get(format!("{address}/api/feedback/approved?sortBy=rating&sortOrder=asc"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["pagination"]["totalItems"], 2);
    assert_eq!(body["data"][0]["name"], "Low");
    assert_eq!(body["data"][1]["name"], "High");
    assert!(body["data"][0].get("status").is_none());

    let body: Value = client
        .get(format!("{address}/api/feedback/approved?rating=5"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["pagination"]["totalItems"], 1);
    assert_eq!(body["data"][0]["_id"], approved_high.as_str());
}

#[sqlx::test]
async fn moderation_records_the_response(pool: PgPool) {
    let address = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let admin = register(&client, &address, "mod@shop.test", "password123", Some("admin")).await;
    let id = submit_ok(&client, &address, "Guest", 3).await;

    let response = set_status(&client, &address, &admin.token, &id, json!({"status": "archived"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Without a response nothing is attributed
    let body: Value = set_status(&client, &address, &admin.token, &id, json!({"status": "approved"}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["status"], "approved");
    assert!(body["data"]["respondedBy"].is_null());
    assert!(body["data"]["respondedAt"].is_null());

    let body: Value = set_status(
        &client,
        &address,
        &admin.token,
        &id,
        json!({"status": "rejected", "adminResponse": "Off topic"}),
    )
    .await
    .json()
    .await
    .unwrap();
    assert_eq!(body["message"], "Feedback status updated successfully");
    assert_eq!(body["data"]["status"], "rejected");
    assert_eq!(body["data"]["adminResponse"], "Off topic");
    assert_eq!(body["data"]["respondedBy"], admin.id.to_string());
    assert!(body["data"]["respondedAt"].is_string());

    let missing = uuid::Uuid::new_v4();
    let response = set_status(
        &client,
        &address,
        &admin.token,
        &missing.to_string(),
        json!({"status": "approved"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test]
async fn admin_listing_stats_and_delete(pool: PgPool) {
    let address = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &address).await;

    let first = submit_ok(&client, &address, "A", 5).await;
    submit_ok(&client, &address, "B", 5).await;
    submit_ok(&client, &address, "C", 2).await;
    set_status(&client, &address, &admin, &first, json!({"status": "approved"})).await;

    let body: Value = client
        .get(format!("{address}/api/feedback?status=pending&limit=1"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["pagination"]["totalItems"], 2);
    assert_eq!(body["pagination"]["hasNextPage"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let body: Value = client
        .get(format!("{address}/api/feedback/stats"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let stats = &body["data"];
    assert_eq!(stats["totalFeedback"], 3);
    assert_eq!(stats["pendingFeedback"], 2);
    assert_eq!(stats["approvedFeedback"], 1);
    assert_eq!(stats["rejectedFeedback"], 0);
    assert_eq!(stats["averageRating"], 4.0);
    assert_eq!(stats["recentFeedback"], 3);
    assert_eq!(
        stats["ratingDistribution"],
        json!([{"rating": 2, "count": 1}, {"rating": 5, "count": 2}])
    );

    let response = client
        .delete(format!("{address}/api/feedback/{first}"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .delete(format!("{address}/api/feedback/{first}"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test]
async fn moderation_is_admin_only(pool: PgPool) {
    let address = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let member = register(&client, &address, "ann@shop.test", "password123", None).await;

    let response = client
        .get(format!("{address}/api/feedback"))
        .bearer_auth(&member.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
