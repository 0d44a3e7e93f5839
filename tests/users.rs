mod common;

use reqwest::StatusCode;
use serde_json::{Value, json};
use sqlx::PgPool;

use common::{admin_token, register, spawn_app, user_token};

fn default_shipping_names(addresses: &Value) -> Vec<String> {
    addresses
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["isDefaultShipping"] == true)
        .map(|a| a["firstName"].as_str().unwrap().to_string())
        .collect()
}

fn address(first_name: &str, default_shipping: bool) -> Value {
    json!({
        "firstName": first_name,
        "lastName": "Doe",
        "country": "US",
        "streetAddress": "1 Main St",
        "city": "Springfield",
        "state": "IL",
        "postalCode": "62701",
        "phone": "555-0100",
        "label": "Office",
        "isDefaultShipping": default_shipping
    })
}

async fn get_json(client: &reqwest::Client, url: String, token: &str) -> Value {
    let response = client.get(url).bearer_auth(token).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.unwrap()
}

#[sqlx::test]
async fn profile_update_replaces_the_address_book(pool: PgPool) {
    let address_url = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let token = user_token(&client, &address_url, "jane@shop.test").await;

    let response = client
        .put(format!("{address_url}/api/users/profile"))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Jane",
            "phone": "555-0199",
            "addresses": [address("Home", true), address("Work", true)]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "User updated successfully");
    assert_eq!(body["data"]["name"], "Jane");
    assert_eq!(body["data"]["phone"], "555-0199");
    let addresses = body["data"]["addresses"].as_array().unwrap();
    assert_eq!(addresses.len(), 2);
    // The last entry claiming a default keeps it
    assert_eq!(default_shipping_names(&body["data"]["addresses"]), ["Work"]);

    // Blank name keeps the old one, a new list replaces the old addresses
    let body: Value = client
        .put(format!("{address_url}/api/users/profile"))
        .bearer_auth(&token)
        .json(&json!({ "name": "  ", "addresses": [address("Cabin", false)] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["name"], "Jane");
    assert_eq!(body["data"]["addresses"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["addresses"][0]["firstName"], "Cabin");

    let profile = get_json(&client, format!("{address_url}/api/users/profile"), &token).await;
    assert_eq!(profile["data"]["email"], "jane@shop.test");
    assert!(profile["data"].get("passwordHash").is_none());
}

#[sqlx::test]
async fn invalid_addresses_leave_the_profile_untouched(pool: PgPool) {
    let address_url = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let token = user_token(&client, &address_url, "jane@shop.test").await;

    let mut incomplete = address("Home", false);
    incomplete["city"] = json!("");

    let response = client
        .put(format!("{address_url}/api/users/profile"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Changed", "addresses": [incomplete] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let profile = get_json(&client, format!("{address_url}/api/users/profile"), &token).await;
    assert_eq!(profile["data"]["name"], "Test User");
}

#[sqlx::test]
async fn address_crud_keeps_a_single_default(pool: PgPool) {
    let address_url = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let token = user_token(&client, &address_url, "jane@shop.test").await;

    let mut ids = Vec::new();
    for name in ["Home", "Work"] {
        let response = client
            .post(format!("{address_url}/api/users/address"))
            .bearer_auth(&token)
            .json(&address(name, true))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["data"]["label"], "Office");
        ids.push(body["data"]["_id"].as_str().unwrap().to_string());
    }

    let body = get_json(&client, format!("{address_url}/api/users/addresses"), &token).await;
    assert_eq!(default_shipping_names(&body["data"]), ["Work"]);

    // Partial update moves the default back to the first address
    let response = client
        .put(format!("{address_url}/api/users/addresses/{}", ids[0]))
        .bearer_auth(&token)
        .json(&json!({ "city": "Shelbyville", "isDefaultShipping": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["city"], "Shelbyville");
    assert_eq!(body["data"]["firstName"], "Home");

    let body = get_json(&client, format!("{address_url}/api/users/addresses"), &token).await;
    assert_eq!(default_shipping_names(&body["data"]), ["Home"]);

    let response = client
        .delete(format!("{address_url}/api/users/addresses/{}", ids[1]))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .delete(format!("{address_url}/api/users/addresses/{}", ids[1]))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test]
async fn addresses_of_other_users_are_not_found(pool: PgPool) {
    let address_url = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let owner = user_token(&client, &address_url, "owner@shop.test").await;
    let other = user_token(&client, &address_url, "other@shop.test").await;

    let body: Value = client
        .post(format!("{address_url}/api/users/address"))
        .bearer_auth(&owner)
        .json(&address("Home", false))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = body["data"]["_id"].as_str().unwrap();

    let response = client
        .put(format!("{address_url}/api/users/addresses/{id}"))
        .bearer_auth(&other)
        .json(&json!({ "city": "Elsewhere" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Address not found");
}

#[sqlx::test]
async fn admin_lists_users_with_search_filter_and_pagination(pool: PgPool) {
    let address_url = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &address_url).await;
    for email in ["ann@shop.test", "bob@shop.test", "carl@example.org"] {
        user_token(&client, &address_url, email).await;
    }

    let body = get_json(
        &client,
        format!("{address_url}/api/users/all?role=user&sortBy=email&sortOrder=asc&limit=2"),
        &admin,
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["email"], "ann@shop.test");
    assert_eq!(body["data"][1]["email"], "bob@shop.test");
    assert_eq!(body["pagination"]["totalItems"], 3);
    assert_eq!(body["pagination"]["totalPages"], 2);
    assert_eq!(body["pagination"]["hasNextPage"], true);
    assert_eq!(body["pagination"]["hasPrevPage"], false);

    let body = get_json(
        &client,
        format!("{address_url}/api/users/all?search=EXAMPLE"),
        &admin,
    )
    .await;
    assert_eq!(body["pagination"]["totalItems"], 1);
    assert_eq!(body["data"][0]["email"], "carl@example.org");

    // LIKE wildcards match literally
    let body = get_json(&client, format!("{address_url}/api/users/all?search=%25"), &admin).await;
    assert_eq!(body["pagination"]["totalItems"], 0);
}

#[sqlx::test]
async fn admin_user_stats(pool: PgPool) {
    let address_url = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &address_url).await;
    user_token(&client, &address_url, "ann@shop.test").await;
    user_token(&client, &address_url, "bob@shop.test").await;

    let body = get_json(&client, format!("{address_url}/api/users/stats"), &admin).await;
    assert_eq!(
        body["data"],
        json!({
            "totalUsers": 3,
            "adminUsers": 1,
            "regularUsers": 2,
            "googleUsers": 0,
            "localUsers": 3,
            "recentUsers": 3
        })
    );
}

#[sqlx::test]
async fn admins_cannot_target_themselves(pool: PgPool) {
    let address_url = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let admin = register(&client, &address_url, "boss@shop.test", "password123", Some("admin")).await;
    let admin_id = admin.id;

    let response = client
        .delete(format!("{address_url}/api/users/{admin_id}"))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Cannot delete your own account");

    let response = client
        .patch(format!("{address_url}/api/users/{admin_id}/role"))
        .bearer_auth(&admin.token)
        .json(&json!({ "role": "user" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Cannot change your own role");
}

#[sqlx::test]
async fn admin_manages_other_accounts(pool: PgPool) {
    let address_url = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &address_url).await;
    let member = register(&client, &address_url, "ann@shop.test", "password123", None).await;
    let member_id = member.id;

    let response = client
        .patch(format!("{address_url}/api/users/{member_id}/role"))
        .bearer_auth(&admin)
        .json(&json!({ "role": "superuser" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .patch(format!("{address_url}/api/users/{member_id}/role"))
        .bearer_auth(&admin)
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["role"], "admin");

    let response = client
        .put(format!("{address_url}/api/users/{member_id}"))
        .bearer_auth(&admin)
        .json(&json!({ "phone": "555-0123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = get_json(&client, format!("{address_url}/api/users/{member_id}"), &admin).await;
    assert_eq!(body["data"]["phone"], "555-0123");
    assert_eq!(body["data"]["addresses"], json!([]));

    let response = client
        .delete(format!("{address_url}/api/users/{member_id}"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .get(format!("{address_url}/api/users/{member_id}"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test]
async fn user_management_is_admin_only(pool: PgPool) {
    let address_url = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let token = user_token(&client, &address_url, "ann@shop.test").await;

    for path in ["/api/users/all", "/api/users/stats"] {
        let response = client
            .get(format!("{address_url}{path}"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
