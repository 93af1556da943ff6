mod support;

use serde_json::json;

async fn create(payload: serde_json::Value) -> reqwest::Response {
    let base_url = support::ensure_server();
    reqwest::Client::new()
        .post(format!("{base_url}/rooms"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed")
}

#[tokio::test]
async fn when_room_is_created_then_id_is_echoed_and_duplicates_conflict() {
    let room_id = format!("test-{}", uuid::Uuid::new_v4());

    let res = create(json!({ "room_id": room_id, "max_clients": 4 })).await;
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.expect("json body");
    assert_eq!(body, json!({ "room_id": room_id }));

    let again = create(json!({ "room_id": room_id })).await;
    assert_eq!(again.status(), reqwest::StatusCode::CONFLICT);
    let body: serde_json::Value = again.json().await.expect("json body");
    assert_eq!(body["error"], "room already exists");
}

#[tokio::test]
async fn when_room_id_is_blank_then_request_is_rejected() {
    let res = create(json!({ "room_id": "   " })).await;

    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn when_capacity_is_zero_then_request_is_rejected() {
    let room_id = format!("test-{}", uuid::Uuid::new_v4());

    let res = create(json!({ "room_id": room_id, "max_clients": 0 })).await;

    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
}
