mod support;

use serde_json::json;
use support::{connect, next_json, next_of_type, send_json};

async fn create_room(max_clients: usize) -> String {
    let base_url = support::ensure_server();
    let room_id = format!("test-{}", uuid::Uuid::new_v4());
    let res = reqwest::Client::new()
        .post(format!("{base_url}/rooms"))
        .json(&json!({ "room_id": room_id, "max_clients": max_clients }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    room_id
}

fn join(username: &str, clan: &str) -> serde_json::Value {
    json!({ "type": "join", "data": { "username": username, "clan": clan } })
}

#[tokio::test]
async fn when_client_joins_default_room_then_it_gets_init_then_full_state() {
    let mut socket = connect(None).await;
    send_json(&mut socket, join("vlad", "ventrue")).await;

    let init = next_of_type(&mut socket, "gameInit").await;
    assert_eq!(init["data"]["mapWidth"], 7000.0);
    assert_eq!(init["data"]["currentTime"], "day");
    let player_id = init["data"]["playerId"]
        .as_str()
        .expect("player id")
        .to_string();

    let sync = next_of_type(&mut socket, "stateSync").await;
    let players = sync["data"]["players"].as_array().expect("players array");
    let me = players
        .iter()
        .find(|p| p["id"] == player_id.as_str())
        .expect("own player in state");
    assert_eq!(me["username"], "vlad");
    assert_eq!(me["clan"], "ventrue");
    assert_eq!(sync["data"]["territories"].as_array().map(Vec::len), Some(16));
}

#[tokio::test]
async fn when_second_player_joins_then_first_sees_them_in_a_patch() {
    let room_id = create_room(2).await;
    let mut first = connect(Some(&room_id)).await;
    send_json(&mut first, join("first", "tremere")).await;
    next_of_type(&mut first, "stateSync").await;

    let mut second = connect(Some(&room_id)).await;
    send_json(&mut second, join("second", "toreador")).await;
    let init = next_of_type(&mut second, "gameInit").await;
    let second_id = init["data"]["playerId"].as_str().expect("player id").to_string();

    loop {
        let patch = next_of_type(&mut first, "statePatch").await;
        let added = patch["data"]["players"]["added"].as_array().cloned();
        if added
            .unwrap_or_default()
            .iter()
            .any(|p| p["id"] == second_id.as_str())
        {
            break;
        }
    }
}

#[tokio::test]
async fn when_room_is_full_then_join_is_rejected_and_socket_closed() {
    let room_id = create_room(1).await;
    let mut first = connect(Some(&room_id)).await;
    send_json(&mut first, join("first", "nosferatu")).await;
    next_of_type(&mut first, "gameInit").await;

    let mut second = connect(Some(&room_id)).await;
    send_json(&mut second, join("second", "nosferatu")).await;

    // Patches for the room may precede the rejection.
    let rejected = next_of_type(&mut second, "joinRejected").await;
    assert!(rejected["data"]["reason"].as_str().is_some());
    assert!(next_json(&mut second).await.is_none());
}

#[tokio::test]
async fn when_clan_is_unknown_then_join_is_rejected() {
    let mut socket = connect(None).await;
    send_json(&mut socket, join("vlad", "brujah")).await;

    let rejected = next_json(&mut socket).await.expect("joinRejected frame");
    assert_eq!(rejected["type"], "joinRejected");
    assert!(next_json(&mut socket).await.is_none());
}

#[tokio::test]
async fn when_room_does_not_exist_then_upgrade_is_refused() {
    let base_url = support::ensure_server();
    let url = format!(
        "{}/ws?room_id=missing-room",
        base_url.replacen("http://", "ws://", 1)
    );

    let result = tokio_tungstenite::connect_async(url).await;

    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), 404);
        }
        other => panic!("expected HTTP 404, got {other:?}"),
    }
}
