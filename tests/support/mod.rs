// Boots one shared server per test binary and offers small client helpers.
#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Base URL published once the server thread has bound its port.
static SERVER_URL: OnceLock<String> = OnceLock::new();

// Start the server on first use and return its base URL.
pub fn ensure_server() -> &'static str {
    SERVER_URL.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // A dedicated OS thread and runtime outlive each `#[tokio::test]` runtime.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{addr}"));
                room_server::run(listener).await.expect("server failed");
            });
        });
        wait_until_ready(&published_url)
    })
}

// Block until the URL is published and the port accepts TCP connections.
fn wait_until_ready(published_url: &OnceLock<String>) -> String {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://")
        .to_string();
    for _ in 0..100 {
        if std::net::TcpStream::connect(&addr).is_ok() {
            return base_url;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("server did not become ready in time");
}

// Open a WebSocket to `room_id` (or the default room).
pub async fn connect(room_id: Option<&str>) -> Socket {
    let base_url = ensure_server();
    let ws_base = base_url.replacen("http://", "ws://", 1);
    let url = match room_id {
        Some(room_id) => format!("{ws_base}/ws?room_id={room_id}"),
        None => format!("{ws_base}/ws"),
    };
    let (socket, _response) = tokio_tungstenite::connect_async(url)
        .await
        .expect("websocket connect");
    socket
}

pub async fn send_json(socket: &mut Socket, value: serde_json::Value) {
    socket
        .send(Message::Text(value.to_string().into()))
        .await
        .expect("send frame");
}

// Next JSON text frame, or `None` once the server closes the socket.
pub async fn next_json(socket: &mut Socket) -> Option<serde_json::Value> {
    loop {
        let next = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("frame within timeout");
        match next? {
            Ok(Message::Text(text)) => {
                return Some(serde_json::from_str(&text).expect("server sends JSON"));
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

// Skip frames until one with the given `type` arrives.
pub async fn next_of_type(socket: &mut Socket, kind: &str) -> serde_json::Value {
    loop {
        let frame = next_json(socket)
            .await
            .unwrap_or_else(|| panic!("socket closed before `{kind}`"));
        if frame["type"] == kind {
            return frame;
        }
    }
}
