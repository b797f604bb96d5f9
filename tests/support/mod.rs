// Shared primitives for one-time server bootstrapping and WebSocket clients across integration tests.
#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const WAIT: Duration = Duration::from_secs(5);

// Global WebSocket URL used by all tests after the server publishes its bound address.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Ensure the test server is running and return the shared WebSocket URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_addr = Arc::new(OnceLock::<String>::new());
        let published_addr_thread = Arc::clone(&published_addr);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_addr_thread.set(addr.to_string());
                race_server::run(listener).await.expect("server failed");
            });
        });
        wait_for_server(published_addr);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

// Wait for address publication and then for the server socket to accept TCP connections.
fn wait_for_server(published_addr: Arc<OnceLock<String>>) {
    let addr = loop {
        if let Some(addr) = published_addr.get() {
            break addr.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(format!("ws://{addr}/"));

    for _ in 0..100 {
        if std::net::TcpStream::connect(&addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

/// Opens a connection and consumes the welcome message. Returns the assigned client id.
pub async fn connect() -> (Client, u64) {
    let url = ensure_server();
    let (mut ws, _) = connect_async(url).await.expect("websocket handshake");
    let welcome = next_json(&mut ws).await;
    assert_eq!(welcome["type"], "welcome");
    let client_id = welcome["clientId"].as_u64().expect("numeric client id");
    (ws, client_id)
}

pub async fn send_json(ws: &mut Client, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("send message");
}

pub async fn send_raw(ws: &mut Client, text: &str) {
    ws.send(Message::text(text.to_string()))
        .await
        .expect("send message");
}

pub async fn send_binary(ws: &mut Client, data: &[u8]) {
    ws.send(Message::binary(data.to_vec()))
        .await
        .expect("send message");
}

pub async fn setup_player(ws: &mut Client, name: &str) {
    send_json(
        ws,
        serde_json::json!({"type": "playerSetup", "name": name, "carId": "Race_car_03"}),
    )
    .await;
}

/// Next text frame parsed as JSON.
pub async fn next_json(ws: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("message in time")
            .expect("stream open")
            .expect("valid frame");
        if msg.is_text() {
            let text = msg.to_text().expect("utf-8 text");
            return serde_json::from_str(text).expect("server sends json");
        }
    }
}

/// Reads until a message matches `pred`, skipping everything else.
pub async fn next_matching(ws: &mut Client, pred: impl Fn(&Value) -> bool) -> Value {
    tokio::time::timeout(WAIT, async {
        loop {
            let value = next_json(ws).await;
            if pred(&value) {
                return value;
            }
        }
    })
    .await
    .expect("matching message in time")
}

pub fn is_type(value: &Value, ty: &str) -> bool {
    value["type"] == ty
}

pub fn player_ids(update: &Value) -> Vec<u64> {
    update["players"]
        .as_array()
        .map(|players| players.iter().filter_map(|p| p["id"].as_u64()).collect())
        .unwrap_or_default()
}
