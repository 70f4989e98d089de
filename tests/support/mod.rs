//! Shared helpers for the integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use std::net::SocketAddr;
use std::time::Duration;

use leankit_client::{ClientConfig, ClientConfigBuilder, LeanKitClient};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::{MockServer, ResponseTemplate};

pub const EMAIL: &str = "dev@acme.test";
pub const PASSWORD: &str = "hunter2";
pub const BOARD_ID: &str = "101";
/// `Basic base64("dev@acme.test:hunter2")`
pub const AUTHORIZATION: &str = "Basic ZGV2QGFjbWUudGVzdDpodW50ZXIy";

/// Config builder pointed at the mock server over plain HTTP.
pub fn config_for(server: &MockServer) -> ClientConfigBuilder {
    config_for_addr(*server.address())
}

/// Config builder pointed at any local listener over plain HTTP.
pub fn config_for_addr(addr: SocketAddr) -> ClientConfigBuilder {
    ClientConfig::builder()
        .email(EMAIL)
        .password(PASSWORD)
        .host(addr.to_string())
        .board_id(BOARD_ID)
        .scheme("http")
        .read_timeout(Duration::from_secs(10))
}

pub fn client_for(server: &MockServer) -> LeanKitClient {
    LeanKitClient::new(config_for(server).build().expect("valid config")).expect("client builds")
}

/// A LeanKit envelope response.
pub fn envelope(reply_code: i64, reply_text: &str, reply_data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "ReplyCode": reply_code,
        "ReplyText": reply_text,
        "ReplyData": reply_data,
    }))
}

/// Serves a single connection with a hand-written HTTP/1.1 response.
///
/// After the request head arrives, each `(delay, bytes)` segment is written
/// once its delay has passed; the socket is closed after the last one.
pub async fn start_scripted_server_or_skip(
    script: Vec<(Duration, Vec<u8>)>,
) -> Option<SocketAddr> {
    if socket_guard::should_skip_socket_bound_test() {
        return None;
    }
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("listener address");

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut head = Vec::new();
        let mut buf = [0_u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => head.extend_from_slice(&buf[..n]),
            }
        }
        for (delay, bytes) in script {
            tokio::time::sleep(delay).await;
            if socket.write_all(&bytes).await.is_err() {
                return;
            }
            let _ = socket.flush().await;
        }
        let _ = socket.shutdown().await;
    });

    Some(addr)
}
