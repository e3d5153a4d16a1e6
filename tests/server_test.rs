//! End-to-end tests for the detector server
//!
//! A real OpenSSL client connects to the server and claims to be different
//! browsers; the JSON report must carry the matching verdict.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use mitm_detector::config::DetectorConfig;
use mitm_detector::server::{MitmServer, VerdictReporter};
use mitm_detector::tls::create_self_signed_acceptor;
use mitm_detector::FingerprintTable;

use common::{
    https_get, openssl_client_hello, split_response, tls_connect, CHROME_UA, FIREFOX_UA,
};

fn test_config() -> DetectorConfig {
    DetectorConfig {
        listen: "127.0.0.1:0".parse().unwrap(),
        self_signed: true,
        hello_timeout_ms: 1000,
        ..Default::default()
    }
}

async fn start_server_with(config: DetectorConfig) -> (SocketAddr, FingerprintTable) {
    let acceptor = create_self_signed_acceptor(&config.server_name).unwrap();
    let server = MitmServer::bind(&config, acceptor, Arc::new(VerdictReporter))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let table = server.table().clone();
    tokio::spawn(server.run());
    (addr, table)
}

async fn start_server() -> SocketAddr {
    start_server_with(test_config()).await.0
}

/// Poll until the table holds `len` entries
async fn wait_for_entries(table: &FingerprintTable, len: usize) {
    for _ in 0..150 {
        if table.len() == len {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("table has {} entries, expected {}", table.len(), len);
}

fn report(response: &str) -> serde_json::Value {
    let (head, body) = split_response(response);
    assert!(head.starts_with("HTTP/1.1 200 OK"), "unexpected response: {}", head);
    assert!(head.contains("content-type: application/json"));
    serde_json::from_str(body).unwrap()
}

#[tokio::test]
async fn test_openssl_client_claiming_firefox_is_flagged() {
    let addr = start_server().await;

    let body = report(&https_get(addr, FIREFOX_UA).await);
    assert_eq!(body["browser"], "firefox");
    assert_eq!(body["mitm"], "likely");
    assert!(!body["fingerprint"]["cipher_suites"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_non_browser_user_agent_is_unknown() {
    let addr = start_server().await;

    let body = report(&https_get(addr, "curl/8.4.0").await);
    assert_eq!(body["browser"], "unknown");
    assert_eq!(body["mitm"], "unknown");
}

#[tokio::test]
async fn test_keep_alive_serves_several_requests() {
    let addr = start_server().await;
    let mut stream = tls_connect(addr).await;

    let first = format!(
        "POST /one HTTP/1.1\r\nHost: localhost\r\nUser-Agent: {}\r\nContent-Length: 5\r\n\r\nhello",
        CHROME_UA
    );
    let second = format!(
        "GET /two HTTP/1.1\r\nHost: localhost\r\nUser-Agent: {}\r\nConnection: close\r\n\r\n",
        FIREFOX_UA
    );
    stream.write_all(first.as_bytes()).await.unwrap();
    stream.write_all(second.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    let _ = stream.read_to_end(&mut raw).await;
    let raw = String::from_utf8(raw).unwrap();

    assert_eq!(raw.matches("HTTP/1.1 200 OK").count(), 2);
    assert!(raw.contains("connection: keep-alive"));
    assert!(raw.contains("connection: close"));
    assert!(raw.contains("\"browser\": \"chrome\""));
    assert!(raw.contains("\"browser\": \"firefox\""));
}

#[tokio::test]
async fn test_malformed_request_gets_400() {
    let addr = start_server().await;
    let mut stream = tls_connect(addr).await;

    stream.write_all(b"NOT A REQUEST\r\n\r\n").await.unwrap();
    let mut raw = Vec::new();
    let _ = stream.read_to_end(&mut raw).await;

    let raw = String::from_utf8(raw).unwrap();
    assert!(raw.starts_with("HTTP/1.1 400 Bad Request"));
}

#[tokio::test]
async fn test_plain_http_client_does_not_stop_server() {
    let addr = start_server().await;

    let mut plain = TcpStream::connect(addr).await.unwrap();
    plain
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    drop(plain);

    let body = report(&https_get(addr, "curl/8.4.0").await);
    assert_eq!(body["mitm"], "unknown");
}

#[tokio::test]
async fn test_stalled_handshake_is_dropped() {
    let (addr, table) = start_server_with(DetectorConfig {
        handshake_timeout_ms: 200,
        idle_timeout_ms: 60_000,
        ..test_config()
    })
    .await;

    // Send a real ClientHello, then never answer the server's flight.
    let hello = openssl_client_hello().await;
    let mut stalled = TcpStream::connect(addr).await.unwrap();
    stalled.write_all(&hello).await.unwrap();

    wait_for_entries(&table, 1).await;
    wait_for_entries(&table, 0).await;

    let mut rest = Vec::new();
    let closed = tokio::time::timeout(Duration::from_secs(2), stalled.read_to_end(&mut rest)).await;
    assert!(closed.is_ok(), "server kept the stalled connection open");
}

#[tokio::test]
async fn test_idle_session_is_dropped() {
    let (addr, table) = start_server_with(DetectorConfig {
        handshake_timeout_ms: 60_000,
        idle_timeout_ms: 200,
        ..test_config()
    })
    .await;

    let mut idle = tls_connect(addr).await;
    wait_for_entries(&table, 1).await;
    wait_for_entries(&table, 0).await;

    let mut buf = [0u8; 16];
    let closed = tokio::time::timeout(Duration::from_secs(2), idle.read(&mut buf)).await;
    assert!(closed.is_ok(), "server kept the idle session open");

    // The server keeps serving after dropping the idle client.
    let body = report(&https_get(addr, "curl/8.4.0").await);
    assert_eq!(body["mitm"], "unknown");
}
