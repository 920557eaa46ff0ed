//! Drives the WebDriver client against a canned in-process endpoint.

use std::time::Duration;

use shopdesk_core::browser::{BrowserLauncher, BrowserProfile, Locator};
use shopdesk_interaction::WebDriverLauncher;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

fn route(method: &str, path: &str, body: &str) -> (u16, String) {
    match (method, path) {
        ("POST", "/session") => (200, r#"{"value":{"sessionId":"s1","capabilities":{}}}"#.into()),
        ("GET", "/session/s1/url") => (
            200,
            r#"{"value":"https://seller.shopee.tw/new-webchat/conversations"}"#.into(),
        ),
        ("POST", "/session/s1/element") if body.contains("missing") => (
            404,
            r#"{"value":{"error":"no such element","message":"Unable to locate element"}}"#.into(),
        ),
        ("POST", "/session/s1/element") => (200, format!(r#"{{"value":{{"{}":"e1"}}}}"#, ELEMENT_KEY)),
        ("GET", "/session/s1/element/e1/attribute/title") => (200, r#"{"value":"Alice"}"#.into()),
        ("GET", "/session/s1/title") => (
            404,
            r#"{"value":{"error":"invalid session id","message":"session deleted"}}"#.into(),
        ),
        _ => (
            404,
            r#"{"value":{"error":"unknown command","message":"unrouted"}}"#.into(),
        ),
    }
}

async fn serve(listener: TcpListener) {
    loop {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let header_end = loop {
                let n = stream.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    return;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|line| {
                    let lower = line.to_ascii_lowercase();
                    lower
                        .strip_prefix("content-length:")
                        .and_then(|v| v.trim().parse::<usize>().ok())
                })
                .unwrap_or(0);
            while buf.len() < header_end + content_length {
                let n = stream.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
            let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
            let method = request_line.next().unwrap_or_default();
            let path = request_line.next().unwrap_or_default();

            let (status, payload) = route(method, path, &body);
            let response = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                payload.len(),
                payload
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        });
    }
}

#[tokio::test]
async fn session_commands_map_to_capability_results() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(serve(listener));

    let temp_dir = TempDir::new().unwrap();
    let launcher = WebDriverLauncher::new(endpoint, Duration::from_secs(5)).unwrap();
    let session = launcher
        .launch(&BrowserProfile::new(temp_dir.path().join("profile")))
        .await
        .unwrap();

    assert_eq!(
        session.current_url().await.unwrap(),
        "https://seller.shopee.tw/new-webchat/conversations"
    );

    let cell = session
        .find_element(&Locator::css("[data-cy='webchat-conversation-cell-name']"), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        session.attribute(&cell, "title").await.unwrap().as_deref(),
        Some("Alice")
    );

    let missing = session.find_element(&Locator::css("#missing"), None).await.unwrap();
    assert!(missing.is_none());

    let err = session.title().await.unwrap_err();
    assert!(err.is_session_dead());
}

#[tokio::test]
async fn unreachable_endpoint_is_a_dead_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let temp_dir = TempDir::new().unwrap();
    let launcher = WebDriverLauncher::new(endpoint, Duration::from_secs(2)).unwrap();
    let err = launcher
        .launch(&BrowserProfile::new(temp_dir.path().join("profile")))
        .await
        .err()
        .unwrap();
    assert!(err.is_session_dead());
}
