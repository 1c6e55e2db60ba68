use super::*;
use crate::rate_limit::RateLimitError;
use crate::state::test_helpers::test_app_state;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[tokio::test]
async fn api_error_renders_json_body() {
    let err = ApiError::new(StatusCode::TOO_MANY_REQUESTS, &RateLimitError::Exceeded { limit: 10, window_ms: 1000 });
    assert!(err.retryable);

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], serde_json::json!(false));
    assert_eq!(body["code"], serde_json::json!("E_RATE_LIMITED"));
    assert_eq!(body["retryable"], serde_json::json!(true));
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn healthz_is_ok() {
    assert_eq!(healthz().await, StatusCode::OK);
}

/// Plain HTTP/1.1 GET against a served router; returns the raw response.
async fn http_get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    raw
}

#[tokio::test]
async fn router_serves_rest_routes() {
    let (state, store) = test_app_state();
    store.add_user(7, "neo", None);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });

    let health = http_get(addr, "/healthz").await;
    assert!(health.starts_with("HTTP/1.1 200"), "{health}");

    let count = http_get(addr, "/api/sessions/count").await;
    assert!(count.starts_with("HTTP/1.1 200"), "{count}");
    assert!(count.contains(r#""count":0"#), "{count}");

    let user = http_get(addr, "/api/users/neo").await;
    assert!(user.contains(r#""username":"neo""#), "{user}");

    let missing = http_get(addr, "/api/games/999").await;
    assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");
    assert!(missing.contains("E_SESSION_NOT_FOUND"), "{missing}");
}
