//! Tests for the reqwest-backed fetcher

use link_resolver::config::HttpConfig;
use link_resolver::fetch::{FetchError, FetchRequest, Fetcher, HttpFetcher};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&HttpConfig::default()).expect("Failed to build fetcher")
}

#[tokio::test]
async fn test_redirect_returned_when_not_following() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/go"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/file.mkv"))
        .mount(&mock_server)
        .await;

    let request =
        FetchRequest::new(format!("{}/go", mock_server.uri()), Duration::from_secs(5)).no_redirects();
    let response = fetcher().get(&request).await.expect("Request failed");

    assert_eq!(response.status, 302);
    assert_eq!(response.location(), Some("/file.mkv"));
}

#[tokio::test]
async fn test_redirect_followed_by_default() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/go"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/landing"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/landing"))
        .respond_with(ResponseTemplate::new(200).set_body_string("landed"))
        .mount(&mock_server)
        .await;

    let request = FetchRequest::new(format!("{}/go", base_url), Duration::from_secs(5));
    let response = fetcher().get(&request).await.expect("Request failed");

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "landed");
    assert_eq!(response.final_url, format!("{}/landing", base_url));
}

#[tokio::test]
async fn test_referer_and_headers_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("referer", "https://origin.example/"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let request = FetchRequest::new(format!("{}/page", mock_server.uri()), Duration::from_secs(5))
        .with_referer(Some("https://origin.example/".to_string()))
        .with_header("X-Requested-With", "XMLHttpRequest");
    let response = fetcher().get(&request).await.expect("Request failed");

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_post_sends_form() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/source"))
        .and(body_string_contains("file=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
        .mount(&mock_server)
        .await;

    let request = FetchRequest::new(
        format!("{}/api/source", mock_server.uri()),
        Duration::from_secs(5),
    );
    let form = vec![("file".to_string(), "abc123".to_string())];
    let response = fetcher().post(&request, &form).await.expect("Request failed");

    assert!(response.is_success());
    assert_eq!(response.body, r#"{"ok":true}"#);
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let request = FetchRequest::new(
        format!("{}/slow", mock_server.uri()),
        Duration::from_millis(200),
    );
    let result = fetcher().get(&request).await;

    assert!(matches!(result, Err(FetchError::Timeout { .. })));
}

#[tokio::test]
async fn test_headers_only_skips_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dl/abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/octet-stream")
                .set_body_bytes(vec![0u8; 4 * 1024 * 1024]),
        )
        .mount(&mock_server)
        .await;

    let request = FetchRequest::new(
        format!("{}/dl/abc?token=1", mock_server.uri()),
        Duration::from_secs(5),
    )
    .no_redirects()
    .headers_only();
    let response = fetcher().get(&request).await.expect("Request failed");

    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("application/octet-stream"));
    assert!(response.body.is_empty());
}
