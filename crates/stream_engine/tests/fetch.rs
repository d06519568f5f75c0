use std::time::Duration;

use stream_engine::{EngineConfig, EngineContext, FailureKind, FetchHeaders, Fetcher, ReqwestFetcher};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(max_bytes: u64) -> ReqwestFetcher {
    let ctx = EngineContext::new(EngineConfig::default()).expect("client builds");
    ReqwestFetcher::new(ctx.client.clone(), Duration::from_secs(5), max_bytes)
}

#[tokio::test]
async fn fetcher_returns_body_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list.m3u"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("#EXTM3U\n", "audio/x-mpegurl"))
        .mount(&server)
        .await;

    let url = format!("{}/list.m3u", server.uri());
    let output = fetcher(1024)
        .fetch(&url, &FetchHeaders::default())
        .await
        .expect("fetch ok");

    assert_eq!(output.bytes, b"#EXTM3U\n");
    assert_eq!(output.metadata.original_url, url);
    assert_eq!(output.metadata.final_url, url);
    assert_eq!(output.metadata.byte_len, 8);
    assert_eq!(output.metadata.content_type.as_deref(), Some("audio/x-mpegurl"));
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = fetcher(1024)
        .fetch(&format!("{}/missing", server.uri()), &FetchHeaders::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert_eq!(err.to_status().to_string(), "error_404");
}

#[tokio::test]
async fn fetcher_enforces_size_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![b'a'; 64], "text/plain"))
        .mount(&server)
        .await;

    let err = fetcher(16)
        .fetch(&format!("{}/big", server.uri()), &FetchHeaders::default())
        .await
        .unwrap_err();
    assert!(matches!(err.kind, FailureKind::TooLarge { max_bytes: 16, .. }));
}

#[tokio::test]
async fn fetcher_rejects_invalid_urls() {
    let err = fetcher(1024)
        .fetch("not a url", &FetchHeaders::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}

#[tokio::test]
async fn fetcher_sends_referer_and_origin() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/embed"))
        .and(header("referer", "https://events.example/schedule"))
        .and(header("origin", "https://events.example"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>player</html>", "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let url = format!("{}/embed", server.uri());
    let headers = FetchHeaders {
        referer: Some("https://events.example/schedule".to_string()),
        origin: Some("https://events.example".to_string()),
    };
    let fetcher = fetcher(1024);

    let page = fetcher.fetch_text(&url, &headers).await.expect("fetch ok");
    assert_eq!(page.text, "<html>player</html>");

    let err = fetcher.fetch(&url, &FetchHeaders::default()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(403));
}

#[tokio::test]
async fn fetch_text_honours_declared_charset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latin1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"caf\xe9 en vivo".to_vec(), "text/html; charset=iso-8859-1"),
        )
        .mount(&server)
        .await;

    let page = fetcher(1024)
        .fetch_text(&format!("{}/latin1", server.uri()), &FetchHeaders::default())
        .await
        .expect("fetch ok");
    assert_eq!(page.text, "café en vivo");
    assert!(!page.lossy);
}
