//! Client tests against a local axum server standing in for the ledger API.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use ticker_horizon::{
    HorizonApi, HorizonClient, HorizonError, HttpMetadataSource, MetadataSource, TradeRequest,
    MAX_METADATA_BYTES,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn trade_json(id: &str) -> String {
    format!(
        r#"{{"id":"{id}","paging_token":"{id}","ledger_close_time":"2024-05-01T10:00:00Z",
            "base_amount":"1.0","base_asset_type":"native",
            "counter_amount":"2.0","counter_asset_type":"credit_alphanum4",
            "counter_asset_code":"USD","counter_asset_issuer":"GISSUER",
            "base_is_seller":true,"price":{{"n":2,"d":1}}}}"#
    )
}

async fn trades_page(
    State(seen): State<Seen>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    seen.lock().push(params);
    let body = format!(
        r#"{{"_links":{{"self":{{"href":"http://h/trades?cursor=&limit=200&order=desc"}},
                        "next":{{"href":"http://h/trades?cursor=20-1&limit=200&order=desc"}}}},
            "_embedded":{{"records":[{}]}}}}"#,
        trade_json("20-1")
    );
    ([(header::CONTENT_TYPE, "application/json")], body)
}

#[tokio::test]
async fn test_trades_page_query_and_decode() {
    let seen: Seen = Arc::default();
    let router = Router::new()
        .route("/trades", get(trades_page))
        .with_state(seen.clone());
    let base = serve(router).await;

    let client = HorizonClient::new(base).unwrap();
    let request = TradeRequest {
        base_asset_issuer: Some("GISSUER".to_string()),
        cursor: Some("10-1".to_string()),
        ..Default::default()
    };
    let page = client.trades(request).await.unwrap();

    assert_eq!(page.records().len(), 1);
    assert_eq!(page.records()[0].id, "20-1");
    assert_eq!(page.next_cursor().unwrap(), "20-1");

    let params = seen.lock()[0].clone();
    assert_eq!(params.get("order").map(String::as_str), Some("desc"));
    assert_eq!(params.get("limit").map(String::as_str), Some("200"));
    assert_eq!(params.get("cursor").map(String::as_str), Some("10-1"));
    assert_eq!(params.get("base_asset_issuer").map(String::as_str), Some("GISSUER"));
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let router = Router::new().route(
        "/assets",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
    );
    let base = serve(router).await;

    let client = HorizonClient::new(base).unwrap();
    let err = client.assets(Default::default()).await.unwrap_err();
    assert!(matches!(err, HorizonError::Status { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_metadata_fetch() {
    let router = Router::new().route(
        "/.well-known/stellar.toml",
        get(|| async {
            r#"
[DOCUMENTATION]
ORG_URL = "https://example.com"

[[CURRENCIES]]
code = "USD"
issuer = "GISSUER"
"#
        }),
    );
    let base = serve(router).await;

    let source = HttpMetadataSource::new().unwrap();
    let url = format!("{base}/.well-known/stellar.toml");
    let meta = source.fetch(&url).await.unwrap();
    assert_eq!(meta.documentation.org_url, "https://example.com");
    assert!(meta.currency("USD", "GISSUER").is_some());
}

#[tokio::test]
async fn test_oversized_metadata_rejected() {
    let router = Router::new()
        .route(
            "/sized.toml",
            get(|| async { "#".repeat(MAX_METADATA_BYTES + 1) }),
        )
        .route(
            "/chunked.toml",
            get(|| async {
                let chunks = (0..8).map(|_| Ok::<_, std::io::Error>(vec![b'#'; MAX_METADATA_BYTES / 4]));
                axum::body::Body::from_stream(futures_util::stream::iter(chunks))
            }),
        );
    let base = serve(router).await;
    let source = HttpMetadataSource::new().unwrap();

    for path in ["sized.toml", "chunked.toml"] {
        let err = source.fetch(&format!("{base}/{path}")).await.unwrap_err();
        assert!(matches!(err, HorizonError::MetadataTooLarge(_)), "{path}: {err}");
        assert!(!err.is_retryable());
    }
}

async fn trade_stream(
    State(seen): State<Seen>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let cursor = params.get("cursor").cloned().unwrap_or_default();
    seen.lock().push(params);

    let mut body = String::from("retry: 1000\ndata: \"hello\"\n\n");
    if cursor == "now" {
        for id in ["30-1", "30-2"] {
            body.push_str(&format!("id: {id}\ndata: {}\n\n", trade_json(id).replace('\n', " ")));
        }
        body.push_str("data: \"byebye\"\n\n");
    }
    ([(header::CONTENT_TYPE, "text/event-stream")], body)
}

#[tokio::test]
async fn test_stream_resumes_after_graceful_close() {
    let seen: Seen = Arc::default();
    let router = Router::new()
        .route("/trades", get(trade_stream))
        .with_state(seen.clone());
    let base = serve(router).await;

    let client = Arc::new(HorizonClient::new(base).unwrap());
    let (tx, mut rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();

    let handle = {
        let client = client.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { client.stream_trades("now".to_string(), tx, cancel).await })
    };

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!(first.id, "30-1");
    assert_eq!(second.id, "30-2");

    tokio::time::sleep(Duration::from_millis(1500)).await;
    cancel.cancel();
    assert!(handle.await.unwrap().is_ok());

    let cursors: Vec<String> = seen
        .lock()
        .iter()
        .filter_map(|p| p.get("cursor").cloned())
        .collect();
    assert_eq!(cursors[0], "now");
    assert_eq!(cursors[1], "30-2");
}

#[tokio::test]
async fn test_stream_open_failure_is_terminal() {
    let router = Router::new().route(
        "/trades",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "down") }),
    );
    let base = serve(router).await;

    let client = HorizonClient::new(base).unwrap();
    let (tx, _rx) = mpsc::channel(1);
    let result = client
        .stream_trades("now".to_string(), tx, CancellationToken::new())
        .await;
    assert!(matches!(result, Err(HorizonError::Status { status: 500, .. })));
}
