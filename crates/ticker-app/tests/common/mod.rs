//! Mock ledger API for pipeline tests.
//!
//! Serves one asset page, the issuer metadata document and one trade page
//! from a local axum server, recording the query of every request.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub const ISSUER: &str = "GUSDISSUER";

#[derive(Clone)]
struct Shared {
    base: String,
    now: DateTime<Utc>,
    requests: Arc<Mutex<Vec<(String, HashMap<String, String>)>>>,
}

pub struct MockUpstream {
    base: String,
    requests: Arc<Mutex<Vec<(String, HashMap<String, String>)>>>,
}

impl MockUpstream {
    /// Start the server on an available port. Trades are dated relative to `now`.
    pub async fn start(now: DateTime<Utc>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let shared = Shared {
            base: base.clone(),
            now,
            requests: requests.clone(),
        };
        let router = Router::new()
            .route("/assets", get(assets))
            .route("/trades", get(trades))
            .route("/.well-known/stellar.toml", get(metadata))
            .with_state(shared);

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { base, requests }
    }

    pub fn url(&self) -> &str {
        &self.base
    }

    /// Paths requested so far, in order.
    pub fn paths(&self) -> Vec<String> {
        self.requests.lock().iter().map(|(path, _)| path.clone()).collect()
    }

    pub fn queries(&self, path: &str) -> Vec<HashMap<String, String>> {
        self.requests
            .lock()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, q)| q.clone())
            .collect()
    }
}

fn json(body: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], body)
}

fn asset_json(base: &str, code: &str, holders: i32) -> String {
    format!(
        r#"{{"_links":{{"toml":{{"href":"{base}/.well-known/stellar.toml"}}}},
            "asset_type":"credit_alphanum4","asset_code":"{code}","asset_issuer":"{ISSUER}",
            "paging_token":"{code}_{ISSUER}_credit_alphanum4","num_accounts":{holders},
            "amount":"5000.0000000","flags":{{"auth_required":false,"auth_revocable":false}}}}"#
    )
}

async fn assets(State(shared): State<Shared>, Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    shared.requests.lock().push(("/assets".to_string(), params));
    let base = &shared.base;
    json(format!(
        r#"{{"_links":{{"self":{{"href":"{base}/assets?cursor=&limit=200&order=asc"}},
                        "next":{{"href":"{base}/assets?cursor=&limit=200&order=asc"}}}},
            "_embedded":{{"records":[{},{}]}}}}"#,
        asset_json(base, "USD", 150),
        asset_json(base, "SPAM", 3),
    ))
}

fn trade_json(id: &str, close_time: DateTime<Utc>, n: i64, d: i64) -> String {
    let close = close_time.to_rfc3339_opts(SecondsFormat::Secs, true);
    format!(
        r#"{{"id":"{id}","paging_token":"{id}","ledger_close_time":"{close}",
            "offer_id":"77","base_offer_id":"77","base_account":"GBUYER",
            "base_amount":"100.0000000","base_asset_type":"native",
            "counter_offer_id":"88","counter_account":"GSELLER",
            "counter_amount":"12.0000000","counter_asset_type":"credit_alphanum4",
            "counter_asset_code":"USD","counter_asset_issuer":"{ISSUER}",
            "base_is_seller":true,"price":{{"n":{n},"d":{d}}}}}"#
    )
}

async fn trades(State(shared): State<Shared>, Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    shared.requests.lock().push(("/trades".to_string(), params));
    let base = &shared.base;
    let now = shared.now;
    let records = [
        trade_json("300-1", now - Duration::hours(1), 25, 3),
        trade_json("200-1", now - Duration::hours(2), 10, 1),
        trade_json("100-1", now - Duration::hours(30), 1, 1),
    ];
    json(format!(
        r#"{{"_links":{{"self":{{"href":"{base}/trades?cursor=&limit=200&order=desc"}},
                        "next":{{"href":"{base}/trades?cursor=100-1&limit=200&order=desc"}}}},
            "_embedded":{{"records":[{}]}}}}"#,
        records.join(",")
    ))
}

async fn metadata(State(shared): State<Shared>) -> impl IntoResponse {
    shared
        .requests
        .lock()
        .push(("/.well-known/stellar.toml".to_string(), HashMap::new()));
    format!(
        r#"
SIGNING_KEY = "GSIGNER"
TRANSFER_SERVER = "https://anchor.example/sep6"

[DOCUMENTATION]
ORG_NAME = "Example Anchor"
ORG_URL = "https://anchor.example"
ORG_TWITTER = "anchor"

[[CURRENCIES]]
code = "USD"
issuer = "{ISSUER}"
display_decimals = 2
name = "US Dollar"
is_asset_anchored = true
anchor_asset_type = "fiat"
anchor_asset = "USD"
"#
    )
}
