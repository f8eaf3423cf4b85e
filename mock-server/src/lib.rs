//! httpbin-style fixture server for exercising the real transport path.
//!
//! Routes:
//! - `GET /json`: the slideshow document.
//! - `ANY /anything`, `ANY /anything/{*rest}`: echoes method, path, query
//!   args, headers and body.
//! - `GET /delay/{secs}`: the slideshow after sleeping (capped at 10 s).
//! - `GET /empty`: 204 with no body.
//! - `ANY /status/{code}`: the given status with no body.
//! - `GET /hits`: how many times each path has been served.

use std::{collections::BTreeMap, collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub const MAX_DELAY_SECS: u64 = 10;

/// Request echo returned by `/anything`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub args: BTreeMap<String, Vec<String>>,
    pub headers: BTreeMap<String, String>,
    pub data: String,
    pub json: Option<Value>,
}

pub type Hits = Arc<RwLock<HashMap<String, u64>>>;

pub fn app() -> Router {
    let hits: Hits = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/json", get(slideshow))
        .route("/anything", any(anything))
        .route("/anything/{*rest}", any(anything))
        .route("/delay/{secs}", get(delay))
        .route("/empty", get(empty))
        .route("/status/{code}", any(status))
        .route("/hits", get(list_hits))
        .with_state(hits)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// The slideshow document served by `/json` and `/delay/{secs}`.
pub fn slideshow_fixture() -> Value {
    json!({
        "slideshow": {
            "author": "Yours Truly",
            "date": "date of publication",
            "slides": [
                {
                    "title": "Wake up to WonderWidgets!",
                    "type": "all"
                },
                {
                    "items": [
                        "Why <em>WonderWidgets</em> are great",
                        "Who <em>buys</em> WonderWidgets"
                    ],
                    "title": "Overview",
                    "type": "all"
                }
            ],
            "title": "Sample Slide Show"
        }
    })
}

async fn record(hits: &Hits, path: &str) {
    *hits.write().await.entry(path.to_string()).or_insert(0) += 1;
}

async fn slideshow(State(hits): State<Hits>) -> Json<Value> {
    record(&hits, "/json").await;
    Json(slideshow_fixture())
}

async fn anything(
    State(hits): State<Hits>,
    method: Method,
    uri: Uri,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    record(&hits, uri.path()).await;

    let mut args: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in pairs {
        args.entry(key).or_default().push(value);
    }
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        args,
        headers,
        data: String::from_utf8_lossy(&body).into_owned(),
        json: serde_json::from_slice(&body).ok(),
    })
}

async fn delay(State(hits): State<Hits>, Path(secs): Path<u64>) -> Json<Value> {
    record(&hits, "/delay").await;
    let secs = secs.min(MAX_DELAY_SECS);
    debug!(secs, "delaying response");
    tokio::time::sleep(Duration::from_secs(secs)).await;
    Json(slideshow_fixture())
}

async fn empty(State(hits): State<Hits>) -> StatusCode {
    record(&hits, "/empty").await;
    StatusCode::NO_CONTENT
}

async fn status(State(hits): State<Hits>, Path(code): Path<u16>) -> StatusCode {
    record(&hits, "/status").await;
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn list_hits(State(hits): State<Hits>) -> Json<HashMap<String, u64>> {
    Json(hits.read().await.clone())
}
