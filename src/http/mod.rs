//! HTTP surface: JSON lookup, NDJSON streaming lookup, and MCP over streamable HTTP.

use std::net::SocketAddr;

use axum::body::{Body, Bytes};
use axum::extract::{RawQuery, Request, State};
use axum::http::{HeaderName, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::StreamExt;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use url::form_urlencoded;

use crate::lookup::events::lookup_events;
use crate::lookup::{self, FailureKind, LookupFailure, LookupResult, Query};
use crate::mdn::{DocsIndex, MdnClient};
use crate::tools::MdnLookup;

const API_KEY_HEADER: &str = "x-api-key";
const NDJSON: &str = "application/x-ndjson";

#[derive(Clone)]
pub struct AppState<I = MdnClient> {
    pub index: I,
    /// Shared secret for `/mcp`; `None` leaves it open.
    pub password: Option<String>,
}

/// Query-string form: `?q=` wins over `?query=`. Repeated keys are allowed;
/// the first non-empty value is used.
fn url_query(raw: Option<&str>) -> Option<Query> {
    let pairs: Vec<(String, String)> = form_urlencoded::parse(raw.unwrap_or_default().as_bytes())
        .into_owned()
        .collect();
    let values = |name: &'static str| {
        pairs
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| Some(value.as_str()))
    };
    Query::first_present(values("q").chain(values("query")))
}

/// JSON body form: `"query"` wins over `"q"`. Fields that are not strings are
/// skipped; malformed or absent bodies are read as carrying no query.
fn body_query(body: &[u8]) -> Option<Query> {
    let value: Value = serde_json::from_slice(body).ok()?;
    Query::first_present(["query", "q"].map(|key| value.get(key).and_then(Value::as_str)))
}

pub fn router<I>(state: AppState<I>) -> Router
where
    I: DocsIndex + Clone + Send + Sync + 'static,
{
    let mcp_index = state.index.clone();
    let mcp = StreamableHttpService::new(
        move || Ok(MdnLookup::new(mcp_index.clone())),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );
    let mcp_routes = Router::new()
        .nest_service("/mcp", mcp)
        .layer(middleware::from_fn_with_state(
            state.password.clone(),
            require_api_key,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(API_KEY_HEADER),
        ]);

    Router::new()
        .route("/", get(home))
        .route("/lookup", get(get_lookup::<I>).post(post_lookup::<I>))
        .route(
            "/stream-lookup",
            get(get_stream_lookup::<I>).post(post_stream_lookup::<I>),
        )
        .with_state(state)
        .merge(mcp_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "http server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}

async fn require_api_key(
    State(password): State<Option<String>>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(expected) = &password {
        let provided = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            warn!(path = %req.uri().path(), "rejected request with missing or wrong API key");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response();
        }
    }
    next.run(req).await
}

async fn home() -> Json<serde_json::Value> {
    Json(json!({
        "name": "mdnlookup",
        "description": "A tool to fetch and summarize developer documentation from MDN.",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/lookup": "GET or POST - Search MDN documentation",
            "/stream-lookup": "GET or POST - Search MDN documentation with streaming response",
            "/mcp": "MCP streamable HTTP transport (tool: mdnlookup)"
        }
    }))
}

async fn get_lookup<I>(State(state): State<AppState<I>>, RawQuery(raw): RawQuery) -> Response
where
    I: DocsIndex + Clone + Send + Sync + 'static,
{
    match url_query(raw.as_deref()) {
        Some(query) => run_lookup(&state, query).await,
        None => lookup_response(LookupResult::Failure(LookupFailure::validation(
            "Query parameter \"q\" or \"query\" is required",
        ))),
    }
}

async fn post_lookup<I>(State(state): State<AppState<I>>, body: Bytes) -> Response
where
    I: DocsIndex + Clone + Send + Sync + 'static,
{
    match body_query(&body) {
        Some(query) => run_lookup(&state, query).await,
        None => lookup_response(LookupResult::Failure(LookupFailure::validation(
            "Query field \"query\" or \"q\" is required in request body",
        ))),
    }
}

async fn run_lookup<I: DocsIndex + Sync>(state: &AppState<I>, query: Query) -> Response {
    info!(%query, "http:lookup");
    let result = match lookup::guard(lookup::lookup(&state.index, &query)).await {
        Ok(result) => result,
        Err(cause) => {
            error!(%query, %cause, "lookup panicked");
            LookupResult::Failure(LookupFailure::internal(query.as_str(), &cause))
        }
    };
    lookup_response(result)
}

fn lookup_response(result: LookupResult) -> Response {
    let status = match &result {
        LookupResult::Failure(f) if f.kind == FailureKind::Validation => StatusCode::BAD_REQUEST,
        LookupResult::Failure(f) if f.kind == FailureKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::OK,
    };
    (status, Json(result)).into_response()
}

async fn get_stream_lookup<I>(State(state): State<AppState<I>>, RawQuery(raw): RawQuery) -> Response
where
    I: DocsIndex + Clone + Send + Sync + 'static,
{
    ndjson_response(&state, url_query(raw.as_deref()))
}

async fn post_stream_lookup<I>(State(state): State<AppState<I>>, body: Bytes) -> Response
where
    I: DocsIndex + Clone + Send + Sync + 'static,
{
    ndjson_response(&state, body_query(&body))
}

fn ndjson_response<I>(state: &AppState<I>, query: Option<Query>) -> Response
where
    I: DocsIndex + Clone + Send + Sync + 'static,
{
    let raw_query = query.map(|q| q.to_string()).unwrap_or_default();
    info!(query = %raw_query, "http:stream-lookup");
    let lines = lookup_events(state.index.clone(), raw_query).map(|event| event.to_ndjson());
    (
        [(header::CONTENT_TYPE, NDJSON)],
        Body::from_stream(lines),
    )
        .into_response()
}
