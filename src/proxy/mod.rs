//! Development reverse proxy for the `/api/*` collaborators.
//!
//! Requests whose path starts with a configured prefix are forwarded to the
//! upstream with that prefix rewritten; everything else gets a 404.

pub mod error;

use crate::core::config::{ProxyConfig, RewriteRule};
use crate::providers::util::http_client;
use anyhow::{Context, Result};
use axum::{
    Router,
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use error::ProxyError;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Headers that describe one connection and are not forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Rewrites `path` with the first rule whose prefix matches whole segments.
pub fn rewrite_path(rules: &[RewriteRule], path: &str) -> Option<String> {
    rules.iter().find_map(|rule| {
        let rest = path.strip_prefix(rule.prefix.as_str())?;
        (rest.is_empty() || rest.starts_with('/')).then(|| format!("{}{}", rule.target, rest))
    })
}

pub struct ProxyState {
    upstream: String,
    rules: Vec<RewriteRule>,
    client: reqwest::Client,
}

impl ProxyState {
    pub fn new(upstream: &str, rules: Vec<RewriteRule>) -> Result<Self> {
        Ok(Self {
            upstream: upstream.trim_end_matches('/').to_string(),
            rules,
            client: http_client().context("Failed to build proxy HTTP client")?,
        })
    }
}

pub fn router(state: Arc<ProxyState>) -> Router {
    Router::new()
        .fallback(forward)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn forward(State(state): State<Arc<ProxyState>>, request: Request) -> Response {
    match relay(&state, request).await {
        Ok(response) => response,
        Err(e) => {
            if matches!(e, ProxyError::Upstream(_)) {
                warn!("Proxy error: {e}");
            }
            e.into_response()
        }
    }
}

async fn relay(state: &ProxyState, request: Request) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path();
    let target_path =
        rewrite_path(&state.rules, path).ok_or_else(|| ProxyError::NoRoute(path.to_string()))?;
    let query = parts.uri.query().map(|q| format!("?{q}")).unwrap_or_default();
    let url = format!("{}{}{}", state.upstream, target_path, query);
    debug!("Forwarding {} {} -> {}", parts.method, path, url);

    let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
        .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;
    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;

    let mut upstream_request = state.client.request(method, &url);
    for (name, value) in parts.headers.iter() {
        if !is_hop_by_hop(name.as_str()) {
            upstream_request = upstream_request.header(name.as_str(), value.as_bytes());
        }
    }

    let upstream = upstream_request
        .body(body)
        .send()
        .await
        .map_err(|e| ProxyError::Upstream(format!("Failed to reach {url}: {e}")))?;

    let status = StatusCode::from_u16(upstream.status().as_u16())
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;
    let mut headers = HeaderMap::new();
    for (name, value) in upstream.headers() {
        if is_hop_by_hop(name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(name, value);
        }
    }
    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| ProxyError::Upstream(format!("Failed to read upstream response: {e}")))?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Serves the proxy on an already bound listener until `shutdown` resolves.
pub async fn serve_with_shutdown(
    listener: TcpListener,
    state: Arc<ProxyState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Proxy server error")
}

/// Binds `config.listen` and serves until Ctrl-C.
pub async fn serve(config: &ProxyConfig, upstream: &str) -> Result<()> {
    let state = Arc::new(ProxyState::new(upstream, config.rules.clone())?);
    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen))?;
    info!("Proxy listening on {} -> {}", config.listen, upstream);

    serve_with_shutdown(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {e}");
        }
        info!("Proxy shutting down");
    })
    .await
}
