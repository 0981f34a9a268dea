//! HTTP Serving Layer
//!
//! Thin JSON-over-HTTP surface over a [`Shelf`]. Routing is a plain match on
//! method and path segments; [`route`] is independent of the connection
//! handling so it can be exercised without a socket.
//!
//! | Route                          | Result                                   |
//! |--------------------------------|------------------------------------------|
//! | `GET /books[?status=]`         | all books, or those with the status      |
//! | `GET /books/{id}`              | one book                                 |
//! | `GET /recipe-tags`             | all recipe tags                          |
//! | `GET /recipe-tags/{id}`        | one recipe tag                           |
//! | `GET /admin/cache`             | per-collection cache state               |
//! | `POST /admin/cache/clear`      | clear both caches                        |
//! | `GET /healthz`                 | liveness                                 |
//! | `GET /readyz`                  | upstream reachability                    |
//! | `GET /metrics`                 | Prometheus text exposition               |

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::domain::BookStatus;
use crate::error::{Error, ErrorKind, Result};
use crate::shelf::Shelf;

const JSON: &str = "application/json";

/// A fully rendered response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
}

impl ApiResponse {
    fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: JSON,
                body: Bytes::from(body),
            },
            Err(e) => {
                error!(error = %e, "Failed to serialize response");
                Self::message(StatusCode::INTERNAL_SERVER_ERROR, "internal", "serialization failed")
            }
        }
    }

    fn message(status: StatusCode, error: &str, message: impl std::fmt::Display) -> Self {
        let body = json!({ "error": error, "message": message.to_string() });
        Self {
            status,
            content_type: JSON,
            body: Bytes::from(body.to_string()),
        }
    }

    fn from_error(error: &Error) -> Self {
        let status = status_for(error.kind());
        if status.is_server_error() {
            warn!(error = %error, kind = %error.kind(), "Request failed");
        }

        match error {
            Error::NotFound { collection, id } => Self::json(
                status,
                &json!({
                    "error": error.kind().to_string(),
                    "collection": collection,
                    "id": id,
                    "message": error.to_string(),
                }),
            ),
            _ => Self::message(status, &error.kind().to_string(), error),
        }
    }

    fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        response
    }
}

/// HTTP status for an error classification.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::SourceUnavailable | ErrorKind::Validation => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// Routing
// =============================================================================

/// Route one request.
pub async fn route(shelf: &Shelf, method: &Method, path: &str, query: Option<&str>) -> ApiResponse {
    let segments: Vec<&str> = path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    debug!(%method, path, "Routing request");

    match (method, segments.as_slice()) {
        (&Method::GET, ["books"]) => list_books(shelf, query).await,
        (&Method::GET, ["books", id]) => match decode_segment(id) {
            Ok(id) => respond(shelf.books().get_by_id(&id).await),
            Err(response) => response,
        },
        (&Method::GET, ["recipe-tags"]) => respond(shelf.recipe_tags().get_all().await),
        (&Method::GET, ["recipe-tags", id]) => match decode_segment(id) {
            Ok(id) => respond(shelf.recipe_tags().get_by_id(&id).await),
            Err(response) => response,
        },
        (&Method::GET, ["admin", "cache"]) => ApiResponse::json(StatusCode::OK, &shelf.status()),
        (&Method::POST, ["admin", "cache", "clear"]) => {
            shelf.clear_all().await;
            ApiResponse::json(
                StatusCode::OK,
                &json!({ "cleared": [shelf.books().name(), shelf.recipe_tags().name()] }),
            )
        }
        (&Method::GET, ["healthz"]) => {
            ApiResponse::json(StatusCode::OK, &json!({ "status": "ok", "mode": shelf.mode().to_string() }))
        }
        (&Method::GET, ["readyz"]) => readiness(shelf).await,
        (&Method::GET, ["metrics"]) => metrics(shelf),
        (_, ["books"] | ["books", _] | ["recipe-tags"] | ["recipe-tags", _])
        | (_, ["admin", "cache"] | ["admin", "cache", "clear"])
        | (_, ["healthz"] | ["readyz"] | ["metrics"]) => ApiResponse::message(
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            format!("{} not allowed on {}", method, path),
        ),
        _ => ApiResponse::message(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("no route for {}", path),
        ),
    }
}

fn respond<T: Serialize>(result: Result<T>) -> ApiResponse {
    match result {
        Ok(value) => ApiResponse::json(StatusCode::OK, &value),
        Err(e) => ApiResponse::from_error(&e),
    }
}

async fn list_books(shelf: &Shelf, query: Option<&str>) -> ApiResponse {
    let status = match query_param(query, "status") {
        Ok(Some(raw)) => match raw.parse::<BookStatus>() {
            Ok(status) => Some(status),
            Err(reason) => return ApiResponse::message(StatusCode::BAD_REQUEST, "bad_request", reason),
        },
        Ok(None) => None,
        Err(response) => return response,
    };

    match status {
        Some(status) => respond(shelf.books().get_by_status(status).await),
        None => respond(shelf.books().get_all().await),
    }
}

async fn readiness(shelf: &Shelf) -> ApiResponse {
    match shelf.health_check().await {
        Ok(true) => ApiResponse::json(StatusCode::OK, &json!({ "status": "ready" })),
        Ok(false) => ApiResponse::json(
            StatusCode::SERVICE_UNAVAILABLE,
            &json!({ "status": "unavailable" }),
        ),
        Err(e) => {
            warn!(error = %e, "Upstream health check failed");
            ApiResponse::message(StatusCode::SERVICE_UNAVAILABLE, "source_unavailable", e)
        }
    }
}

/// Percent-decode one path segment.
fn decode_segment(segment: &str) -> std::result::Result<String, ApiResponse> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|e| ApiResponse::message(StatusCode::BAD_REQUEST, "bad_request", e))
}

/// Value of `name` in a query string, percent-decoded.
fn query_param(query: Option<&str>, name: &str) -> std::result::Result<Option<String>, ApiResponse> {
    let Some(query) = query else {
        return Ok(None);
    };

    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key == name {
            let value = urlencoding::decode(&value.replace('+', " "))
                .map(|s| s.into_owned())
                .map_err(|e| ApiResponse::message(StatusCode::BAD_REQUEST, "bad_request", e))?;
            return Ok(Some(value));
        }
    }
    Ok(None)
}

// =============================================================================
// Metrics
// =============================================================================

fn metrics(shelf: &Shelf) -> ApiResponse {
    match render_metrics(shelf) {
        Ok(body) => ApiResponse {
            status: StatusCode::OK,
            content_type: prometheus::TEXT_FORMAT,
            body: Bytes::from(body),
        },
        Err(e) => ApiResponse::from_error(&e),
    }
}

/// Render the cache counters of both collections in Prometheus text format.
pub fn render_metrics(shelf: &Shelf) -> Result<Vec<u8>> {
    let registry = Registry::new();
    let counter = |name: &str, help: &str| -> Result<IntCounterVec> {
        let vec = IntCounterVec::new(Opts::new(name, help), &["collection"]).map_err(metrics_error)?;
        registry.register(Box::new(vec.clone())).map_err(metrics_error)?;
        Ok(vec)
    };

    let hits = counter("notion_shelf_cache_hits_total", "Reads served from the cache")?;
    let misses = counter("notion_shelf_cache_misses_total", "Reads that triggered a refresh")?;
    let refreshes = counter("notion_shelf_cache_refreshes_total", "Successful refreshes")?;
    let failures = counter("notion_shelf_cache_refresh_failures_total", "Failed refreshes")?;
    let discarded = counter(
        "notion_shelf_cache_refreshes_discarded_total",
        "Refreshes not installed because the cache was cleared meanwhile",
    )?;
    let pages = counter("notion_shelf_upstream_pages_total", "Upstream pages fetched")?;
    let records = counter("notion_shelf_upstream_records_total", "Upstream records fetched")?;
    let clears = counter("notion_shelf_cache_clears_total", "Explicit cache clears")?;

    let last_refresh = IntGaugeVec::new(
        Opts::new(
            "notion_shelf_cache_last_refresh_timestamp_seconds",
            "Capture time of the stored entry, 0 when empty",
        ),
        &["collection"],
    )
    .map_err(metrics_error)?;
    registry
        .register(Box::new(last_refresh.clone()))
        .map_err(metrics_error)?;

    for status in shelf.status() {
        let label = [status.collection];
        let stats = &status.stats;
        hits.with_label_values(&label).inc_by(stats.hits);
        misses.with_label_values(&label).inc_by(stats.misses);
        refreshes.with_label_values(&label).inc_by(stats.refreshes);
        failures.with_label_values(&label).inc_by(stats.refresh_failures);
        discarded.with_label_values(&label).inc_by(stats.discarded_refreshes);
        pages.with_label_values(&label).inc_by(stats.pages_fetched);
        records.with_label_values(&label).inc_by(stats.records_fetched);
        clears.with_label_values(&label).inc_by(stats.clears);
        last_refresh
            .with_label_values(&label)
            .set(status.last_refreshed_at.map(|t| t.timestamp()).unwrap_or(0));
    }

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .map_err(metrics_error)?;
    Ok(buffer)
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::Internal(format!("metrics encoding failed: {}", e))
}

// =============================================================================
// Server
// =============================================================================

/// Accept connections on `addr` until the task is cancelled.
pub async fn serve(shelf: Arc<Shelf>, addr: &str) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Config(format!("Invalid listen address '{}': {}", addr, e)))?;

    let listener = TcpListener::bind(addr).await?;
    info!("API server listening on {}", addr);

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let shelf = shelf.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let shelf = shelf.clone();
                async move {
                    let response =
                        route(&shelf, req.method(), req.uri().path(), req.uri().query()).await;
                    Ok::<_, Infallible>(response.into_response())
                }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!(%peer, "API server connection error: {}", e);
            }
        });
    }
}
