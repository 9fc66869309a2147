//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, body limits,
//! route matching, then the headers every response carries and access logging.

use crate::config::AppState;
use crate::handler::{home, static_files, upload, BoxError};
use crate::http::body::{self, BodyError, BodyKind};
use crate::http::{self, HttpResponse};
use crate::logger::{self, AccessLogEntry};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, IF_NONE_MATCH, SERVER};
use hyper::{Method, Request, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context encapsulating information needed for GET/HEAD processing
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<String>,
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<HttpResponse, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let started = Instant::now();
    let mut entry = AccessLogEntry::from_request(
        remote_addr,
        req.method(),
        req.uri(),
        req.version(),
        req.headers(),
    );

    let (mut response, is_static) = route_request(req, &state).await;

    // Applies to every response, whatever produced it
    http::apply_isolation_headers(&mut response);
    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    let logging = &state.config.logging;
    if logging.access_log && (!is_static || logging.log_static) {
        let body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.finish(response.status().as_u16(), body_bytes, started);
        logger::log_access(&entry, &logging.access_log_format);
    }

    Ok(response)
}

/// Route a request; the flag tells whether a static mount answered it
async fn route_request<B>(req: Request<B>, state: &AppState) -> (HttpResponse, bool)
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();

    // 1. Check HTTP method
    if !matches!(method, Method::GET | Method::HEAD | Method::POST) {
        logger::log_warning(&format!("Method not allowed: {method}"));
        return (http::build_405_response(http::ALLOWED_METHODS), false);
    }

    // 2. Check body size
    if let Some(resp) = check_body_size(req.headers(), state.config.http.max_body_size) {
        return (resp, false);
    }

    let path = req.uri().path().to_string();

    if method == Method::POST {
        return (dispatch_post(req, &path, state).await, false);
    }

    let ctx = RequestContext {
        path: &path,
        is_head: method == Method::HEAD,
        if_none_match: req
            .headers()
            .get(IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string),
    };

    // 3. Static mounts
    for mount in state.mounts() {
        if let Some(relative) = mount.strip(ctx.path) {
            let response =
                static_files::serve(&ctx, mount, relative, &state.config.assets.index_files).await;
            return (response, true);
        }
    }

    // 4. Application routes
    let response = if ctx.path == "/" {
        serve_home(&ctx, &state.home)
    } else if ctx.path == state.config.assets.upload_route {
        http::build_405_response("POST")
    } else {
        http::build_404_response()
    };
    (response, false)
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<HttpResponse> {
    let content_length = headers.get(CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_warning(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

async fn dispatch_post<B>(req: Request<B>, path: &str, state: &AppState) -> HttpResponse
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    if path == state.config.assets.upload_route {
        return upload::handle_upload(req, state).await;
    }

    // No other route takes a body yet, but malformed ones are still refused
    match read_form(req, state.config.http.max_body_size).await {
        Ok(value) => {
            if !value.is_null() {
                logger::log_debug(&format!("POST {path} body: {value}"));
            }
        }
        Err(BodyError::TooLarge { .. }) => return http::build_413_response(),
        Err(e) => {
            logger::log_debug(&format!("POST {path}: {e}"));
            return http::build_json_error(StatusCode::BAD_REQUEST, &e.to_string());
        }
    }

    let is_get_route = path == "/" || state.mounts().iter().any(|m| m.strip(path).is_some());
    if is_get_route {
        http::build_405_response("GET, HEAD")
    } else {
        http::build_404_response()
    }
}

/// Collect and decode a JSON or URL-encoded body; other bodies are left unread
async fn read_form<B>(req: Request<B>, limit: u64) -> Result<serde_json::Value, BodyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let kind = BodyKind::from_content_type(content_type);
    if !matches!(kind, BodyKind::Json | BodyKind::UrlEncoded) {
        return Ok(serde_json::Value::Null);
    }

    let max = usize::try_from(limit).unwrap_or(usize::MAX);
    let bytes = match Limited::new(req.into_body(), max).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(BodyError::TooLarge { limit });
        }
        Err(e) => return Err(BodyError::Read(e.to_string())),
    };

    body::parse_form(kind, &bytes)
}

/// Serve the home view
fn serve_home(ctx: &RequestContext<'_>, home: &home::HomePage) -> HttpResponse {
    match home.render() {
        Ok(html) => http::build_html_response(html, ctx.is_head),
        Err(e) => {
            logger::log_error(&format!("Failed to render home page: {e}"));
            http::build_status_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
