//! HTTP response building module
//!
//! Builders for every status the server produces. Builders never panic: a
//! build failure is logged and replaced by an empty response of the same status.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{ALLOW, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LOCATION};
use hyper::{Response, StatusCode};
use serde::Serialize;

pub type HttpResponse = Response<Full<Bytes>>;

/// Methods the server answers at all
pub const ALLOWED_METHODS: &str = "GET, HEAD, POST";

fn finish(builder: hyper::http::response::Builder, body: Bytes, status: StatusCode) -> HttpResponse {
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error(status, &e);
        let mut fallback = Response::new(Full::new(Bytes::new()));
        *fallback.status_mut() = status;
        fallback
    })
}

/// Plain-text response with the reason phrase as body
pub fn build_status_response(status: StatusCode) -> HttpResponse {
    let text = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    build_text_response(status, text)
}

pub fn build_text_response(status: StatusCode, text: String) -> HttpResponse {
    let builder = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_LENGTH, text.len());
    finish(builder, Bytes::from(text), status)
}

/// Build 404 Not Found response
pub fn build_404_response() -> HttpResponse {
    build_status_response(StatusCode::NOT_FOUND)
}

/// Build 405 Method Not Allowed response
pub fn build_405_response(allow: &str) -> HttpResponse {
    let text = "405 Method Not Allowed";
    let builder = Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(ALLOW, allow);
    finish(builder, Bytes::from_static(text.as_bytes()), StatusCode::METHOD_NOT_ALLOWED)
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> HttpResponse {
    build_status_response(StatusCode::PAYLOAD_TOO_LARGE)
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str) -> HttpResponse {
    let builder = Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(ETAG, etag)
        .header(CACHE_CONTROL, "no-cache");
    finish(builder, Bytes::new(), StatusCode::NOT_MODIFIED)
}

/// Build generic HTML response
pub fn build_html_response(content: String, is_head: bool) -> HttpResponse {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .header(CONTENT_LENGTH, content_length)
        .header(CACHE_CONTROL, "no-cache");
    finish(builder, body, StatusCode::OK)
}

/// Static file response; clients revalidate with the `ETag` on every use
pub fn build_file_response(data: Vec<u8>, content_type: &str, etag: &str, is_head: bool) -> HttpResponse {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { Bytes::from(data) };

    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length)
        .header(ETAG, etag)
        .header(CACHE_CONTROL, "no-cache");
    finish(builder, body, StatusCode::OK)
}

/// JSON response from any serializable value
pub fn build_json_response<T: Serialize>(status: StatusCode, value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(json) => {
            let builder = Response::builder()
                .status(status)
                .header(CONTENT_TYPE, "application/json")
                .header(CONTENT_LENGTH, json.len());
            finish(builder, Bytes::from(json), status)
        }
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize JSON response: {e}"));
            build_status_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// `201 Created` pointing at the new resource
pub fn build_created_response<T: Serialize>(location: &str, value: &T) -> HttpResponse {
    let mut response = build_json_response(StatusCode::CREATED, value);
    match hyper::header::HeaderValue::from_str(location) {
        Ok(v) => {
            response.headers_mut().insert(LOCATION, v);
        }
        Err(e) => log_build_error(StatusCode::CREATED, &e.into()),
    }
    response
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// JSON error body: `{"error": "..."}`
pub fn build_json_error(status: StatusCode, message: &str) -> HttpResponse {
    build_json_response(status, &ErrorBody { error: message })
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(response: HttpResponse) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_status_response_text() {
        let response = build_404_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(response).await, "404 Not Found");
    }

    #[test]
    fn test_405_lists_methods() {
        let response = build_405_response(ALLOWED_METHODS);
        assert_eq!(response.headers()[ALLOW], "GET, HEAD, POST");
    }

    #[tokio::test]
    async fn test_head_keeps_length_drops_body() {
        let response = build_file_response(b"abcdef".to_vec(), "text/plain", "\"e\"", true);
        assert_eq!(response.headers()[CONTENT_LENGTH], "6");
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_json_error_shape() {
        let response = build_json_error(StatusCode::BAD_REQUEST, "no file");
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_of(response).await, r#"{"error":"no file"}"#);
    }

    #[test]
    fn test_created_sets_location() {
        let response = build_created_response("/uploads/a.png", &serde_json::json!({"name": "a.png"}));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[LOCATION], "/uploads/a.png");
    }
}
