//! HTTP protocol layer module
//!
//! Protocol-level building blocks shared by the handlers: response builders,
//! content types, conditional requests, body decoding and the cross-origin
//! isolation headers.

pub mod body;
pub mod cache;
pub mod isolation;
pub mod mime;
pub mod path;
pub mod response;

// Re-export commonly used types
pub use isolation::apply_isolation_headers;
pub use response::{
    build_304_response, build_404_response, build_405_response, build_413_response,
    build_created_response, build_file_response, build_html_response, build_json_error,
    build_json_response, build_status_response, HttpResponse, ALLOWED_METHODS,
};
