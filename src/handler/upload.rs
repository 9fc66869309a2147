//! Upload route
//!
//! Accepts one file per `multipart/form-data` request and hands it to the
//! [`UploadStore`](crate::storage::UploadStore).

use crate::config::AppState;
use crate::handler::BoxError;
use crate::http::body::BodyKind;
use crate::http::{self, HttpResponse};
use crate::logger;
use crate::storage::{ChunkSource, StoredFile, UploadError};
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_TYPE;
use hyper::{Request, StatusCode};
use multer::{Constraints, Field, Multipart, SizeLimit};
use serde::Serialize;

impl ChunkSource for Field<'_> {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, UploadError> {
        self.chunk().await.map_err(from_multer)
    }
}

fn from_multer(e: multer::Error) -> UploadError {
    match e {
        multer::Error::StreamSizeExceeded { limit }
        | multer::Error::FieldSizeExceeded { limit, .. } => UploadError::TooLarge { limit },
        other => UploadError::Source(other.to_string()),
    }
}

/// Success body
#[derive(Debug, Serialize)]
pub struct UploadReceipt {
    pub name: String,
    pub size: u64,
    /// Where the file is served from now
    pub url: String,
}

impl UploadReceipt {
    fn new(stored: StoredFile, upload_prefix: &str) -> Self {
        let url = format!("{upload_prefix}/{}", http::path::encode_segment(&stored.name));
        Self {
            name: stored.name,
            size: stored.size,
            url,
        }
    }
}

/// Handle `POST <upload_route>`
pub async fn handle_upload<B>(req: Request<B>, state: &AppState) -> HttpResponse
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    if BodyKind::from_content_type(content_type) != BodyKind::Multipart {
        return http::build_json_error(StatusCode::BAD_REQUEST, "expected multipart/form-data");
    }

    let boundary = match content_type.map(multer::parse_boundary) {
        Some(Ok(boundary)) => boundary,
        _ => {
            return http::build_json_error(StatusCode::BAD_REQUEST, "missing multipart boundary");
        }
    };

    let limit = state.config.http.max_body_size;
    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(limit));
    let mut multipart =
        Multipart::with_constraints(req.into_body().into_data_stream(), boundary, constraints);
    let wanted = state.config.assets.upload_field.as_str();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                return http::build_json_error(
                    StatusCode::BAD_REQUEST,
                    &format!("no file in field '{wanted}'"),
                );
            }
            Err(e) => return error_response(&from_multer(e)),
        };

        // Unread fields are skipped by the next `next_field` call
        if field.name() != Some(wanted) {
            continue;
        }
        let Some(file_name) = field.file_name().map(ToString::to_string) else {
            continue;
        };

        return match state.uploads.store(&file_name, field).await {
            Ok(stored) => {
                logger::log_info(&format!(
                    "[Upload] Stored '{}' ({} bytes)",
                    stored.name, stored.size
                ));
                let receipt = UploadReceipt::new(stored, &state.config.assets.upload_prefix());
                http::build_created_response(&receipt.url, &receipt)
            }
            Err(e) => error_response(&e),
        };
    }
}

fn error_response(e: &UploadError) -> HttpResponse {
    match e {
        UploadError::InvalidFileName(_) | UploadError::Source(_) => {
            logger::log_warning(&format!("Rejected upload: {e}"));
            http::build_json_error(StatusCode::BAD_REQUEST, &e.to_string())
        }
        UploadError::TooLarge { .. } => {
            logger::log_warning(&format!("Rejected upload: {e}"));
            http::build_json_error(StatusCode::PAYLOAD_TOO_LARGE, &e.to_string())
        }
        UploadError::Io(_) => {
            logger::log_error(&format!("Upload failed: {e}"));
            http::build_json_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to store upload")
        }
    }
}
