//! Request handler module
//!
//! Responsible for request routing dispatch and business logic processing:
//! the home view, the two static mounts and the upload route.

pub mod home;
pub mod router;
pub mod static_files;
pub mod upload;

/// Error type request bodies are allowed to fail with
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// Re-export main entry point
pub use router::handle_request;
