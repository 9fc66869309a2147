//! Minimal HTTP server for a WebAssembly model viewer.
//!
//! Serves the viewer bundle and the upload form, accepts uploaded files and
//! serves them back, with cross-origin isolation headers on every response.

pub mod bootstrap;
pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod storage;
