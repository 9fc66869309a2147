// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::path::{Component, Path};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub assets: AssetsConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
    /// Also write access log lines for requests served from static mounts
    #[serde(default)]
    pub log_static: bool,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    /// Seconds to wait for a request head, idle keep-alive gaps included; 0 disables keep-alive
    pub keep_alive_timeout: u64,
    /// Seconds of silence tolerated while a request is in flight
    pub read_timeout: u64,
    /// Seconds a response write may stall
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    /// Upper bound for any request body, uploads included
    pub max_body_size: u64,
}

/// Static trees and upload intake
#[derive(Debug, Deserialize, Clone)]
pub struct AssetsConfig {
    /// Directory holding the prebuilt viewer bundle
    pub wasm_dir: String,
    /// URL prefix the viewer bundle is served under
    pub wasm_prefix: String,
    /// Upload directory; its name doubles as the URL prefix
    pub upload_path: String,
    pub upload_route: String,
    /// Multipart field carrying the file
    pub upload_field: String,
    #[serde(default = "default_index_files")]
    pub index_files: Vec<String>,
    /// Optional minijinja template for the home page
    #[serde(default)]
    pub home_template: Option<String>,
    /// Loader script inside `wasm_dir` referenced by the home page
    pub viewer_script: String,
}

fn default_index_files() -> Vec<String> {
    vec!["index.html".to_string()]
}

impl AssetsConfig {
    /// URL prefix for re-serving uploads, derived from `upload_path`.
    ///
    /// `uploads`, `./uploads` and `/uploads/` all map to `/uploads`.
    /// `.` and `./` map to `/`, which the bootstrap refuses.
    pub fn upload_prefix(&self) -> String {
        let segments: Vec<&str> = Path::new(&self.upload_path)
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect();
        format!("/{}", segments.join("/"))
    }

    /// `wasm_prefix` normalized to a single leading slash and no trailing one
    pub fn wasm_prefix(&self) -> String {
        format!("/{}", self.wasm_prefix.trim_matches('/'))
    }
}
