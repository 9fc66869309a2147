// Configuration module entry point
// Loads the immutable process configuration and the shared request state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{AssetsConfig, Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig};

/// Environment variable overriding `assets.upload_path`
pub const UPLOAD_PATH_ENV: &str = "UPLOAD_PATH";
/// Environment variable overriding `server.port`
pub const PORT_ENV: &str = "PORT";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// `UPLOAD_PATH` and `PORT` take precedence over everything else.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::from_sources(
            config_path,
            std::env::var(UPLOAD_PATH_ENV).ok(),
            std::env::var(PORT_ENV).ok(),
        )
    }

    /// Build configuration from a file plus explicit overrides
    pub fn from_sources(
        config_path: &str,
        upload_path: Option<String>,
        port: Option<String>,
    ) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 4000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("logging.log_static", false)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "viewer_server")?
            .set_default("http.max_body_size", 104_857_600)? // 100MB
            .set_default("assets.wasm_dir", "wasm")?
            .set_default("assets.wasm_prefix", "/wasm")?
            .set_default("assets.upload_path", "uploads")?
            .set_default("assets.upload_route", "/upload")?
            .set_default("assets.upload_field", "file")?
            .set_default("assets.viewer_script", "viewer.js")?
            .set_override_option("assets.upload_path", upload_path)?
            .set_override_option("server.port", port)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::from_sources("no-such-config-file", None, None).unwrap();
        assert_eq!(cfg.server.port, 4000);
        assert_eq!(cfg.assets.upload_path, "uploads");
        assert_eq!(cfg.assets.upload_prefix(), "/uploads");
        assert_eq!(cfg.assets.wasm_prefix(), "/wasm");
        assert_eq!(cfg.assets.upload_field, "file");
        assert_eq!(cfg.assets.index_files, vec!["index.html".to_string()]);
        assert!(!cfg.logging.log_static);
    }

    #[test]
    fn test_overrides_win() {
        let cfg = Config::from_sources(
            "no-such-config-file",
            Some("models".to_string()),
            Some("8123".to_string()),
        )
        .unwrap();
        assert_eq!(cfg.server.port, 8123);
        assert_eq!(cfg.assets.upload_prefix(), "/models");
    }

    #[test]
    fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9000\n\n[assets]\nwasm_dir = \"bundle\"\n",
        )
        .unwrap();

        let stem = dir.path().join("server");
        let cfg = Config::from_sources(stem.to_str().unwrap(), None, None).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.assets.wasm_dir, "bundle");
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 9000);
    }
}
