//! Startup preparation
//!
//! Creates the upload directory and assembles the shared [`AppState`] before
//! the listener is bound.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{AppState, Config};
use crate::handler::home::{HomeContext, HomePage};
use crate::logger;
use crate::storage::UploadStore;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to create upload directory '{}': {source}", .path.display())]
    CreateUploadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("upload path '{}' exists and is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to read home template '{}': {source}", .path.display())]
    ReadTemplate {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("upload path '{0}' has no directory name to serve it under")]
    UnservableUploadPath(String),
    #[error("failed to clear partial uploads in '{}': {source}", .path.display())]
    ClearPartials {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid home template: {0}")]
    Template(#[from] minijinja::Error),
}

/// Make sure `path` is a directory, creating it if absent.
///
/// Only the last component is created; a missing parent is an error. Returns
/// whether the directory was created by this call.
pub fn ensure_upload_dir(path: &Path) -> Result<bool, BootstrapError> {
    match std::fs::create_dir(path) {
        Ok(()) => {
            logger::log_upload_dir_created(path);
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            if path.is_dir() {
                Ok(false)
            } else {
                Err(BootstrapError::NotADirectory(path.to_path_buf()))
            }
        }
        Err(source) => Err(BootstrapError::CreateUploadDir {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Build the application state from a loaded configuration
pub fn prepare(config: Config) -> Result<AppState, BootstrapError> {
    // The upload mount would otherwise shadow every route but the wasm one
    if config.assets.upload_prefix() == "/" {
        return Err(BootstrapError::UnservableUploadPath(
            config.assets.upload_path.clone(),
        ));
    }

    let upload_dir = PathBuf::from(&config.assets.upload_path);
    ensure_upload_dir(&upload_dir)?;

    if !Path::new(&config.assets.wasm_dir).is_dir() {
        logger::log_warning(&format!(
            "Viewer bundle directory '{}' not found; {} will answer 404",
            config.assets.wasm_dir,
            config.assets.wasm_prefix()
        ));
    }

    let template = match config.assets.home_template.as_deref() {
        Some(path) => Some(std::fs::read_to_string(path).map_err(|source| {
            BootstrapError::ReadTemplate {
                path: PathBuf::from(path),
                source,
            }
        })?),
        None => None,
    };
    let home = HomePage::new(template, HomeContext::from_assets(&config.assets))?;
    let uploads = UploadStore::new(upload_dir, config.http.max_body_size);
    match uploads.remove_stale_partials() {
        Ok(0) => {}
        Ok(n) => logger::log_info(&format!("[Bootstrap] Removed {n} stale partial upload(s)")),
        Err(source) => {
            return Err(BootstrapError::ClearPartials {
                path: uploads.root().to_path_buf(),
                source,
            });
        }
    }

    Ok(AppState::new(config, uploads, home))
}
