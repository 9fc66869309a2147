// Application state module
// Everything a request handler needs, fixed at startup

use crate::handler::home::HomePage;
use crate::handler::static_files::StaticMount;
use crate::storage::{self, UploadStore};

use super::types::Config;

/// Application state
///
/// Built once by the bootstrap and shared behind an `Arc`; nothing in here
/// changes after the listener is bound.
pub struct AppState {
    pub config: Config,
    /// Viewer bundle mount
    pub wasm_mount: StaticMount,
    /// Mount re-serving stored uploads
    pub upload_mount: StaticMount,
    pub uploads: UploadStore,
    pub home: HomePage,
}

impl AppState {
    pub fn new(config: Config, uploads: UploadStore, home: HomePage) -> Self {
        let wasm_mount = StaticMount::new(config.assets.wasm_prefix(), &config.assets.wasm_dir);
        let upload_mount = StaticMount::new(config.assets.upload_prefix(), uploads.root())
            .hiding(storage::is_partial_name);

        Self {
            config,
            wasm_mount,
            upload_mount,
            uploads,
            home,
        }
    }

    /// Both static mounts, in match order
    pub fn mounts(&self) -> [&StaticMount; 2] {
        [&self.wasm_mount, &self.upload_mount]
    }
}
