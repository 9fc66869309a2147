//! Static file serving module
//!
//! A [`StaticMount`] exposes one directory tree under one URL prefix. Paths
//! are resolved strictly inside the mount root; anything else is a 404.

use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime, HttpResponse};
use crate::logger;
use hyper::StatusCode;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// One (URL prefix → directory) pair
#[derive(Debug, Clone)]
pub struct StaticMount {
    prefix: String,
    root: PathBuf,
    /// File names never served from this mount
    hidden: Option<fn(&str) -> bool>,
}

impl StaticMount {
    /// `prefix` is normalized to `/name` form
    pub fn new(prefix: impl AsRef<str>, root: impl Into<PathBuf>) -> Self {
        Self {
            prefix: format!("/{}", prefix.as_ref().trim_matches('/')),
            root: root.into(),
            hidden: None,
        }
    }

    /// Refuse files whose name matches `filter`
    #[must_use]
    pub fn hiding(mut self, filter: fn(&str) -> bool) -> Self {
        self.hidden = Some(filter);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path below the prefix, without its leading slash.
    ///
    /// `/wasm` and `/wasm/x` belong to the `/wasm` mount, `/wasmx` does not.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() {
            return Some("");
        }
        rest.strip_prefix('/')
    }

    /// Map a raw (still percent-encoded) relative path to a file inside the root.
    ///
    /// Returns `None` when the file is missing or would lie outside the root.
    pub async fn resolve(&self, relative: &str, index_files: &[String]) -> Option<PathBuf> {
        let Some(decoded) = http::path::decode(relative) else {
            logger::log_debug(&format!("Undecodable path under {}: {relative}", self.prefix));
            return None;
        };

        let mut candidate = self.root.clone();
        for segment in decoded.split('/') {
            if segment.is_empty() || segment == "." {
                continue;
            }
            if !is_plain_segment(segment) {
                logger::log_warning(&format!(
                    "Path traversal attempt blocked: {}/{relative}",
                    self.prefix
                ));
                return None;
            }
            candidate.push(segment);
        }

        let Ok(root) = fs::canonicalize(&self.root).await else {
            logger::log_debug(&format!(
                "Static directory '{}' is missing",
                self.root.display()
            ));
            return None;
        };

        if fs::metadata(&candidate).await.is_ok_and(|m| m.is_dir()) {
            candidate = find_index(&candidate, index_files).await?;
        }

        // Missing files are common (404), no need to log
        let resolved = fs::canonicalize(&candidate).await.ok()?;
        if !resolved.starts_with(&root) {
            logger::log_warning(&format!(
                "Path escapes static root via link: {} -> {}",
                candidate.display(),
                resolved.display()
            ));
            return None;
        }

        if let Some(hidden) = self.hidden {
            if resolved.file_name().and_then(|n| n.to_str()).is_some_and(hidden) {
                return None;
            }
        }

        match fs::metadata(&resolved).await {
            Ok(meta) if meta.is_file() => Some(resolved),
            _ => None,
        }
    }
}

/// A single normal path component: no `..`, separators, prefixes or NUL
fn is_plain_segment(segment: &str) -> bool {
    if segment.contains(|c: char| c == '\\' || c == '\0') {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

async fn find_index(dir: &Path, index_files: &[String]) -> Option<PathBuf> {
    for index_file in index_files {
        let index_path = dir.join(index_file);
        if fs::metadata(&index_path).await.is_ok_and(|m| m.is_file()) {
            return Some(index_path);
        }
    }
    None
}

/// Serve `relative` from `mount`, honouring `If-None-Match` and `HEAD`
pub async fn serve(
    ctx: &RequestContext<'_>,
    mount: &StaticMount,
    relative: &str,
    index_files: &[String],
) -> HttpResponse {
    let Some(path) = mount.resolve(relative, index_files).await else {
        return http::build_404_response();
    };

    let data = match fs::read(&path).await {
        Ok(data) => data,
        // Removed between resolve and read
        Err(e) if e.kind() == ErrorKind::NotFound => return http::build_404_response(),
        Err(e) => {
            logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
            return http::build_status_response(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let etag = cache::generate_etag(&data);
    if cache::check_etag_match(ctx.if_none_match.as_deref(), &etag) {
        return http::build_304_response(&etag);
    }

    http::build_file_response(data, mime::content_type_for(&path), &etag, ctx.is_head)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> Vec<String> {
        vec!["index.html".to_string()]
    }

    fn tree() -> (tempfile::TempDir, StaticMount) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("wasm");
        std::fs::create_dir_all(root.join("docs")).unwrap();
        std::fs::write(root.join("viewer.wasm"), b"\0asm").unwrap();
        std::fs::write(root.join("my model.obj"), b"v 0 0 0").unwrap();
        std::fs::write(root.join("docs/index.html"), b"<p>docs</p>").unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"outside").unwrap();
        let mount = StaticMount::new("wasm/", &root);
        (dir, mount)
    }

    #[test]
    fn test_strip_prefix_boundaries() {
        let mount = StaticMount::new("/wasm", "wasm");
        assert_eq!(mount.prefix(), "/wasm");
        assert_eq!(mount.strip("/wasm/viewer.js"), Some("viewer.js"));
        assert_eq!(mount.strip("/wasm/a/b.js"), Some("a/b.js"));
        assert_eq!(mount.strip("/wasm"), Some(""));
        assert_eq!(mount.strip("/wasmx/viewer.js"), None);
        assert_eq!(mount.strip("/uploads/viewer.js"), None);
    }

    #[test]
    fn test_plain_segments() {
        assert!(is_plain_segment("viewer.wasm"));
        assert!(is_plain_segment("..hidden"));
        assert!(!is_plain_segment(".."));
        assert!(!is_plain_segment("a\\..\\b"));
        assert!(!is_plain_segment("/etc"));
    }

    #[tokio::test]
    async fn test_resolve_existing_and_encoded() {
        let (_dir, mount) = tree();
        let path = mount.resolve("viewer.wasm", &index()).await.unwrap();
        assert!(path.ends_with("viewer.wasm"));
        assert!(mount.resolve("my%20model.obj", &index()).await.is_some());
    }

    #[tokio::test]
    async fn test_resolve_directory_index() {
        let (_dir, mount) = tree();
        let path = mount.resolve("docs/", &index()).await.unwrap();
        assert!(path.ends_with("docs/index.html"));
        assert!(mount.resolve("", &[]).await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_missing() {
        let (_dir, mount) = tree();
        assert!(mount.resolve("missing.png", &index()).await.is_none());
    }

    #[tokio::test]
    async fn test_traversal_is_contained() {
        let (_dir, mount) = tree();
        for attempt in ["../secret.txt", "docs/../../secret.txt", "%2e%2e/secret.txt", "..%2fsecret.txt"] {
            assert!(
                mount.resolve(attempt, &index()).await.is_none(),
                "escaped via {attempt}"
            );
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_is_contained() {
        let (dir, mount) = tree();
        std::os::unix::fs::symlink(dir.path().join("secret.txt"), mount.root().join("link.txt"))
            .unwrap();
        assert!(mount.resolve("link.txt", &index()).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_root() {
        let mount = StaticMount::new("/wasm", "/definitely/not/here");
        assert!(mount.resolve("viewer.wasm", &index()).await.is_none());
    }

    #[tokio::test]
    async fn test_hidden_names_are_not_served() {
        let (_dir, mount) = tree();
        std::fs::write(mount.root().join(".upload-7-0.part"), b"half").unwrap();
        let mount = mount.hiding(crate::storage::is_partial_name);

        assert!(mount.resolve(".upload-7-0.part", &index()).await.is_none());
        assert!(mount.resolve("viewer.wasm", &index()).await.is_some());
    }
}
