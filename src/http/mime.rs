//! MIME type detection module
//!
//! Returns the Content-Type for a served file based on its extension.

use std::path::Path;

/// Get MIME Content-Type based on file extension (case-insensitive)
///
/// # Examples
/// ```
/// use viewer_server::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("wasm")), "application/wasm");
/// assert_eq!(get_content_type(Some("GLB")), "model/gltf-binary");
/// assert_eq!(get_content_type(None), "application/octet-stream");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    let Some(ext) = extension else {
        return "application/octet-stream";
    };

    match ext.to_ascii_lowercase().as_str() {
        // Text
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "txt" | "md" => "text/plain; charset=utf-8",
        "xml" => "application/xml",

        // Viewer bundle
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "wasm" => "application/wasm",
        "json" => "application/json",
        "map" => "application/json",
        "data" => "application/octet-stream",

        // 3D models
        "gltf" => "model/gltf+json",
        "glb" => "model/gltf-binary",
        "obj" => "model/obj",
        "mtl" => "model/mtl",
        "stl" => "model/stl",
        "ply" => "application/x-ply",
        "fbx" => "application/octet-stream",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "hdr" => "image/vnd.radiance",
        "ktx2" => "image/ktx2",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        // Archives
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",

        _ => "application/octet-stream",
    }
}

/// Content-Type for a file path
pub fn content_type_for(path: &Path) -> &'static str {
    get_content_type(path.extension().and_then(|e| e.to_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_bundle_types() {
        assert_eq!(get_content_type(Some("wasm")), "application/wasm");
        assert_eq!(
            get_content_type(Some("js")),
            "text/javascript; charset=utf-8"
        );
        assert_eq!(
            get_content_type(Some("html")),
            "text/html; charset=utf-8"
        );
    }

    #[test]
    fn test_model_types() {
        assert_eq!(get_content_type(Some("gltf")), "model/gltf+json");
        assert_eq!(get_content_type(Some("Glb")), "model/gltf-binary");
        assert_eq!(get_content_type(Some("stl")), "model/stl");
    }

    #[test]
    fn test_path_lookup() {
        assert_eq!(
            content_type_for(Path::new("wasm/viewer.wasm")),
            "application/wasm"
        );
        assert_eq!(content_type_for(Path::new("uploads/photo.PNG")), "image/png");
        assert_eq!(
            content_type_for(Path::new("uploads/README")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(get_content_type(Some("xyz")), "application/octet-stream");
        assert_eq!(get_content_type(None), "application/octet-stream");
    }
}
