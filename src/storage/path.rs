//! Destination naming for uploaded files

use std::path::{Path, PathBuf};

use super::{is_partial_name, UploadError};

/// Resolve where an upload named `client_filename` is written.
///
/// The client's name is kept as-is apart from dropping any directory part, so
/// `a/b/model.glb` and `C:\tmp\model.glb` both land on `<root>/model.glb`.
/// Existing files of the same name are overwritten by the caller.
pub fn destination_path(upload_root: &Path, client_filename: &str) -> Result<PathBuf, UploadError> {
    let name = client_filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(client_filename);

    // Partial-upload names are reserved for in-flight temp files
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('\0')
        || is_partial_name(name)
    {
        return Err(UploadError::InvalidFileName(client_filename.to_string()));
    }

    Ok(upload_root.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_kept_verbatim() {
        let root = Path::new("uploads");
        assert_eq!(
            destination_path(root, "scene model (1).glb").unwrap(),
            root.join("scene model (1).glb")
        );
        assert_eq!(
            destination_path(root, ".hidden").unwrap(),
            root.join(".hidden")
        );
    }

    #[test]
    fn test_directory_parts_are_dropped() {
        let root = Path::new("/srv/uploads");
        assert_eq!(
            destination_path(root, "../../etc/passwd").unwrap(),
            root.join("passwd")
        );
        assert_eq!(
            destination_path(root, "C:\\Users\\me\\mesh.obj").unwrap(),
            root.join("mesh.obj")
        );
    }

    #[test]
    fn test_unusable_names_rejected() {
        let root = Path::new("uploads");
        for bad in ["", ".", "..", "dir/", "../..", "nul\0byte.png", ".upload-1-0.part"] {
            assert!(
                matches!(
                    destination_path(root, bad),
                    Err(UploadError::InvalidFileName(_))
                ),
                "expected rejection for {bad:?}"
            );
        }
    }
}
