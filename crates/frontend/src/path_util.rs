//! Path normalization for reported file names.

use std::path::Path;

use crate::FrontendError;

/// Normalizes a file path to a canonical UTF-8 string with forward slashes.
///
/// # Process
/// 1. Canonicalizes the path using `dunce::canonicalize` (removes `\\?\` prefix on Windows)
/// 2. Converts to UTF-8 string
/// 3. Replaces backslashes with forward slashes
///
/// # Errors
/// - `IoError` if canonicalization fails (file not found, permissions, etc.)
/// - `NonUtf8` if the path contains non-UTF-8 characters
pub fn normalize_path(path: &Path) -> Result<String, FrontendError> {
    let canonical = dunce::canonicalize(path)?;
    let s = canonical
        .to_str()
        .ok_or_else(|| FrontendError::NonUtf8(canonical.display().to_string()))?;
    Ok(s.replace('\\', "/"))
}

/// Path of `file` relative to `root` for reports and baseline fingerprints,
/// so a baseline stays valid when the checkout moves.
///
/// Falls back to the normalized absolute path when `file` is outside `root`.
pub fn display_path(file: &Path, root: &Path) -> Result<String, FrontendError> {
    let file_norm = normalize_path(file)?;
    let root_norm = normalize_path(root)?;
    if file_norm == root_norm {
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_norm.as_str());
        return Ok(name.to_string());
    }
    match file_norm.strip_prefix(&format!("{}/", root_norm.trim_end_matches('/'))) {
        Some(rel) => Ok(rel.to_string()),
        None => Ok(file_norm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_cargo_manifest() {
        let cargo_manifest = std::env::var("CARGO_MANIFEST_DIR")
            .map(|dir| Path::new(&dir).join("Cargo.toml"))
            .unwrap();

        let normalized = normalize_path(&cargo_manifest).unwrap();
        assert!(normalized.ends_with("Cargo.toml"));
        assert!(!normalized.contains('\\'));
    }

    #[test]
    fn test_normalize_nonexistent_path() {
        assert!(normalize_path(Path::new("/this/does/not/exist/Nowhere.java")).is_err());
    }

    #[test]
    fn test_display_path_relative() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("src/com");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("A.java");
        std::fs::write(&file, "class A {}").unwrap();

        assert_eq!(display_path(&file, tmp.path()).unwrap(), "src/com/A.java");
        assert_eq!(display_path(&file, &file).unwrap(), "A.java");
    }
}
