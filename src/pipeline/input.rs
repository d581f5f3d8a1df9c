//! Input validation: make sure the source document is a readable PDF.
//!
//! This runs before a workspace exists, so a bad path fails the run without
//! touching the filesystem. Checking the `%PDF` magic here gives callers a
//! clear "not a PDF" error instead of a renderer crash further down.

use crate::error::ExtractError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A validated source document. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    path: PathBuf,
}

impl SourceDocument {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Validate that `path` exists, is a readable file, and starts with `%PDF`.
pub fn validate_source(path: impl AsRef<Path>) -> Result<SourceDocument, ExtractError> {
    let path = path.as_ref().to_path_buf();

    if !path.is_file() {
        return Err(ExtractError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
                return Err(ExtractError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ExtractError::FileNotFound { path });
        }
    }

    let path = path.canonicalize().unwrap_or(path);
    debug!("Validated source document: {}", path.display());
    Ok(SourceDocument { path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_found() {
        let err = validate_source("/definitely/not/a/real/file.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[test]
    fn directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_source(dir.path()).unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.pdf");
        std::fs::write(&path, b"PK\x03\x04 zip, not pdf").unwrap();
        match validate_source(&path).unwrap_err() {
            ExtractError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.pdf");
        std::fs::write(&path, b"%P").unwrap();
        assert!(matches!(
            validate_source(&path).unwrap_err(),
            ExtractError::NotAPdf { .. }
        ));
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.pdf");
        std::fs::write(&path, b"%PDF-1.7\n").unwrap();
        let doc = validate_source(&path).unwrap();
        assert!(doc.path().ends_with("catalog.pdf"));
    }
}
