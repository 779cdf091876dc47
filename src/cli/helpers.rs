//! Shared helper functions for CLI commands

use std::path::Path;

use crate::core::record::FileMeta;

/// Truncate a string to max_len, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}

/// Guess a MIME type from a file extension.
///
/// Covers the types the shipped attachment rules care about; everything
/// else is reported as a generic byte stream.
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Build the attachment descriptor for a selected file.
///
/// Reads name and byte size from the filesystem and derives the media
/// type from the extension; the file contents are never read.
pub fn file_meta_for(path: &Path) -> std::io::Result<FileMeta> {
    let metadata = std::fs::metadata(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(FileMeta {
        media_type: media_type_for(path).to_string(),
        size: metadata.len(),
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
    }

    #[test]
    fn test_media_type_for() {
        assert_eq!(media_type_for(&PathBuf::from("cert.JPG")), "image/jpeg");
        assert_eq!(media_type_for(&PathBuf::from("cert.pdf")), "application/pdf");
        assert_eq!(
            media_type_for(&PathBuf::from("no-extension")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_file_meta_for_reads_name_size_and_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cert.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let meta = file_meta_for(&path).unwrap();
        assert_eq!(meta.name, "cert.pdf");
        assert_eq!(meta.media_type, "application/pdf");
        assert_eq!(meta.size, 8);
    }

    #[test]
    fn test_file_meta_for_missing_file_errors() {
        let err = file_meta_for(&PathBuf::from("/nonexistent/cert.pdf")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
