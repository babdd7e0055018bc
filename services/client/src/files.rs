//! services/client/src/files.rs
//!
//! Turns a path on disk into a `DocumentFile`.

use playlist_core::domain::DocumentFile;
use std::path::Path;

/// MIME type implied by the file extension. Unknown extensions map to
/// `application/octet-stream`, which validation rejects.
pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

pub async fn load_document(path: &Path) -> std::io::Result<DocumentFile> {
    let contents = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    Ok(DocumentFile::new(name, mime_type_for(path), contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_map_to_allowed_types() {
        assert_eq!(mime_type_for(Path::new("notes.PDF")), "application/pdf");
        assert_eq!(mime_type_for(Path::new("a/b/readme.txt")), "text/plain");
        assert_eq!(mime_type_for(Path::new("old.doc")), "application/msword");
        assert_eq!(
            mime_type_for(Path::new("new.docx")),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(mime_type_for(Path::new("photo.png")), "application/octet-stream");
        assert_eq!(mime_type_for(Path::new("Makefile")), "application/octet-stream");
    }

    #[tokio::test]
    async fn loads_name_and_contents() {
        let path = std::env::temp_dir().join(format!("doc2video-{}.txt", std::process::id()));
        tokio::fs::write(&path, b"hello").await.unwrap();

        let file = load_document(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(file.mime_type, "text/plain");
        assert_eq!(file.size_bytes(), 5);
        assert!(file.name.ends_with(".txt"));
    }
}
