//! Turning files on disk into [`Document`]s.
//!
//! Input files are read as UTF-8 text; extraction from binary formats is
//! expected to have happened upstream.

use std::path::Path;

use precis_chunker::Document;
use precis_core::Error;

/// Whether the file name of `path` starts with a dot.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

/// Whether `path` should be summarized when it appears in a watched directory.
pub fn is_candidate(path: &Path) -> bool {
    path.file_name().is_some() && !is_hidden(path) && path.is_file()
}

/// Read `path` into a document named after its file name.
///
/// # Errors
///
/// Returns [`Error::FileReadFailed`] if the file is unreadable or not UTF-8.
pub async fn read_document(path: &Path) -> precis_core::Result<Document> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::file_read_failed(path, "path has no file name"))?;

    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::file_read_failed(path, e.to_string()))?;

    Ok(Document::new(name, text))
}
