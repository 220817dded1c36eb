//! Filename generation and manipulation.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Replace every character that is unsafe in a filename with `_`.
///
/// Covers `\ / : * ? " < > |`, space and control characters, so the result can
/// never introduce a path separator.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Sanitize a path component (the per-account folder).
///
/// Unlike [`sanitize_filename`] this rejects traversal and empty names, since the
/// component comes from user input rather than upstream ids.
pub fn sanitize_path_component(name: &str) -> Result<String> {
    // Reject path traversal attempts
    if name.contains("..") {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    // Reject null bytes
    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed: '{}'",
            name
        )));
    }

    let sanitized = sanitize_filename(name.trim());

    // Reject empty or underscore-only names
    if sanitized.trim_matches('_').is_empty() {
        return Err(Error::InvalidFilename(
            "Path component cannot be empty or whitespace-only".to_string(),
        ));
    }

    Ok(sanitized)
}

/// Build the `<postID>_<mediaID>.<ext>` filename for a media item.
pub fn media_filename(post_id: &str, media_id: &str, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        sanitize_filename(post_id),
        sanitize_filename(media_id),
        extension
    )
}

/// Hidden sibling path used while a transfer is in progress.
pub fn partial_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");
    let parent = destination.parent().unwrap_or(Path::new("."));

    parent.join(format!(".{}.{}.part", name, uuid::Uuid::new_v4().simple()))
}
