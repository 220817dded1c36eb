//! Path and directory management.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fs::naming::sanitize_path_component;
use crate::media::MediaKind;

/// Get the base folder for an account: `<root>/<identity>`.
pub fn get_account_folder(root: &Path, identity: &str) -> Result<PathBuf> {
    let folder = sanitize_path_component(identity)?;
    Ok(root.join(folder))
}

/// Get the folder a media kind is stored in: `<root>/<identity>/{photos,videos}`.
pub fn get_media_folder(root: &Path, identity: &str, kind: MediaKind) -> Result<PathBuf> {
    Ok(get_account_folder(root, identity)?.join(kind.folder_name()))
}

/// Ensure a directory exists, creating it if necessary.
///
/// Creating a directory that already exists (possibly concurrently) is not an error.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_account_folder() {
        let path = get_account_folder(Path::new("/downloads"), "someone").unwrap();
        assert_eq!(path, PathBuf::from("/downloads/someone"));
        assert!(get_account_folder(Path::new("/downloads"), "..").is_err());
    }

    #[test]
    fn test_get_media_folder() {
        let root = Path::new("/downloads");
        assert_eq!(
            get_media_folder(root, "someone", MediaKind::Photo).unwrap(),
            PathBuf::from("/downloads/someone/photos")
        );
        assert_eq!(
            get_media_folder(root, "someone", MediaKind::AnimatedImage).unwrap(),
            PathBuf::from("/downloads/someone/videos")
        );
    }

    #[tokio::test]
    async fn test_ensure_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_dir(&nested).await.unwrap();
        ensure_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
    }
}
