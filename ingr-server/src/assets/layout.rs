//! Filesystem layout for permanent and staged assets

use ingr_common::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tracing::info;

const IMAGES_DIR: &str = "images";
const THUMBNAILS_DIR: &str = "thumbnails";
const MODELS_DIR: &str = "models";

/// Roots for permanent assets and per-session staging
///
/// ```text
/// <upload_root>/images/<assetId>_<name>
/// <upload_root>/thumbnails/<assetId>_<name>
/// <upload_root>/models/
/// <tmp_root>/<sessionId>/<fileId>_<name>
/// ```
#[derive(Debug, Clone)]
pub struct AssetLayout {
    upload_root: PathBuf,
    tmp_root: PathBuf,
}

impl AssetLayout {
    pub fn new(upload_root: impl Into<PathBuf>, tmp_root: impl Into<PathBuf>) -> Self {
        Self {
            upload_root: upload_root.into(),
            tmp_root: tmp_root.into(),
        }
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    pub fn tmp_root(&self) -> &Path {
        &self.tmp_root
    }

    pub fn images_dir(&self) -> PathBuf {
        self.upload_root.join(IMAGES_DIR)
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.upload_root.join(THUMBNAILS_DIR)
    }

    pub fn models_dir(&self) -> PathBuf {
        self.upload_root.join(MODELS_DIR)
    }

    /// Staging directory for a session
    ///
    /// The session id becomes a single path component, so it must be
    /// non-empty and free of separators and `..`.
    pub fn session_dir(&self, session_id: &str) -> Result<PathBuf> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(Error::required("session_id"));
        }
        if !is_single_component(session_id) {
            return Err(Error::Validation(format!(
                "session_id must be a plain name: {}",
                session_id
            )));
        }
        Ok(self.tmp_root.join(session_id))
    }

    /// Resolve a client-supplied relative path under the upload root
    ///
    /// Absolute paths and parent components are rejected.
    pub fn resolve_download(&self, relative: &str) -> Result<PathBuf> {
        if relative.is_empty() {
            return Err(Error::required("filename"));
        }
        let path = Path::new(relative);
        if !path.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(Error::Validation(format!("Invalid download path: {}", relative)));
        }
        Ok(self.upload_root.join(path))
    }

    /// Create every permanent directory and the staging root
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.images_dir(),
            self.thumbnails_dir(),
            self.models_dir(),
            self.tmp_root.clone(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        info!(
            upload_root = %self.upload_root.display(),
            tmp_root = %self.tmp_root.display(),
            "Asset directories ready"
        );
        Ok(())
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> AssetLayout {
        AssetLayout::new("/srv/static", "/srv/.tmp")
    }

    #[test]
    fn test_session_dir_rejects_empty() {
        assert!(matches!(layout().session_dir(""), Err(Error::Validation(_))));
        assert!(matches!(layout().session_dir("   "), Err(Error::Validation(_))));
    }

    #[test]
    fn test_session_dir_rejects_traversal() {
        assert!(layout().session_dir("../etc").is_err());
        assert!(layout().session_dir("a/b").is_err());
        assert!(layout().session_dir("..").is_err());
    }

    #[test]
    fn test_session_dir_under_tmp_root() {
        assert_eq!(
            layout().session_dir("s1").unwrap(),
            PathBuf::from("/srv/.tmp/s1")
        );
    }

    #[test]
    fn test_resolve_download() {
        assert_eq!(
            layout().resolve_download("images/a_b.png").unwrap(),
            PathBuf::from("/srv/static/images/a_b.png")
        );
        assert!(layout().resolve_download("../secret").is_err());
        assert!(layout().resolve_download("images/../../x").is_err());
        assert!(layout().resolve_download("").is_err());
        assert!(layout().resolve_download("/etc/passwd").is_err());
    }

    #[test]
    fn test_ensure_dirs_creates_tree() {
        let root = tempfile::tempdir().unwrap();
        let layout = AssetLayout::new(root.path().join("static"), root.path().join(".tmp"));
        layout.ensure_dirs().unwrap();

        assert!(layout.images_dir().is_dir());
        assert!(layout.thumbnails_dir().is_dir());
        assert!(layout.models_dir().is_dir());
        assert!(layout.tmp_root().is_dir());
    }
}
