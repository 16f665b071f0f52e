//! Per-invocation scratch space and attachment staging.
//!
//! Each file-handling command gets its own uniquely named directory under the
//! configured scratch root, so concurrent invocations (or two uploads with the same
//! name) never share paths. Everything inside is removed when the [`ScratchDir`] is
//! dropped, whichever way the command ends.

use crate::errors::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A temporary working directory owned by one command invocation
#[derive(Debug)]
pub struct ScratchDir {
    dir: tempfile::TempDir,
}

impl ScratchDir {
    /// Creates a fresh directory under `root`, creating `root` if needed.
    ///
    /// # Errors
    /// Returns an I/O error if the directory cannot be created.
    pub fn create(root: &Path, command: &str) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{command}-"))
            .tempdir_in(root)?;
        debug!("Created scratch directory {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Directory path
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a file inside the scratch directory
    #[must_use]
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(sanitize_filename(name))
    }

    /// Writes downloaded attachment bytes under the attachment's own name and returns
    /// the staged path.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be written.
    pub async fn stage(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.file(filename);
        tokio::fs::write(&path, bytes).await?;
        debug!(bytes = bytes.len(), "Staged {}", path.display());
        Ok(path)
    }
}

/// Reduces an uploaded name to a single path component.
///
/// Discord already strips directories from attachment names; this guards against
/// anything left that would escape the scratch directory.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    match base {
        "" | "." | ".." => "upload".to_string(),
        other => other.to_string(),
    }
}
