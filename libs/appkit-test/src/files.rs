//! Dummy file fixtures.
//!
//! A [`DummyFile`] owns a working copy of some source file and removes it
//! (plus any tracked original) when dropped. Cleanup is best-effort:
//! failures are debug-logged, never surfaced.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

pub struct DummyFile {
    path: PathBuf,
    original: Option<PathBuf>,
}

impl DummyFile {
    /// Wrap an existing file; it is removed on drop.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            original: None,
        }
    }

    /// Copy `source` into `dir` under a unique name and wrap the copy.
    ///
    /// # Errors
    /// Fails when the copy cannot be created.
    pub fn copy_into(source: &Path, dir: &Path) -> io::Result<Self> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dummy".to_owned());

        let mut name = format!("{stem}-{}", Uuid::new_v4().simple());
        if let Some(ext) = source.extension().and_then(|e| e.to_str()) {
            name.push('.');
            name.push_str(ext);
        }

        let path = dir.join(name);
        fs::copy(source, &path)?;
        Ok(Self::new(path))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Also remove `original` when this dummy is dropped.
    pub fn track_original(&mut self, original: impl Into<PathBuf>) {
        self.original = Some(original.into());
    }

    /// # Errors
    /// Fails when the file cannot be read.
    pub fn contents(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

impl Drop for DummyFile {
    fn drop(&mut self) {
        for path in std::iter::once(&self.path).chain(self.original.as_ref()) {
            if let Err(e) = fs::remove_file(path) {
                debug!(path = %path.display(), error = %e, "dummy file cleanup failed");
            }
        }
    }
}

/// A dummy file plus the client-side metadata of an upload.
pub struct DummyUploadedFile {
    file: DummyFile,
    client_name: String,
    content_type: String,
}

impl DummyUploadedFile {
    /// Promote a dummy file to an upload fixture. Client name and content
    /// type are derived from the file's path.
    #[must_use]
    pub fn from_file(file: DummyFile) -> Self {
        let client_name = file
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_owned());
        let content_type = appkit_http::mime_for_path(file.path()).to_string();
        Self {
            file,
            client_name,
            content_type,
        }
    }

    #[must_use]
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    #[must_use]
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// # Errors
    /// Fails when the file cannot be read.
    pub fn contents(&self) -> io::Result<Vec<u8>> {
        self.file.contents()
    }
}
