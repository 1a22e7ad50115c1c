//! Email attachments

use std::{
    borrow::Cow,
    fmt, io,
    path::{Path, PathBuf},
};

use tempfile::TempDir;
use tracing::{debug, warn};

/// Where an attachment's content lives
#[derive(Debug)]
pub enum AttachmentSource {
    /// Content held in memory
    Memory(Vec<u8>),

    /// Content written to a temporary file
    Disk(StoredFile),
}

/// A file uploaded alongside an email
#[derive(Debug)]
pub struct Attachment {
    filename: String,
    content_type: String,
    size: u64,
    source: AttachmentSource,
}

impl Attachment {
    /// Creates an attachment held in memory.
    pub fn in_memory(filename: &str, content_type: &str, content: Vec<u8>) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size: content.len() as u64,
            source: AttachmentSource::Memory(content),
        }
    }

    /// Creates an attachment backed by a temporary file.
    pub fn on_disk(filename: &str, content_type: &str, size: u64, file: StoredFile) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size,
            source: AttachmentSource::Disk(file),
        }
    }

    /// The client-supplied file name
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The declared MIME type
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Size of the content in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Where the content lives
    pub fn source(&self) -> &AttachmentSource {
        &self.source
    }

    /// Reads the attachment's content, from memory or from its temporary file.
    pub async fn content(&self) -> io::Result<Cow<'_, [u8]>> {
        match &self.source {
            AttachmentSource::Memory(content) => Ok(Cow::Borrowed(content.as_slice())),
            AttachmentSource::Disk(file) => Ok(Cow::Owned(tokio::fs::read(file.path()).await?)),
        }
    }

    /// Releases the attachment's storage.
    pub fn release(self) -> io::Result<()> {
        match self.source {
            AttachmentSource::Memory(_) => Ok(()),
            AttachmentSource::Disk(file) => file.release(),
        }
    }
}

/// A file written into its own temporary directory.
///
/// The directory is removed by [`StoredFile::release`], or when the value is
/// dropped, so every exit path of a request cleans up after itself.
pub struct StoredFile {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl StoredFile {
    /// Takes ownership of `dir`, which holds the file at `path`.
    pub fn new(dir: TempDir, path: PathBuf) -> Self {
        Self {
            dir: Some(dir),
            path,
        }
    }

    /// Path of the stored file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the temporary directory, reporting any failure.
    pub fn release(mut self) -> io::Result<()> {
        match self.dir.take() {
            Some(dir) => {
                debug!("removing temporary directory {}", dir.path().display());
                dir.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for StoredFile {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let dir_path = dir.path().to_path_buf();

            if let Err(e) = dir.close() {
                warn!(
                    "failed to remove temporary directory {}: {}",
                    dir_path.display(),
                    e
                );
            }
        }
    }
}

impl fmt::Debug for StoredFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredFile")
            .field("path", &self.path)
            .field("released", &self.dir.is_none())
            .finish()
    }
}
