//! Temporary attachment storage

use std::{
    io,
    path::{Path, PathBuf},
};

use clap::{Parser, ValueEnum};
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, warn};

use crate::domain::mail::{Attachment, AttachmentError, StoredFile};

/// One mebibyte
pub const MIB: usize = 1024 * 1024;

/// Default per-file attachment ceiling
pub const MAX_ATTACHMENT_SIZE: usize = 25 * MIB;

const FALLBACK_FILENAME: &str = "attachment";

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Where uploaded attachments are kept until the email is sent
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum StorageMode {
    /// Each attachment is written to its own temporary directory
    #[default]
    Disk,

    /// Attachments are kept in memory
    Memory,
}

/// Attachment storage configuration
#[derive(Clone, Debug, Parser)]
pub struct AttachmentConfig {
    /// Where to keep attachments while sending
    #[arg(
        long = "attachment-storage",
        env = "ATTACHMENT_STORAGE",
        value_enum,
        default_value_t = StorageMode::Disk
    )]
    pub storage: StorageMode,

    /// Directory for temporary attachment files, defaults to the OS temp dir
    #[arg(long = "attachment-dir", env = "ATTACHMENT_DIR")]
    pub dir: Option<PathBuf>,

    /// Maximum size of a single attachment in bytes
    #[arg(long = "attachment-max-size", env = "ATTACHMENT_MAX_SIZE", default_value_t = MAX_ATTACHMENT_SIZE)]
    pub max_size: usize,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            storage: StorageMode::Disk,
            dir: None,
            max_size: MAX_ATTACHMENT_SIZE,
        }
    }
}

/// Persists uploaded attachments for the duration of a request
#[derive(Clone, Debug)]
pub struct AttachmentStore {
    mode: StorageMode,
    root: PathBuf,
    max_size: usize,
}

impl AttachmentStore {
    /// Create a new attachment store
    pub fn new(config: AttachmentConfig) -> Self {
        Self {
            mode: config.storage,
            root: config.dir.unwrap_or_else(std::env::temp_dir),
            max_size: config.max_size,
        }
    }

    /// The storage mode
    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    /// The directory temporary files are created in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maximum size of a single attachment in bytes. The store does not enforce
    /// it; callers check it before each write.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Opens a writer for a new attachment.
    ///
    /// In disk mode every call gets a fresh directory, so attachments sharing a
    /// file name never overwrite each other. Dropping the writer before
    /// [`AttachmentWriter::finish`] removes that directory again.
    ///
    /// # Errors
    /// [`AttachmentError::Io`] if the directory or file cannot be created.
    pub async fn create(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<AttachmentWriter, AttachmentError> {
        let sink = match self.mode {
            StorageMode::Memory => Sink::Memory(Vec::new()),
            StorageMode::Disk => {
                let io_error = |source| AttachmentError::Io {
                    filename: filename.to_string(),
                    source,
                };

                let dir = tempfile::Builder::new()
                    .prefix("mail-attachment-")
                    .tempdir_in(&self.root)
                    .map_err(io_error)?;

                let path = dir.path().join(safe_filename(filename));
                let file = StoredFile::new(dir, path);
                let handle = File::create(file.path()).await.map_err(io_error)?;

                Sink::Disk { handle, file }
            }
        };

        Ok(AttachmentWriter {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size: 0,
            sink,
        })
    }

    /// Copies everything `reader` yields into a new attachment.
    ///
    /// # Errors
    /// [`AttachmentError::Io`] if reading or writing fails. Any partially
    /// written directory is removed.
    pub async fn persist<R>(
        &self,
        filename: &str,
        content_type: &str,
        mut reader: R,
    ) -> Result<Attachment, AttachmentError>
    where
        R: AsyncRead + Unpin,
    {
        let mut writer = self.create(filename, content_type).await?;
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

        loop {
            let read = reader
                .read(&mut buffer)
                .await
                .map_err(|source| writer.io_error(source))?;

            if read == 0 {
                break;
            }

            writer.write(&buffer[..read]).await?;
        }

        writer.finish().await
    }

    /// Releases every attachment in `attachments` on the blocking pool.
    /// Failures are logged, never returned.
    pub async fn release_all(&self, attachments: impl IntoIterator<Item = Attachment>) {
        let attachments: Vec<Attachment> = attachments.into_iter().collect();

        if attachments.is_empty() {
            return;
        }

        let cleanup = tokio::task::spawn_blocking(move || {
            for attachment in attachments {
                release(attachment);
            }
        });

        if let Err(e) = cleanup.await {
            warn!("attachment cleanup did not complete: {}", e);
        }
    }
}

/// An attachment whose content is still being received
#[derive(Debug)]
pub struct AttachmentWriter {
    filename: String,
    content_type: String,
    size: u64,
    sink: Sink,
}

#[derive(Debug)]
enum Sink {
    Memory(Vec<u8>),

    // `handle` is declared first so it is closed before the directory goes
    Disk { handle: File, file: StoredFile },
}

impl AttachmentWriter {
    /// Bytes written so far
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Appends `chunk` to the attachment.
    ///
    /// # Errors
    /// [`AttachmentError::Io`] if the temporary file cannot be written.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), AttachmentError> {
        match &mut self.sink {
            Sink::Memory(content) => content.extend_from_slice(chunk),
            Sink::Disk { handle, .. } => {
                let written = handle.write_all(chunk).await;

                if let Err(source) = written {
                    return Err(self.io_error(source));
                }
            }
        }

        self.size += chunk.len() as u64;

        Ok(())
    }

    /// Completes the attachment.
    ///
    /// # Errors
    /// [`AttachmentError::Io`] if buffered bytes cannot be flushed to disk.
    pub async fn finish(self) -> Result<Attachment, AttachmentError> {
        let Self {
            filename,
            content_type,
            size,
            sink,
        } = self;

        match sink {
            Sink::Memory(content) => Ok(Attachment::in_memory(&filename, &content_type, content)),
            Sink::Disk { mut handle, file } => {
                if let Err(source) = handle.flush().await {
                    return Err(AttachmentError::Io { filename, source });
                }

                drop(handle);

                debug!(
                    "stored attachment \"{}\" ({} bytes) at {}",
                    filename,
                    size,
                    file.path().display()
                );

                Ok(Attachment::on_disk(&filename, &content_type, size, file))
            }
        }
    }

    fn io_error(&self, source: io::Error) -> AttachmentError {
        AttachmentError::Io {
            filename: self.filename.clone(),
            source,
        }
    }
}

fn release(attachment: Attachment) {
    let filename = attachment.filename().to_string();

    if let Err(e) = attachment.release() {
        warn!("failed to remove temporary attachment \"{}\": {}", filename, e);
    }
}

/// Keeps only the final path component of a client-supplied name.
fn safe_filename(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or(FALLBACK_FILENAME)
}
