//! FileSender - writes every payload to its own file

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use contracts::{ContractError, PayloadSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Sender that writes payloads to `<dir>/<name>-<sequence>.bin`
pub struct FileSender {
    name: String,
    dir: PathBuf,
    sequence: AtomicU64,
}

impl FileSender {
    /// Create a new FileSender, creating `dir` if needed
    pub fn new(name: impl Into<String>, dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            name: name.into(),
            dir,
            sequence: AtomicU64::new(0),
        })
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_path(&self) -> PathBuf {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!("{}-{:06}.bin", self.name, sequence))
    }
}

impl PayloadSender for FileSender {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sender_send",
        skip(self, payload, _cancel),
        fields(sender = %self.name, bytes = payload.len())
    )]
    async fn send(&self, payload: Bytes, _cancel: CancellationToken) -> Result<(), ContractError> {
        let path = self.next_path();
        tokio::fs::write(&path, &payload).await?;
        debug!(sender = %self.name, path = %path.display(), "Payload written");
        Ok(())
    }
}
