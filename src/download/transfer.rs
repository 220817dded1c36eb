//! Direct media file transfer.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::fs::naming::partial_path;

/// Transfers a remote file to a local path.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download `url` to `destination`.
    ///
    /// On success `destination` holds the complete file; on error it is left untouched.
    async fn fetch_to_file(&self, url: &str, destination: &Path) -> Result<()>;
}

/// Streaming HTTP implementation of [`MediaFetcher`].
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Download(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch_to_file(&self, url: &str, destination: &Path) -> Result<()> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Download(format!("HTTP {}", status)));
        }

        let partial = PartialFile::new(destination);

        // Stream to file
        let mut file = File::create(partial.path()).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Download(format!("Stream error: {}", e)))?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        drop(file);

        partial.commit(destination).await
    }
}

/// Hidden in-progress file that is removed unless committed.
///
/// Dropping it (including when a cancelled transfer future is dropped) deletes the
/// partial data, so the existence check never sees a truncated file.
pub struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    pub fn new(destination: &Path) -> Self {
        Self {
            path: partial_path(destination),
            committed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the partial file into place.
    pub async fn commit(mut self, destination: &Path) -> Result<()> {
        tokio::fs::rename(&self.path, destination).await?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
