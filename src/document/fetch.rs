// src/document/fetch.rs
// Stage a remotely hosted image in the scratch directory

use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::error::{Result, StoryError};

/// A downloaded image on local disk, removed when dropped.
#[derive(Debug)]
pub struct StagedImage {
    path: PathBuf,
    bytes: u64,
}

impl StagedImage {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedImage {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!("Could not remove staged image {}: {}", self.path.display(), e);
        }
    }
}

/// Stream `url` into a fresh file under `scratch_dir`.
///
/// Every call writes to its own uniquely named file, so concurrent exports
/// never share a path. Bodies larger than `max_bytes` are rejected, either up
/// front from `Content-Length` or as soon as the running total passes it;
/// the partial file is removed.
pub async fn fetch_image(
    client: &Client,
    url: &str,
    scratch_dir: &Path,
    max_bytes: u64,
) -> Result<StagedImage> {
    let parsed = Url::parse(url)
        .map_err(|e| StoryError::ImageFetch(format!("invalid image url {url}: {e}")))?;

    tokio::fs::create_dir_all(scratch_dir).await?;

    let response = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| StoryError::ImageFetch(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(StoryError::ImageFetch(format!("{url} returned {status}")));
    }

    if let Some(declared) = response.content_length()
        && declared > max_bytes
    {
        return Err(too_large(url, declared, max_bytes));
    }

    let mut staged = StagedImage {
        path: scratch_dir.join(format!("{}.img", Uuid::new_v4())),
        bytes: 0,
    };
    let mut file = tokio::fs::File::create(&staged.path).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| StoryError::ImageFetch(format!("{url}: {e}")))?;
        staged.bytes += chunk.len() as u64;
        if staged.bytes > max_bytes {
            return Err(too_large(url, staged.bytes, max_bytes));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    info!("Staged image {} ({} bytes)", staged.path.display(), staged.bytes);
    Ok(staged)
}

fn too_large(url: &str, bytes: u64, max_bytes: u64) -> StoryError {
    StoryError::ImageFetch(format!("{url}: image exceeds {max_bytes} bytes (got {bytes})"))
}
