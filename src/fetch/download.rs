// src/fetch/download.rs

use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::Client;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::{
    fs,
    io::{AsyncWriteExt, BufWriter},
    time::sleep,
};
use tracing::{error, info, warn};

/// Write buffer size for streamed downloads.
pub const CHUNK_SIZE: usize = 8192;

/// Download `url` into `dest_dir/filename`, retrying up to `max_retries`
/// attempts with a fixed `retry_delay` between them.
///
/// Returns `None` once every attempt has failed; nothing is left at the
/// target path in that case.
pub async fn download_dataset(
    client: &Client,
    url: &str,
    dest_dir: &Path,
    filename: &str,
    max_retries: u32,
    retry_delay: Duration,
) -> Option<PathBuf> {
    let dest_path = dest_dir.join(filename);

    for attempt in 1..=max_retries {
        info!(%filename, attempt, max_retries, "downloading");
        match stream_to_file(client, url, &dest_path).await {
            Ok(bytes) => {
                info!(%filename, bytes, "downloaded");
                return Some(dest_path);
            }
            Err(e) => {
                error!(%filename, %url, attempt, error = %e, "download failed");
                discard_partial(&dest_path).await;
                if attempt < max_retries {
                    sleep(retry_delay).await;
                }
            }
        }
    }

    warn!(%filename, "giving up after {} attempts", max_retries);
    None
}

async fn stream_to_file(client: &Client, url: &str, dest_path: &Path) -> Result<u64> {
    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {}", url))?
        .error_for_status()?;

    let file = fs::File::create(dest_path)
        .await
        .with_context(|| format!("creating {}", dest_path.display()))?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);

    let mut written = 0u64;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("reading body from {}", url))?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    writer.flush().await?;

    Ok(written)
}

async fn discard_partial(path: &Path) {
    if fs::try_exists(path).await.unwrap_or(false) {
        if let Err(e) = fs::remove_file(path).await {
            warn!(path = %path.display(), error = %e, "failed to remove partial download");
        }
    }
}
