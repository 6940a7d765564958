//! Streaming HTTP download to a local file.

use crate::utils::{Result, YabackupError};
use futures_util::StreamExt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Fetch `url` into `dest`, publishing written bytes through `counter`.
///
/// Returns the number of bytes written.
pub async fn download_to_file(
    http: &reqwest::Client,
    url: &str,
    dest: &Path,
    counter: Arc<AtomicU64>,
) -> Result<u64> {
    let response = http.get(url).send().await?;
    if !response.status().is_success() {
        return Err(YabackupError::Transfer(format!(
            "download failed with status {}",
            response.status()
        )));
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        counter.store(written, Ordering::Relaxed);
    }
    file.flush().await?;

    Ok(written)
}

/// Content length advertised by a HEAD probe, if any
pub async fn probe_length(http: &reqwest::Client, url: &str) -> Option<u64> {
    let response = http.head(url).send().await.ok()?;
    response
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
