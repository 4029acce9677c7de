use std::path::Path;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use filetime::FileTime;
use futures::stream::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;

mod executor;

pub use executor::run_all;

static RESET_HEADER: &str = "x-rate-limit-reset";

/// Fetches a URL and writes the body to a file
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str, path: &Path) -> Result<()>;
}

#[async_trait]
impl Downloader for Client {
    async fn download(&self, url: &str, path: &Path) -> Result<()> {
        streamed_download(self, url, path).await
    }
}

pub async fn streamed_download(client: &Client, url: &str, path: impl AsRef<Path>) -> Result<()> {
    let resp = client.get(url).send().await?;

    check_download_status(url, resp.status(), resp.headers())?;

    let mut file = fs::File::create(path.as_ref()).await?;
    let mut stream = resp.bytes_stream();
    while let Some(b) = stream.next().await {
        let chunk = b?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    tracing::debug!("downloaded {} to {}", url, path.as_ref().display());

    Ok(())
}

/// Media hosts are not governed, a 429 here is fatal for the batch
fn check_download_status(url: &str, status: StatusCode, headers: &HeaderMap) -> Result<()> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let reset_at = headers
            .get(RESET_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|v| OffsetDateTime::from_unix_timestamp(v).ok());
        return Err(match reset_at {
            Some(t) => anyhow!("rate limited while downloading {}, resets at {}", url, t),
            None => anyhow!("rate limited while downloading {}", url),
        });
    }
    if !status.is_success() {
        return Err(anyhow!("failed to download {}: {}", url, status));
    }
    Ok(())
}

/// Set both access and modification time of `path`
pub fn set_mtime(path: impl AsRef<Path>, time: &OffsetDateTime) -> Result<()> {
    let ft = FileTime::from_unix_time(time.unix_timestamp(), time.nanosecond());
    filetime::set_file_times(path, ft, ft)?;
    Ok(())
}
