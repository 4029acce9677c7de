use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use serde::Deserialize;
use tc_crawler_common::{run_all, set_mtime, Downloader};
use time::{Duration, OffsetDateTime};
use twitter::{Reporter, TweetMedia};
use url::Url;

/// What to do when a target file already exists
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExistingFiles {
    #[default]
    Overwrite,
    Skip,
}

#[derive(Clone, Copy, Debug)]
pub struct DownloadOptions {
    pub max_connections: Option<usize>,
    pub existing_files: ExistingFiles,
}

/// One planned file write
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaTarget {
    pub url: String,
    pub path: PathBuf,
    pub tweet_id: i64,
    pub index: usize,
}

/// Lay out every media file as `{author}_{id}_{index}{ext}` under `save_dir`
pub fn plan(save_dir: &Path, tweets: &[TweetMedia]) -> Vec<MediaTarget> {
    tweets
        .iter()
        .flat_map(|tweet| {
            tweet.media.iter().enumerate().map(move |(index, media)| {
                let file_name = format!(
                    "{}_{}_{}{}",
                    tweet.author,
                    tweet.id,
                    index,
                    extension(&media.url)
                );
                MediaTarget {
                    url: media.url.clone(),
                    path: save_dir.join(file_name),
                    tweet_id: tweet.id,
                    index,
                }
            })
        })
        .collect()
}

/// Extension of the url path including the dot, ignoring a `:orig` suffix
fn extension(url: &str) -> String {
    let Ok(url) = Url::parse(url) else {
        return String::new();
    };
    let path = url.path().replace(":orig", "");
    Path::new(&path)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Download every target, then stamp file times so the files sort in batch
/// order, newest first.
pub async fn download_all(
    downloader: &dyn Downloader,
    targets: &[MediaTarget],
    options: &DownloadOptions,
    reporter: &dyn Reporter,
) -> Result<()> {
    let finished = AtomicUsize::new(0);
    let total = targets.len();

    run_all(
        targets.iter().map(|target| {
            let finished = &finished;
            async move {
                let exists = tokio::fs::try_exists(&target.path)
                    .await
                    .with_context(|| format!("failed to check {}", target.path.display()))?;
                if exists && options.existing_files == ExistingFiles::Skip {
                    tracing::debug!("skipping existing {}", target.path.display());
                } else {
                    downloader
                        .download(&target.url, &target.path)
                        .await
                        .with_context(|| format!("failed to download {}", target.url))?;
                }

                let n = finished.fetch_add(1, Ordering::Relaxed) + 1;
                let name = target
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                reporter.status(&format!("Downloading {}/{}: {}", n, total, name));
                Ok::<_, anyhow::Error>(())
            }
        }),
        options.max_connections,
    )
    .await?;

    stamp_times(targets, OffsetDateTime::now_utc())
}

/// Set modified and accessed time of the i-th target to `now - i` seconds
pub fn stamp_times(targets: &[MediaTarget], now: OffsetDateTime) -> Result<()> {
    for (i, target) in targets.iter().enumerate() {
        let time = now - Duration::seconds(i as i64);
        set_mtime(&target.path, &time)
            .with_context(|| format!("failed to set file time of {}", target.path.display()))?;
    }
    Ok(())
}
