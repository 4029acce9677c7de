use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use futures::TryStreamExt;
use tc_crawler_common::Downloader;
use twitter::{
    DedupFilter, Feed, FeedItem, FeedSource, MediaPolicy, Pagination, RateLimitGovernor,
    Reporter, TweetMedia,
};

use crate::db::{ProcessedStore, ProcessedTweet};
use crate::download::{download_all, plan, DownloadOptions, ExistingFiles};

#[derive(Clone, Debug)]
pub struct SaveOptions {
    pub download_path: PathBuf,
    pub max_connections: Option<usize>,
    pub existing_files: ExistingFiles,
    pub media_policy: MediaPolicy,
}

/// Saves the media of collections and records what was saved
pub struct Crawler<'a> {
    source: &'a dyn FeedSource,
    downloader: &'a dyn Downloader,
    store: &'a dyn ProcessedStore,
    reporter: &'a dyn Reporter,
    options: SaveOptions,
}

impl<'a> Crawler<'a> {
    pub fn new(
        source: &'a dyn FeedSource,
        downloader: &'a dyn Downloader,
        store: &'a dyn ProcessedStore,
        reporter: &'a dyn Reporter,
        options: SaveOptions,
    ) -> Self {
        Self {
            source,
            downloader,
            store,
            reporter,
            options,
        }
    }

    /// Download the media of every unprocessed tweet in a collection.
    ///
    /// Tweets are recorded only after all their files are on disk, so a
    /// failed run records nothing and the next run retries the same tweets.
    /// Returns the number of files written.
    pub async fn save_collection(&self, collection_id: &str) -> Result<usize> {
        let dedup = DedupFilter::new(self.store.select_all().await?);
        tracing::debug!("{} tweets already processed", dedup.len());

        self.reporter
            .status(&format!("Fetching collection {}...", collection_id));
        let feed = Feed::Collection(collection_id.to_string());
        let items: Vec<FeedItem> = Pagination::new(self.source, feed, &dedup)
            .items()
            .try_collect()
            .await
            .with_context(|| format!("failed to list collection {}", collection_id))?;
        if items.is_empty() {
            tracing::info!("collection {}: nothing new", collection_id);
            return Ok(0);
        }
        tracing::info!("collection {}: {} new tweets", collection_id, items.len());

        let ids = items.iter().map(|i| i.id).collect::<Vec<_>>();
        let governor = RateLimitGovernor::new(self.options.max_connections);
        let details = governor
            .run(&ids, self.reporter, |id| self.source.detail(id))
            .await
            .context("failed to fetch tweet details")?;
        if let Some((id, detail)) = ids.iter().zip(&details).find(|(id, d)| **id != d.id) {
            bail!("detail of tweet {} returned tweet {}", id, detail.id);
        }

        let tweets = details
            .into_iter()
            .map(|d| TweetMedia::resolve(d, self.options.media_policy))
            .collect::<Result<Vec<_>, _>>()?;

        tokio::fs::create_dir_all(&self.options.download_path)
            .await
            .with_context(|| {
                format!(
                    "failed to create {}",
                    self.options.download_path.display()
                )
            })?;
        let targets = plan(&self.options.download_path, &tweets);
        let download_options = DownloadOptions {
            max_connections: self.options.max_connections,
            existing_files: self.options.existing_files,
        };
        download_all(self.downloader, &targets, &download_options, self.reporter).await?;

        let rows = tweets
            .iter()
            .map(|t| ProcessedTweet {
                id: t.id,
                url: t.permalink(),
            })
            .collect::<Vec<_>>();
        self.store
            .insert_batch(&rows)
            .await
            .context("failed to record processed tweets")?;

        tracing::info!(
            "collection {}: saved {} files from {} tweets",
            collection_id,
            targets.len(),
            tweets.len()
        );
        Ok(targets.len())
    }
}

#[cfg(test)]
mod test {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;
    use twitter::media::RawMedia;
    use twitter::{Cursor, OnError, Page, Rated, RateLimitWindow, Silent, TweetDetail, TwitterError};

    use super::*;
    use crate::db::open_memory;
    use crate::download::test::FakeDownloader;

    /// One page collection whose details carry `media` urls per tweet
    struct FakeSource {
        tweets: Vec<(i64, Vec<RawMedia>)>,
        detail_calls: Mutex<Vec<i64>>,
        /// Detail id returned in place of the requested one
        answers: HashMap<i64, i64>,
    }

    impl FakeSource {
        fn new(tweets: Vec<(i64, Vec<RawMedia>)>) -> Self {
            Self {
                tweets,
                detail_calls: Mutex::new(vec![]),
                answers: HashMap::new(),
            }
        }
    }

    #[async_trait]
    impl FeedSource for FakeSource {
        async fn page(&self, _feed: &Feed, _cursor: Option<&Cursor>) -> Result<Page, TwitterError> {
            Ok(Page {
                items: self
                    .tweets
                    .iter()
                    .map(|(id, _)| FeedItem {
                        id: *id,
                        author: "alice".to_string(),
                        created_at: OffsetDateTime::UNIX_EPOCH,
                        text: String::new(),
                        media: vec![],
                    })
                    .collect(),
                cursor: Cursor {
                    max_position: 2,
                    min_position: 1,
                    truncated: false,
                },
            })
        }

        async fn detail(&self, id: i64) -> Result<Rated<TweetDetail>, TwitterError> {
            self.detail_calls.lock().unwrap().push(id);
            let media = self
                .tweets
                .iter()
                .find(|(i, _)| *i == id)
                .map(|(_, m)| m.clone())
                .unwrap_or_default();
            Ok(Rated {
                value: TweetDetail {
                    id: self.answers.get(&id).copied().unwrap_or(id),
                    author: "alice".to_string(),
                    media,
                },
                window: Some(RateLimitWindow {
                    remaining: 100,
                    reset_at: OffsetDateTime::now_utc().unix_timestamp() + 900,
                }),
            })
        }
    }

    fn photo(url: &str) -> RawMedia {
        RawMedia {
            kind: Some("photo".to_string()),
            media_url_https: Some(url.to_string()),
            ..Default::default()
        }
    }

    fn options(dir: &std::path::Path) -> SaveOptions {
        SaveOptions {
            download_path: dir.join("out"),
            max_connections: Some(4),
            existing_files: ExistingFiles::Overwrite,
            media_policy: MediaPolicy::default(),
        }
    }

    async fn recorded(store: &dyn ProcessedStore) -> Vec<i64> {
        let mut ids = store.select_all().await.unwrap();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn saves_media_and_records_tweets() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(vec![
            (
                1,
                vec![
                    photo("https://pbs.twimg.com/media/a.jpg"),
                    photo("https://pbs.twimg.com/media/b.png"),
                ],
            ),
            (2, vec![]),
        ]);
        let downloader = FakeDownloader::default();
        let store = open_memory().await;

        let crawler = Crawler::new(&source, &downloader, &store, &Silent, options(dir.path()));
        let saved = crawler.save_collection("99").await.unwrap();

        assert_eq!(2, saved);
        let out = dir.path().join("out");
        assert_eq!(
            b"https://pbs.twimg.com/media/a.jpg:orig".to_vec(),
            std::fs::read(out.join("alice_1_0.jpg")).unwrap()
        );
        assert!(out.join("alice_1_1.png").exists());
        // tweets without media are recorded too
        assert_eq!(vec![1, 2], recorded(&store).await);
    }

    #[tokio::test]
    async fn second_run_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(vec![(1, vec![photo("https://pbs.twimg.com/media/a.jpg")])]);
        let downloader = FakeDownloader::default();
        let store = open_memory().await;

        let crawler = Crawler::new(&source, &downloader, &store, &Silent, options(dir.path()));
        assert_eq!(1, crawler.save_collection("99").await.unwrap());
        assert_eq!(0, crawler.save_collection("99").await.unwrap());

        assert_eq!(vec![1], *source.detail_calls.lock().unwrap());
        assert_eq!(1, downloader.fetched.lock().unwrap().len());
        assert_eq!(vec![1], recorded(&store).await);
    }

    #[tokio::test]
    async fn failed_download_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(vec![
            (1, vec![photo("https://pbs.twimg.com/media/a.jpg")]),
            (2, vec![photo("https://pbs.twimg.com/media/broken.jpg")]),
        ]);
        let downloader = FakeDownloader {
            failing: HashSet::from(["https://pbs.twimg.com/media/broken.jpg:orig".to_string()]),
            ..Default::default()
        };
        let store = open_memory().await;

        let crawler = Crawler::new(&source, &downloader, &store, &Silent, options(dir.path()));
        assert!(crawler.save_collection("99").await.is_err());
        assert!(recorded(&store).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_media_aborts_or_skips() {
        let dir = tempfile::tempdir().unwrap();
        let strange = RawMedia {
            kind: Some("hologram".to_string()),
            ..Default::default()
        };
        let source = FakeSource::new(vec![(
            1,
            vec![strange, photo("https://pbs.twimg.com/media/a.jpg")],
        )]);
        let downloader = FakeDownloader::default();
        let store = open_memory().await;

        let crawler = Crawler::new(&source, &downloader, &store, &Silent, options(dir.path()));
        let err = crawler.save_collection("99").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TwitterError>(),
            Some(TwitterError::UnknownMediaKind { .. })
        ));
        assert!(recorded(&store).await.is_empty());

        let mut skipping = options(dir.path());
        skipping.media_policy.unknown_kind = OnError::Skip;
        let crawler = Crawler::new(&source, &downloader, &store, &Silent, skipping);
        assert_eq!(1, crawler.save_collection("99").await.unwrap());
        assert_eq!(vec![1], recorded(&store).await);
    }

    #[tokio::test]
    async fn processed_tweets_are_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(vec![
            (1, vec![photo("https://pbs.twimg.com/media/a.jpg")]),
            (2, vec![photo("https://pbs.twimg.com/media/b.jpg")]),
        ]);
        let downloader = FakeDownloader::default();
        let store = open_memory().await;
        store
            .insert_batch(&[ProcessedTweet {
                id: 1,
                url: "https://twitter.com/alice/status/1".to_string(),
            }])
            .await
            .unwrap();

        let crawler = Crawler::new(&source, &downloader, &store, &Silent, options(dir.path()));
        assert_eq!(1, crawler.save_collection("99").await.unwrap());
        assert_eq!(vec![2], *source.detail_calls.lock().unwrap());

        assert_eq!(
            vec!["https://pbs.twimg.com/media/b.jpg:orig".to_string()],
            *downloader.fetched.lock().unwrap()
        );
    }

    #[tokio::test]
    async fn detail_of_another_tweet_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FakeSource::new(vec![
            (1, vec![photo("https://pbs.twimg.com/media/a.jpg")]),
            (2, vec![photo("https://pbs.twimg.com/media/b.jpg")]),
        ]);
        source.answers.insert(2, 1);
        let downloader = FakeDownloader::default();
        let store = open_memory().await;

        let crawler = Crawler::new(&source, &downloader, &store, &Silent, options(dir.path()));
        let err = crawler.save_collection("99").await.unwrap_err();

        assert!(err.to_string().contains("detail of tweet 2 returned tweet 1"));
        assert!(downloader.fetched.lock().unwrap().is_empty());
        assert!(recorded(&store).await.is_empty());
    }
}
