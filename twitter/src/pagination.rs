use std::collections::{HashSet, VecDeque};

use futures::Stream;
use tokio::time::{sleep, Duration};

use crate::dedup::DedupFilter;
use crate::error::TwitterError;
use crate::feed::{Cursor, Feed, FeedSource, Page};
use crate::tweet::FeedItem;

/// Delay between two page requests
pub const PAGE_PACING: Duration = Duration::from_millis(500);
/// Delay before retrying a cursor that returned an empty page
pub const EMPTY_PAGE_BACKOFF: Duration = Duration::from_secs(3);

/// Walks every page of a feed, yielding each unprocessed tweet once
pub struct Pagination<'a, S: ?Sized> {
    source: &'a S,
    feed: Feed,
    dedup: &'a DedupFilter,
}

#[derive(Default)]
struct FetchState {
    cursor: Option<Cursor>,
    items: VecDeque<FeedItem>,
    yielded: HashSet<i64>,
    delay: Option<Duration>,
    retried_empty: bool,
    done: bool,
}

impl<'a, S: FeedSource + ?Sized + 'a> Pagination<'a, S> {
    pub fn new(source: &'a S, feed: Feed, dedup: &'a DedupFilter) -> Self {
        Self {
            source,
            feed,
            dedup,
        }
    }

    /// Lazily fetch pages until the feed is exhausted.
    ///
    /// The first error ends the stream.
    pub fn items(self) -> impl Stream<Item = Result<FeedItem, TwitterError>> + 'a {
        futures::stream::unfold(
            (self, FetchState::default()),
            |(pager, mut state)| async move {
                loop {
                    // Return next item if it exists
                    if let Some(item) = state.items.pop_front() {
                        return Some((Ok(item), (pager, state)));
                    }

                    if state.done {
                        return None;
                    }

                    if let Some(delay) = state.delay.take() {
                        sleep(delay).await;
                    }

                    let result = match pager
                        .source
                        .page(&pager.feed, state.cursor.as_ref())
                        .await
                    {
                        Ok(page) => pager.advance(&mut state, page),
                        Err(e) => Err(e),
                    };
                    if let Err(e) = result {
                        state.done = true;
                        return Some((Err(e), (pager, state)));
                    }
                }
            },
        )
    }

    fn advance(&self, state: &mut FetchState, page: Page) -> Result<(), TwitterError> {
        if page.items.is_empty() && page.cursor.truncated {
            if state.retried_empty {
                return Err(TwitterError::PaginationStalled {
                    feed: self.feed.to_string(),
                });
            }
            tracing::debug!("empty page from {}, retrying", self.feed);
            state.retried_empty = true;
            state.delay = Some(EMPTY_PAGE_BACKOFF);
            return Ok(());
        }
        state.retried_empty = false;

        let repeated = state
            .cursor
            .map(|c| c.min_position == page.cursor.min_position)
            .unwrap_or(false);
        if repeated {
            tracing::debug!("cursor of {} stopped advancing", self.feed);
        }
        state.done = !page.cursor.truncated || repeated;
        state.cursor = Some(page.cursor);
        state.delay = Some(PAGE_PACING);

        let unseen = self.dedup.filter_unseen(page.items);
        let yielded = &mut state.yielded;
        state
            .items
            .extend(unseen.into_iter().filter(|i| yielded.insert(i.id)));

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::StreamExt;
    use time::OffsetDateTime;
    use tokio::time::Instant;

    use super::*;
    use crate::feed::Rated;
    use crate::tweet::TweetDetail;

    struct ScriptedSource {
        start: Instant,
        pages: Mutex<VecDeque<Result<Page, TwitterError>>>,
        requests: Mutex<Vec<(Option<Cursor>, Duration)>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Result<Page, TwitterError>>) -> Self {
            Self {
                start: Instant::now(),
                pages: Mutex::new(pages.into()),
                requests: Mutex::new(vec![]),
            }
        }

        fn requests(&self) -> Vec<(Option<Cursor>, Duration)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FeedSource for ScriptedSource {
        async fn page(&self, _feed: &Feed, cursor: Option<&Cursor>) -> Result<Page, TwitterError> {
            self.requests
                .lock()
                .unwrap()
                .push((cursor.copied(), self.start.elapsed()));
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .expect("no more scripted pages")
        }

        async fn detail(&self, _id: i64) -> Result<Rated<TweetDetail>, TwitterError> {
            unimplemented!()
        }
    }

    fn item(id: i64) -> FeedItem {
        FeedItem {
            id,
            author: "author".to_string(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            text: String::new(),
            media: vec![],
        }
    }

    fn page(ids: &[i64], min_position: i64, truncated: bool) -> Result<Page, TwitterError> {
        Ok(Page {
            items: ids.iter().copied().map(item).collect(),
            cursor: Cursor {
                max_position: min_position + 100,
                min_position,
                truncated,
            },
        })
    }

    async fn collect(
        source: &ScriptedSource,
        dedup: &DedupFilter,
    ) -> Vec<Result<FeedItem, TwitterError>> {
        let feed = Feed::Collection("1".to_string());
        Pagination::new(source, feed, dedup).items().collect().await
    }

    fn ids(results: Vec<Result<FeedItem, TwitterError>>) -> Vec<i64> {
        results.into_iter().map(|r| r.unwrap().id).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn yields_every_page_once() {
        let source = ScriptedSource::new(vec![
            page(&[9, 8, 7], 70, true),
            page(&[6, 5], 50, false),
        ]);
        let results = collect(&source, &DedupFilter::default()).await;
        assert_eq!(vec![9, 8, 7, 6, 5], ids(results));

        let requests = source.requests();
        assert_eq!(2, requests.len());
        assert_eq!(None, requests[0].0);
        assert_eq!(70, requests[1].0.unwrap().min_position);
        assert!(requests[1].1 >= PAGE_PACING);
    }

    #[tokio::test(start_paused = true)]
    async fn skips_processed_and_repeated() {
        let source = ScriptedSource::new(vec![
            page(&[9, 8, 7], 70, true),
            page(&[7, 6, 5], 50, false),
        ]);
        let dedup = DedupFilter::new([8, 5]);
        let results = collect(&source, &dedup).await;
        assert_eq!(vec![9, 7, 6], ids(results));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_page_is_retried_once() {
        let source = ScriptedSource::new(vec![
            page(&[3], 30, true),
            page(&[], 30, true),
            page(&[2, 1], 10, false),
        ]);
        let results = collect(&source, &DedupFilter::default()).await;
        assert_eq!(vec![3, 2, 1], ids(results));

        let requests = source.requests();
        assert_eq!(3, requests.len());
        assert_eq!(requests[1].0, requests[2].0);
        assert!(requests[2].1 - requests[1].1 >= EMPTY_PAGE_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn two_empty_pages_stall() {
        let source = ScriptedSource::new(vec![
            page(&[3], 30, true),
            page(&[], 30, true),
            page(&[], 30, true),
        ]);
        let results = collect(&source, &DedupFilter::default()).await;
        assert_eq!(2, results.len());
        assert_eq!(3, results[0].as_ref().unwrap().id);
        assert!(matches!(
            results[1],
            Err(TwitterError::PaginationStalled { .. })
        ));
        assert_eq!(3, source.requests().len());
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_repeated_cursor() {
        let source = ScriptedSource::new(vec![
            page(&[3, 2], 20, true),
            page(&[2, 1], 20, true),
        ]);
        let results = collect(&source, &DedupFilter::default()).await;
        assert_eq!(vec![3, 2, 1], ids(results));
        assert_eq!(2, source.requests().len());
    }

    #[tokio::test(start_paused = true)]
    async fn endpoint_error_ends_stream() {
        let source = ScriptedSource::new(vec![
            page(&[3, 2], 20, true),
            Err(TwitterError::Endpoint {
                status: 403,
                reason: "Forbidden".to_string(),
                context: "collection entries".to_string(),
            }),
        ]);
        let results = collect(&source, &DedupFilter::default()).await;
        assert_eq!(3, results.len());
        assert!(matches!(
            results[2],
            Err(TwitterError::Endpoint { status: 403, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn single_page() {
        let source = ScriptedSource::new(vec![page(&[1], 0, false)]);
        let results = collect(&source, &DedupFilter::default()).await;
        assert_eq!(vec![1], ids(results));
        assert_eq!(1, source.requests().len());
    }
}
