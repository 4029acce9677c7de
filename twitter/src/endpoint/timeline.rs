use crate::error::TwitterError;
use crate::feed::{Cursor, Page};
use crate::tweet::{FeedItem, LegacyTweet};
use crate::utils::parse_json;

/// Tweets requested per page
pub(crate) const PAGE_SIZE: usize = 200;

/// Parse a `favorites/list.json` or `statuses/user_timeline.json` response.
///
/// These endpoints page with `max_id`, so the cursor is derived from the ids
/// on the page: the next request starts just below the oldest one, and an
/// empty page is the end.
pub(crate) fn parse_timeline(text: &str, context: &str) -> Result<Page, TwitterError> {
    let tweets: Vec<LegacyTweet> = parse_json(text, context)?;
    let items = tweets
        .into_iter()
        .map(LegacyTweet::into_feed_item)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(page_from_items(items))
}

fn page_from_items(items: Vec<FeedItem>) -> Page {
    let max_position = items.iter().map(|i| i.id).max().unwrap_or_default();
    let min_position = items
        .iter()
        .map(|i| i.id)
        .min()
        .map(|id| id - 1)
        .unwrap_or_default();

    Page {
        cursor: Cursor {
            max_position,
            min_position,
            truncated: !items.is_empty(),
        },
        items,
    }
}
