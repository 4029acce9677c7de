use std::collections::HashMap;

use serde::Deserialize;
use time::OffsetDateTime;

use crate::error::TwitterError;
use crate::feed::{Cursor, Page};
use crate::tweet::{ExtendedEntities, FeedItem};
use crate::utils::{deserialize_created_at, deserialize_lenient_i64, parse_id, parse_json};

/// Entries requested per page
pub(crate) const PAGE_SIZE: usize = 150;

#[derive(Deserialize, Debug)]
struct EntriesResponse {
    #[serde(default)]
    objects: Objects,
    response: Entries,
}

#[derive(Deserialize, Debug, Default)]
struct Objects {
    #[serde(default)]
    tweets: HashMap<String, CollectionTweet>,
    #[serde(default)]
    users: HashMap<String, CollectionUser>,
}

#[derive(Deserialize, Debug)]
struct CollectionTweet {
    #[serde(deserialize_with = "deserialize_created_at")]
    created_at: OffsetDateTime,
    #[serde(default)]
    full_text: String,
    user: UserRef,
    extended_entities: Option<ExtendedEntities>,
}

#[derive(Deserialize, Debug)]
struct UserRef {
    id_str: String,
}

#[derive(Deserialize, Debug)]
struct CollectionUser {
    screen_name: String,
}

#[derive(Deserialize, Debug)]
struct Entries {
    timeline: Vec<TimelineEntry>,
    position: Position,
}

#[derive(Deserialize, Debug)]
struct TimelineEntry {
    tweet: TweetRef,
}

#[derive(Deserialize, Debug)]
struct TweetRef {
    id: String,
}

#[derive(Deserialize, Debug)]
struct Position {
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    max_position: i64,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    min_position: i64,
    was_truncated: bool,
}

/// Parse a `collections/entries.json` response
pub(crate) fn parse_entries(text: &str) -> Result<Page, TwitterError> {
    let resp: EntriesResponse = parse_json(text, "collection entries")?;
    let mut objects = resp.objects;

    let items = resp
        .response
        .timeline
        .into_iter()
        .map(|entry| {
            let id = parse_id(&entry.tweet.id)?;
            let tweet = objects.tweets.remove(&entry.tweet.id).ok_or_else(|| {
                TwitterError::malformed(format!("tweet {} missing from collection objects", id))
            })?;
            let author = objects
                .users
                .get(&tweet.user.id_str)
                .ok_or_else(|| {
                    TwitterError::malformed(format!(
                        "user {} missing from collection objects",
                        tweet.user.id_str
                    ))
                })?
                .screen_name
                .clone();

            Ok(FeedItem {
                id,
                author,
                created_at: tweet.created_at,
                text: tweet.full_text,
                media: tweet.extended_entities.map(|e| e.media).unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>, TwitterError>>()?;

    let position = resp.response.position;
    Ok(Page {
        items,
        cursor: Cursor {
            max_position: position.max_position,
            min_position: position.min_position,
            truncated: position.was_truncated,
        },
    })
}
