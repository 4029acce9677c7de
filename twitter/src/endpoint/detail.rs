use serde::Deserialize;

use crate::error::TwitterError;
use crate::media::RawMedia;
use crate::tweet::{ExtendedEntities, LegacyTweet, TweetDetail};
use crate::utils::{parse_id, parse_json};

/// `statuses/show.json`
pub(crate) fn parse_status(text: &str) -> Result<TweetDetail, TwitterError> {
    let tweet: LegacyTweet = parse_json(text, "tweet detail")?;
    tweet.into_detail()
}

// v2 `tweets/{id}` with media and author expansions

#[derive(Deserialize, Debug)]
struct V2Response {
    data: V2Tweet,
    #[serde(default)]
    includes: V2Includes,
}

#[derive(Deserialize, Debug)]
struct V2Tweet {
    id: String,
    author_id: String,
    attachments: Option<V2Attachments>,
}

#[derive(Deserialize, Debug)]
struct V2Attachments {
    #[serde(default)]
    media_keys: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
struct V2Includes {
    #[serde(default)]
    media: Vec<V2Media>,
    #[serde(default)]
    users: Vec<V2User>,
}

#[derive(Deserialize, Debug)]
struct V2Media {
    media_key: String,
    #[serde(flatten)]
    media: RawMedia,
}

#[derive(Deserialize, Debug)]
struct V2User {
    id: String,
    username: String,
}

pub(crate) fn parse_v2(text: &str) -> Result<TweetDetail, TwitterError> {
    let resp: V2Response = parse_json(text, "tweet detail")?;
    let id = parse_id(&resp.data.id)?;

    let author = resp
        .includes
        .users
        .iter()
        .find(|u| u.id == resp.data.author_id)
        .map(|u| u.username.clone())
        .ok_or_else(|| {
            TwitterError::malformed(format!("author of tweet {} not in includes", id))
        })?;

    let keys = resp
        .data
        .attachments
        .map(|a| a.media_keys)
        .unwrap_or_default();
    let media = keys
        .iter()
        .map(|key| {
            let mut matching = resp.includes.media.iter().filter(|m| &m.media_key == key);
            match (matching.next(), matching.next()) {
                (Some(m), None) => Ok(m.media.clone()),
                _ => Err(TwitterError::malformed(format!(
                    "media key {} of tweet {} does not match exactly one include",
                    key, id
                ))),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TweetDetail { id, author, media })
}

// GraphQL `TweetDetail`

#[derive(Deserialize, Debug)]
struct GraphQlResponse {
    data: GraphQlData,
}

#[derive(Deserialize, Debug)]
struct GraphQlData {
    threaded_conversation_with_injections_v2: Conversation,
}

#[derive(Deserialize, Debug)]
struct Conversation {
    #[serde(default)]
    instructions: Vec<Instruction>,
}

#[derive(Deserialize, Debug)]
struct Instruction {
    #[serde(default)]
    entries: Vec<Entry>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Entry {
    entry_id: String,
    content: EntryContent,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct EntryContent {
    item_content: Option<ItemContent>,
}

/// Cursor entries carry an `itemContent` without `tweet_results`
#[derive(Deserialize, Debug)]
struct ItemContent {
    tweet_results: Option<TweetResults>,
}

#[derive(Deserialize, Debug)]
struct TweetResults {
    result: TweetResult,
}

#[derive(Deserialize, Debug)]
struct TweetResult {
    core: Option<TweetCore>,
    legacy: Option<GraphQlLegacy>,
    /// Set instead of `core`/`legacy` on `TweetWithVisibilityResults`
    tweet: Option<Box<TweetResult>>,
}

#[derive(Deserialize, Debug)]
struct TweetCore {
    user_results: UserResults,
}

#[derive(Deserialize, Debug)]
struct UserResults {
    result: UserResult,
}

#[derive(Deserialize, Debug)]
struct UserResult {
    core: Option<ScreenName>,
    legacy: Option<ScreenName>,
}

#[derive(Deserialize, Debug)]
struct ScreenName {
    screen_name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GraphQlLegacy {
    id_str: String,
    extended_entities: Option<ExtendedEntities>,
}

pub(crate) fn parse_graphql(text: &str, id: i64) -> Result<TweetDetail, TwitterError> {
    let resp: GraphQlResponse = parse_json(text, "tweet detail")?;
    let entry_id = format!("tweet-{}", id);

    let focal = resp
        .data
        .threaded_conversation_with_injections_v2
        .instructions
        .into_iter()
        .flat_map(|i| i.entries)
        .find(|e| e.entry_id == entry_id)
        .ok_or_else(|| TwitterError::malformed(format!("no {} entry in detail", entry_id)))?;
    let results = focal
        .content
        .item_content
        .and_then(|c| c.tweet_results)
        .ok_or_else(|| TwitterError::malformed(format!("{} has no tweet results", entry_id)))?;

    let mut result = results.result;
    if let Some(inner) = result.tweet.take() {
        result = *inner;
    }

    let legacy = result
        .legacy
        .ok_or_else(|| TwitterError::malformed(format!("tweet {} has no legacy object", id)))?;
    let user = result
        .core
        .map(|c| c.user_results.result)
        .ok_or_else(|| TwitterError::malformed(format!("tweet {} has no author", id)))?;
    let author = user
        .core
        .and_then(|c| c.screen_name)
        .or_else(|| user.legacy.and_then(|l| l.screen_name))
        .ok_or_else(|| TwitterError::malformed(format!("tweet {} has no screen name", id)))?;

    let parsed = parse_id(&legacy.id_str)?;
    if parsed != id {
        return Err(TwitterError::malformed(format!(
            "{} holds tweet {}",
            entry_id, parsed
        )));
    }

    Ok(TweetDetail {
        id: parsed,
        author,
        media: legacy
            .extended_entities
            .map(|e| e.media)
            .unwrap_or_default(),
    })
}
