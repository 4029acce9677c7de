use serde::Deserialize;
use time::OffsetDateTime;

use crate::error::TwitterError;
use crate::media::{resolve_with, MediaDescriptor, MediaPolicy, RawMedia};
use crate::utils::{deserialize_created_at, parse_id};

/// One entry of a feed page
#[derive(Clone, Debug)]
pub struct FeedItem {
    pub id: i64,
    pub author: String,
    pub created_at: OffsetDateTime,
    pub text: String,
    /// Media block as the feed returned it, not resolved
    pub media: Vec<RawMedia>,
}

impl FeedItem {
    pub fn permalink(&self) -> String {
        permalink(&self.author, self.id)
    }
}

/// A tweet as returned by the detail endpoint of any backend
#[derive(Clone, Debug)]
pub struct TweetDetail {
    pub id: i64,
    pub author: String,
    pub media: Vec<RawMedia>,
}

/// A tweet whose media have been resolved to download urls
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TweetMedia {
    pub id: i64,
    pub author: String,
    pub media: Vec<MediaDescriptor>,
}

impl TweetMedia {
    pub fn resolve(detail: TweetDetail, policy: MediaPolicy) -> Result<Self, TwitterError> {
        let media = resolve_with(policy, detail.id, &detail.media)?;
        Ok(Self {
            id: detail.id,
            author: detail.author,
            media,
        })
    }

    pub fn permalink(&self) -> String {
        permalink(&self.author, self.id)
    }
}

fn permalink(author: &str, id: i64) -> String {
    format!("https://twitter.com/{}/status/{}", author, id)
}

/// Tweet object of the v1.1 REST endpoints
#[derive(Deserialize, Debug)]
pub(crate) struct LegacyTweet {
    #[serde(deserialize_with = "deserialize_created_at")]
    pub created_at: OffsetDateTime,
    pub id_str: String,
    #[serde(default)]
    pub full_text: String,
    pub user: LegacyUser,
    pub extended_entities: Option<ExtendedEntities>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct LegacyUser {
    pub screen_name: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ExtendedEntities {
    #[serde(default)]
    pub media: Vec<RawMedia>,
}

impl LegacyTweet {
    pub(crate) fn into_feed_item(self) -> Result<FeedItem, TwitterError> {
        Ok(FeedItem {
            id: parse_id(&self.id_str)?,
            author: self.user.screen_name,
            created_at: self.created_at,
            text: self.full_text,
            media: self.extended_entities.map(|e| e.media).unwrap_or_default(),
        })
    }

    pub(crate) fn into_detail(self) -> Result<TweetDetail, TwitterError> {
        Ok(TweetDetail {
            id: parse_id(&self.id_str)?,
            author: self.user.screen_name,
            media: self.extended_entities.map(|e| e.media).unwrap_or_default(),
        })
    }
}
