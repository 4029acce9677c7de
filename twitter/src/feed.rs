use std::fmt::Display;

use async_trait::async_trait;

use crate::error::TwitterError;
use crate::rate_limit::RateLimitWindow;
use crate::tweet::{FeedItem, TweetDetail};

/// A paginated list of tweets
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Feed {
    /// Custom collection, by numeric id without the `custom-` prefix
    Collection(String),
    /// Tweets liked by a user
    Likes(String),
    /// Tweets posted by a user
    Tweets(String),
}

impl Display for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collection(id) => write!(f, "collection {}", id),
            Self::Likes(user) => write!(f, "likes of {}", user),
            Self::Tweets(user) => write!(f, "tweets of {}", user),
        }
    }
}

/// Boundary of one fetched page. The next page is requested from
/// `min_position`, the older edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor {
    pub max_position: i64,
    pub min_position: i64,
    /// More pages remain
    pub truncated: bool,
}

#[derive(Clone, Debug)]
pub struct Page {
    pub items: Vec<FeedItem>,
    pub cursor: Cursor,
}

/// A response value along with the rate limit window reported with it
#[derive(Clone, Debug)]
pub struct Rated<T> {
    pub value: T,
    pub window: Option<RateLimitWindow>,
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch one page of `feed`, continuing from `cursor` if given
    async fn page(&self, feed: &Feed, cursor: Option<&Cursor>) -> Result<Page, TwitterError>;

    /// Fetch a single tweet with its media
    async fn detail(&self, id: i64) -> Result<Rated<TweetDetail>, TwitterError>;
}

#[async_trait]
pub trait FeedEditor: Send + Sync {
    async fn delete_tweet(&self, id: i64) -> Result<(), TwitterError>;
    async fn unlike(&self, id: i64) -> Result<(), TwitterError>;
}
