pub mod client;
pub mod dedup;
mod endpoint;
pub mod error;
pub mod feed;
pub mod media;
pub mod pagination;
pub mod progress;
pub mod rate_limit;
pub mod tweet;
mod utils;

pub use client::{Backend, Credentials, TwitterClient};
pub use dedup::DedupFilter;
pub use error::TwitterError;
pub use feed::{Cursor, Feed, FeedEditor, FeedSource, Page, Rated};
pub use media::{MediaDescriptor, MediaKind, MediaPolicy, OnError};
pub use pagination::Pagination;
pub use progress::{Reporter, Silent};
pub use rate_limit::{RateLimitGovernor, RateLimitWindow};
pub use tweet::{FeedItem, TweetDetail, TweetMedia};
