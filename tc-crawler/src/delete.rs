use anyhow::{Context, Result};
use futures::TryStreamExt;
use regex::{Regex, RegexBuilder};
use tc_crawler_common::run_all;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};
use twitter::{DedupFilter, Feed, FeedEditor, FeedItem, FeedSource, Pagination, Reporter};

/// Which of a user's lists to clean up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Tweets,
    Likes,
}

/// Selects tweets by creation date and text. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct DeleteFilter {
    /// First day included
    pub since: Option<Date>,
    /// Last day included
    pub until: Option<Date>,
    pub keyword: Option<Regex>,
}

impl DeleteFilter {
    pub fn matches(&self, item: &FeedItem) -> bool {
        let created_at = item.created_at;
        if let Some(since) = self.since {
            if created_at < since.midnight().assume_utc() {
                return false;
            }
        }
        if let Some(until) = self.until {
            let end = until.midnight().assume_utc() + Duration::days(1);
            if created_at >= end {
                return false;
            }
        }
        if let Some(keyword) = &self.keyword {
            if !keyword.is_match(&item.text) {
                return false;
            }
        }
        true
    }
}

/// `YYYY-MM-DD`
pub fn parse_date(s: &str) -> Result<Date> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_keyword(s: &str) -> Result<Regex> {
    RegexBuilder::new(s)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid keyword pattern '{}'", s))
}

/// Delete (or unlike) every tweet of `user` that passes `filter`.
///
/// With `dry_run` the matching tweets are only printed. Returns the number of
/// matching tweets.
pub async fn delete<C>(
    client: &C,
    target: Target,
    user: &str,
    filter: &DeleteFilter,
    dry_run: bool,
    max_connections: Option<usize>,
    reporter: &dyn Reporter,
) -> Result<usize>
where
    C: FeedSource + FeedEditor + ?Sized,
{
    let feed = match target {
        Target::Tweets => Feed::Tweets(user.to_string()),
        Target::Likes => Feed::Likes(user.to_string()),
    };

    reporter.status(&format!("Fetching {}...", feed));
    let dedup = DedupFilter::default();
    let matching: Vec<FeedItem> = Pagination::new(client, feed.clone(), &dedup)
        .items()
        .try_filter(|item| futures::future::ready(filter.matches(item)))
        .try_collect()
        .await
        .with_context(|| format!("failed to list {}", feed))?;
    tracing::info!("{}: {} matching tweets", feed, matching.len());

    if dry_run {
        for item in &matching {
            println!("{} {} {}", format_time(item.created_at), item.permalink(), item.text);
        }
        return Ok(matching.len());
    }

    run_all(
        matching.iter().map(|item| async move {
            let result = match target {
                Target::Tweets => client.delete_tweet(item.id).await,
                Target::Likes => client.unlike(item.id).await,
            };
            result.with_context(|| format!("failed to remove {}", item.permalink()))?;
            tracing::debug!("removed {}", item.permalink());
            Ok::<_, anyhow::Error>(())
        }),
        max_connections,
    )
    .await?;

    Ok(matching.len())
}

fn format_time(t: OffsetDateTime) -> String {
    t.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_default()
}
