use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode};

use crate::endpoint::{self, collection, detail, timeline};
use crate::error::TwitterError;
use crate::feed::{Cursor, Feed, FeedEditor, FeedSource, Page, Rated};
use crate::rate_limit::{reset_from_headers, RateLimitWindow};
use crate::tweet::TweetDetail;

/// Which family of endpoints to talk to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Official API with an app bearer token
    Api,
    /// The web client's v1.1 endpoints, authenticated by session headers
    Web,
    /// Like `Web`, but tweet details come from the GraphQL `TweetDetail` operation
    GraphQl { query_id: String },
}

impl Backend {
    fn rest_base(&self) -> &'static str {
        match self {
            Self::Api => endpoint::API_BASE,
            Self::Web | Self::GraphQl { .. } => endpoint::WEB_BASE,
        }
    }
}

/// Authentication sent with every request
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub bearer: Option<String>,
    /// Extra headers such as `cookie` and `x-csrf-token`
    pub headers: HashMap<String, String>,
}

pub struct TwitterClient<'a> {
    reqwest_client: &'a Client,
    backend: Backend,
    headers: HeaderMap,
}

impl<'a> TwitterClient<'a> {
    pub fn new(
        reqwest_client: &'a Client,
        backend: Backend,
        credentials: &Credentials,
    ) -> Result<Self, TwitterError> {
        let mut headers = HeaderMap::new();
        if let Some(bearer) = &credentials.bearer {
            let value = HeaderValue::from_str(&format!("Bearer {}", bearer)).map_err(|_| {
                TwitterError::InvalidHeader {
                    name: AUTHORIZATION.to_string(),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        for (name, value) in &credentials.headers {
            let invalid = || TwitterError::InvalidHeader { name: name.clone() };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            headers.insert(header_name, header_value);
        }

        Ok(Self {
            reqwest_client,
            backend,
            headers,
        })
    }

    fn page_request(&self, feed: &Feed, cursor: Option<&Cursor>) -> RequestBuilder {
        let base = self.backend.rest_base();
        let request = match feed {
            Feed::Collection(id) => {
                let request = self
                    .reqwest_client
                    .get(format!("{}/collections/entries.json", base))
                    .query(&[
                        ("tweet_mode", "extended".to_string()),
                        ("count", collection::PAGE_SIZE.to_string()),
                        ("id", format!("custom-{}", id)),
                    ]);
                match cursor {
                    Some(c) => request.query(&[("max_position", c.min_position)]),
                    None => request,
                }
            }
            Feed::Likes(user) | Feed::Tweets(user) => {
                let path = match feed {
                    Feed::Likes(_) => "favorites/list.json",
                    _ => "statuses/user_timeline.json",
                };
                let request = self
                    .reqwest_client
                    .get(format!("{}/{}", base, path))
                    .query(&[
                        ("screen_name", user.clone()),
                        ("count", timeline::PAGE_SIZE.to_string()),
                        ("tweet_mode", "extended".to_string()),
                        ("include_rts", "true".to_string()),
                    ]);
                match cursor {
                    Some(c) => request.query(&[("max_id", c.min_position)]),
                    None => request,
                }
            }
        };
        request.headers(self.headers.clone())
    }

    fn detail_request(&self, id: i64) -> RequestBuilder {
        let request = match &self.backend {
            Backend::Api => self
                .reqwest_client
                .get(format!("{}/{}", endpoint::V2_TWEETS, id))
                .query(&[
                    ("expansions", "attachments.media_keys,author_id"),
                    ("media.fields", "type,url,preview_image_url,variants"),
                    ("user.fields", "username"),
                ]),
            Backend::Web => self
                .reqwest_client
                .get(format!("{}/statuses/show.json", endpoint::WEB_BASE))
                .query(&[
                    ("id", id.to_string()),
                    ("tweet_mode", "extended".to_string()),
                    ("include_entities", "true".to_string()),
                ]),
            Backend::GraphQl { query_id } => self
                .reqwest_client
                .get(format!(
                    "{}/{}/TweetDetail",
                    endpoint::GRAPHQL_BASE,
                    query_id
                ))
                .query(&[
                    ("variables", endpoint::graphql_variables(id)),
                    ("features", endpoint::GRAPHQL_FEATURES.clone()),
                ]),
        };
        request.headers(self.headers.clone())
    }

    /// Send a request, turning throttling and non-success statuses into errors
    async fn send(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<(String, Option<RateLimitWindow>), TwitterError> {
        let resp = request.send().await?;
        let window = check_status(resp.status(), resp.headers(), context)?;
        let text = resp.text().await?;
        Ok((text, window))
    }
}

/// Map a response status to an error, or to the rate limit window of a success
fn check_status(
    status: StatusCode,
    headers: &HeaderMap,
    context: &str,
) -> Result<Option<RateLimitWindow>, TwitterError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let reset_at = reset_from_headers(headers).ok_or_else(|| {
            TwitterError::malformed(format!("{}: throttled without a reset time", context))
        })?;
        return Err(TwitterError::RateLimited { reset_at });
    }
    if !status.is_success() {
        return Err(TwitterError::Endpoint {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            context: context.to_string(),
        });
    }
    Ok(RateLimitWindow::from_headers(headers))
}

#[async_trait]
impl FeedSource for TwitterClient<'_> {
    async fn page(&self, feed: &Feed, cursor: Option<&Cursor>) -> Result<Page, TwitterError> {
        let context = feed.to_string();
        tracing::debug!("fetching {} from {:?}", context, cursor);
        let (text, _) = self.send(self.page_request(feed, cursor), &context).await?;
        match feed {
            Feed::Collection(_) => collection::parse_entries(&text),
            Feed::Likes(_) | Feed::Tweets(_) => timeline::parse_timeline(&text, &context),
        }
    }

    async fn detail(&self, id: i64) -> Result<Rated<TweetDetail>, TwitterError> {
        let context = format!("detail of tweet {}", id);
        let (text, window) = self.send(self.detail_request(id), &context).await?;
        let value = match &self.backend {
            Backend::Api => detail::parse_v2(&text)?,
            Backend::Web => detail::parse_status(&text)?,
            Backend::GraphQl { .. } => detail::parse_graphql(&text, id)?,
        };
        Ok(Rated { value, window })
    }
}

#[async_trait]
impl FeedEditor for TwitterClient<'_> {
    async fn delete_tweet(&self, id: i64) -> Result<(), TwitterError> {
        let request = self
            .reqwest_client
            .post(format!(
                "{}/statuses/destroy/{}.json",
                self.backend.rest_base(),
                id
            ))
            .headers(self.headers.clone());
        self.send(request, &format!("delete of tweet {}", id))
            .await
            .map(|_| ())
    }

    async fn unlike(&self, id: i64) -> Result<(), TwitterError> {
        let request = self
            .reqwest_client
            .post(format!("{}/favorites/destroy.json", self.backend.rest_base()))
            .form(&[("id", id.to_string())])
            .headers(self.headers.clone());
        self.send(request, &format!("unlike of tweet {}", id))
            .await
            .map(|_| ())
    }
}
