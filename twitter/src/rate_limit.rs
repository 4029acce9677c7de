use std::collections::VecDeque;
use std::future::Future;
use std::str::FromStr;

use reqwest::header::HeaderMap;
use tc_crawler_common::run_all;
use time::OffsetDateTime;
use tokio::time::{sleep, Duration};

use crate::error::TwitterError;
use crate::feed::Rated;
use crate::progress::Reporter;

static REMAINING_HEADER: &str = "x-rate-limit-remaining";
static RESET_HEADER: &str = "x-rate-limit-reset";

/// Added to every wait so the window has surely rolled over
const SAFETY_MARGIN_SECS: i64 = 5;

/// Least wait after a 429, even when the reported reset has passed
const MIN_THROTTLE_WAIT_SECS: i64 = 1;

/// Rate limit state reported with a response
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitWindow {
    pub remaining: i32,
    /// Unix time in seconds
    pub reset_at: i64,
}

impl RateLimitWindow {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        Some(Self {
            remaining: header_value(headers, REMAINING_HEADER)?,
            reset_at: reset_from_headers(headers)?,
        })
    }
}

pub(crate) fn reset_from_headers(headers: &HeaderMap) -> Option<i64> {
    header_value(headers, RESET_HEADER)
}

fn header_value<T: FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

pub trait Clock: Send + Sync {
    /// Current unix time in seconds
    fn now(&self) -> i64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }
}

enum Outcome<T> {
    Done(T),
    Throttled { reset_at: i64 },
}

/// Spreads a batch of rate limited calls over as many windows as needed.
///
/// One probe call learns the window, then up to `remaining` calls run
/// concurrently. If work is left, the whole batch waits for the reset plus a
/// safety margin and starts over with a new probe.
pub struct RateLimitGovernor<C = SystemClock> {
    clock: C,
    max_concurrent: Option<usize>,
}

impl RateLimitGovernor<SystemClock> {
    pub fn new(max_concurrent: Option<usize>) -> Self {
        Self::with_clock(SystemClock, max_concurrent)
    }
}

impl<C: Clock> RateLimitGovernor<C> {
    pub fn with_clock(clock: C, max_concurrent: Option<usize>) -> Self {
        Self {
            clock,
            max_concurrent,
        }
    }

    /// Seconds to wait before calls are allowed again
    pub fn wait_seconds(&self, reset_at: i64) -> i64 {
        (reset_at - self.clock.now() + SAFETY_MARGIN_SECS).max(0)
    }

    /// Call `call` once for every id, returning the values in the order of `ids`
    pub async fn run<T, F, Fut>(
        &self,
        ids: &[i64],
        reporter: &dyn Reporter,
        call: F,
    ) -> Result<Vec<T>, TwitterError>
    where
        F: Fn(i64) -> Fut,
        Fut: Future<Output = Result<Rated<T>, TwitterError>>,
    {
        let mut results = std::iter::repeat_with(|| None)
            .take(ids.len())
            .collect::<Vec<Option<T>>>();
        let mut pending = (0..ids.len()).collect::<VecDeque<_>>();
        let mut done = 0;

        while let Some(probe) = pending.pop_front() {
            let window = match call(ids[probe]).await {
                Ok(rated) => {
                    results[probe] = Some(rated.value);
                    done += 1;
                    rated.window.ok_or_else(|| {
                        TwitterError::malformed(format!(
                            "rate limit headers missing for tweet {}",
                            ids[probe]
                        ))
                    })?
                }
                Err(TwitterError::RateLimited { reset_at }) => {
                    pending.push_front(probe);
                    self.wait_until(reset_at, true, reporter).await;
                    continue;
                }
                Err(e) => return Err(e),
            };
            tracing::debug!(
                "rate limit window: {} remaining, resets at {}",
                window.remaining,
                window.reset_at
            );

            let budget = usize::try_from(window.remaining)
                .unwrap_or(0)
                .min(pending.len());
            let batch = pending.drain(..budget).collect::<Vec<_>>();
            let outcomes = run_all(
                batch.iter().map(|&pos| {
                    let fut = call(ids[pos]);
                    async move {
                        match fut.await {
                            Ok(rated) => Ok((pos, Outcome::Done(rated.value))),
                            Err(TwitterError::RateLimited { reset_at }) => {
                                Ok((pos, Outcome::Throttled { reset_at }))
                            }
                            Err(e) => Err(e),
                        }
                    }
                }),
                self.max_concurrent,
            )
            .await?;

            let mut reset_at = window.reset_at;
            let mut throttled = vec![];
            for (pos, outcome) in outcomes {
                match outcome {
                    Outcome::Done(value) => {
                        results[pos] = Some(value);
                        done += 1;
                    }
                    Outcome::Throttled { reset_at: r } => {
                        reset_at = reset_at.max(r);
                        throttled.push(pos);
                    }
                }
            }
            let was_throttled = !throttled.is_empty();
            for pos in throttled.into_iter().rev() {
                pending.push_front(pos);
            }
            reporter.status(&format!("Fetched {}/{} tweets...", done, ids.len()));

            if !pending.is_empty() {
                self.wait_until(reset_at, was_throttled, reporter).await;
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    async fn wait_until(&self, reset_at: i64, throttled: bool, reporter: &dyn Reporter) {
        let mut remaining = self.wait_seconds(reset_at);
        if throttled {
            remaining = remaining.max(MIN_THROTTLE_WAIT_SECS);
        }
        if remaining == 0 {
            return;
        }

        tracing::info!("rate limit reached, waiting {}s", remaining);
        while remaining > 0 {
            reporter.status(&format!("Rate limit reached, resuming in {}s...", remaining));
            sleep(Duration::from_secs(1)).await;
            remaining -= 1;
        }
    }
}
