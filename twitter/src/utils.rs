use serde::{Deserialize, Deserializer};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::TwitterError;

/// `Wed Oct 10 20:19:24 +0000 2018`
static CREATED_AT: &[FormatItem<'static>] = format_description!(
    "[weekday repr:short] [month repr:short] [day] [hour repr:24]:[minute]:[second] [offset_hour sign:mandatory][offset_minute] [year]"
);

pub(crate) fn deserialize_created_at<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&s, CREATED_AT).map_err(serde::de::Error::custom)
}

/// Positions are sent as strings by some endpoints and numbers by others
pub(crate) fn deserialize_lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Int(i64),
        Str(String),
    }

    match Lenient::deserialize(deserializer)? {
        Lenient::Int(i) => Ok(i),
        Lenient::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

pub(crate) fn parse_id(s: &str) -> Result<i64, TwitterError> {
    s.parse()
        .map_err(|_| TwitterError::malformed(format!("invalid tweet id '{}'", s)))
}

pub(crate) fn parse_json<'a, T: Deserialize<'a>>(text: &'a str, context: &str) -> Result<T, TwitterError> {
    serde_json::from_str(text).map_err(|e| TwitterError::malformed(format!("{}: {}", context, e)))
}
