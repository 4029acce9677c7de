//! Response models and parsers, one module per endpoint family

pub(crate) mod collection;
pub(crate) mod detail;
pub(crate) mod timeline;

use once_cell::sync::Lazy;
use serde_json::json;

/// v1.1 REST base for the official API
pub(crate) static API_BASE: &str = "https://api.twitter.com/1.1";
/// v1.1 REST base used by the web client
pub(crate) static WEB_BASE: &str = "https://twitter.com/i/api/1.1";
pub(crate) static V2_TWEETS: &str = "https://api.twitter.com/2/tweets";
pub(crate) static GRAPHQL_BASE: &str = "https://twitter.com/i/api/graphql";

/// Feature switches the GraphQL `TweetDetail` operation requires
pub(crate) static GRAPHQL_FEATURES: Lazy<String> = Lazy::new(|| {
    json!({
        "responsive_web_graphql_exclude_directive_enabled": true,
        "verified_phone_label_enabled": false,
        "responsive_web_graphql_timeline_navigation_enabled": true,
        "responsive_web_graphql_skip_user_profile_image_extensions_enabled": false,
        "tweetypie_unmention_optimization_enabled": true,
        "responsive_web_edit_tweet_api_enabled": true,
        "graphql_is_translatable_rweb_tweet_is_translatable_enabled": true,
        "view_counts_everywhere_api_enabled": true,
        "longform_notetweets_consumption_enabled": true,
        "tweet_awards_web_tipping_enabled": false,
        "freedom_of_speech_not_reach_fetch_enabled": true,
        "standardized_nudges_misinfo": true,
        "longform_notetweets_rich_text_read_enabled": true,
        "longform_notetweets_inline_media_enabled": true,
        "responsive_web_enhance_cards_enabled": false,
    })
    .to_string()
});

pub(crate) fn graphql_variables(id: i64) -> String {
    json!({
        "focalTweetId": id.to_string(),
        "with_rux_injections": false,
        "includePromotedContent": false,
        "withCommunity": true,
        "withQuickPromoteEligibilityTweetFields": false,
        "withBirdwatchNotes": false,
        "withVoice": true,
        "withV2Timeline": true,
    })
    .to_string()
}
