use std::path::Path;

use serde::Deserialize;

use crate::error::TwitterError;

/// Media entry exactly as an endpoint returned it.
///
/// The legacy v1.1 and GraphQL shapes carry `media_url_https` and
/// `video_info.variants`; the v2 shape carries `url`, `preview_image_url` and
/// top level `variants`. Which fields are present decides how the entry is
/// resolved.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct RawMedia {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub media_url_https: Option<String>,
    pub url: Option<String>,
    pub preview_image_url: Option<String>,
    pub video_info: Option<VideoInfo>,
    pub variants: Option<Vec<RawVariant>>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct VideoInfo {
    #[serde(default)]
    pub variants: Vec<RawVariant>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct RawVariant {
    #[serde(alias = "bit_rate")]
    pub bitrate: Option<i64>,
    pub url: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    AnimatedGif,
    Video,
}

impl MediaKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "photo" => Some(Self::Photo),
            "animated_gif" => Some(Self::AnimatedGif),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    pub url: String,
    /// -1 when the endpoint did not report a bitrate
    pub bitrate: i64,
}

/// A single download-ready media file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaDescriptor {
    pub kind: MediaKind,
    pub variants: Vec<Variant>,
    pub url: String,
}

/// What to do when one media entry cannot be resolved
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    #[default]
    Abort,
    Skip,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MediaPolicy {
    pub unknown_kind: OnError,
    pub unresolved: OnError,
}

const NO_BITRATE: i64 = -1;

/// Resolve every entry of a media block, keeping source order
pub fn resolve(item_id: i64, media: &[RawMedia]) -> Vec<Result<MediaDescriptor, TwitterError>> {
    media.iter().map(|m| resolve_one(item_id, m)).collect()
}

/// Resolve a media block, skipping or failing on bad entries per `policy`
pub fn resolve_with(
    policy: MediaPolicy,
    item_id: i64,
    media: &[RawMedia],
) -> Result<Vec<MediaDescriptor>, TwitterError> {
    let mut descriptors = Vec::with_capacity(media.len());
    for result in resolve(item_id, media) {
        match result {
            Ok(d) => descriptors.push(d),
            Err(e @ TwitterError::UnknownMediaKind { .. })
                if policy.unknown_kind == OnError::Skip =>
            {
                tracing::warn!("skipping media: {}", e);
            }
            Err(e @ TwitterError::UnresolvedMedia { .. }) if policy.unresolved == OnError::Skip => {
                tracing::warn!("skipping media: {}", e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(descriptors)
}

fn resolve_one(item_id: i64, media: &RawMedia) -> Result<MediaDescriptor, TwitterError> {
    let kind_str = media.kind.as_deref().ok_or_else(|| {
        TwitterError::malformed(format!("media type missing in tweet {}", item_id))
    })?;
    let kind = MediaKind::parse(kind_str).ok_or_else(|| TwitterError::UnknownMediaKind {
        kind: kind_str.to_string(),
        item_id,
    })?;

    if kind == MediaKind::Photo {
        let url = media
            .media_url_https
            .as_deref()
            .or(media.url.as_deref())
            .ok_or_else(|| {
                TwitterError::malformed(format!("photo url missing in tweet {}", item_id))
            })?;
        return Ok(MediaDescriptor {
            kind,
            variants: vec![],
            url: photo_url(url),
        });
    }

    let raw_variants = match (&media.video_info, &media.variants) {
        (Some(info), _) => Some(&info.variants),
        (None, Some(v)) => Some(v),
        (None, None) => None,
    };
    let variants = raw_variants
        .map(|v| {
            v.iter()
                .map(|v| parse_variant(item_id, v))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();

    let url = match best_variant(&variants) {
        Some(v) => v.url.clone(),
        None => match (&media.preview_image_url, raw_variants) {
            (Some(preview), None) if kind == MediaKind::AnimatedGif => gif_from_thumbnail(preview),
            (_, None) => {
                return Err(TwitterError::malformed(format!(
                    "video variants missing in tweet {}",
                    item_id
                )))
            }
            (_, Some(_)) => return Err(TwitterError::UnresolvedMedia { item_id }),
        },
    };

    Ok(MediaDescriptor {
        kind,
        variants,
        url,
    })
}

fn parse_variant(item_id: i64, variant: &RawVariant) -> Result<Variant, TwitterError> {
    let url = variant.url.clone().ok_or_else(|| {
        TwitterError::malformed(format!("variant url missing in tweet {}", item_id))
    })?;
    Ok(Variant {
        url,
        bitrate: variant.bitrate.unwrap_or(NO_BITRATE),
    })
}

/// Strictly highest bitrate wins, so ties keep the first one seen
fn best_variant(variants: &[Variant]) -> Option<&Variant> {
    let mut best = None;
    let mut highest = NO_BITRATE;
    for v in variants {
        if v.bitrate > highest {
            highest = v.bitrate;
            best = Some(v);
        }
    }
    best
}

fn photo_url(url: &str) -> String {
    let is_jpg = Path::new(url)
        .extension()
        .map(|e| e.eq_ignore_ascii_case("jpg"))
        .unwrap_or(false);
    if is_jpg {
        format!("{}:orig", url)
    } else {
        url.to_string()
    }
}

/// Older endpoints only expose the thumbnail of a gif, the mp4 lives next to it
fn gif_from_thumbnail(preview: &str) -> String {
    let url = preview.replace("tweet_video_thumb", "tweet_video");
    let name_start = url.rfind('/').map(|i| i + 1).unwrap_or(0);
    match url[name_start..].rfind('.') {
        Some(dot) => format!("{}.mp4", &url[..name_start + dot]),
        None => format!("{}.mp4", url),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn photo(url: &str) -> RawMedia {
        RawMedia {
            kind: Some("photo".to_string()),
            media_url_https: Some(url.to_string()),
            ..Default::default()
        }
    }

    fn video(variants: &[(i64, &str)]) -> RawMedia {
        RawMedia {
            kind: Some("video".to_string()),
            video_info: Some(VideoInfo {
                variants: variants
                    .iter()
                    .map(|(bitrate, url)| RawVariant {
                        bitrate: Some(*bitrate),
                        url: Some(url.to_string()),
                    })
                    .collect(),
            }),
            ..Default::default()
        }
    }

    fn resolve_ok(media: RawMedia) -> MediaDescriptor {
        resolve(1, &[media]).pop().unwrap().unwrap()
    }

    #[test]
    fn jpg_requests_original_size() {
        let d = resolve_ok(photo("https://pbs.twimg.com/media/abc.jpg"));
        assert_eq!(MediaKind::Photo, d.kind);
        assert_eq!("https://pbs.twimg.com/media/abc.jpg:orig", d.url);
    }

    #[test]
    fn jpg_extension_is_case_insensitive() {
        let d = resolve_ok(photo("https://pbs.twimg.com/media/abc.JPG"));
        assert_eq!("https://pbs.twimg.com/media/abc.JPG:orig", d.url);
    }

    #[test]
    fn png_is_unchanged() {
        let d = resolve_ok(photo("https://pbs.twimg.com/media/abc.png"));
        assert_eq!("https://pbs.twimg.com/media/abc.png", d.url);
    }

    #[test]
    fn first_highest_bitrate_wins() {
        let d = resolve_ok(video(&[(256000, "A"), (832000, "B"), (832000, "C")]));
        assert_eq!(MediaKind::Video, d.kind);
        assert_eq!("B", d.url);
        assert_eq!(3, d.variants.len());
    }

    #[test]
    fn variants_without_bitrate_are_ignored() {
        let media: RawMedia = serde_json::from_str(
            r#"{
                "type": "video",
                "media_url_https": "https://pbs.twimg.com/ext_tw_video_thumb/1/pu/img/x.jpg",
                "video_info": {"variants": [
                    {"content_type": "application/x-mpegURL", "url": "https://video.twimg.com/x.m3u8"},
                    {"bitrate": 0, "content_type": "video/mp4", "url": "https://video.twimg.com/x.mp4"}
                ]}
            }"#,
        )
        .unwrap();
        assert_eq!("https://video.twimg.com/x.mp4", resolve_ok(media).url);
    }

    #[test]
    fn only_bitrate_less_variants_is_unresolved() {
        let media: RawMedia = serde_json::from_str(
            r#"{"type": "video", "video_info": {"variants": [{"url": "https://video.twimg.com/x.m3u8"}]}}"#,
        )
        .unwrap();
        let err = resolve(7, &[media]).pop().unwrap().unwrap_err();
        assert!(matches!(err, TwitterError::UnresolvedMedia { item_id: 7 }));
    }

    #[test]
    fn v2_gif_uses_variants() {
        let media: RawMedia = serde_json::from_str(
            r#"{
                "media_key": "16_1",
                "type": "animated_gif",
                "preview_image_url": "https://pbs.twimg.com/tweet_video_thumb/Abc.jpg",
                "variants": [{"bit_rate": 0, "content_type": "video/mp4", "url": "https://video.twimg.com/tweet_video/Abc.mp4"}]
            }"#,
        )
        .unwrap();
        let d = resolve_ok(media);
        assert_eq!(MediaKind::AnimatedGif, d.kind);
        assert_eq!("https://video.twimg.com/tweet_video/Abc.mp4", d.url);
    }

    #[test]
    fn gif_from_thumbnail_only() {
        let media = RawMedia {
            kind: Some("animated_gif".to_string()),
            preview_image_url: Some("https://pbs.twimg.com/tweet_video_thumb/Abc.jpg".to_string()),
            ..Default::default()
        };
        let d = resolve_ok(media);
        assert_eq!("https://pbs.twimg.com/tweet_video/Abc.mp4", d.url);
        assert!(d.variants.is_empty());
    }

    #[test]
    fn video_without_variants_is_malformed() {
        let media = RawMedia {
            kind: Some("video".to_string()),
            preview_image_url: Some("https://pbs.twimg.com/x.jpg".to_string()),
            ..Default::default()
        };
        let err = resolve(3, &[media]).pop().unwrap().unwrap_err();
        assert!(matches!(err, TwitterError::MalformedResponse { .. }));
    }

    #[test]
    fn unknown_kind_is_classified() {
        let media = RawMedia {
            kind: Some("hologram".to_string()),
            ..Default::default()
        };
        let err = resolve(9, &[media]).pop().unwrap().unwrap_err();
        match err {
            TwitterError::UnknownMediaKind { kind, item_id } => {
                assert_eq!("hologram", kind);
                assert_eq!(9, item_id);
            }
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn missing_kind_is_malformed() {
        let err = resolve(9, &[RawMedia::default()]).pop().unwrap().unwrap_err();
        assert!(matches!(err, TwitterError::MalformedResponse { .. }));
    }

    #[test]
    fn keeps_source_order() {
        let media = [
            photo("https://pbs.twimg.com/media/1.png"),
            video(&[(1, "https://video.twimg.com/2.mp4")]),
            photo("https://pbs.twimg.com/media/3.jpg"),
        ];
        let urls = resolve_with(MediaPolicy::default(), 1, &media)
            .unwrap()
            .into_iter()
            .map(|d| d.url)
            .collect::<Vec<_>>();
        assert_eq!(
            vec![
                "https://pbs.twimg.com/media/1.png",
                "https://video.twimg.com/2.mp4",
                "https://pbs.twimg.com/media/3.jpg:orig",
            ],
            urls
        );
    }

    #[test]
    fn policy_skip_and_abort() {
        let media = [
            RawMedia {
                kind: Some("hologram".to_string()),
                ..Default::default()
            },
            photo("https://pbs.twimg.com/media/1.png"),
        ];

        assert!(resolve_with(MediaPolicy::default(), 1, &media).is_err());

        let skip = MediaPolicy {
            unknown_kind: OnError::Skip,
            unresolved: OnError::Abort,
        };
        let resolved = resolve_with(skip, 1, &media).unwrap();
        assert_eq!(1, resolved.len());
    }

    #[test]
    fn skip_policy_still_fails_malformed() {
        let skip = MediaPolicy {
            unknown_kind: OnError::Skip,
            unresolved: OnError::Skip,
        };
        assert!(resolve_with(skip, 1, &[RawMedia::default()]).is_err());
    }
}
