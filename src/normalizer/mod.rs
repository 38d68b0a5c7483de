//! Conversion of raw platform payloads into the canonical item shape.
//!
//! Each source platform gets a [`Normalizer`] implementation; the shared
//! extraction logic (media, hashtags, engagement, authorship) lives in
//! [`helpers`] so implementations compose it instead of inheriting it.

mod dates;
mod generic;
mod item;
mod media;
mod sanitizer;

pub use dates::{DateConverter, TimezoneConfig};
pub use generic::GenericNormalizer;
pub use item::NormalizedItem;
pub use media::{MediaReference, MediaType};
pub use sanitizer::{HtmlSanitizer, PassthroughFilter, SafeHtmlFilter};

use serde_json::{Map, Value};

use crate::app::Result;

/// Converts one platform's raw payloads into [`NormalizedItem`]s.
pub trait Normalizer: Send + Sync {
    /// ID of the adapter whose payloads this normalizer understands.
    fn adapter_id(&self) -> &str;

    /// Convert a raw item into the canonical shape.
    ///
    /// Missing optional signals must not fail; only the identity fields
    /// (source id, content, publish date) are mandatory.
    fn normalize(&self, raw_item: &Map<String, Value>) -> Result<NormalizedItem>;

    fn supports(&self, adapter_id: &str) -> bool {
        self.adapter_id() == adapter_id
    }
}

/// Shared extraction helpers available to every normalizer.
pub mod helpers {
    use super::*;

    /// URL substrings of known media-hosting services. A match counts as
    /// media even without a recognizable file extension.
    const MEDIA_HOSTS: [&str; 8] = [
        "pbs.twimg.com",
        "video.twimg.com",
        "instagram.com/p/",
        "cdninstagram.com",
        "imgur.com",
        "i.imgur.com",
        "giphy.com",
        "media.tumblr.com",
    ];

    /// Candidate raw keys per normalized engagement metric, in priority
    /// order. The first numeric candidate wins.
    const ENGAGEMENT_KEYS: [(&str, &[&str]); 5] = [
        ("likes", &["likes", "like_count", "favorite_count", "favourites_count"]),
        ("shares", &["shares", "share_count", "retweet_count", "reblog_count"]),
        ("comments", &["comments", "comment_count", "reply_count"]),
        ("views", &["views", "view_count", "impression_count"]),
        ("bookmarks", &["bookmarks", "bookmark_count", "saves", "save_count"]),
    ];

    const SOURCE_URL_KEYS: [&str; 5] = ["url", "source_url", "link", "permalink", "original_url"];

    /// Whether a URL likely points at a media file: extension in the
    /// image/video/audio set, or a known media host.
    pub fn is_media_url(url: &str) -> bool {
        if let Ok(parsed) = url::Url::parse(url) {
            let path = parsed.path();
            if let Some((_, extension)) = path.rsplit('/').next().and_then(|s| s.rsplit_once('.')) {
                if MediaReference::is_media_extension(&extension.to_ascii_lowercase()) {
                    return true;
                }
            }
        }

        MEDIA_HOSTS.iter().any(|host| url.contains(host))
    }

    /// Scan HTML for media-like URLs and build one reference per match.
    pub fn extract_media_from_html(
        sanitizer: &HtmlSanitizer,
        html: &str,
    ) -> Vec<MediaReference> {
        sanitizer
            .extract_urls(html)
            .iter()
            .filter(|url| is_media_url(url))
            .map(|url| MediaReference::from_url(url))
            .collect()
    }

    /// Build references from URLs the caller already knows are media.
    pub fn extract_media_from_urls(urls: &[String]) -> Vec<MediaReference> {
        urls.iter()
            .filter(|url| !url.is_empty())
            .map(|url| MediaReference::from_url(url))
            .collect()
    }

    /// `#hashtags` in first-occurrence order, de-duplicated, without the `#`.
    pub fn extract_hashtags(text: &str) -> Vec<String> {
        extract_tokens(text, r"#(\w+)")
    }

    /// `@mentions` in first-occurrence order, de-duplicated, without the `@`.
    pub fn extract_mentions(text: &str) -> Vec<String> {
        extract_tokens(text, r"@(\w+)")
    }

    fn extract_tokens(text: &str, pattern: &str) -> Vec<String> {
        let regex = regex::Regex::new(pattern).expect("token pattern is valid");
        let mut tokens = Vec::new();
        for caps in regex.captures_iter(text) {
            let token = caps[1].to_string();
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        tokens
    }

    /// Default content-type heuristic; platform normalizers refine it.
    pub fn determine_content_type(raw_item: &Map<String, Value>) -> crate::manifest::ContentType {
        use crate::manifest::ContentType;

        let present = |key: &str| raw_item.get(key).is_some_and(|v| !v.is_null());

        if present("parent_id") || present("in_reply_to") {
            return ContentType::Reply;
        }
        if present("retweeted_status") || present("is_repost") {
            return ContentType::Repost;
        }
        if truthy(raw_item.get("is_thread")) {
            return ContentType::Thread;
        }
        ContentType::Post
    }

    fn truthy(value: Option<&Value>) -> bool {
        match value {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => !s.is_empty() && s != "0" && s != "false",
            _ => false,
        }
    }

    /// Harvest engagement counters under their normalized names.
    ///
    /// Non-numeric candidates are skipped, not coerced; negative values are
    /// dropped to keep counters non-negative.
    pub fn extract_engagement(raw_item: &Map<String, Value>) -> indexmap::IndexMap<String, u64> {
        let mut engagement = indexmap::IndexMap::new();

        for (metric, candidates) in ENGAGEMENT_KEYS {
            for &candidate in candidates {
                if let Some(count) = raw_item.get(candidate).and_then(numeric_count) {
                    engagement.insert(metric.to_string(), count);
                    break;
                }
            }
        }

        engagement
    }

    fn numeric_count(value: &Value) -> Option<u64> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s
                .trim()
                .parse::<u64>()
                .ok()
                .or_else(|| s.trim().parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64)),
            _ => None,
        }
    }

    /// First present URL field among the common candidates.
    pub fn build_source_url(raw_item: &Map<String, Value>) -> Option<String> {
        for key in SOURCE_URL_KEYS {
            if let Some(url) = raw_item.get(key).and_then(Value::as_str) {
                if !url.is_empty() {
                    return Some(url.to_string());
                }
            }
        }
        None
    }

    /// Author name/URL from the common payload structures: a nested
    /// `author` object, a nested `user` object, then flat keys. The first
    /// structure yielding a non-null name wins.
    pub fn extract_author(raw_item: &Map<String, Value>) -> (Option<String>, Option<String>) {
        if let Some(author) = raw_item.get("author").and_then(Value::as_object) {
            let name = string_field(author, &["name", "display_name"]);
            if name.is_some() {
                return (name, string_field(author, &["url", "profile_url"]));
            }
        }

        if let Some(user) = raw_item.get("user").and_then(Value::as_object) {
            let name = string_field(user, &["name", "screen_name"]);
            if name.is_some() {
                return (name, string_field(user, &["url"]));
            }
        }

        let name = string_field(raw_item, &["author_name", "username"]);
        if name.is_some() {
            return (name, string_field(raw_item, &["author_url"]));
        }

        (None, None)
    }

    fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
        keys.iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    }

    /// Convert newline-delimited plain text to paragraph markup.
    pub fn text_to_html(sanitizer: &HtmlSanitizer, text: &str) -> String {
        sanitizer.convert_line_breaks(text)
    }
}
