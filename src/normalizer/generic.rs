use serde_json::{Map, Value};

use crate::app::{EstuaryError, Result};
use crate::normalizer::{helpers, DateConverter, HtmlSanitizer, NormalizedItem, Normalizer};

const ID_KEYS: [&str; 2] = ["id", "source_id"];
const CONTENT_KEYS: [&str; 3] = ["content", "text", "body"];
const DATE_KEYS: [&str; 4] = ["created_at", "timestamp", "published_at", "date"];
const PARENT_KEYS: [&str; 2] = ["parent_id", "in_reply_to"];

/// Platform-agnostic normalizer built entirely from the default heuristics.
///
/// Useful for archive-style JSON exports and as the reference implementation
/// of the [`Normalizer`] contract; platform normalizers follow the same
/// shape with sharper field mappings.
pub struct GenericNormalizer {
    adapter_id: String,
    sanitizer: HtmlSanitizer,
    dates: DateConverter,
}

impl GenericNormalizer {
    pub fn new(adapter_id: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            sanitizer: HtmlSanitizer::new(),
            dates: DateConverter::new(),
        }
    }

    pub fn with_components(
        adapter_id: impl Into<String>,
        sanitizer: HtmlSanitizer,
        dates: DateConverter,
    ) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            sanitizer,
            dates,
        }
    }

    pub fn sanitizer(&self) -> &HtmlSanitizer {
        &self.sanitizer
    }

    pub fn date_converter(&self) -> &DateConverter {
        &self.dates
    }

    fn find_string<'a>(raw_item: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
        keys.iter()
            .find_map(|key| raw_item.get(*key).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
    }

    fn find_id(raw_item: &Map<String, Value>) -> Option<String> {
        for key in ID_KEYS {
            match raw_item.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(Value::Number(n)) => return Some(n.to_string()),
                _ => {}
            }
        }
        None
    }

    fn find_date(&self, raw_item: &Map<String, Value>) -> Option<Result<chrono::DateTime<chrono::Utc>>> {
        for key in DATE_KEYS {
            match raw_item.get(key) {
                Some(Value::String(s)) if !s.is_empty() => {
                    return Some(self.dates.convert(s, None));
                }
                Some(Value::Number(n)) => {
                    return Some(self.dates.convert(&n.to_string(), None));
                }
                _ => {}
            }
        }
        None
    }
}

impl Normalizer for GenericNormalizer {
    fn adapter_id(&self) -> &str {
        &self.adapter_id
    }

    fn normalize(&self, raw_item: &Map<String, Value>) -> Result<NormalizedItem> {
        let source_id = Self::find_id(raw_item)
            .ok_or_else(|| EstuaryError::MissingField("id".to_string()))?;

        let raw_content = Self::find_string(raw_item, &CONTENT_KEYS)
            .ok_or_else(|| EstuaryError::MissingField("content".to_string()))?;

        // HTML is sanitized as-is; bare text gets paragraph markup first.
        let content = if raw_content.contains('<') {
            self.sanitizer.sanitize(raw_content)
        } else {
            self.sanitizer
                .sanitize(&helpers::text_to_html(&self.sanitizer, raw_content))
        };

        let publish_date = self
            .find_date(raw_item)
            .ok_or_else(|| EstuaryError::MissingField("publish_date".to_string()))??;

        let content_type = helpers::determine_content_type(raw_item);

        let mut item = NormalizedItem::new(
            source_id,
            self.adapter_id.clone(),
            content_type,
            content,
            publish_date,
        );

        item.title = Self::find_string(raw_item, &["title"]).map(str::to_string);

        item.source_url = helpers::build_source_url(raw_item)
            .map(|url| self.sanitizer.remove_tracking_params(&url));

        let (author_name, author_url) = helpers::extract_author(raw_item);
        item.author_name = author_name;
        item.author_url = author_url;

        item.parent_id = Self::find_string(raw_item, &PARENT_KEYS).map(str::to_string);

        item.engagement = helpers::extract_engagement(raw_item);

        let plain_text = self.sanitizer.extract_text(&item.content);
        item.tags = helpers::extract_hashtags(&plain_text);

        let mentions = helpers::extract_mentions(&plain_text);
        if !mentions.is_empty() {
            item.set_meta(
                "mentions",
                Value::Array(mentions.into_iter().map(Value::String).collect()),
            );
        }

        // Declared media URLs first, then anything media-like in the body.
        if let Some(urls) = raw_item.get("media_urls").and_then(Value::as_array) {
            let urls: Vec<String> = urls
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            for media in helpers::extract_media_from_urls(&urls) {
                item.add_media(media);
            }
        }
        let body_media = helpers::extract_media_from_html(&self.sanitizer, &item.content);
        for media in body_media {
            if !item.media.iter().any(|m| m.id == media.id) {
                item.add_media(media);
            }
        }

        Ok(item)
    }
}
