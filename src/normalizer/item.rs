use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::app::{EstuaryError, Result};
use crate::manifest::ContentType;
use crate::normalizer::media::{MediaReference, MediaType};
use crate::normalizer::sanitizer::HtmlSanitizer;

/// Canonical content unit produced by normalization.
///
/// Every platform payload ends up in this shape before being handed to the
/// target publishing system. Assembled once per raw item; after construction
/// only the media list and metadata may grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub source_id: String,
    pub source_adapter: String,
    pub content_type: ContentType,
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    pub publish_date: DateTime<Utc>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub media: Vec<MediaReference>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub engagement: IndexMap<String, u64>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_url: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NormalizedItem {
    pub fn new(
        source_id: impl Into<String>,
        source_adapter: impl Into<String>,
        content_type: ContentType,
        content: impl Into<String>,
        publish_date: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            source_adapter: source_adapter.into(),
            content_type,
            content: content.into(),
            title: None,
            publish_date,
            source_url: None,
            media: Vec::new(),
            metadata: Map::new(),
            engagement: IndexMap::new(),
            author_name: None,
            author_url: None,
            parent_id: None,
            tags: Vec::new(),
        }
    }

    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }

    pub fn media_count(&self) -> usize {
        self.media.len()
    }

    pub fn media_by_type(&self, media_type: MediaType) -> Vec<&MediaReference> {
        self.media
            .iter()
            .filter(|m| m.media_type == media_type)
            .collect()
    }

    pub fn images(&self) -> Vec<&MediaReference> {
        self.media_by_type(MediaType::Image)
    }

    pub fn videos(&self) -> Vec<&MediaReference> {
        self.media_by_type(MediaType::Video)
    }

    pub fn add_media(&mut self, media: MediaReference) {
        self.media.push(media);
    }

    fn stripped_text(&self) -> String {
        HtmlSanitizer::new().extract_text(&self.content)
    }

    /// Word count of the content with HTML stripped.
    pub fn word_count(&self) -> usize {
        self.stripped_text().split_whitespace().count()
    }

    /// Character count of the content with HTML stripped.
    pub fn character_count(&self) -> usize {
        self.stripped_text().chars().count()
    }

    /// Plain-text excerpt capped at `length` characters.
    ///
    /// Truncation snaps back to the last word boundary only when that
    /// boundary sits past 80% of the target length; otherwise the cut is
    /// hard. A truncated excerpt ends with "...".
    pub fn excerpt(&self, length: usize) -> String {
        let text = self.stripped_text();
        let chars: Vec<char> = text.chars().collect();

        if chars.len() <= length {
            return text;
        }

        let truncated: String = chars[..length].iter().collect();
        let cut = match truncated.rfind(' ') {
            Some(pos) => {
                let boundary = truncated[..pos].chars().count();
                if boundary as f64 > length as f64 * 0.8 {
                    truncated[..pos].to_string()
                } else {
                    truncated
                }
            }
            None => truncated,
        };

        format!("{cut}...")
    }

    /// The stored title, or a truncated excerpt when none exists.
    pub fn generate_title(&self, max_length: usize) -> String {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => self.excerpt(max_length),
        }
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn engagement(&self, key: &str) -> u64 {
        self.engagement.get(key).copied().unwrap_or(0)
    }

    /// Sum of every known engagement counter.
    pub fn total_engagement(&self) -> u64 {
        self.engagement.values().sum()
    }

    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("normalized item serialization cannot fail")
    }

    pub fn from_value(value: Value) -> Result<Self> {
        for field in [
            "source_id",
            "source_adapter",
            "content_type",
            "content",
            "publish_date",
        ] {
            if value.get(field).map_or(true, Value::is_null) {
                return Err(EstuaryError::MissingField(field.to_string()));
            }
        }
        Ok(serde_json::from_value(value)?)
    }
}
