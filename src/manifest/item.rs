use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::app::{EstuaryError, Result};
use crate::manifest::ContentType;

/// Author attribution carried on a manifest item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: Option<String>,
    pub url: Option<String>,
}

/// Metadata for one remote content item, listed before its body is fetched.
///
/// Immutable once built by an adapter; `id` and `created_at` are mandatory
/// and reconstruction from serialized data fails without them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestItem {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
}

impl ManifestItem {
    pub fn new(
        id: impl Into<String>,
        content_type: ContentType,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            content_type,
            title: title.into(),
            excerpt: None,
            created_at,
            updated_at: None,
            media_urls: Vec::new(),
            metadata: Map::new(),
            parent_id: None,
            original_url: None,
            author: None,
        }
    }

    pub fn has_media(&self) -> bool {
        !self.media_urls.is_empty()
    }

    pub fn has_parent(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Platform metadata value by key.
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("manifest item serialization cannot fail")
    }

    pub fn from_value(value: Value) -> Result<Self> {
        for field in ["id", "type", "title", "created_at"] {
            if value.get(field).map_or(true, Value::is_null) {
                return Err(EstuaryError::MissingField(field.to_string()));
            }
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> ManifestItem {
        let mut item = ManifestItem::new(
            "tweet-1",
            ContentType::Post,
            "Hello world",
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
        );
        item.excerpt = Some("Hello...".into());
        item.media_urls = vec!["https://pbs.twimg.com/media/a.jpg".into()];
        item.metadata
            .insert("lang".into(), Value::String("en".into()));
        item
    }

    #[test]
    fn test_has_media() {
        assert!(sample().has_media());
        let bare = ManifestItem::new("x", ContentType::Post, "t", Utc::now());
        assert!(!bare.has_media());
    }

    #[test]
    fn test_has_parent() {
        let mut item = sample();
        assert!(!item.has_parent());
        item.parent_id = Some("tweet-0".into());
        assert!(item.has_parent());
    }

    #[test]
    fn test_round_trip_is_identical() {
        let item = sample();
        let value = item.to_value();
        let back = ManifestItem::from_value(value.clone()).unwrap();
        assert_eq!(back, item);
        assert_eq!(back.to_value(), value);
    }

    #[test]
    fn test_from_value_missing_created_at() {
        let value = serde_json::json!({
            "id": "a",
            "type": "post",
            "title": "t"
        });
        let err = ManifestItem::from_value(value).unwrap_err();
        assert!(matches!(err, EstuaryError::MissingField(f) if f == "created_at"));
    }

    #[test]
    fn test_from_value_missing_id() {
        let value = serde_json::json!({
            "type": "post",
            "title": "t",
            "created_at": "2024-01-15T10:30:00Z"
        });
        assert!(ManifestItem::from_value(value).is_err());
    }

    #[test]
    fn test_serialized_timestamps_are_iso8601() {
        let value = sample().to_value();
        let created = value.get("created_at").and_then(Value::as_str).unwrap();
        assert!(created.starts_with("2024-01-15T10:30:00"));
    }
}
