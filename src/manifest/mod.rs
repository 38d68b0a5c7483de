//! Lightweight listings of remote content.
//!
//! An adapter answers "what is available?" with a [`ContentManifest`]: cheap
//! metadata about every item it can export, keyed by item ID. The caller
//! reviews the manifest (filters, stats, date range) before committing to
//! full-content fetches.

mod content_type;
mod item;

pub use content_type::ContentType;
pub use item::{Author, ManifestItem};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::{EstuaryError, Result};

/// Earliest/latest creation timestamps across a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

/// Aggregate counts over a manifest.
///
/// `by_type` only lists types that actually occur; zero counts are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestStats {
    pub total: usize,
    pub with_media: usize,
    pub by_type: IndexMap<String, usize>,
}

/// A named, timestamped collection of [`ManifestItem`]s keyed by ID.
///
/// Built per fetch call and discarded after the caller persists what it
/// needs; serializable for transient caching. Iteration order follows
/// insertion order.
#[derive(Debug, Clone)]
pub struct ContentManifest {
    source_id: String,
    generated_at: DateTime<Utc>,
    items: IndexMap<String, ManifestItem>,
}

impl ContentManifest {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            generated_at: Utc::now(),
            items: IndexMap::new(),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Insert an item, replacing any existing item with the same ID.
    pub fn add_item(&mut self, item: ManifestItem) {
        self.items.insert(item.id.clone(), item);
    }

    /// Remove an item by ID, preserving the order of the rest.
    pub fn remove_item(&mut self, id: &str) -> bool {
        self.items.shift_remove(id).is_some()
    }

    pub fn get_item(&self, id: &str) -> Option<&ManifestItem> {
        self.items.get(id)
    }

    pub fn has_item(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn items(&self) -> impl Iterator<Item = &ManifestItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items_by_type(&self, content_type: ContentType) -> Vec<&ManifestItem> {
        self.items
            .values()
            .filter(|item| item.content_type == content_type)
            .collect()
    }

    pub fn items_with_media(&self) -> Vec<&ManifestItem> {
        self.items.values().filter(|item| item.has_media()).collect()
    }

    /// Earliest and latest `created_at` across all items.
    ///
    /// The sort is stable, so items sharing a timestamp keep their insertion
    /// order; an empty manifest yields `None` on both ends.
    pub fn date_range(&self) -> DateRange {
        if self.items.is_empty() {
            return DateRange {
                earliest: None,
                latest: None,
            };
        }

        let mut dates: Vec<DateTime<Utc>> =
            self.items.values().map(|item| item.created_at).collect();
        dates.sort();

        DateRange {
            earliest: dates.first().copied(),
            latest: dates.last().copied(),
        }
    }

    pub fn stats(&self) -> ManifestStats {
        let mut by_type = IndexMap::new();
        for content_type in ContentType::ALL {
            let count = self
                .items
                .values()
                .filter(|item| item.content_type == content_type)
                .count();
            if count > 0 {
                by_type.insert(content_type.as_str().to_string(), count);
            }
        }

        ManifestStats {
            total: self.items.len(),
            with_media: self.items_with_media().len(),
            by_type,
        }
    }

    /// Serialized form: `{source_id, generated_at, stats, items}`.
    ///
    /// `stats` is recomputed on every call and ignored when reading back.
    pub fn to_value(&self) -> Value {
        let items: IndexMap<&str, Value> = self
            .items
            .values()
            .map(|item| (item.id.as_str(), item.to_value()))
            .collect();

        serde_json::json!({
            "source_id": self.source_id,
            "generated_at": self.generated_at,
            "stats": self.stats(),
            "items": items,
        })
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let source_id = value
            .get("source_id")
            .and_then(Value::as_str)
            .ok_or_else(|| EstuaryError::MissingField("source_id".to_string()))?
            .to_string();

        let mut manifest = Self::new(source_id);

        if let Some(generated_at) = value.get("generated_at") {
            if !generated_at.is_null() {
                manifest.generated_at = serde_json::from_value(generated_at.clone())?;
            }
        }

        if let Some(items) = value.get("items").and_then(Value::as_object) {
            for item_value in items.values() {
                manifest.add_item(ManifestItem::from_value(item_value.clone())?);
            }
        }

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str, content_type: ContentType, ts: i64) -> ManifestItem {
        ManifestItem::new(
            id,
            content_type,
            format!("title {id}"),
            Utc.timestamp_opt(ts, 0).unwrap(),
        )
    }

    fn media_item(id: &str, ts: i64) -> ManifestItem {
        let mut item = item(id, ContentType::Post, ts);
        item.media_urls = vec!["https://example.com/a.jpg".into()];
        item
    }

    #[test]
    fn test_keyed_map_semantics() {
        let mut manifest = ContentManifest::new("twitter");
        manifest.add_item(item("a", ContentType::Post, 100));
        manifest.add_item(item("b", ContentType::Reply, 200));

        assert_eq!(manifest.len(), 2);
        assert!(manifest.has_item("a"));
        assert_eq!(manifest.get_item("b").unwrap().content_type, ContentType::Reply);

        // Same-id insert overwrites.
        manifest.add_item(item("a", ContentType::Article, 300));
        assert_eq!(manifest.len(), 2);
        assert_eq!(
            manifest.get_item("a").unwrap().content_type,
            ContentType::Article
        );

        assert!(manifest.remove_item("a"));
        assert!(!manifest.remove_item("a"));
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn test_filters_preserve_order() {
        let mut manifest = ContentManifest::new("twitter");
        manifest.add_item(item("c", ContentType::Post, 3));
        manifest.add_item(item("a", ContentType::Post, 1));
        manifest.add_item(item("b", ContentType::Reply, 2));

        let posts = manifest.items_by_type(ContentType::Post);
        let ids: Vec<&str> = posts.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[test]
    fn test_date_range_empty() {
        let manifest = ContentManifest::new("twitter");
        let range = manifest.date_range();
        assert!(range.earliest.is_none());
        assert!(range.latest.is_none());
    }

    #[test]
    fn test_date_range_bounds_all_items() {
        let mut manifest = ContentManifest::new("twitter");
        manifest.add_item(item("a", ContentType::Post, 500));
        manifest.add_item(item("b", ContentType::Post, 100));
        manifest.add_item(item("c", ContentType::Post, 900));

        let range = manifest.date_range();
        let earliest = range.earliest.unwrap();
        let latest = range.latest.unwrap();
        assert_eq!(earliest.timestamp(), 100);
        assert_eq!(latest.timestamp(), 900);
        for i in manifest.items() {
            assert!(earliest <= i.created_at && i.created_at <= latest);
        }
    }

    #[test]
    fn test_stats_omits_zero_counts() {
        let mut manifest = ContentManifest::new("twitter");
        manifest.add_item(media_item("a", 1));
        manifest.add_item(item("b", ContentType::Post, 2));
        manifest.add_item(item("c", ContentType::Thread, 3));

        let stats = manifest.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.with_media, 1);
        assert_eq!(stats.by_type.get("post"), Some(&2));
        assert_eq!(stats.by_type.get("thread"), Some(&1));
        assert!(!stats.by_type.contains_key("reply"));
        assert!(!stats.by_type.contains_key("repost"));
        assert_eq!(stats.by_type.len(), 2);
    }

    #[test]
    fn test_round_trip_is_identical() {
        let mut manifest = ContentManifest::new("twitter");
        manifest.add_item(media_item("a", 1));
        manifest.add_item(item("b", ContentType::Reply, 2));

        let value = manifest.to_value();
        let back = ContentManifest::from_value(value.clone()).unwrap();
        assert_eq!(back.source_id(), "twitter");
        assert_eq!(back.generated_at(), manifest.generated_at());
        assert_eq!(back.len(), 2);
        assert_eq!(back.to_value(), value);
    }

    #[test]
    fn test_from_value_requires_source_id() {
        let err = ContentManifest::from_value(serde_json::json!({"items": {}})).unwrap_err();
        assert!(matches!(err, EstuaryError::MissingField(f) if f == "source_id"));
    }

    #[test]
    fn test_from_value_without_items_is_empty() {
        let manifest =
            ContentManifest::from_value(serde_json::json!({"source_id": "medium"})).unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.source_id(), "medium");
    }
}
