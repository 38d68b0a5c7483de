use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use url::Url;

use crate::app::{EstuaryError, Result};

const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "bmp"];
const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "webm", "mov", "avi", "wmv", "flv", "mkv"];
const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "wav", "ogg", "flac", "m4a", "aac"];
const DOCUMENT_EXTENSIONS: [&str; 7] = ["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx"];

/// Broad media category, detected from the URL extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Document => "document",
        }
    }
}

/// One media asset tracked through the import process, from its remote URL
/// to a sideloaded local copy and finally an imported attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaReference {
    pub id: String,
    pub source_url: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub local_path: Option<String>,
    #[serde(default)]
    pub attachment_id: Option<u64>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl MediaReference {
    pub fn new(
        id: impl Into<String>,
        source_url: impl Into<String>,
        media_type: MediaType,
    ) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
            media_type,
            alt_text: None,
            caption: None,
            width: None,
            height: None,
            file_size: None,
            mime_type: None,
            local_path: None,
            attachment_id: None,
            metadata: Map::new(),
        }
    }

    /// Build a reference from a bare URL.
    ///
    /// The ID is the SHA-256 of the URL, so the same URL always produces the
    /// same reference.
    pub fn from_url(url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let id = hex::encode(hasher.finalize());
        Self::new(id, url, Self::detect_type_from_url(url))
    }

    /// Map a URL's path extension through the fixed extension tables.
    ///
    /// Unknown or missing extensions default to `Image`.
    pub fn detect_type_from_url(url: &str) -> MediaType {
        let extension = match url_path_extension(url) {
            Some(ext) => ext,
            None => return MediaType::Image,
        };

        if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            MediaType::Image
        } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            MediaType::Video
        } else if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
            MediaType::Audio
        } else if DOCUMENT_EXTENSIONS.contains(&extension.as_str()) {
            MediaType::Document
        } else {
            MediaType::Image
        }
    }

    /// Extensions counting as directly-linkable media (image, video, audio).
    pub(crate) fn is_media_extension(extension: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&extension)
            || VIDEO_EXTENSIONS.contains(&extension)
            || AUDIO_EXTENSIONS.contains(&extension)
    }

    pub fn is_image(&self) -> bool {
        self.media_type == MediaType::Image
    }

    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }

    pub fn is_audio(&self) -> bool {
        self.media_type == MediaType::Audio
    }

    pub fn is_document(&self) -> bool {
        self.media_type == MediaType::Document
    }

    pub fn is_imported(&self) -> bool {
        self.attachment_id.is_some()
    }

    pub fn has_dimensions(&self) -> bool {
        self.width.is_some() && self.height.is_some()
    }

    /// Width over height, or `None` when dimensions are absent or height is
    /// zero.
    pub fn aspect_ratio(&self) -> Option<f64> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if h != 0 => Some(f64::from(w) / f64::from(h)),
            _ => None,
        }
    }

    /// One-way transition into the imported state; both fields are set
    /// together.
    pub fn mark_imported(&mut self, attachment_id: u64, local_path: impl Into<String>) {
        self.attachment_id = Some(attachment_id);
        self.local_path = Some(local_path.into());
    }

    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Lowercase extension of the source URL's path, if any.
    pub fn extension(&self) -> Option<String> {
        url_path_extension(&self.source_url)
    }

    /// Final path segment of the source URL, if any.
    pub fn filename(&self) -> Option<String> {
        let url = Url::parse(&self.source_url).ok()?;
        let name = url.path_segments()?.next_back()?;
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("media reference serialization cannot fail")
    }

    pub fn from_value(value: Value) -> Result<Self> {
        for field in ["id", "source_url"] {
            if value.get(field).map_or(true, Value::is_null) {
                return Err(EstuaryError::MissingField(field.to_string()));
            }
        }
        Ok(serde_json::from_value(value)?)
    }
}

fn url_path_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let path = parsed.path();
    let segment = path.rsplit('/').next()?;
    let (_, extension) = segment.rsplit_once('.')?;
    if extension.is_empty() {
        None
    } else {
        Some(extension.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_deterministic() {
        let a = MediaReference::from_url("https://example.com/photo.jpg");
        let b = MediaReference::from_url("https://example.com/photo.jpg");
        let c = MediaReference::from_url("https://example.com/other.jpg");
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.id.len(), 64);
    }

    #[test]
    fn test_detect_type_tables() {
        assert_eq!(
            MediaReference::detect_type_from_url("https://e.com/a.PNG"),
            MediaType::Image
        );
        assert_eq!(
            MediaReference::detect_type_from_url("https://e.com/clip.mp4"),
            MediaType::Video
        );
        assert_eq!(
            MediaReference::detect_type_from_url("https://e.com/song.flac"),
            MediaType::Audio
        );
        assert_eq!(
            MediaReference::detect_type_from_url("https://e.com/report.pdf"),
            MediaType::Document
        );
    }

    #[test]
    fn test_detect_type_defaults_to_image() {
        assert_eq!(
            MediaReference::detect_type_from_url("https://e.com/page"),
            MediaType::Image
        );
        assert_eq!(
            MediaReference::detect_type_from_url("https://e.com/file.xyz"),
            MediaType::Image
        );
        assert_eq!(
            MediaReference::detect_type_from_url("not a url"),
            MediaType::Image
        );
    }

    #[test]
    fn test_aspect_ratio_guards() {
        let mut media = MediaReference::from_url("https://e.com/a.jpg");
        assert_eq!(media.aspect_ratio(), None);

        media.width = Some(1920);
        // Only one dimension set: still undefined.
        assert_eq!(media.aspect_ratio(), None);
        assert!(!media.has_dimensions());

        media.height = Some(0);
        assert_eq!(media.aspect_ratio(), None);

        media.height = Some(1080);
        assert!(media.has_dimensions());
        let ratio = media.aspect_ratio().unwrap();
        assert!((ratio - 16.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_mark_imported_sets_both_fields() {
        let mut media = MediaReference::from_url("https://e.com/a.jpg");
        assert!(!media.is_imported());
        media.mark_imported(42, "/uploads/a.jpg");
        assert!(media.is_imported());
        assert_eq!(media.attachment_id, Some(42));
        assert_eq!(media.local_path.as_deref(), Some("/uploads/a.jpg"));
    }

    #[test]
    fn test_extension_and_filename() {
        let media = MediaReference::from_url("https://e.com/images/Photo.JPG?x=1");
        assert_eq!(media.extension().as_deref(), Some("jpg"));
        assert_eq!(media.filename().as_deref(), Some("Photo.JPG"));

        let bare = MediaReference::from_url("https://e.com");
        assert_eq!(bare.extension(), None);
        assert_eq!(bare.filename(), None);
    }

    #[test]
    fn test_round_trip_is_identical() {
        let mut media = MediaReference::from_url("https://e.com/a.jpg");
        media.alt_text = Some("alt".into());
        media.width = Some(10);
        media.height = Some(20);
        media.mark_imported(7, "/tmp/a.jpg");
        media.set_meta("origin", Value::String("timeline".into()));

        let value = media.to_value();
        let back = MediaReference::from_value(value.clone()).unwrap();
        assert_eq!(back, media);
        assert_eq!(back.to_value(), value);
    }

    #[test]
    fn test_from_value_missing_source_url() {
        let err = MediaReference::from_value(serde_json::json!({"id": "x"})).unwrap_err();
        assert!(matches!(err, EstuaryError::MissingField(f) if f == "source_url"));
    }

    #[test]
    fn test_type_predicates() {
        let media = MediaReference::from_url("https://e.com/clip.webm");
        assert!(media.is_video());
        assert!(!media.is_image());
        assert!(!media.is_audio());
        assert!(!media.is_document());
    }
}
