use serde::{Deserialize, Serialize};

/// Kind of content a source can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// A standard post (tweet, status update, etc.).
    Post,
    /// A thread of connected posts.
    Thread,
    /// A reply to another post.
    Reply,
    /// A repost/retweet of another post.
    Repost,
    /// Standalone media content.
    Media,
    /// A long-form article.
    Article,
    /// Video content.
    Video,
    /// Story content (ephemeral).
    Story,
}

impl ContentType {
    /// All variants, in declaration order.
    pub const ALL: [ContentType; 8] = [
        ContentType::Post,
        ContentType::Thread,
        ContentType::Reply,
        ContentType::Repost,
        ContentType::Media,
        ContentType::Article,
        ContentType::Video,
        ContentType::Story,
    ];

    /// String tag used in serialized data.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Post => "post",
            ContentType::Thread => "thread",
            ContentType::Reply => "reply",
            ContentType::Repost => "repost",
            ContentType::Media => "media",
            ContentType::Article => "article",
            ContentType::Video => "video",
            ContentType::Story => "story",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::Post => "Post",
            ContentType::Thread => "Thread",
            ContentType::Reply => "Reply",
            ContentType::Repost => "Repost",
            ContentType::Media => "Media",
            ContentType::Article => "Article",
            ContentType::Video => "Video",
            ContentType::Story => "Story",
        }
    }

    /// Whether this is primary content rather than a derivative of another
    /// item (replies, reposts, stories).
    pub fn is_primary(&self) -> bool {
        match self {
            ContentType::Post
            | ContentType::Thread
            | ContentType::Article
            | ContentType::Video
            | ContentType::Media => true,
            ContentType::Reply | ContentType::Repost | ContentType::Story => false,
        }
    }

    /// Parse a string tag back into a variant.
    pub fn parse(tag: &str) -> Option<ContentType> {
        ContentType::ALL.iter().copied().find(|t| t.as_str() == tag)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(ContentType::Post.label(), "Post");
        assert_eq!(ContentType::Article.label(), "Article");
        assert_eq!(ContentType::Story.label(), "Story");
    }

    #[test]
    fn test_is_primary() {
        assert!(ContentType::Post.is_primary());
        assert!(ContentType::Thread.is_primary());
        assert!(ContentType::Article.is_primary());
        assert!(ContentType::Video.is_primary());
        assert!(ContentType::Media.is_primary());
        assert!(!ContentType::Reply.is_primary());
        assert!(!ContentType::Repost.is_primary());
        assert!(!ContentType::Story.is_primary());
    }

    #[test]
    fn test_parse_round_trip() {
        for t in ContentType::ALL {
            assert_eq!(ContentType::parse(t.as_str()), Some(t));
        }
        assert_eq!(ContentType::parse("unknown"), None);
    }

    #[test]
    fn test_serde_string_tags() {
        let json = serde_json::to_string(&ContentType::Repost).unwrap();
        assert_eq!(json, "\"repost\"");
        let back: ContentType = serde_json::from_str("\"thread\"").unwrap();
        assert_eq!(back, ContentType::Thread);
    }
}
