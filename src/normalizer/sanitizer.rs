use std::sync::{Arc, OnceLock};

use regex::Regex;
use url::Url;

/// Allowlist filter supplied by the host publishing system.
///
/// The sanitizer strips outright dangerous markup itself; restricting the
/// remainder to an allowlisted tag/attribute set is the host's job.
pub trait SafeHtmlFilter: Send + Sync {
    fn filter(&self, html: &str) -> String;
}

/// Default filter: applies no restriction beyond what the sanitizer already
/// stripped.
pub struct PassthroughFilter;

impl SafeHtmlFilter for PassthroughFilter {
    fn filter(&self, html: &str) -> String {
        html.to_string()
    }
}

/// Query parameters dropped by [`HtmlSanitizer::remove_tracking_params`].
const TRACKING_PARAMS: [&str; 7] = ["fbclid", "gclid", "ref", "ref_src", "ref_url", "s", "t"];

fn regexes() -> &'static SanitizerRegexes {
    static REGEXES: OnceLock<SanitizerRegexes> = OnceLock::new();
    REGEXES.get_or_init(SanitizerRegexes::new)
}

struct SanitizerRegexes {
    script: Regex,
    style: Regex,
    noscript: Regex,
    iframe: Regex,
    object: Regex,
    embed: Regex,
    event_attr_quoted: Regex,
    event_attr_bare: Regex,
    any_tag: Regex,
    spaces: Regex,
    newlines: Regex,
    href_src: Regex,
    bare_url: Regex,
    hashtag: Regex,
    mention: Regex,
}

impl SanitizerRegexes {
    fn new() -> Self {
        Self {
            script: Regex::new(r"(?is)<script\b[^>]*>.*?</script>").expect("valid regex"),
            style: Regex::new(r"(?is)<style\b[^>]*>.*?</style>").expect("valid regex"),
            noscript: Regex::new(r"(?is)<noscript\b[^>]*>.*?</noscript>").expect("valid regex"),
            iframe: Regex::new(r"(?is)<iframe\b[^>]*>.*?</iframe>").expect("valid regex"),
            object: Regex::new(r"(?is)<object\b[^>]*>.*?</object>").expect("valid regex"),
            embed: Regex::new(r"(?is)<embed\b[^>]*/?>").expect("valid regex"),
            event_attr_quoted: Regex::new(r#"(?i)\s*on\w+\s*=\s*("[^"]*"|'[^']*')"#)
                .expect("valid regex"),
            event_attr_bare: Regex::new(r"(?i)\s*on\w+\s*=\s*\S+").expect("valid regex"),
            any_tag: Regex::new(r"(?s)<[^>]*>").expect("valid regex"),
            spaces: Regex::new(r"[ \t]+").expect("valid regex"),
            newlines: Regex::new(r"\n{3,}").expect("valid regex"),
            href_src: Regex::new(r#"(?i)(?:href|src)\s*=\s*["']([^"']+)["']"#)
                .expect("valid regex"),
            bare_url: Regex::new(r#"(?i)https?://[^\s<>"']+"#).expect("valid regex"),
            hashtag: Regex::new(r"#(\w+)").expect("valid regex"),
            mention: Regex::new(r"@(\w+)").expect("valid regex"),
        }
    }
}

/// Cleans platform HTML for safe storage: dangerous tags out, encoding
/// quirks fixed, whitespace normalized, URL hygiene helpers.
#[derive(Clone)]
pub struct HtmlSanitizer {
    filter: Arc<dyn SafeHtmlFilter>,
}

impl Default for HtmlSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlSanitizer {
    pub fn new() -> Self {
        Self {
            filter: Arc::new(PassthroughFilter),
        }
    }

    /// Use a host-provided allowlist filter in the sanitize pipeline.
    pub fn with_filter(filter: Arc<dyn SafeHtmlFilter>) -> Self {
        Self { filter }
    }

    /// Full pipeline: strip dangerous markup, fix encoding, apply the safe
    /// HTML filter, normalize whitespace.
    pub fn sanitize(&self, html: &str) -> String {
        if html.is_empty() {
            return String::new();
        }

        let html = self.strip_scripts(html);
        let html = self.fix_encoding(&html);
        let html = self.filter.filter(&html);
        self.normalize_whitespace(&html)
    }

    /// Remove script/style/noscript/iframe/object/embed tags with their
    /// content, and inline event-handler attributes.
    pub fn strip_scripts(&self, html: &str) -> String {
        let r = regexes();
        let html = r.script.replace_all(html, "");
        let html = r.style.replace_all(&html, "");
        let html = r.noscript.replace_all(&html, "");
        let html = r.iframe.replace_all(&html, "");
        let html = r.object.replace_all(&html, "");
        let html = r.embed.replace_all(&html, "");
        let html = r.event_attr_quoted.replace_all(&html, "");
        let html = r.event_attr_bare.replace_all(&html, "");
        html.into_owned()
    }

    /// Replace typographic punctuation with ASCII equivalents and drop
    /// control characters other than newline, tab, and carriage return.
    pub fn fix_encoding(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let mut result = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '\u{00A0}' => result.push(' '),
                '\u{2018}' | '\u{2019}' => result.push('\''),
                '\u{201C}' | '\u{201D}' => result.push('"'),
                '\u{2013}' => result.push('-'),
                '\u{2014}' => result.push_str("--"),
                '\u{2026}' => result.push_str("..."),
                '\n' | '\t' | '\r' => result.push(c),
                c if (c as u32) < 0x20 || c == '\u{7F}' => {}
                c => result.push(c),
            }
        }
        result
    }

    /// Strip tracking parameters from a URL's query string, preserving
    /// everything else. URLs without a host or query are returned unchanged.
    pub fn remove_tracking_params(&self, url: &str) -> String {
        if url.is_empty() {
            return String::new();
        }

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(_) => return url.to_string(),
        };

        if !parsed.has_host() || parsed.query().is_none() {
            return url.to_string();
        }

        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| {
                !key.starts_with("utm_") && !TRACKING_PARAMS.contains(&key.as_ref())
            })
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut cleaned = parsed;
        if kept.is_empty() {
            cleaned.set_query(None);
        } else {
            cleaned.query_pairs_mut().clear().extend_pairs(kept);
        }

        cleaned.to_string()
    }

    /// Plain text from HTML: scripts out, tags out, whitespace normalized.
    pub fn extract_text(&self, html: &str) -> String {
        if html.is_empty() {
            return String::new();
        }

        let html = self.strip_scripts(html);
        let text = regexes().any_tag.replace_all(&html, "");
        self.normalize_whitespace(&text).trim().to_string()
    }

    /// Collapse space/tab runs, cap consecutive newlines at two, and trim
    /// each line.
    pub fn normalize_whitespace(&self, text: &str) -> String {
        let r = regexes();
        let text = r.spaces.replace_all(text, " ");
        let text = r.newlines.replace_all(&text, "\n\n");
        text.lines().map(str::trim).collect::<Vec<_>>().join("\n")
    }

    /// Convert blank-line-delimited paragraphs into `<p>` markup.
    pub fn convert_line_breaks(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let paragraphs: Vec<&str> = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if paragraphs.is_empty() {
            return format!("<p>{}</p>", text.trim());
        }

        paragraphs
            .iter()
            .map(|p| format!("<p>{p}</p>"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Wrap bare URLs in anchor tags.
    pub fn linkify_urls(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        regexes()
            .bare_url
            .replace_all(text, |caps: &regex::Captures| {
                let url = &caps[0];
                format!("<a href=\"{url}\">{url}</a>")
            })
            .into_owned()
    }

    /// Turn `#hashtags` into links under `base_url`.
    ///
    /// The link target is URL-encoded; the visible tag text is HTML-escaped.
    pub fn linkify_hashtags(&self, text: &str, base_url: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let base = base_url.trim_end_matches('/');
        regexes()
            .hashtag
            .replace_all(text, |caps: &regex::Captures| {
                let tag = &caps[1];
                let encoded: String = url::form_urlencoded::byte_serialize(tag.as_bytes()).collect();
                let visible = html_escape::encode_text(tag);
                format!("<a href=\"{base}/{encoded}\">#{visible}</a>")
            })
            .into_owned()
    }

    /// Turn `@mentions` into profile links under `base_url`.
    pub fn linkify_mentions(&self, text: &str, base_url: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let base = base_url.trim_end_matches('/');
        regexes()
            .mention
            .replace_all(text, |caps: &regex::Captures| {
                let username = &caps[1];
                let encoded: String =
                    url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
                let visible = html_escape::encode_text(username);
                format!("<a href=\"{base}/{encoded}\">@{visible}</a>")
            })
            .into_owned()
    }

    /// All `href`/`src` attribute values that parse as real web URLs,
    /// de-duplicated in first-seen order. `javascript:` and other pseudo
    /// schemes are excluded.
    pub fn extract_urls(&self, html: &str) -> Vec<String> {
        if html.is_empty() {
            return Vec::new();
        }

        let mut urls = Vec::new();
        for caps in regexes().href_src.captures_iter(html) {
            let candidate = caps[1].to_string();
            if urls.contains(&candidate) {
                continue;
            }
            let valid = Url::parse(&candidate)
                .map(|u| matches!(u.scheme(), "http" | "https" | "ftp"))
                .unwrap_or(false);
            if valid {
                urls.push(candidate);
            }
        }
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> HtmlSanitizer {
        HtmlSanitizer::new()
    }

    #[test]
    fn test_strip_scripts_removes_script_with_content() {
        let html = "<p>Hello</p><script>alert(1)</script><p>World</p>";
        assert_eq!(sanitizer().strip_scripts(html), "<p>Hello</p><p>World</p>");
    }

    #[test]
    fn test_strip_scripts_case_insensitive_with_attributes() {
        let html = "<SCRIPT type=\"text/javascript\">x</SCRIPT>ok<STYLE media=\"all\">p{}</STYLE>";
        assert_eq!(sanitizer().strip_scripts(html), "ok");
    }

    #[test]
    fn test_strip_scripts_removes_embeds_and_iframes() {
        let html = "<iframe src=\"x\">inner</iframe>a<object data=\"x\">o</object>b<embed src=\"x\"/>c<noscript>n</noscript>";
        assert_eq!(sanitizer().strip_scripts(html), "abc");
    }

    #[test]
    fn test_strip_scripts_removes_event_handlers() {
        let html = "<img src=\"a.jpg\" onerror=\"alert(1)\"><div onclick='go()'>x</div><a onmouseover=bad>y</a>";
        let out = sanitizer().strip_scripts(html);
        assert!(!out.to_lowercase().contains("onerror"));
        assert!(!out.to_lowercase().contains("onclick"));
        assert!(!out.to_lowercase().contains("onmouseover"));
        assert!(out.contains("<img src=\"a.jpg\">"));
    }

    #[test]
    fn test_sanitize_empty_short_circuits() {
        assert_eq!(sanitizer().sanitize(""), "");
    }

    #[test]
    fn test_fix_encoding_smart_punctuation() {
        let text = "\u{201C}quote\u{201D} \u{2018}single\u{2019} a\u{2013}b c\u{2014}d e\u{2026} x\u{00A0}y";
        assert_eq!(
            sanitizer().fix_encoding(text),
            "\"quote\" 'single' a-b c--d e... x y"
        );
    }

    #[test]
    fn test_fix_encoding_strips_control_chars() {
        let text = "a\u{0000}b\u{0007}c\nd\te\u{007F}f";
        assert_eq!(sanitizer().fix_encoding(text), "abc\nd\tef");
    }

    #[test]
    fn test_remove_tracking_params() {
        let url = "https://example.com/post?utm_source=x&utm_medium=y&id=5&fbclid=z";
        assert_eq!(
            sanitizer().remove_tracking_params(url),
            "https://example.com/post?id=5"
        );
    }

    #[test]
    fn test_remove_tracking_params_drops_query_entirely() {
        let url = "https://twitter.com/u/status/1?s=20&t=abc";
        assert_eq!(
            sanitizer().remove_tracking_params(url),
            "https://twitter.com/u/status/1"
        );
    }

    #[test]
    fn test_remove_tracking_params_preserves_fragment() {
        let url = "https://example.com/a?ref=rss&keep=1#section";
        assert_eq!(
            sanitizer().remove_tracking_params(url),
            "https://example.com/a?keep=1#section"
        );
    }

    #[test]
    fn test_remove_tracking_params_no_query_unchanged() {
        let url = "https://example.com/a";
        assert_eq!(sanitizer().remove_tracking_params(url), url);
        assert_eq!(sanitizer().remove_tracking_params("not a url"), "not a url");
    }

    #[test]
    fn test_extract_text() {
        let html = "<p>Hello   <b>world</b></p><script>alert(1)</script>";
        assert_eq!(sanitizer().extract_text(html), "Hello world");
    }

    #[test]
    fn test_normalize_whitespace() {
        let text = "a   b\t\tc\n\n\n\n\nd\n  e  ";
        assert_eq!(sanitizer().normalize_whitespace(text), "a b c\n\nd\ne");
    }

    #[test]
    fn test_convert_line_breaks() {
        let text = "first paragraph\n\nsecond paragraph";
        assert_eq!(
            sanitizer().convert_line_breaks(text),
            "<p>first paragraph</p>\n<p>second paragraph</p>"
        );
    }

    #[test]
    fn test_linkify_urls() {
        let text = "see https://example.com/a now";
        assert_eq!(
            sanitizer().linkify_urls(text),
            "see <a href=\"https://example.com/a\">https://example.com/a</a> now"
        );
    }

    #[test]
    fn test_linkify_hashtags() {
        let out = sanitizer().linkify_hashtags("go #rust", "https://twitter.com/hashtag/");
        assert_eq!(
            out,
            "go <a href=\"https://twitter.com/hashtag/rust\">#rust</a>"
        );
    }

    #[test]
    fn test_linkify_mentions() {
        let out = sanitizer().linkify_mentions("cc @alice", "https://twitter.com");
        assert_eq!(out, "cc <a href=\"https://twitter.com/alice\">@alice</a>");
    }

    #[test]
    fn test_extract_urls_dedupes_and_validates() {
        let html = concat!(
            "<a href=\"https://example.com/a\">x</a>",
            "<img src=\"https://example.com/a\">",
            "<a href=\"javascript:alert(1)\">bad</a>",
            "<a href=\"/relative/path\">rel</a>",
            "<img src=\"https://example.com/b.jpg\">",
        );
        assert_eq!(
            sanitizer().extract_urls(html),
            vec![
                "https://example.com/a".to_string(),
                "https://example.com/b.jpg".to_string()
            ]
        );
    }
}
