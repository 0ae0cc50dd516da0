//! Small text and clock helpers shared by config parsing, push payloads and
//! the upload client.

use url::Url;

const EXCERPT_LIMIT: usize = 180;

/// Trimmed copy of `value`, or `None` when it is missing or blank.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Parse an absolute `http`/`https` URL with a host and return it without a
/// trailing slash, ready to have routes appended.
pub fn http_base_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    Some(url.as_str().trim_end_matches('/').to_string())
}

/// One-line excerpt of a server response for error messages.
///
/// Whitespace runs (including newlines from HTML error pages) collapse to a
/// single space and long bodies are cut with a trailing ellipsis.
pub fn response_excerpt(body: &str) -> String {
    let mut excerpt = String::new();
    for (count, word) in body.split_whitespace().enumerate() {
        if count > 0 {
            excerpt.push(' ');
        }
        excerpt.push_str(word);
        if excerpt.chars().count() > EXCERPT_LIMIT {
            let mut cut: String = excerpt.chars().take(EXCERPT_LIMIT).collect();
            cut.push('…');
            return cut;
        }
    }
    excerpt
}

/// Current Unix timestamp in milliseconds.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_blank_drops_whitespace_only_values() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" \t ")), None);
        assert_eq!(non_blank(Some(" s-1 ")), Some("s-1".to_string()));
    }

    #[test]
    fn http_base_url_requires_scheme_and_host() {
        assert_eq!(
            http_base_url(" https://retrophoto.example.com/ ").as_deref(),
            Some("https://retrophoto.example.com")
        );
        assert_eq!(
            http_base_url("http://localhost:3000").as_deref(),
            Some("http://localhost:3000")
        );
        assert_eq!(http_base_url("example.com"), None);
        assert_eq!(http_base_url("ftp://example.com"), None);
        assert_eq!(http_base_url("file:///tmp/queue"), None);
    }

    #[test]
    fn response_excerpt_flattens_html_pages() {
        let page = "<html>\n  <body>\n    Bad   Gateway\n  </body>\n</html>";
        assert_eq!(
            response_excerpt(page),
            "<html> <body> Bad Gateway </body> </html>"
        );
        assert_eq!(response_excerpt("   "), "");
    }

    #[test]
    fn response_excerpt_marks_truncation() {
        let excerpt = response_excerpt(&"y".repeat(400));
        assert_eq!(excerpt.chars().count(), EXCERPT_LIMIT + 1);
        assert!(excerpt.ends_with('…'));
    }
}
