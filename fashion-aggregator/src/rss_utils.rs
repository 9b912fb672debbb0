//! Small helpers shared by the registry, fetcher and the command line tool.

/// URL utilities for feed endpoints
pub mod url {
    use url::Url;

    /// Host part of a URL, used as the politeness key by the fetcher.
    pub fn extract_host(url_str: &str) -> Option<String> {
        Url::parse(url_str)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_ascii_lowercase()))
    }

    /// Feed endpoints must be absolute http(s) URLs with a host.
    pub fn is_valid_feed_url(url_str: &str) -> bool {
        match Url::parse(url_str) {
            Ok(url) => matches!(url.scheme(), "http" | "https") && url.host().is_some(),
            Err(_) => false,
        }
    }
}

/// Time utilities
pub mod time {
    use chrono::{DateTime, Utc};

    /// "3 days ago", "1 hour ago", "5 minutes ago" or "Just now".
    pub fn format_time_ago(published: DateTime<Utc>, now: DateTime<Utc>) -> String {
        let diff = now.signed_duration_since(published);
        if diff.num_days() > 0 {
            plural(diff.num_days(), "day")
        } else if diff.num_seconds() > 3600 {
            plural(diff.num_hours(), "hour")
        } else if diff.num_seconds() > 60 {
            plural(diff.num_minutes(), "minute")
        } else {
            "Just now".to_string()
        }
    }

    fn plural(n: i64, unit: &str) -> String {
        format!("{} {}{} ago", n, unit, if n > 1 { "s" } else { "" })
    }
}

/// Text helpers for feed summaries
pub mod text {
    /// Strips markup from a feed summary and collapses whitespace.
    pub fn extract_text_from_html(html: &str) -> String {
        html.chars()
            .fold((String::new(), false), |(mut text, in_tag), c| match c {
                '<' => (text, true),
                '>' => {
                    text.push(' ');
                    (text, false)
                }
                _ if !in_tag => {
                    text.push(c);
                    (text, in_tag)
                }
                _ => (text, in_tag),
            })
            .0
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Cuts `text` to at most `max_chars` characters on a word boundary.
    pub fn truncate_words(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let cut: String = text.chars().take(max_chars).collect();
        match cut.rfind(' ') {
            Some(idx) if idx > 0 => format!("{}...", &cut[..idx]),
            _ => format!("{}...", cut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn feed_url_validation() {
        assert!(url::is_valid_feed_url("https://wwd.com/feed/"));
        assert!(url::is_valid_feed_url("http://example.com/rss"));
        assert!(!url::is_valid_feed_url("ftp://example.com/feed"));
        assert!(!url::is_valid_feed_url("not a url"));
        assert_eq!(url::extract_host("https://Glossy.co/beauty/feed/"), Some("glossy.co".to_string()));
    }

    #[test]
    fn time_ago_labels() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(time::format_time_ago(now - Duration::days(2), now), "2 days ago");
        assert_eq!(time::format_time_ago(now - Duration::hours(1) - Duration::minutes(5), now), "1 hour ago");
        assert_eq!(time::format_time_ago(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(time::format_time_ago(now - Duration::seconds(30), now), "Just now");
    }

    #[test]
    fn html_is_stripped_and_truncated() {
        let text = text::extract_text_from_html("<p>Spring <b>runway</b></p>\n<p>looks</p>");
        assert_eq!(text, "Spring runway looks");
        assert_eq!(text::truncate_words("Spring runway looks", 12), "Spring...");
        assert_eq!(text::truncate_words("short", 12), "short");
    }
}
