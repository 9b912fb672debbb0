use crate::types::{AggregatorError, ParsedEntry, ParsedFeed, Result};
use chrono::{DateTime, Utc};
use feed_rs::parser;
use std::collections::HashSet;
use tracing::debug;

pub const NO_TITLE: &str = "No Title";

/// Turns an RSS/Atom document into normalized entries.
///
/// Only the first `max_entries` entries of a document are looked at, in
/// document order. Entries without a link are dropped, as are repeated links
/// within the same document.
pub struct FeedParser {
    max_entries: usize,
}

impl FeedParser {
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries }
    }

    /// `now` is the timestamp given to entries that carry no usable date.
    pub fn parse_feed(&self, content: &str, now: DateTime<Utc>) -> Result<ParsedFeed> {
        let content = normalize_content(content);
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes()).map_err(|e| {
            if is_valid_feed_content(content) {
                AggregatorError::Parse(format!("Failed to parse feed: {}", e))
            } else {
                AggregatorError::Parse(format!("Response is not an RSS/Atom document: {}", e))
            }
        })?;

        let title = feed.title.map(|t| t.content);
        let mut seen_urls = HashSet::new();
        let mut entries = Vec::new();

        for entry in feed.entries.into_iter().take(self.max_entries) {
            let Some(parsed) = normalize_entry(entry, now) else {
                continue;
            };
            if !seen_urls.insert(parsed.url.clone()) {
                debug!("Skipping duplicate entry with URL: {}", parsed.url);
                continue;
            }
            entries.push(parsed);
        }

        Ok(ParsedFeed { title, entries })
    }
}

fn normalize_entry(entry: feed_rs::model::Entry, now: DateTime<Utc>) -> Option<ParsedEntry> {
    let url = entry
        .links
        .iter()
        .map(|l| l.href.trim())
        .find(|href| !href.is_empty())?
        .to_string();

    let title = entry
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());

    let description = entry
        .summary
        .map(|s| s.content.trim().to_string())
        .filter(|s| !s.is_empty());

    let published_at = entry.published.or(entry.updated).unwrap_or(now);

    Some(ParsedEntry {
        url,
        title,
        description,
        published_at,
    })
}

/// Drops a byte order mark and leading whitespace, both of which make XML
/// parsers reject an otherwise valid document.
fn normalize_content(content: &str) -> &str {
    content.trim_start_matches('\u{feff}').trim_start()
}

pub fn is_valid_feed_content(content: &str) -> bool {
    let content_lower = content.to_lowercase();
    content_lower.contains("<rss")
        || content_lower.contains("<feed")
        || content_lower.contains("<rdf:rdf")
        || content_lower.contains("<channel")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Runway Daily</title>
    <link>https://runway.example</link>
    <description>Fixture</description>
    <item>
      <title>  Paris Fashion Week recap  </title>
      <link>https://runway.example/paris</link>
      <description>The best looks from the runway</description>
      <pubDate>Mon, 04 Mar 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <link>https://runway.example/untitled</link>
    </item>
    <item>
      <title>No link here</title>
    </item>
    <item>
      <title>Paris again</title>
      <link>https://runway.example/paris</link>
    </item>
  </channel>
</rss>"#;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn entries_are_normalized_with_fallbacks() {
        let feed = FeedParser::new(20).parse_feed(RSS, fixed_now()).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Runway Daily"));
        assert_eq!(feed.entries.len(), 2);

        let first = &feed.entries[0];
        assert_eq!(first.title, "Paris Fashion Week recap");
        assert_eq!(first.url, "https://runway.example/paris");
        assert_eq!(first.description.as_deref(), Some("The best looks from the runway"));
        assert_eq!(first.published_at, Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap());

        let second = &feed.entries[1];
        assert_eq!(second.title, NO_TITLE);
        assert_eq!(second.description, None);
        assert_eq!(second.published_at, fixed_now());
    }

    #[test]
    fn entry_cap_applies_before_filtering() {
        let feed = FeedParser::new(1).parse_feed(RSS, fixed_now()).unwrap();
        assert_eq!(feed.entries.len(), 1);
    }

    #[test]
    fn atom_updated_is_used_when_published_is_missing() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Beauty Notes</title>
  <id>urn:beauty</id>
  <updated>2024-03-02T08:30:00Z</updated>
  <entry>
    <title>Serum season</title>
    <id>urn:beauty:1</id>
    <link href="https://beauty.example/serum"/>
    <updated>2024-03-02T08:30:00Z</updated>
    <summary>Skincare picks</summary>
  </entry>
</feed>"#;
        let feed = FeedParser::new(20).parse_feed(atom, fixed_now()).unwrap();
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(
            feed.entries[0].published_at,
            Utc.with_ymd_and_hms(2024, 3, 2, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn leading_whitespace_and_bom_are_tolerated() {
        let padded = format!("\u{feff}\n  {}", RSS);
        assert!(FeedParser::new(20).parse_feed(&padded, fixed_now()).is_ok());
    }

    #[test]
    fn html_error_pages_are_parse_errors() {
        let err = FeedParser::new(20)
            .parse_feed("<html><body>503 Service Unavailable</body></html>", fixed_now())
            .unwrap_err();
        assert!(matches!(err, AggregatorError::Parse(_)));
        assert!(!is_valid_feed_content("<html></html>"));
    }
}
