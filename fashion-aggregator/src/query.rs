use crate::aggregator::NewsAggregator;
use crate::classifier::Category;
use crate::types::{AggregatorError, Article, Result, StatsRecord};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_LIMIT: usize = 200;
pub const ALL_CATEGORIES: &str = "All Categories";
pub const ALL_SOURCES: &str = "All Sources";

/// Age windows offered for browsing articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    #[default]
    AllTime,
    OneHour,
    TwelveHours,
    OneDay,
    TwoDays,
    ThreeDays,
}

impl TimeRange {
    pub const ALL: [TimeRange; 6] = [
        TimeRange::AllTime,
        TimeRange::OneHour,
        TimeRange::TwelveHours,
        TimeRange::OneDay,
        TimeRange::TwoDays,
        TimeRange::ThreeDays,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::AllTime => "All time",
            TimeRange::OneHour => "1 hour",
            TimeRange::TwelveHours => "12 hours",
            TimeRange::OneDay => "1 day",
            TimeRange::TwoDays => "2 days",
            TimeRange::ThreeDays => "3 days",
        }
    }

    /// `None` means no age limit.
    pub fn max_age_hours(&self) -> Option<f64> {
        match self {
            TimeRange::AllTime => None,
            TimeRange::OneHour => Some(1.0),
            TimeRange::TwelveHours => Some(12.0),
            TimeRange::OneDay => Some(24.0),
            TimeRange::TwoDays => Some(48.0),
            TimeRange::ThreeDays => Some(72.0),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeRange {
    type Err = AggregatorError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        TimeRange::ALL
            .into_iter()
            .find(|range| range.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AggregatorError::InvalidTimeRange(s.to_string()))
    }
}

/// Maps a category filter value to a category. Empty strings and
/// "All Categories" mean no filter.
pub fn parse_category_filter(value: Option<&str>) -> Result<Option<Category>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case(ALL_CATEGORIES) => Ok(None),
        Some(v) => v.parse().map(Some),
    }
}

/// Maps a source filter value to a source name. Empty strings and
/// "All Sources" mean no filter.
pub fn parse_source_filter(value: Option<&str>) -> Option<&str> {
    match value.map(str::trim) {
        None | Some("") => None,
        Some(v) if v.eq_ignore_ascii_case(ALL_SOURCES) => None,
        Some(v) => Some(v),
    }
}

/// Read-only view over an aggregator, accepting the loosely typed filter
/// values a dashboard or command line hands over.
#[derive(Clone)]
pub struct QueryFacade {
    aggregator: Arc<NewsAggregator>,
}

impl QueryFacade {
    pub fn new(aggregator: Arc<NewsAggregator>) -> Self {
        Self { aggregator }
    }

    pub async fn get_recent_articles(
        &self,
        limit: Option<usize>,
        category: Option<&str>,
        source: Option<&str>,
        time_range: Option<&str>,
    ) -> Result<Vec<Article>> {
        let category = parse_category_filter(category)?;
        let source = parse_source_filter(source);
        let max_age_hours = match time_range.map(str::trim).filter(|t| !t.is_empty()) {
            Some(label) => label.parse::<TimeRange>()?.max_age_hours(),
            None => None,
        };

        self.aggregator
            .get_recent_articles(limit.unwrap_or(DEFAULT_LIMIT), category, source, max_age_hours)
            .await
    }

    pub async fn get_stats(&self) -> Result<StatsRecord> {
        self.aggregator.get_stats().await
    }

    /// Registry source names, sorted.
    pub fn get_sources(&self) -> Vec<String> {
        self.aggregator.registry().source_names().into_iter().collect()
    }

    pub fn get_categories(&self) -> Vec<&'static str> {
        self.aggregator.classifier().categories()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_range_labels_resolve_to_hours() {
        assert_eq!("1 hour".parse::<TimeRange>().unwrap().max_age_hours(), Some(1.0));
        assert_eq!("12 HOURS".parse::<TimeRange>().unwrap().max_age_hours(), Some(12.0));
        assert_eq!(" 1 day ".parse::<TimeRange>().unwrap().max_age_hours(), Some(24.0));
        assert_eq!("2 days".parse::<TimeRange>().unwrap().max_age_hours(), Some(48.0));
        assert_eq!("3 days".parse::<TimeRange>().unwrap().max_age_hours(), Some(72.0));
        assert_eq!("All time".parse::<TimeRange>().unwrap().max_age_hours(), None);
    }

    #[test]
    fn unknown_time_range_is_rejected() {
        let err = "1 week".parse::<TimeRange>().unwrap_err();
        assert!(matches!(err, AggregatorError::InvalidTimeRange(_)));
    }

    #[test]
    fn sentinel_filters_mean_no_filter() {
        assert_eq!(parse_category_filter(Some(ALL_CATEGORIES)).unwrap(), None);
        assert_eq!(parse_category_filter(Some("")).unwrap(), None);
        assert_eq!(parse_category_filter(Some("beauty")).unwrap(), Some(Category::Beauty));
        assert!(matches!(
            parse_category_filter(Some("Sneakers")),
            Err(AggregatorError::InvalidCategory(_))
        ));

        assert_eq!(parse_source_filter(Some("All Sources")), None);
        assert_eq!(parse_source_filter(Some("  ")), None);
        assert_eq!(parse_source_filter(Some("Vogue")), Some("Vogue"));
    }
}
