//! Recognized time range shapes

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// The shape a time range was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeRangeKind {
    /// `30 minutes ago`
    Ago,
    /// `since 1 day ago`
    SinceAgo,
    /// `2024-01-31` or `2024-01-31 12:00:00`
    Absolute,
    Yesterday,
    Today,
    /// `this week`
    ThisPeriod,
    /// `last month`
    LastPeriod,
}

impl fmt::Display for TimeRangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeRangeKind::Ago => "relative",
            TimeRangeKind::SinceAgo => "since-relative",
            TimeRangeKind::Absolute => "absolute",
            TimeRangeKind::Yesterday => "yesterday",
            TimeRangeKind::Today => "today",
            TimeRangeKind::ThisPeriod => "this-period",
            TimeRangeKind::LastPeriod => "last-period",
        };
        write!(f, "{}", name)
    }
}

static SHAPES: Lazy<Vec<(TimeRangeKind, Regex)>> = Lazy::new(|| {
    let shapes = [
        (
            TimeRangeKind::Ago,
            r"^[0-9]+\s+(second|minute|hour|day|week|month)s?\s+ago$",
        ),
        (
            TimeRangeKind::SinceAgo,
            r"^since\s+[0-9]+\s+(second|minute|hour|day|week|month)s?\s+ago$",
        ),
        (
            TimeRangeKind::Absolute,
            r"^[0-9]{4}-[0-9]{2}-[0-9]{2}(\s+[0-9]{2}:[0-9]{2}:[0-9]{2})?$",
        ),
        (TimeRangeKind::Yesterday, r"^yesterday$"),
        (TimeRangeKind::Today, r"^today$"),
        (
            TimeRangeKind::ThisPeriod,
            r"^this\s+(week|month|quarter|year)$",
        ),
        (
            TimeRangeKind::LastPeriod,
            r"^last\s+(week|month|quarter|year)$",
        ),
    ];

    shapes
        .into_iter()
        .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("invalid time range regex")))
        .collect()
});

/// Classify a time range, ignoring case and surrounding whitespace.
pub fn classify(time_range: &str) -> Option<TimeRangeKind> {
    let normalized = time_range.trim().to_lowercase();
    SHAPES
        .iter()
        .find(|(_, pattern)| pattern.is_match(&normalized))
        .map(|(kind, _)| *kind)
}
