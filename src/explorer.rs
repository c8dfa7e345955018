use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{HourglassError, Result};
use crate::models::TimeEntry;

pub const DEFAULT_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    DateDesc,
    DateAsc,
    HoursDesc,
    HoursAsc,
}

pub const SORT_KEYS: &[SortKey] = &[
    SortKey::DateDesc,
    SortKey::DateAsc,
    SortKey::HoursDesc,
    SortKey::HoursAsc,
];

impl SortKey {
    pub fn key(&self) -> &'static str {
        match self {
            Self::DateDesc => "date_desc",
            Self::DateAsc => "date_asc",
            Self::HoursDesc => "hours_desc",
            Self::HoursAsc => "hours_asc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::DateDesc => "Date (Newest First)",
            Self::DateAsc => "Date (Oldest First)",
            Self::HoursDesc => "Hours (Highest First)",
            Self::HoursAsc => "Hours (Lowest First)",
        }
    }

    pub fn next(&self) -> Self {
        let i = SORT_KEYS.iter().position(|k| k == self).unwrap_or(0);
        SORT_KEYS[(i + 1) % SORT_KEYS.len()]
    }

    fn compare(&self, a: &TimeEntry, b: &TimeEntry) -> Ordering {
        match self {
            Self::DateAsc => dated_first(a, b).then_with(|| a.parsed_date.cmp(&b.parsed_date)),
            Self::DateDesc => dated_first(a, b).then_with(|| b.parsed_date.cmp(&a.parsed_date)),
            Self::HoursAsc => a.hours.total_cmp(&b.hours),
            Self::HoursDesc => b.hours.total_cmp(&a.hours),
        }
    }
}

/// Undated rows go last regardless of direction.
fn dated_first(a: &TimeEntry, b: &TimeEntry) -> Ordering {
    a.parsed_date.is_none().cmp(&b.parsed_date.is_none())
}

impl FromStr for SortKey {
    type Err = HourglassError;

    fn from_str(s: &str) -> Result<Self> {
        SORT_KEYS
            .iter()
            .find(|k| k.key() == s.trim())
            .copied()
            .ok_or_else(|| {
                HourglassError::Other(format!(
                    "unknown sort {s:?} (expected date_desc, date_asc, hours_desc or hours_asc)"
                ))
            })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Explorer output: the visible rows and how many matched before truncation.
#[derive(Debug, Clone, PartialEq)]
pub struct Explored<'a> {
    pub rows: Vec<&'a TimeEntry>,
    pub total: usize,
}

impl Explored<'_> {
    pub fn is_truncated(&self) -> bool {
        self.rows.len() < self.total
    }
}

pub fn explore<'a>(
    view: &[&'a TimeEntry],
    category: Option<&str>,
    service: Option<&str>,
    sort: SortKey,
    limit: usize,
) -> Explored<'a> {
    let mut rows: Vec<&'a TimeEntry> = view
        .iter()
        .copied()
        .filter(|e| category.map_or(true, |c| e.classification == c))
        .filter(|e| service.map_or(true, |s| e.service_item == s))
        .collect();
    rows.sort_by(|a, b| sort.compare(a, b));
    let total = rows.len();
    rows.truncate(limit);
    Explored { rows, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::entry;

    fn dates(explored: &Explored) -> Vec<String> {
        explored.rows.iter().map(|e| e.local_date.clone()).collect()
    }

    fn sample() -> Vec<TimeEntry> {
        let mut rows = vec![
            entry("2024-01-02", 3.0, "Admin"),
            entry("bad", 9.0, "Admin"),
            entry("2024-01-01", 1.0, "Dev"),
            entry("2024-01-03", 3.0, "Dev"),
        ];
        rows[3].service_item = "Tax".to_string();
        rows
    }

    #[test]
    fn test_limit_reports_total() {
        let entries: Vec<TimeEntry> = (0..1500)
            .map(|i| entry("2024-01-01", i as f64, "Admin"))
            .collect();
        let view: Vec<&TimeEntry> = entries.iter().collect();
        let out = explore(&view, None, None, SortKey::HoursDesc, DEFAULT_LIMIT);
        assert_eq!(out.rows.len(), 1000);
        assert_eq!(out.total, 1500);
        assert!(out.is_truncated());
        assert_eq!(out.rows[0].hours, 1499.0);
    }

    #[test]
    fn test_date_orders_put_undated_last() {
        let entries = sample();
        let view: Vec<&TimeEntry> = entries.iter().collect();
        let asc = explore(&view, None, None, SortKey::DateAsc, 10);
        assert_eq!(dates(&asc), vec!["2024-01-01", "2024-01-02", "2024-01-03", "bad"]);
        let desc = explore(&view, None, None, SortKey::DateDesc, 10);
        assert_eq!(dates(&desc), vec!["2024-01-03", "2024-01-02", "2024-01-01", "bad"]);
    }

    #[test]
    fn test_hours_sort_is_stable() {
        let entries = sample();
        let view: Vec<&TimeEntry> = entries.iter().collect();
        let desc = explore(&view, None, None, SortKey::HoursDesc, 10);
        // The two 3.0h rows keep their input order
        assert_eq!(dates(&desc), vec!["bad", "2024-01-02", "2024-01-03", "2024-01-01"]);
        let asc = explore(&view, None, None, SortKey::HoursAsc, 10);
        assert_eq!(dates(&asc), vec!["2024-01-01", "2024-01-02", "2024-01-03", "bad"]);
    }

    #[test]
    fn test_category_and_service_filters() {
        let entries = sample();
        let view: Vec<&TimeEntry> = entries.iter().collect();
        let out = explore(&view, Some("Dev"), None, SortKey::DateAsc, 10);
        assert_eq!(out.total, 2);
        let out = explore(&view, Some("Dev"), Some("Tax"), SortKey::DateAsc, 10);
        assert_eq!(dates(&out), vec!["2024-01-03"]);
        let out = explore(&view, Some("Nope"), None, SortKey::DateAsc, 10);
        assert_eq!(out.total, 0);
        assert!(out.rows.is_empty());
    }

    #[test]
    fn test_sort_key_parse_and_cycle() {
        assert_eq!("hours_asc".parse::<SortKey>().unwrap(), SortKey::HoursAsc);
        assert!("newest".parse::<SortKey>().is_err());
        assert_eq!(SortKey::HoursAsc.next(), SortKey::DateDesc);
        assert_eq!(SortKey::default(), SortKey::DateDesc);
    }
}
