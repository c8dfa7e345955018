use std::collections::HashMap;
use std::hash::Hash;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::TimeEntry;

/// Row cap for the service item view.
pub const TOP_N: usize = 10;

/// Categories charted in the trend view when the caller picks none.
pub const DEFAULT_TREND_CATEGORIES: usize = 5;

// ---------------------------------------------------------------------------
// Grouping helpers
// ---------------------------------------------------------------------------

/// Sum hours per key, keeping keys in first-seen order. Rows for which `key`
/// returns `None` are skipped.
fn group_hours<'a, K, F>(view: &[&'a TimeEntry], key: F) -> Vec<(K, f64, usize)>
where
    K: Eq + Hash + Clone,
    F: Fn(&'a TimeEntry) -> Option<K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, f64, usize)> = Vec::new();
    for &entry in view {
        let Some(k) = key(entry) else { continue };
        match index.get(&k) {
            Some(&i) => {
                groups[i].1 += entry.hours;
                groups[i].2 += 1;
            }
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, entry.hours, 1));
            }
        }
    }
    groups
}

/// Stable descending sort by hours; ties keep first-seen order.
fn sort_by_hours_desc<T>(rows: &mut [T], hours: impl Fn(&T) -> f64) {
    rows.sort_by(|a, b| hours(b).total_cmp(&hours(a)));
}

// ---------------------------------------------------------------------------
// Category totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub classification: String,
    pub hours: f64,
    pub entries: usize,
    /// Share of the view's total hours, in percent.
    pub pct: f64,
}

pub fn category_totals(view: &[&TimeEntry]) -> Vec<CategoryTotal> {
    let groups = group_hours(view, |e| Some(e.classification.clone()));
    let total: f64 = groups.iter().map(|(_, h, _)| h).sum();
    let mut rows: Vec<CategoryTotal> = groups
        .into_iter()
        .map(|(classification, hours, entries)| CategoryTotal {
            classification,
            hours,
            entries,
            pct: if total != 0.0 { hours / total * 100.0 } else { 0.0 },
        })
        .collect();
    sort_by_hours_desc(&mut rows, |r| r.hours);
    rows
}

// ---------------------------------------------------------------------------
// Service items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceItemTotal {
    pub service_item: String,
    pub hours: f64,
    pub entries: usize,
}

/// Top [`TOP_N`] service items by hours.
pub fn service_item_totals(view: &[&TimeEntry]) -> Vec<ServiceItemTotal> {
    let mut rows: Vec<ServiceItemTotal> = group_hours(view, |e| Some(e.service_item.clone()))
        .into_iter()
        .map(|(service_item, hours, entries)| ServiceItemTotal {
            service_item,
            hours,
            entries,
        })
        .collect();
    sort_by_hours_desc(&mut rows, |r| r.hours);
    rows.truncate(TOP_N);
    rows
}

// ---------------------------------------------------------------------------
// Monthly totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    pub month: String,
    pub hours: f64,
}

/// Hours per "YYYY-MM" bucket, oldest first. Undated rows are dropped.
pub fn monthly_totals(view: &[&TimeEntry]) -> Vec<MonthlyTotal> {
    let mut rows: Vec<MonthlyTotal> = group_hours(view, |e| e.month_bucket.clone())
        .into_iter()
        .map(|(month, hours, _)| MonthlyTotal { month, hours })
        .collect();
    rows.sort_by(|a, b| a.month.cmp(&b.month));
    rows
}

// ---------------------------------------------------------------------------
// Employees
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeTotal {
    pub first_name: String,
    pub last_name: String,
    pub hours: f64,
    pub entries: usize,
}

impl EmployeeTotal {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn dimension(&self) -> Dimension {
        Dimension::Employee {
            first: self.first_name.clone(),
            last: self.last_name.clone(),
        }
    }
}

pub fn employee_totals(view: &[&TimeEntry]) -> Vec<EmployeeTotal> {
    let mut rows: Vec<EmployeeTotal> = group_hours(view, |e| {
        Some((e.first_name.clone(), e.last_name.clone()))
    })
    .into_iter()
    .map(|((first_name, last_name), hours, entries)| EmployeeTotal {
        first_name,
        last_name,
        hours,
        entries,
    })
    .collect();
    sort_by_hours_desc(&mut rows, |r| r.hours);
    rows
}

// ---------------------------------------------------------------------------
// Category breakdown for one service item or employee
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dimension {
    ServiceItem(String),
    Employee { first: String, last: String },
}

impl Dimension {
    pub fn matches(&self, entry: &TimeEntry) -> bool {
        match self {
            Self::ServiceItem(name) => entry.service_item == *name,
            Self::Employee { first, last } => {
                entry.first_name == *first && entry.last_name == *last
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::ServiceItem(name) => name.clone(),
            Self::Employee { first, last } => format!("{first} {last}"),
        }
    }
}

pub fn category_breakdown(view: &[&TimeEntry], dimension: &Dimension) -> Vec<CategoryTotal> {
    let subset: Vec<&TimeEntry> = view
        .iter()
        .copied()
        .filter(|e| dimension.matches(e))
        .collect();
    category_totals(&subset)
}

// ---------------------------------------------------------------------------
// Category trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub month: String,
    pub classification: String,
    pub hours: f64,
}

/// Hours per (month, classification), oldest month first. Within a month,
/// classifications keep first-seen order.
pub fn category_trend(view: &[&TimeEntry]) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = group_hours(view, |e| {
        e.month_bucket
            .clone()
            .map(|m| (m, e.classification.clone()))
    })
    .into_iter()
    .map(|((month, classification), hours, _)| TrendPoint {
        month,
        classification,
        hours,
    })
    .collect();
    points.sort_by(|a, b| a.month.cmp(&b.month));
    points
}

/// Categories to chart: the caller's picks, or the top `n` by total hours.
pub fn trend_selection(requested: &[String], totals: &[CategoryTotal], n: usize) -> Vec<String> {
    if !requested.is_empty() {
        return requested.to_vec();
    }
    totals
        .iter()
        .take(n)
        .map(|t| t.classification.clone())
        .collect()
}

pub fn select_trend(points: &[TrendPoint], selection: &[String]) -> Vec<TrendPoint> {
    points
        .iter()
        .filter(|p| selection.contains(&p.classification))
        .cloned()
        .collect()
}

/// Month x classification matrix for heatmap-style display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrendGrid {
    pub months: Vec<String>,
    pub classifications: Vec<String>,
    /// `hours[c][m]` for classification `c` and month `m`.
    pub hours: Vec<Vec<f64>>,
}

pub fn pivot_trend(points: &[TrendPoint]) -> TrendGrid {
    let mut months: Vec<String> = Vec::new();
    let mut classifications: Vec<String> = Vec::new();
    for p in points {
        if !months.contains(&p.month) {
            months.push(p.month.clone());
        }
        if !classifications.contains(&p.classification) {
            classifications.push(p.classification.clone());
        }
    }
    months.sort();

    let mut hours = vec![vec![0.0; months.len()]; classifications.len()];
    for p in points {
        let m = months.iter().position(|x| *x == p.month);
        let c = classifications.iter().position(|x| *x == p.classification);
        if let (Some(m), Some(c)) = (m, c) {
            hours[c][m] += p.hours;
        }
    }
    TrendGrid {
        months,
        classifications,
        hours,
    }
}

// ---------------------------------------------------------------------------
// Summary and filter choices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    pub total_hours: f64,
    pub entries: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

pub fn summary(view: &[&TimeEntry]) -> Summary {
    let dates = view.iter().filter_map(|e| e.parsed_date);
    Summary {
        total_hours: view.iter().map(|e| e.hours).sum(),
        entries: view.len(),
        first_date: dates.clone().min(),
        last_date: dates.max(),
    }
}

pub fn distinct_classifications(view: &[&TimeEntry]) -> Vec<String> {
    distinct(view, |e| &e.classification)
}

pub fn distinct_service_items(view: &[&TimeEntry]) -> Vec<String> {
    distinct(view, |e| &e.service_item)
}

fn distinct<'a>(view: &[&'a TimeEntry], field: impl Fn(&'a TimeEntry) -> &'a String) -> Vec<String> {
    let mut values: Vec<String> = view.iter().map(|&e| field(e).clone()).collect();
    values.sort();
    values.dedup();
    values
}
