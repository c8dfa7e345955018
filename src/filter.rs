use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};

use crate::error::{HourglassError, Result};
use crate::models::TimeEntry;

// ---------------------------------------------------------------------------
// Range modes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeMode {
    #[default]
    All,
    Last3Days,
    LastWeek,
    LastMonth,
    Last3Months,
    Custom,
}

/// Presets the dashboard cycles through (custom needs explicit dates).
pub const PRESETS: &[RangeMode] = &[
    RangeMode::All,
    RangeMode::Last3Days,
    RangeMode::LastWeek,
    RangeMode::LastMonth,
    RangeMode::Last3Months,
];

impl RangeMode {
    pub fn key(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Last3Days => "3d",
            Self::LastWeek => "1w",
            Self::LastMonth => "1m",
            Self::Last3Months => "3m",
            Self::Custom => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "All Time",
            Self::Last3Days => "Last 3 Days",
            Self::LastWeek => "Last Week",
            Self::LastMonth => "Last Month",
            Self::Last3Months => "Last 3 Months",
            Self::Custom => "Custom Range",
        }
    }

    /// Days subtracted from today for the lower bound of a preset.
    fn lookback_days(&self) -> Option<i64> {
        match self {
            Self::Last3Days => Some(3),
            Self::LastWeek => Some(7),
            Self::LastMonth => Some(30),
            Self::Last3Months => Some(90),
            Self::All | Self::Custom => None,
        }
    }

    /// Next preset in dashboard order. Custom falls back to All.
    pub fn next_preset(&self) -> Self {
        let idx = PRESETS.iter().position(|m| m == self);
        match idx {
            Some(i) => PRESETS[(i + 1) % PRESETS.len()],
            None => RangeMode::All,
        }
    }
}

impl FromStr for RangeMode {
    type Err = HourglassError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "3d" | "last_3_days" => Ok(Self::Last3Days),
            "1w" | "last_week" => Ok(Self::LastWeek),
            "1m" | "last_month" => Ok(Self::LastMonth),
            "3m" | "last_3_months" => Ok(Self::Last3Months),
            "custom" => Ok(Self::Custom),
            other => Err(HourglassError::Range(format!(
                "unknown range {other:?} (expected all, 3d, 1w, 1m, 3m or custom)"
            ))),
        }
    }
}

impl fmt::Display for RangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateBounds {
    pub lower: Option<NaiveDate>,
    pub upper: Option<NaiveDate>,
    /// When set, `upper` is compared with `<` instead of `<=`.
    pub upper_exclusive: bool,
}

impl DateBounds {
    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(d) = date else {
            return false;
        };
        let above = self.lower.map_or(true, |lo| d >= lo);
        let below = match self.upper {
            None => true,
            Some(hi) if self.upper_exclusive => d < hi,
            Some(hi) => d <= hi,
        };
        above && below
    }

    /// Human-readable window with inclusive end dates, e.g. "2024-03-03 to 2024-03-10".
    pub fn describe(&self) -> String {
        let last_day = match self.upper {
            Some(hi) if self.upper_exclusive => hi.pred_opt(),
            other => other,
        };
        match (self.lower, last_day) {
            (None, None) => "all dates".to_string(),
            (Some(lo), None) => format!("from {lo}"),
            (None, Some(hi)) => format!("through {hi}"),
            (Some(lo), Some(hi)) => format!("{lo} to {hi}"),
        }
    }
}

/// Turn a range selection into concrete bounds relative to `today`.
pub fn resolve_range(
    mode: RangeMode,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<DateBounds> {
    match mode {
        RangeMode::All => Ok(DateBounds::default()),
        RangeMode::Custom => {
            let (Some(start), Some(end)) = (start, end) else {
                return Err(HourglassError::Range(
                    "custom range requires both --from and --to".to_string(),
                ));
            };
            let upper = end.checked_add_signed(Duration::days(1)).ok_or_else(|| {
                HourglassError::Range(format!("end date {end} is out of range"))
            })?;
            Ok(DateBounds {
                lower: Some(start),
                upper: Some(upper),
                upper_exclusive: true,
            })
        }
        preset => {
            let days = preset.lookback_days().unwrap_or_default();
            Ok(DateBounds {
                lower: today.checked_sub_signed(Duration::days(days)),
                upper: Some(today),
                upper_exclusive: false,
            })
        }
    }
}

/// Order-preserving filter over the parsed date.
pub fn apply<'a, I>(entries: I, bounds: &DateBounds) -> Vec<&'a TimeEntry>
where
    I: IntoIterator<Item = &'a TimeEntry>,
{
    entries
        .into_iter()
        .filter(|e| bounds.contains(e.parsed_date))
        .collect()
}
