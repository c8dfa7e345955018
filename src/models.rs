use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

/// One row of the classified timesheet, plus the fields derived at load time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeEntry {
    pub local_date: String,
    pub hours: f64,
    pub first_name: String,
    pub last_name: String,
    pub service_item: String,
    pub notes: String,
    pub classification: String,
    pub classification_reason: String,
    #[serde(skip)]
    pub parsed_date: Option<NaiveDate>,
    #[serde(skip)]
    pub month_bucket: Option<String>,
}

impl TimeEntry {
    pub fn employee(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// The loaded dataset. Never mutated after load.
#[derive(Debug)]
pub struct Dataset {
    pub source: PathBuf,
    pub entries: Vec<TimeEntry>,
    /// Rows whose `local_date` could not be parsed.
    pub unparsed_dates: usize,
}

impl Dataset {
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.entries.iter().filter_map(|e| e.parsed_date).min()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.entries.iter().filter_map(|e| e.parsed_date).max()
    }
}
