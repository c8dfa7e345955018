use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::error::{HourglassError, Result};
use crate::models::{Dataset, TimeEntry};

/// Header names the source must carry, in display order.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "local_date",
    "hours",
    "fname",
    "lname",
    "service item",
    "notes",
    "classification",
    "classification_reason",
];

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Lenient calendar-date parse. Returns `None` instead of failing.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive())
}

pub fn month_bucket(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Hours must be a finite number; anything else aborts the load.
pub fn parse_hours(raw: &str, row: usize) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|h| h.is_finite())
        .ok_or_else(|| HourglassError::InvalidHours {
            row,
            value: raw.to_string(),
        })
}

/// `None` when the serial is not finite or lands outside chrono's calendar.
#[cfg(any(feature = "xlsx", test))]
pub fn excel_serial_to_date(serial: f64) -> Option<String> {
    if !serial.is_finite() {
        return None;
    }
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let days = chrono::Duration::try_days(serial.trunc() as i64)?;
    let date = base.checked_add_signed(days)?;
    Some(date.format("%Y-%m-%d").to_string())
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

struct ColumnMap {
    local_date: usize,
    hours: usize,
    fname: usize,
    lname: usize,
    service_item: usize,
    notes: usize,
    classification: usize,
    classification_reason: usize,
}

impl ColumnMap {
    fn from_headers(headers: &[String]) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| find(c).is_none())
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(HourglassError::SchemaMismatch { missing });
        }
        let idx = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            local_date: idx("local_date"),
            hours: idx("hours"),
            fname: idx("fname"),
            lname: idx("lname"),
            service_item: idx("service item"),
            notes: idx("notes"),
            classification: idx("classification"),
            classification_reason: idx("classification_reason"),
        })
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

// ---------------------------------------------------------------------------
// Source formats: enum dispatch by file extension
// ---------------------------------------------------------------------------

struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceFormat {
    Csv,
    #[cfg(feature = "xlsx")]
    Xlsx,
}

impl SourceFormat {
    pub fn detect(path: &Path) -> Self {
        #[cfg(feature = "xlsx")]
        {
            let is_sheet = path.extension().is_some_and(|e| {
                e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xls")
            });
            if is_sheet {
                return Self::Xlsx;
            }
        }
        let _ = path;
        Self::Csv
    }

    fn read(&self, path: &Path) -> Result<RawTable> {
        match self {
            Self::Csv => read_csv(path),
            #[cfg(feature = "xlsx")]
            Self::Xlsx => read_xlsx(path),
        }
    }
}

fn open_source(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|source| HourglassError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

fn read_csv(path: &Path) -> Result<RawTable> {
    let file = open_source(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let headers = rdr.headers()?.iter().map(normalize_header).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawTable { headers, rows })
}

#[cfg(feature = "xlsx")]
fn read_xlsx(path: &Path) -> Result<RawTable> {
    use calamine::{Data, Reader};

    // Surface a missing file the same way as for CSV
    open_source(path)?;
    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| HourglassError::Xlsx(format!("Failed to open {}: {e}", path.display())))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| HourglassError::Xlsx(format!("{} has no worksheets", path.display())))?
        .map_err(|e| HourglassError::Xlsx(e.to_string()))?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(row) => row.iter().map(|c| normalize_header(&c.to_string())).collect(),
        None => Vec::new(),
    };
    let date_col = headers.iter().position(|h| h == "local_date");

    let rows = sheet_rows
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| {
                    let serial = match cell {
                        Data::Float(f) if Some(i) == date_col => Some(*f),
                        Data::Int(n) if Some(i) == date_col => Some(*n as f64),
                        Data::DateTime(dt) => Some(dt.as_f64()),
                        _ => None,
                    };
                    match cell {
                        Data::Empty => String::new(),
                        Data::String(s) => s.clone(),
                        // An unconvertible serial stays as its number and fails the date parse
                        other => serial
                            .and_then(excel_serial_to_date)
                            .unwrap_or_else(|| other.to_string()),
                    }
                })
                .collect()
        })
        .collect();
    Ok(RawTable { headers, rows })
}

// ---------------------------------------------------------------------------
// read_dataset
// ---------------------------------------------------------------------------

/// Read and parse the whole dataset. Date failures are absorbed; everything
/// else is fatal.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let started = Instant::now();
    let table = SourceFormat::detect(path).read(path)?;
    let cols = ColumnMap::from_headers(&table.headers)?;

    let mut entries = Vec::with_capacity(table.rows.len());
    let mut unparsed_dates = 0usize;
    for (i, row) in table.rows.iter().enumerate() {
        let line = i + 1;
        let field = |idx: usize| row.get(idx).cloned().unwrap_or_default();

        let hours = parse_hours(&field(cols.hours), line)?;
        let local_date = field(cols.local_date);
        let parsed_date = parse_date(&local_date);
        if parsed_date.is_none() {
            unparsed_dates += 1;
            debug!(row = line, value = %local_date, "unparseable local_date");
        }

        entries.push(TimeEntry {
            hours,
            first_name: field(cols.fname),
            last_name: field(cols.lname),
            service_item: field(cols.service_item),
            notes: field(cols.notes),
            classification: field(cols.classification),
            classification_reason: field(cols.classification_reason),
            month_bucket: parsed_date.map(month_bucket),
            parsed_date,
            local_date,
        });
    }

    if unparsed_dates > 0 {
        warn!(
            count = unparsed_dates,
            "rows with unparseable dates are excluded from date-bounded views"
        );
    }
    info!(
        path = %path.display(),
        rows = entries.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "dataset loaded"
    );

    Ok(Dataset {
        source: path.to_path_buf(),
        entries,
        unparsed_dates,
    })
}

// ---------------------------------------------------------------------------
// DatasetCache
// ---------------------------------------------------------------------------

/// Load-once holder for the dataset. Owned by whoever drives the pipeline;
/// shareable across threads. Two concurrent first loads may both read the
/// file, but only one result is kept.
#[derive(Debug)]
pub struct DatasetCache {
    path: PathBuf,
    slot: RwLock<Option<Arc<Dataset>>>,
    loads: AtomicUsize,
}

impl DatasetCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            slot: RwLock::new(None),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the cached dataset, reading the source on first use.
    pub fn load(&self) -> Result<Arc<Dataset>> {
        if let Some(ds) = self.cached() {
            debug!(path = %self.path.display(), "dataset cache hit");
            return Ok(ds);
        }
        let fresh = Arc::new(read_dataset(&self.path)?);
        self.loads.fetch_add(1, Ordering::Relaxed);
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(slot.get_or_insert(fresh)))
    }

    pub fn cached(&self) -> Option<Arc<Dataset>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Arc::clone)
    }

    pub fn invalidate(&self) {
        debug!(path = %self.path.display(), "dataset cache invalidated");
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn reload(&self) -> Result<Arc<Dataset>> {
        self.invalidate();
        self.load()
    }

    /// How many times the source has actually been read.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const HEADER: &str =
        "local_date,hours,fname,lname,service item,notes,classification,classification_reason\n";

    pub(crate) fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("{HEADER}{body}")).unwrap();
        path
    }

    #[test]
    fn test_parse_date_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5);
        assert_eq!(parse_date("2024-03-05"), d);
        assert_eq!(parse_date("2024/03/05"), d);
        assert_eq!(parse_date("03/05/2024"), d);
        assert_eq!(parse_date("2024-03-05 14:30:00"), d);
        assert_eq!(parse_date("2024-03-05T14:30"), d);
        assert_eq!(parse_date("2024-03-05T14:30:00-05:00"), d);
        assert_eq!(parse_date(" 2024-03-05 "), d);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("13/01/2024"), None);
    }

    #[test]
    fn test_month_bucket() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        assert_eq!(month_bucket(d), "2024-01");
    }

    #[test]
    fn test_parse_hours() {
        assert_eq!(parse_hours("1.5", 1).unwrap(), 1.5);
        assert_eq!(parse_hours(" -2 ", 1).unwrap(), -2.0);
        assert_eq!(parse_hours("0", 1).unwrap(), 0.0);
        assert!(matches!(
            parse_hours("", 7),
            Err(HourglassError::InvalidHours { row: 7, .. })
        ));
        assert!(parse_hours("NaN", 1).is_err());
        assert!(parse_hours("inf", 1).is_err());
        assert!(parse_hours("two", 1).is_err());
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45667.0).as_deref(), Some("2025-01-10"));
        assert_eq!(excel_serial_to_date(45667.75).as_deref(), Some("2025-01-10"));
    }

    #[test]
    fn test_excel_serial_out_of_range_is_none() {
        assert_eq!(excel_serial_to_date(1.0e9), None);
        assert_eq!(excel_serial_to_date(-1.0e12), None);
        assert_eq!(excel_serial_to_date(f64::NAN), None);
        assert_eq!(excel_serial_to_date(f64::INFINITY), None);
        assert_eq!(parse_date("1000000000"), None);
    }

    #[test]
    fn test_read_dataset_derives_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "t.csv",
            "2024-01-05,2,Ada,Lovelace,Audit,Prep work,Admin,keyword\n\
             not a date,1.25,Alan,Turing,Tax,,Dev,model\n",
        );
        let ds = read_dataset(&path).unwrap();
        assert_eq!(ds.entries.len(), 2);
        assert_eq!(ds.unparsed_dates, 1);

        let first = &ds.entries[0];
        assert_eq!(first.hours, 2.0);
        assert_eq!(first.service_item, "Audit");
        assert_eq!(first.month_bucket.as_deref(), Some("2024-01"));
        assert_eq!(first.employee(), "Ada Lovelace");

        let second = &ds.entries[1];
        assert_eq!(second.parsed_date, None);
        assert_eq!(second.month_bucket, None);
        assert_eq!(second.local_date, "not a date");
        assert_eq!(second.notes, "");
    }

    #[test]
    fn test_read_dataset_keeps_keys_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "t.csv",
            "2024-01-05,1,A,B,S,,Admin ,r\n2024-01-05,1,A,B,S,,admin,r\n",
        );
        let ds = read_dataset(&path).unwrap();
        assert_eq!(ds.entries[0].classification, "Admin ");
        assert_eq!(ds.entries[1].classification, "admin");
    }

    #[test]
    fn test_read_dataset_accepts_bom_and_reordered_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(
            &path,
            "\u{feff}hours,local_date,classification,fname,lname,service item,notes,classification_reason\n\
             3,2024-02-01,Dev,A,B,S,n,r\n",
        )
        .unwrap();
        let ds = read_dataset(&path).unwrap();
        assert_eq!(ds.entries[0].hours, 3.0);
        assert_eq!(ds.entries[0].classification, "Dev");
    }

    #[test]
    fn test_read_dataset_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_dataset(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, HourglassError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_read_dataset_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "local_date,hours,fname\n2024-01-01,1,A\n").unwrap();
        match read_dataset(&path).unwrap_err() {
            HourglassError::SchemaMismatch { missing } => {
                assert!(missing.contains(&"classification".to_string()));
                assert!(missing.contains(&"service item".to_string()));
                assert!(!missing.contains(&"hours".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_dataset_rejects_bad_hours() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "t.csv",
            "2024-01-05,1,A,B,S,,Admin,r\n2024-01-06,,A,B,S,,Admin,r\n",
        );
        let err = read_dataset(&path).unwrap_err();
        assert!(matches!(err, HourglassError::InvalidHours { row: 2, .. }));
    }

    // ---------------------------------------------------------------------------
    // Workbook sources
    // ---------------------------------------------------------------------------

    #[cfg(feature = "xlsx")]
    enum Cell {
        Text(&'static str),
        Num(f64),
    }

    #[cfg(feature = "xlsx")]
    fn write_xlsx(dir: &Path, name: &str, headers: &[&str], rows: &[Vec<Cell>]) -> PathBuf {
        let path = dir.join(name);
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (c, h) in headers.iter().enumerate() {
            sheet.write(0, c as u16, *h).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            let r = r as u32 + 1;
            for (c, cell) in row.iter().enumerate() {
                match cell {
                    Cell::Text(s) => sheet.write(r, c as u16, *s).unwrap(),
                    Cell::Num(n) => sheet.write(r, c as u16, *n).unwrap(),
                };
            }
        }
        workbook.save(&path).unwrap();
        path
    }

    #[cfg(feature = "xlsx")]
    fn xlsx_row(date: Cell, hours: Cell, classification: &'static str) -> Vec<Cell> {
        vec![
            date,
            hours,
            Cell::Text("Ada"),
            Cell::Text("Lovelace"),
            Cell::Text("Audit"),
            Cell::Text("Prep"),
            Cell::Text(classification),
            Cell::Text("keyword"),
        ]
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_read_xlsx_converts_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_xlsx(
            dir.path(),
            "t.xlsx",
            REQUIRED_COLUMNS,
            &[
                xlsx_row(Cell::Num(45667.0), Cell::Num(2.0), "Admin"),
                xlsx_row(Cell::Text("2024-03-05"), Cell::Num(1.25), "Dev"),
                xlsx_row(Cell::Num(1.0e9), Cell::Num(0.5), "Admin"),
            ],
        );
        assert_eq!(SourceFormat::detect(&path), SourceFormat::Xlsx);

        let ds = read_dataset(&path).unwrap();
        assert_eq!(ds.entries.len(), 3);
        assert_eq!(ds.unparsed_dates, 1);

        let first = &ds.entries[0];
        assert_eq!(first.local_date, "2025-01-10");
        assert_eq!(first.month_bucket.as_deref(), Some("2025-01"));
        assert_eq!(first.hours, 2.0);
        assert_eq!(first.employee(), "Ada Lovelace");
        assert_eq!(first.classification_reason, "keyword");

        assert_eq!(ds.entries[1].parsed_date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(ds.entries[1].hours, 1.25);

        let far = &ds.entries[2];
        assert_eq!(far.parsed_date, None);
        assert_eq!(far.local_date, "1000000000");
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_read_xlsx_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_xlsx(
            dir.path(),
            "t.xlsx",
            &["local_date", "hours", "fname"],
            &[vec![Cell::Num(45667.0), Cell::Num(1.0), Cell::Text("Ada")]],
        );
        match read_dataset(&path).unwrap_err() {
            HourglassError::SchemaMismatch { missing } => {
                assert!(missing.contains(&"lname".to_string()));
                assert!(!missing.contains(&"local_date".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_read_xlsx_rejects_text_hours() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_xlsx(
            dir.path(),
            "t.xlsx",
            REQUIRED_COLUMNS,
            &[
                xlsx_row(Cell::Num(45667.0), Cell::Num(1.0), "Admin"),
                xlsx_row(Cell::Num(45668.0), Cell::Text("lots"), "Admin"),
            ],
        );
        let err = read_dataset(&path).unwrap_err();
        assert!(matches!(err, HourglassError::InvalidHours { row: 2, .. }));
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_read_xlsx_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_dataset(&dir.path().join("nope.xlsx")).unwrap_err();
        assert!(matches!(err, HourglassError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_cache_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "t.csv", "2024-01-05,1,A,B,S,,Admin,r\n");
        let cache = DatasetCache::new(&path);
        assert!(cache.cached().is_none());

        let a = cache.load().unwrap();
        let b = cache.load().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.load_count(), 1);

        // Edits to the file are not seen until the cache is refreshed
        write_csv(dir.path(), "t.csv", "2024-01-05,1,A,B,S,,Admin,r\n2024-01-06,2,A,B,S,,Dev,r\n");
        assert_eq!(cache.load().unwrap().entries.len(), 1);

        let c = cache.reload().unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(c.entries.len(), 2);
        assert_eq!(cache.load_count(), 2);
    }

    #[test]
    fn test_cache_invalidate_then_load_rereads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "t.csv", "2024-01-05,1,A,B,S,,Admin,r\n");
        let cache = DatasetCache::new(&path);
        cache.load().unwrap();
        cache.invalidate();
        assert!(cache.cached().is_none());
        cache.load().unwrap();
        assert_eq!(cache.load_count(), 2);
    }

    #[test]
    fn test_cache_failure_leaves_slot_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DatasetCache::new(dir.path().join("missing.csv"));
        assert!(cache.load().is_err());
        assert!(cache.cached().is_none());
        assert_eq!(cache.load_count(), 0);
    }

    #[test]
    fn test_cache_shared_across_threads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "t.csv", "2024-01-05,1,A,B,S,,Admin,r\n");
        let cache = Arc::new(DatasetCache::new(&path));
        let first = cache.load().unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.load().unwrap())
            })
            .collect();
        for h in handles {
            assert!(Arc::ptr_eq(&first, &h.join().unwrap()));
        }
        assert_eq!(cache.load_count(), 1);
    }
}
