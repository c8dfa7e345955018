use std::io::Write;
use std::path::PathBuf;

use csv::Writer;

use super::{text, ExportFormat, Report, ReportData};
use crate::error::Result;
use crate::loader::REQUIRED_COLUMNS;
use crate::models::TimeEntry;

/// Write a report to `path` in the requested format, creating parent directories.
pub fn write_file(report: &Report, path: &str, format: ExportFormat) -> Result<()> {
    let p = PathBuf::from(path);
    if let Some(parent) = p.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match format {
        ExportFormat::Csv => write_csv(report, std::fs::File::create(&p)?)?,
        ExportFormat::Text => std::fs::write(&p, format!("{}\n", text::format_report(report)))?,
    }
    println!("Wrote {}", p.display());
    Ok(())
}

/// Write the report rows as CSV. Typed rows serialize with their field names
/// as headers; the trend grid gets one column per month.
pub fn write_csv<W: Write>(report: &Report, out: W) -> Result<()> {
    let mut wtr = Writer::from_writer(out);
    match &report.data {
        ReportData::Categories(rows) => {
            for row in rows {
                wtr.serialize(row)?;
            }
        }
        ReportData::Services(rows) => {
            for row in rows {
                wtr.serialize(row)?;
            }
        }
        ReportData::Monthly(rows) => {
            for row in rows {
                wtr.serialize(row)?;
            }
        }
        ReportData::Employees(rows) => {
            for row in rows {
                wtr.serialize(row)?;
            }
        }
        ReportData::Breakdown { rows, .. } => {
            for row in rows {
                wtr.serialize(row)?;
            }
        }
        ReportData::Trend(grid) => {
            let mut header = vec!["classification".to_string()];
            header.extend(grid.months.iter().cloned());
            wtr.write_record(&header)?;
            for (classification, hours) in grid.classifications.iter().zip(&grid.hours) {
                let mut record = vec![classification.clone()];
                record.extend(hours.iter().map(|h| format!("{h:.2}")));
                wtr.write_record(&record)?;
            }
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Explorer rows as CSV with the timesheet header, so the file loads back in.
pub fn write_entries_csv<W: Write>(rows: &[&TimeEntry], out: W) -> Result<()> {
    let mut wtr = Writer::from_writer(out);
    wtr.write_record(REQUIRED_COLUMNS)?;
    for e in rows {
        let hours = e.hours.to_string();
        wtr.write_record([
            e.local_date.as_str(),
            hours.as_str(),
            e.first_name.as_str(),
            e.last_name.as_str(),
            e.service_item.as_str(),
            e.notes.as_str(),
            e.classification.as_str(),
            e.classification_reason.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::entry;
    use crate::reports::{category_totals, pivot_trend, TrendPoint};

    fn render(report: &Report) -> String {
        let mut buf = Vec::new();
        write_csv(report, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_category_csv_uses_field_headers() {
        let entries = vec![entry("2024-01-01", 3.0, "Admin"), entry("2024-01-02", 1.0, "Dev")];
        let view: Vec<&TimeEntry> = entries.iter().collect();
        let report = Report {
            title: "Hours by Category".into(),
            window: "All Time".into(),
            data: ReportData::Categories(category_totals(&view)),
        };
        let out = render(&report);
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("classification,hours,entries,pct"));
        assert_eq!(lines.next(), Some("Admin,3.0,1,75.0"));
        assert_eq!(lines.next(), Some("Dev,1.0,1,25.0"));
    }

    #[test]
    fn test_trend_csv_has_month_columns() {
        let points = vec![
            TrendPoint { month: "2024-01".into(), classification: "Admin".into(), hours: 2.0 },
            TrendPoint { month: "2024-02".into(), classification: "Admin".into(), hours: 1.5 },
        ];
        let report = Report {
            title: "Category Trend".into(),
            window: "All Time".into(),
            data: ReportData::Trend(pivot_trend(&points)),
        };
        assert_eq!(render(&report), "classification,2024-01,2024-02\nAdmin,2.00,1.50\n");
    }

    #[test]
    fn test_entries_csv_keeps_source_columns() {
        let entries = vec![entry("2024-01-01", 2.5, "Admin")];
        let rows: Vec<&TimeEntry> = entries.iter().collect();
        let mut buf = Vec::new();
        write_entries_csv(&rows, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.starts_with("local_date,hours,fname,lname,service item,"));
        assert!(out.contains("2024-01-01,2.5,Ada,Lovelace,General,,Admin,"));
    }
}
