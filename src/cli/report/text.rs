use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use super::{Report, ReportData};
use crate::explorer::{Explored, SortKey};
use crate::fmt;
use crate::reports::{
    CategoryTotal, EmployeeTotal, MonthlyTotal, ServiceItemTotal, Summary, TrendGrid,
};

const EMPTY: &str = "No time entries in this range.";

const NOTES_WIDTH: usize = 48;

fn hours_cell(hours: f64) -> Cell {
    Cell::new(fmt::hours(hours)).set_alignment(CellAlignment::Right)
}

fn count_cell(n: usize) -> Cell {
    Cell::new(fmt::number(n)).set_alignment(CellAlignment::Right)
}

fn total_row(table: &mut Table, label_cols: usize, hours: f64, trailing: usize) {
    let mut cells = vec![Cell::new("Total".bold())];
    for _ in 1..label_cols {
        cells.push(Cell::new(""));
    }
    cells.push(hours_cell(hours));
    for _ in 0..trailing {
        cells.push(Cell::new(""));
    }
    table.add_row(cells);
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

pub fn format_report(report: &Report) -> String {
    let heading = format!("{} \u{00b7} {}", report.title, report.window);
    if report.data.is_empty() {
        return format!("{heading}\n{EMPTY}");
    }
    let body = match &report.data {
        ReportData::Categories(rows) => format_categories(rows),
        ReportData::Services(rows) => format_services(rows),
        ReportData::Monthly(rows) => format_monthly(rows),
        ReportData::Employees(rows) => format_employees(rows),
        ReportData::Trend(grid) => format_trend(grid),
        ReportData::Breakdown { rows, .. } => format_categories(rows),
    };
    format!("{heading}\n{body}")
}

pub fn format_categories(rows: &[CategoryTotal]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Classification", "Hours", "%", "Entries"]);
    for r in rows {
        table.add_row(vec![
            Cell::new(&r.classification),
            hours_cell(r.hours),
            Cell::new(fmt::pct(r.pct)).set_alignment(CellAlignment::Right),
            count_cell(r.entries),
        ]);
    }
    total_row(&mut table, 1, rows.iter().map(|r| r.hours).sum(), 2);
    table.to_string()
}

pub fn format_services(rows: &[ServiceItemTotal]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["#", "Service Item", "Hours", "Entries"]);
    for (i, r) in rows.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&r.service_item),
            hours_cell(r.hours),
            count_cell(r.entries),
        ]);
    }
    table.to_string()
}

pub fn format_monthly(rows: &[MonthlyTotal]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Month", "Hours"]);
    for r in rows {
        table.add_row(vec![Cell::new(&r.month), hours_cell(r.hours)]);
    }
    total_row(&mut table, 1, rows.iter().map(|r| r.hours).sum(), 0);
    table.to_string()
}

pub fn format_employees(rows: &[EmployeeTotal]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["First Name", "Last Name", "Hours", "Entries"]);
    for r in rows {
        table.add_row(vec![
            Cell::new(&r.first_name),
            Cell::new(&r.last_name),
            hours_cell(r.hours),
            count_cell(r.entries),
        ]);
    }
    total_row(&mut table, 2, rows.iter().map(|r| r.hours).sum(), 1);
    table.to_string()
}

pub fn format_trend(grid: &TrendGrid) -> String {
    let mut table = Table::new();
    let mut header = vec!["Classification".to_string()];
    header.extend(grid.months.iter().cloned());
    table.set_header(header);
    for (name, hours) in grid.classifications.iter().zip(&grid.hours) {
        let mut cells = vec![Cell::new(name)];
        cells.extend(hours.iter().map(|h| hours_cell(*h)));
        table.add_row(cells);
    }
    table.to_string()
}

// ---------------------------------------------------------------------------
// Summary and explorer
// ---------------------------------------------------------------------------

pub fn format_summary(summary: &Summary, window: &str, unparsed_dates: usize) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![Cell::new("Total Hours"), hours_cell(summary.total_hours)]);
    table.add_row(vec![Cell::new("Entries"), count_cell(summary.entries)]);
    let span = match (summary.first_date, summary.last_date) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "\u{2014}".to_string(),
    };
    table.add_row(vec![Cell::new("Date Range"), Cell::new(span)]);
    let mut out = format!("Summary \u{00b7} {window}\n{table}");
    if unparsed_dates > 0 {
        out.push_str(&format!(
            "\n{}",
            format!("{} entries have an unreadable date", fmt::number(unparsed_dates)).yellow()
        ));
    }
    out
}

pub fn format_explored(explored: &Explored, sort: SortKey, window: &str) -> String {
    let heading = format!("Time Entries \u{00b7} {window} \u{00b7} {}", sort.label());
    if explored.rows.is_empty() {
        return format!("{heading}\n{EMPTY}");
    }
    let mut table = Table::new();
    table.set_header(vec![
        "Date",
        "Hours",
        "Employee",
        "Service Item",
        "Classification",
        "Notes",
    ]);
    for e in &explored.rows {
        table.add_row(vec![
            Cell::new(&e.local_date),
            hours_cell(e.hours),
            Cell::new(e.employee()),
            Cell::new(&e.service_item),
            Cell::new(&e.classification),
            Cell::new(fmt::truncate(&e.notes, NOTES_WIDTH)),
        ]);
    }
    let footer = if explored.is_truncated() {
        format!(
            "Showing {} of {} entries",
            fmt::number(explored.rows.len()),
            fmt::number(explored.total)
        )
    } else {
        format!("{} entries", fmt::number(explored.total))
    };
    format!("{heading}\n{table}\n{footer}")
}
