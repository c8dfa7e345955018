pub mod export;
pub mod text;
pub mod view;

use std::io::IsTerminal;

use crate::cli::{parse_employee, OutputArgs, ReportCommands, Session};
use crate::error::{HourglassError, Result};
use crate::filter::{self, DateBounds, RangeMode};
use crate::reports::{
    self, CategoryTotal, Dimension, EmployeeTotal, MonthlyTotal, ServiceItemTotal, TrendGrid,
};

/// A computed report, ready for any of the three renderers.
pub struct Report {
    pub title: String,
    pub window: String,
    pub data: ReportData,
}

pub enum ReportData {
    Categories(Vec<CategoryTotal>),
    Services(Vec<ServiceItemTotal>),
    Monthly(Vec<MonthlyTotal>),
    Employees(Vec<EmployeeTotal>),
    Trend(TrendGrid),
    Breakdown {
        dimension: Dimension,
        rows: Vec<CategoryTotal>,
    },
}

impl ReportData {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Categories(rows) => rows.is_empty(),
            Self::Services(rows) => rows.is_empty(),
            Self::Monthly(rows) => rows.is_empty(),
            Self::Employees(rows) => rows.is_empty(),
            Self::Trend(grid) => grid.months.is_empty(),
            Self::Breakdown { rows, .. } => rows.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExportFormat {
    Text,
    Csv,
}

impl ExportFormat {
    /// An explicit --format wins; otherwise a `.csv` output path means CSV.
    pub(crate) fn resolve(args: &OutputArgs) -> Result<Self> {
        match args.format.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("text") | Some("txt") => Ok(Self::Text),
            Some("csv") => Ok(Self::Csv),
            Some(other) => Err(HourglassError::Other(format!(
                "unknown format {other:?} (expected text or csv)"
            ))),
            None => {
                let is_csv = args
                    .output
                    .as_deref()
                    .is_some_and(|p| p.to_ascii_lowercase().ends_with(".csv"));
                Ok(if is_csv { Self::Csv } else { Self::Text })
            }
        }
    }
}

/// Title suffix describing the active window, e.g. "Last Week (2024-03-03 to 2024-03-10)".
pub(crate) fn window_label(mode: RangeMode, bounds: &DateBounds) -> String {
    if bounds.is_unbounded() {
        mode.label().to_string()
    } else {
        format!("{} ({})", mode.label(), bounds.describe())
    }
}

pub fn dispatch(session: &Session, cmd: ReportCommands) -> Result<()> {
    let report = build(session, &cmd)?;
    let args = cmd.output_args();
    let format = ExportFormat::resolve(args)?;

    if let Some(path) = &args.output {
        export::write_file(&report, path, format)
    } else if format == ExportFormat::Csv {
        export::write_csv(&report, std::io::stdout().lock())
    } else if std::io::stdout().is_terminal() {
        view::show(report)
    } else {
        // Non-TTY: plain text to stdout
        println!("{}", text::format_report(&report));
        Ok(())
    }
}

pub(crate) fn build(session: &Session, cmd: &ReportCommands) -> Result<Report> {
    let (mode, bounds) = session.resolve(cmd.range_args())?;
    let dataset = session.cache.load()?;
    let view = filter::apply(&dataset.entries, &bounds);

    let (title, data) = match cmd {
        ReportCommands::Categories { .. } => (
            "Hours by Category".to_string(),
            ReportData::Categories(reports::category_totals(&view)),
        ),
        ReportCommands::Services { .. } => (
            format!("Top {} Service Items", reports::TOP_N),
            ReportData::Services(reports::service_item_totals(&view)),
        ),
        ReportCommands::Monthly { .. } => (
            "Monthly Hours".to_string(),
            ReportData::Monthly(reports::monthly_totals(&view)),
        ),
        ReportCommands::Employees { .. } => (
            "Hours by Employee".to_string(),
            ReportData::Employees(reports::employee_totals(&view)),
        ),
        ReportCommands::Trend { categories, .. } => {
            let totals = reports::category_totals(&view);
            let selection =
                reports::trend_selection(categories, &totals, session.settings.trend_categories);
            let points = reports::select_trend(&reports::category_trend(&view), &selection);
            (
                "Category Trend".to_string(),
                ReportData::Trend(reports::pivot_trend(&points)),
            )
        }
        ReportCommands::Breakdown {
            service, employee, ..
        } => {
            let dimension = match (service, employee) {
                (Some(name), _) => Dimension::ServiceItem(name.clone()),
                (None, Some(raw)) => parse_employee(raw)?,
                (None, None) => {
                    return Err(HourglassError::Other(
                        "breakdown needs --service or --employee".into(),
                    ))
                }
            };
            let rows = reports::category_breakdown(&view, &dimension);
            (
                format!("Category Breakdown: {}", dimension.label()),
                ReportData::Breakdown { dimension, rows },
            )
        }
    };

    Ok(Report {
        title,
        window: window_label(mode, &bounds),
        data,
    })
}
