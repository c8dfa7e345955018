pub mod dashboard;
pub mod explore;
pub mod init;
pub mod report;
pub mod summary;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::error::{HourglassError, Result};
use crate::filter::{resolve_range, DateBounds, RangeMode};
use crate::loader::DatasetCache;
use crate::reports::Dimension;
use crate::settings::{load_settings, shellexpand_path, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "hourglass",
    version,
    about = "Explore classified timesheet hours from the terminal."
)]
pub struct Cli {
    /// Timesheet file to read (CSV or XLSX). Overrides the configured path.
    #[arg(long, global = true)]
    pub dataset: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Date-range selection shared by every data command.
#[derive(Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// Preset range: all, 3d, 1w, 1m, 3m, custom
    #[arg(long)]
    pub range: Option<String>,
    /// Start date: YYYY-MM-DD (implies --range custom)
    #[arg(long = "from")]
    pub from_date: Option<String>,
    /// End date, inclusive: YYYY-MM-DD (implies --range custom)
    #[arg(long = "to")]
    pub to_date: Option<String>,
}

impl RangeArgs {
    /// Resolve the flags into concrete bounds. With no flags the configured
    /// default range applies.
    pub fn resolve(&self, default_range: &str, today: NaiveDate) -> Result<(RangeMode, DateBounds)> {
        let start = parse_cli_date(self.from_date.as_deref())?;
        let end = parse_cli_date(self.to_date.as_deref())?;
        let mode = match self.range.as_deref() {
            Some(r) => r.parse()?,
            None if start.is_some() || end.is_some() => RangeMode::Custom,
            None => default_range.parse()?,
        };
        let bounds = resolve_range(mode, start, end, today)?;
        Ok((mode, bounds))
    }
}

fn parse_cli_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    let Some(s) = raw else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map(Some)
        .map_err(|_| HourglassError::Range(format!("invalid date {s:?} (expected YYYY-MM-DD)")))
}

/// Where a report goes when it is not shown interactively.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Write the report to a file instead of the terminal
    #[arg(long)]
    pub output: Option<String>,
    /// Output format: text or csv (default: from the --output extension)
    #[arg(long)]
    pub format: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Remember a timesheet path and display defaults.
    Init {
        /// Path to the classified timesheet (CSV or XLSX)
        path: String,
        /// Explorer row limit
        #[arg(long = "row-limit", value_parser = row_limit_parser())]
        row_limit: Option<usize>,
        /// Default range for commands without range flags
        #[arg(long)]
        range: Option<String>,
        /// Categories charted in the trend view by default
        #[arg(long = "trend-categories")]
        trend_categories: Option<usize>,
    },
    /// Total hours, entry count and date span for a range.
    Summary {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Aggregated hour reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Filter, sort and list individual time entries.
    Explore {
        #[command(flatten)]
        range: RangeArgs,
        /// Only entries with this classification
        #[arg(long)]
        category: Option<String>,
        /// Only entries with this service item
        #[arg(long)]
        service: Option<String>,
        /// Sort order: date_desc, date_asc, hours_desc, hours_asc
        #[arg(long, default_value = "date_desc")]
        sort: String,
        /// Maximum rows to show (default from settings)
        #[arg(long, value_parser = row_limit_parser())]
        limit: Option<usize>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Interactive dashboard with category, service, trend, employee and explorer tabs.
    Dashboard {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Print shell completions.
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Hours per classification.
    Categories {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Top 10 service items by hours.
    Services {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Hours per calendar month.
    Monthly {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Hours per employee.
    Employees {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Monthly hours per classification.
    Trend {
        /// Classification to include (repeatable; default: top categories)
        #[arg(long = "category")]
        categories: Vec<String>,
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Classification mix for one service item or employee.
    Breakdown {
        /// Service item to break down
        #[arg(long, conflicts_with = "employee", required_unless_present = "employee")]
        service: Option<String>,
        /// Employee to break down, as "FIRST LAST"
        #[arg(long)]
        employee: Option<String>,
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}

impl ReportCommands {
    pub fn range_args(&self) -> &RangeArgs {
        match self {
            Self::Categories { range, .. }
            | Self::Services { range, .. }
            | Self::Monthly { range, .. }
            | Self::Employees { range, .. }
            | Self::Trend { range, .. }
            | Self::Breakdown { range, .. } => range,
        }
    }

    pub fn output_args(&self) -> &OutputArgs {
        match self {
            Self::Categories { output, .. }
            | Self::Services { output, .. }
            | Self::Monthly { output, .. }
            | Self::Employees { output, .. }
            | Self::Trend { output, .. }
            | Self::Breakdown { output, .. } => output,
        }
    }
}

fn row_limit_parser() -> clap::builder::RangedU64ValueParser<usize> {
    clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
}

/// Parse an employee argument. Everything before the first space is the
/// first name; the remainder is the last name, kept verbatim.
pub(crate) fn parse_employee(raw: &str) -> Result<Dimension> {
    match raw.split_once(' ') {
        Some((first, last)) if !first.is_empty() && !last.is_empty() => Ok(Dimension::Employee {
            first: first.to_string(),
            last: last.to_string(),
        }),
        _ => Err(HourglassError::Other(format!(
            "employee must be given as \"FIRST LAST\", got {raw:?}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Settings plus the dataset cache for one invocation.
pub struct Session {
    pub settings: Settings,
    pub cache: DatasetCache,
}

impl Session {
    pub fn open(dataset: Option<&str>) -> Self {
        let settings = load_settings();
        let raw = dataset.unwrap_or(settings.dataset_path.as_str());
        let path = PathBuf::from(shellexpand_path(raw));
        Self {
            cache: DatasetCache::new(path),
            settings,
        }
    }

    pub fn resolve(&self, range: &RangeArgs) -> Result<(RangeMode, DateBounds)> {
        range.resolve(&self.settings.default_range, today())
    }
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
