use std::io::IsTerminal;

use crate::browser::EntryBrowser;
use crate::cli::report::{export, text, window_label, ExportFormat};
use crate::cli::{OutputArgs, RangeArgs, Session};
use crate::error::Result;
use crate::explorer::{self, SortKey};
use crate::filter;

pub struct ExploreArgs {
    pub range: RangeArgs,
    pub category: Option<String>,
    pub service: Option<String>,
    pub sort: String,
    pub limit: Option<usize>,
    pub output: OutputArgs,
}

pub fn run(session: &Session, args: ExploreArgs) -> Result<()> {
    let sort: SortKey = args.sort.parse()?;
    let (mode, bounds) = session.resolve(&args.range)?;
    let limit = args.limit.unwrap_or(session.settings.row_limit);
    let format = ExportFormat::resolve(&args.output)?;

    let dataset = session.cache.load()?;
    let view = filter::apply(&dataset.entries, &bounds);
    let explored = explorer::explore(
        &view,
        args.category.as_deref(),
        args.service.as_deref(),
        sort,
        limit,
    );
    let window = window_label(mode, &bounds);

    match (&args.output.output, format) {
        (Some(path), ExportFormat::Csv) => {
            let file = std::fs::File::create(path)?;
            export::write_entries_csv(&explored.rows, file)?;
            println!("Wrote {path}");
        }
        (Some(path), ExportFormat::Text) => {
            std::fs::write(path, format!("{}\n", text::format_explored(&explored, sort, &window)))?;
            println!("Wrote {path}");
        }
        (None, ExportFormat::Csv) => {
            export::write_entries_csv(&explored.rows, std::io::stdout().lock())?;
        }
        (None, ExportFormat::Text) if std::io::stdout().is_terminal() => {
            let mut filters = vec![window, sort.label().to_string()];
            filters.extend(args.category.iter().cloned());
            filters.extend(args.service.iter().cloned());
            let rows = explored.rows.iter().map(|&e| e.clone()).collect();
            EntryBrowser::new(rows, explored.total, filters.join(" \u{00b7} ")).run()?;
        }
        (None, ExportFormat::Text) => {
            println!("{}", text::format_explored(&explored, sort, &window));
        }
    }
    Ok(())
}
