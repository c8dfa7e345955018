use crate::cli::report::{text, window_label};
use crate::cli::{RangeArgs, Session};
use crate::error::Result;
use crate::filter;
use crate::reports;

pub fn run(session: &Session, range: &RangeArgs) -> Result<()> {
    let (mode, bounds) = session.resolve(range)?;
    let dataset = session.cache.load()?;
    let view = filter::apply(&dataset.entries, &bounds);
    let summary = reports::summary(&view);
    println!(
        "{}",
        text::format_summary(&summary, &window_label(mode, &bounds), dataset.unparsed_dates)
    );
    Ok(())
}
