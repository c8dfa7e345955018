use std::path::Path;

use crate::error::{HourglassError, Result};
use crate::filter::RangeMode;
use crate::loader::read_dataset;
use crate::models::Dataset;
use crate::settings::{load_settings, save_settings, settings_path, shellexpand_path};

pub fn run(
    path: &str,
    row_limit: Option<usize>,
    range: Option<String>,
    trend_categories: Option<usize>,
) -> Result<()> {
    let mut settings = load_settings();
    settings.dataset_path = shellexpand_path(path);

    if let Some(limit) = row_limit {
        if limit == 0 {
            return Err(HourglassError::Settings("row limit must be at least 1".into()));
        }
        settings.row_limit = limit;
    }
    if let Some(r) = range {
        // Validate before persisting; the key form is what gets stored
        let mode: RangeMode = r.parse()?;
        if mode == RangeMode::Custom {
            return Err(HourglassError::Settings(
                "default range must be a preset (all, 3d, 1w, 1m, 3m)".into(),
            ));
        }
        settings.default_range = mode.key().to_string();
    }
    if let Some(n) = trend_categories {
        settings.trend_categories = n;
    }

    save_settings(&settings)?;
    println!("Saved settings to {}", settings_path().display());

    // Fail now on a missing file or bad header row
    let dataset = read_dataset(Path::new(&settings.dataset_path))?;
    println!("{}", describe(&dataset));
    Ok(())
}

fn describe(dataset: &Dataset) -> String {
    let mut line = format!(
        "Dataset {} has {} entries",
        dataset.source.display(),
        crate::fmt::number(dataset.entries.len())
    );
    if let (Some(first), Some(last)) = (dataset.first_date(), dataset.last_date()) {
        line.push_str(&format!(" from {first} to {last}"));
    }
    line
}
