use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::{MenuError, MenuTable};

/// How to find today's column in the menu table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnStrategy {
    /// Scan the header row for the day of month, e.g. "19日" or "5/19（月）".
    HeaderSearch { day_suffix: Option<String> },
    /// One column per weekday after the row-label column, Monday = 1.
    Positional,
}

impl Default for ColumnStrategy {
    fn default() -> Self {
        ColumnStrategy::HeaderSearch { day_suffix: None }
    }
}

impl ColumnStrategy {
    pub fn resolve_column(&self, table: &MenuTable, target: NaiveDate) -> Result<usize, MenuError> {
        match self {
            ColumnStrategy::HeaderSearch { day_suffix } => {
                find_day_column(table, target.day(), day_suffix.as_deref())
            }
            ColumnStrategy::Positional => positional(table, target),
        }
    }
}

/// Matches `day` as a whole number, so 5 does not hit "15" or "2015". A
/// number followed by `/` is the month of an "M/D" date and never matches.
fn day_pattern(day: u32, suffix: Option<&str>) -> Result<Regex, MenuError> {
    let tail = match suffix {
        Some(suffix) => regex::escape(suffix),
        None => "(?:[^\\d/]|$)".to_string(),
    };
    Regex::new(&format!("(?:^|\\D){day}{tail}"))
        .map_err(|e| MenuError::ExtractionError(format!("bad day pattern: {e}")))
}

/// First header column mentioning `day`, scanning left to right.
pub fn find_day_column(table: &MenuTable, day: u32, suffix: Option<&str>) -> Result<usize, MenuError> {
    let pattern = day_pattern(day, suffix)?;
    table
        .header()
        .iter()
        .position(|cell| cell.as_deref().is_some_and(|text| pattern.is_match(text)))
        .ok_or(MenuError::ColumnNotFound { day })
}

fn positional(table: &MenuTable, target: NaiveDate) -> Result<usize, MenuError> {
    let column = target.weekday().num_days_from_monday() as usize + 1;
    let width = table.width();
    if column >= width {
        return Err(MenuError::OutOfRange { column, width });
    }

    let day = target.day();
    let header = table.cell(0, column).unwrap_or_default();
    if !day_pattern(day, None)?.is_match(header) {
        return Err(MenuError::HeaderMismatch {
            column,
            day,
            header: header.to_string(),
        });
    }
    Ok(column)
}
