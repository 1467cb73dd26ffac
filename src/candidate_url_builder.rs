use chrono::{Datelike, NaiveDate};
use log::debug;

use crate::date_math::{add_days, add_weeks, shift_month, start_of_week};

pub const DEFAULT_BASE_URL: &str = "https://www.numazu-ct.ac.jp/wp-content/uploads";
pub const DEFAULT_LOOKBACK_WEEKS: u32 = 3;

/// A guessed location for the menu published for `reference_date`'s week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentCandidate {
    pub reference_date: NaiveDate,
    pub url: String,
}

/// Guesses where the weekly menu PDF lives.
///
/// The filename always carries the week's Monday (or Tuesday, when the
/// document ships a day late), but the upload folder has moved between
/// conventions over time, so every known convention is emitted as its own
/// candidate.
#[derive(Debug, Clone)]
pub struct CandidateUrlBuilder {
    base_url: String,
    lookback_weeks: u32,
    probe_tuesday: bool,
}

impl Default for CandidateUrlBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_LOOKBACK_WEEKS, true)
    }
}

impl CandidateUrlBuilder {
    pub fn new(base_url: &str, lookback_weeks: u32, probe_tuesday: bool) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            lookback_weeks,
            probe_tuesday,
        }
    }

    pub fn lookback_weeks(&self) -> u32 {
        self.lookback_weeks
    }

    /// Upper bound on the number of candidates `build_candidates` returns.
    pub fn max_candidates(&self) -> usize {
        let filenames = if self.probe_tuesday { 2 } else { 1 };
        self.lookback_weeks as usize * filenames * FOLDER_RULES
    }

    /// Candidates for `today`, current week first.
    pub fn build_candidates(&self, today: NaiveDate) -> Vec<DocumentCandidate> {
        let this_monday = start_of_week(today);
        let mut candidates = Vec::new();

        for week in 0..self.lookback_weeks {
            let monday = add_weeks(this_monday, -i64::from(week));
            let mut filename_dates = vec![monday];
            if self.probe_tuesday {
                filename_dates.push(add_days(monday, 1));
            }

            for file_date in filename_dates {
                for (year, month) in folder_variants(file_date) {
                    candidates.push(DocumentCandidate {
                        reference_date: monday,
                        url: self.url_for(year, month, file_date),
                    });
                }
            }
        }

        debug!(
            "built {} candidate urls for {} (lookback {} weeks)",
            candidates.len(),
            today,
            self.lookback_weeks
        );
        candidates
    }

    fn url_for(&self, folder_year: i32, folder_month: u32, file_date: NaiveDate) -> String {
        format!(
            "{}/{:04}/{:02}/kondate-{}.pdf",
            self.base_url,
            folder_year,
            folder_month,
            file_date.format("%Y%m%d")
        )
    }
}

const FOLDER_RULES: usize = 4;

/// Upload folders (year, month) the file for `file_date` has been seen in,
/// most likely first, without duplicates.
fn folder_variants(file_date: NaiveDate) -> Vec<(i32, u32)> {
    let week_before = add_days(file_date, -7);
    let rollover = if week_before.day() <= 14 {
        shift_month(week_before.year(), week_before.month(), 1)
    } else {
        (week_before.year(), week_before.month())
    };
    let two_weeks_before = add_days(file_date, -14);

    let rules: [(i32, u32); FOLDER_RULES] = [
        (file_date.year(), file_date.month()),
        rollover,
        (two_weeks_before.year(), two_weeks_before.month()),
        shift_month(file_date.year(), file_date.month(), -1),
    ];

    let mut variants = Vec::with_capacity(FOLDER_RULES);
    for folder in rules {
        if !variants.contains(&folder) {
            variants.push(folder);
        }
    }
    variants
}
