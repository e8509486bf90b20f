use chrono::NaiveDate;

use crate::table::{RawRow, DATE_COLUMN};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Where the dates offered for selection come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateIndexMode {
    /// Distinct days found in the uploaded rows
    #[default]
    Derived,
    /// Every day of a user-declared range, whatever the rows contain
    Range {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl DateIndexMode {
    pub fn available_dates(&self, rows: &[RawRow]) -> Vec<String> {
        match *self {
            Self::Derived => derived_dates(rows),
            Self::Range { start, end } => range_dates(start, end),
        }
    }
}

/// Distinct day prefixes (whatever precedes the first space) of the transaction timestamps, in
/// order of first appearance
pub fn derived_dates(rows: &[RawRow]) -> Vec<String> {
    let mut dates: Vec<String> = Vec::new();
    for row in rows {
        let day = day_prefix(row.value(DATE_COLUMN));
        if !day.is_empty() && !dates.iter().any(|seen| seen == day) {
            dates.push(day.to_owned());
        }
    }
    dates
}

/// Every day from `start` to `end` inclusive, formatted as `YYYY-MM-DD`.
///
/// Empty when a bound is missing or when `start` comes after `end`.
pub fn range_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<String> {
    let (Some(start), Some(end)) = (start, end) else {
        return Vec::new();
    };
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| day.format(DATE_FORMAT).to_string())
        .collect()
}

fn day_prefix(timestamp: &str) -> &str {
    timestamp.split(' ').next().unwrap_or_default()
}
