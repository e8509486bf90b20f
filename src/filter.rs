use clap::ValueEnum;

use crate::table::{RawRow, BANK_DEPOSIT_COLUMN, DATE_COLUMN, STATUS_COLUMN};

const ACCEPTED_STATUS: &str = "accepte";
const NO_BANK_DEPOSIT: &str = "-";

/// Which rows of the selected day make it into the export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FilterMode {
    /// Every transaction of the day
    DateOnly,
    /// Accepted transactions of the day which were handed to the bank
    #[default]
    AcceptedAndBanked,
}

impl FilterMode {
    /// Whether `row` passes this filter for `selected_date`.
    ///
    /// `row` is expected to be normalized, so that `"Accepté"` reads as `"Accepte"`.
    pub fn accepts(self, row: &RawRow, selected_date: &str) -> bool {
        let on_date = row.value(DATE_COLUMN).starts_with(selected_date);
        match self {
            Self::DateOnly => on_date,
            Self::AcceptedAndBanked => on_date && is_banked(row) && is_accepted(row),
        }
    }

    pub fn apply<'a>(self, rows: &'a [RawRow], selected_date: &str) -> Vec<&'a RawRow> {
        rows.iter()
            .filter(|row| self.accepts(row, selected_date))
            .collect()
    }
}

fn is_banked(row: &RawRow) -> bool {
    matches!(row.get(BANK_DEPOSIT_COLUMN), Some(n) if !n.is_empty() && n != NO_BANK_DEPOSIT)
}

fn is_accepted(row: &RawRow) -> bool {
    row.value(STATUS_COLUMN).to_lowercase() == ACCEPTED_STATUS
}
