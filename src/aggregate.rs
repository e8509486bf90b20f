use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, warn};

use crate::classifier::{classify, Nature};
use crate::identity::extract_identity;
use crate::table::{
    RawRow, AMOUNT_COLUMN, DATE_COLUMN, EMAIL_COLUMN, REFERENCE_COLUMN, STATUS_COLUMN,
};

pub const HEADER_LABELS: [&str; 6] = [
    "Date de transaction",
    "Nom",
    "Prénom",
    "Mail",
    "Statut",
    "Montant",
];
pub const TOTAL_LABEL: &str = "Total";
/// Name of the single group emitted when no transaction survived filtering
pub const PLACEHOLDER_NAME: &str = "Transactions";

const AMOUNT_INDEX: usize = HEADER_LABELS.len() - 1;

/// A filtered row, classified and reduced to what the export needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub date: String,
    pub mail: String,
    pub nature: Nature,
    pub montant: Decimal,
    pub statut_transaction: String,
    pub prenom: String,
    pub nom: String,
}

impl TransactionRecord {
    pub fn from_row(row: &RawRow) -> Self {
        let mail = row.value(EMAIL_COLUMN);
        let identity = extract_identity(mail);
        Self {
            date: row.value(DATE_COLUMN).to_owned(),
            mail: mail.to_owned(),
            nature: classify(row.value(REFERENCE_COLUMN)),
            montant: parse_amount(row.value(AMOUNT_COLUMN)),
            statut_transaction: row.value(STATUS_COLUMN).to_owned(),
            prenom: identity.prenom,
            nom: identity.nom,
        }
    }

    /// Cells of this record, in the order of [`HEADER_LABELS`]
    pub fn cells(&self) -> [Cell; HEADER_LABELS.len()] {
        [
            Cell::Text(self.date.clone()),
            Cell::Text(self.nom.clone()),
            Cell::Text(self.prenom.clone()),
            Cell::Text(self.mail.clone()),
            Cell::Text(self.statut_transaction.clone()),
            Cell::Amount(self.montant),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Amount(Decimal),
}

/// Transactions sharing a nature, along with their total
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    pub name: String,
    pub records: Vec<TransactionRecord>,
    /// `None` for the placeholder group, which has neither rows nor total
    pub total: Option<Decimal>,
}

impl CategoryGroup {
    fn placeholder() -> Self {
        Self {
            name: PLACEHOLDER_NAME.to_owned(),
            records: Vec::new(),
            total: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.total.is_none()
    }

    pub fn headers(&self) -> &'static [&'static str] {
        &HEADER_LABELS
    }

    pub fn title(&self, selected_date: &str) -> String {
        format!("{} - {selected_date}", self.name)
    }

    pub fn data_rows(&self) -> impl Iterator<Item = [Cell; HEADER_LABELS.len()]> + '_ {
        self.records.iter().map(TransactionRecord::cells)
    }

    /// The synthetic row closing the group: the total under the amount column, labelled in the
    /// column just before it
    pub fn total_row(&self) -> Option<[Cell; HEADER_LABELS.len()]> {
        let total = self.total?;
        Some(std::array::from_fn(|i| match i {
            AMOUNT_INDEX => Cell::Amount(total),
            i if i + 1 == AMOUNT_INDEX => Cell::Text(TOTAL_LABEL.to_owned()),
            _ => Cell::Text(String::new()),
        }))
    }

    /// Total with exactly two decimals
    pub fn display_total(&self) -> Option<String> {
        self.total.map(|total| format!("{total:.2}"))
    }
}

/// Turns filtered rows into per-nature groups.
///
/// Groups appear in the order their nature is first met, after the optional stable sort on
/// lower-cased surname. No rows at all yields a single placeholder group.
pub fn aggregate(rows: &[&RawRow], sort_by_surname: bool) -> Vec<CategoryGroup> {
    let mut records: Vec<TransactionRecord> =
        rows.iter().map(|row| TransactionRecord::from_row(row)).collect();
    if records.is_empty() {
        debug!("No transaction to group, emitting the placeholder group");
        return vec![CategoryGroup::placeholder()];
    }
    if sort_by_surname {
        records.sort_by_cached_key(|record| record.nom.to_lowercase());
    }

    let mut groups: Vec<(Nature, Vec<TransactionRecord>)> = Vec::new();
    for record in records {
        match groups.iter_mut().find(|(nature, _)| *nature == record.nature) {
            Some((_, members)) => members.push(record),
            None => groups.push((record.nature, vec![record])),
        }
    }

    groups
        .into_iter()
        .map(|(nature, records)| {
            let total = sum_amounts(records.iter().map(|record| record.montant))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            debug!("{} transactions for {nature}, total {total}", records.len());
            CategoryGroup {
                name: nature.label().to_owned(),
                records,
                total: Some(total),
            }
        })
        .collect()
}

/// Sums `amounts`, saturating at the bounds of [`Decimal`] instead of overflowing.
fn sum_amounts(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts.into_iter().fold(Decimal::ZERO, |total, amount| {
        total.checked_add(amount).unwrap_or_else(|| {
            warn!("Total overflowed adding {amount} to {total}, clamping it");
            if amount.is_sign_negative() {
                Decimal::MIN
            } else {
                Decimal::MAX
            }
        })
    })
}

/// Reads the leading number of `s`, exponent included, ignoring whatever follows, like a
/// lenient float parse would. Anything unreadable counts as zero, numbers too large for a
/// [`Decimal`] are clamped and numbers too small for one count as zero.
pub fn parse_amount(s: &str) -> Decimal {
    static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"^\s*(?P<sign>[+-]?)(?P<mantissa>\d+(?:\.\d+)?|\.\d+)\.?(?:[eE](?P<exponent>[+-]?\d+))?",
        )
        .expect("regex")
    });

    let Some(groups) = LEADING_NUMBER.captures(s) else {
        return Decimal::ZERO;
    };
    let mantissa = &groups["mantissa"];
    let exponent = groups.name("exponent").map(|exponent| exponent.as_str());
    let parsed = match exponent {
        Some(exponent) => Decimal::from_scientific(&format!("{mantissa}e{exponent}")),
        None => Decimal::from_str(mantissa),
    };
    let magnitude = parsed.unwrap_or_else(|err| {
        if exponent.is_some_and(|exponent| exponent.starts_with('-')) {
            Decimal::ZERO
        } else {
            warn!("Amount {:?} does not fit ({err}), clamping it", groups[0].trim());
            Decimal::MAX
        }
    });
    if &groups["sign"] == "-" {
        -magnitude
    } else {
        magnitude
    }
}
