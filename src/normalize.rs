use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::table::RawRow;

/// Folds a string down to printable ASCII so that headers and cell values can be matched
/// reliably regardless of how the exporting tool encoded accents.
///
/// 1. The string is decomposed (NFD) and combining diacritical marks are dropped, so `"é"`
///    becomes `"e"`
/// 2. Typographic single quotes (`‘` and `’`) become `'`
/// 3. Anything left outside of `0x20..=0x7E` is removed
///
/// The output never has more characters than the input, and normalizing twice yields the same
/// result as normalizing once.
pub fn normalize(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            c => c,
        })
        .filter(|c| matches!(c, ' '..='~'))
        .collect()
}

/// Normalizes every column name and every cell value of a row.
pub fn normalize_row(row: &RawRow) -> RawRow {
    row.iter()
        .map(|(key, value)| (normalize(key), normalize(value)))
        .collect()
}
