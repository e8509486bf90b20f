use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Color, Format, FormatBorder, FormatPattern, Workbook, Worksheet, XlsxError};
use tracing::debug;

use crate::aggregate::{CategoryGroup, Cell, PLACEHOLDER_NAME};

const MAX_SHEET_NAME_LEN: usize = 31;
const FORBIDDEN_SHEET_NAME_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];
const AMOUNT_FORMAT: &str = "0.00";

const TITLE_ROW: u32 = 0;
const HEADER_ROW: u32 = 1;
const FIRST_DATA_ROW: u32 = 2;

/// Renders aggregated groups into an XLSX document, one worksheet per group.
///
/// Each worksheet is laid out as follows:
///
/// 1. A bold title, merged across every column
/// 2. The column headers, bold on a solid yellow background
/// 3. The transactions, amounts written as numbers
/// 4. A bold total row, unless the group is the empty-export placeholder
pub struct WorkbookBuilder {
    title: Format,
    header: Format,
    amount: Format,
    total: Format,
    total_amount: Format,
}

impl Default for WorkbookBuilder {
    fn default() -> Self {
        Self {
            title: Format::new().set_bold().set_font_size(14),
            header: Format::new()
                .set_bold()
                .set_pattern(FormatPattern::Solid)
                .set_background_color(Color::Yellow)
                .set_border(FormatBorder::Thin),
            amount: Format::new().set_num_format(AMOUNT_FORMAT),
            total: Format::new().set_bold(),
            total_amount: Format::new().set_bold().set_num_format(AMOUNT_FORMAT),
        }
    }
}

impl WorkbookBuilder {
    pub fn build(&self, groups: &[CategoryGroup], selected_date: &str) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let mut used_names = Vec::with_capacity(groups.len());
        for group in groups {
            let name = sheet_name(&group.name, &used_names);
            debug!("Writing sheet {name:?} for {:?}", group.name);
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&name)?;
            self.write_group(worksheet, group, selected_date)?;
            used_names.push(name);
        }
        workbook.save_to_buffer()
    }

    fn write_group(
        &self,
        worksheet: &mut Worksheet,
        group: &CategoryGroup,
        selected_date: &str,
    ) -> Result<(), XlsxError> {
        let headers = group.headers();
        let last_col = (headers.len() - 1) as u16;

        worksheet.merge_range(
            TITLE_ROW,
            0,
            TITLE_ROW,
            last_col,
            &group.title(selected_date),
            &self.title,
        )?;
        for (col, label) in (0u16..).zip(headers) {
            worksheet.write_string_with_format(HEADER_ROW, col, *label, &self.header)?;
            worksheet.set_column_width(col, column_width(label))?;
        }

        let mut row = FIRST_DATA_ROW;
        for cells in group.data_rows() {
            self.write_cells(worksheet, row, &cells, None, &self.amount)?;
            row += 1;
        }
        if let Some(cells) = group.total_row() {
            self.write_cells(worksheet, row, &cells, Some(&self.total), &self.total_amount)?;
        }
        Ok(())
    }

    fn write_cells(
        &self,
        worksheet: &mut Worksheet,
        row: u32,
        cells: &[Cell],
        text_format: Option<&Format>,
        amount_format: &Format,
    ) -> Result<(), XlsxError> {
        for (col, cell) in (0u16..).zip(cells) {
            match cell {
                Cell::Text(text) if text.is_empty() => {}
                Cell::Text(text) => match text_format {
                    Some(format) => {
                        worksheet.write_string_with_format(row, col, text, format)?;
                    }
                    None => {
                        worksheet.write_string(row, col, text)?;
                    }
                },
                Cell::Amount(amount) => {
                    worksheet.write_number_with_format(
                        row,
                        col,
                        amount.to_f64().unwrap_or_default(),
                        amount_format,
                    )?;
                }
            }
        }
        Ok(())
    }
}

fn column_width(label: &str) -> f64 {
    match label {
        "Mail" => 32.0,
        "Date de transaction" => 22.0,
        _ => 16.0,
    }
}

/// Makes `name` acceptable as a worksheet name which is not already in `used`.
///
/// Forbidden characters become `_`, surrounding apostrophes are dropped and the result is cut
/// down to 31 characters. Clashes (case-insensitive, like Excel) get a ` (2)`, ` (3)`…
/// suffix.
pub fn sheet_name(name: &str, used: &[String]) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if FORBIDDEN_SHEET_NAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let base = if cleaned.is_empty() {
        PLACEHOLDER_NAME
    } else {
        cleaned
    };

    let is_free = |candidate: &str| {
        !used
            .iter()
            .any(|taken| taken.to_lowercase() == candidate.to_lowercase())
    };
    let candidate = truncate(base, MAX_SHEET_NAME_LEN);
    if is_free(candidate.as_str()) {
        return candidate;
    }
    (2..)
        .map(|n| {
            let suffix = format!(" ({n})");
            let mut candidate = truncate(base, MAX_SHEET_NAME_LEN - suffix.chars().count());
            candidate.push_str(&suffix);
            candidate
        })
        .find(|candidate| is_free(candidate.as_str()))
        .unwrap_or_default()
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::aggregate::aggregate;
    use helpers::*;

    #[test]
    fn should_sanitize_sheet_names() {
        assert_eq!("Parcoursup", sheet_name("Parcoursup", &[]));
        assert_eq!(
            "Voyage, remplacement carte, div",
            sheet_name("Voyage, remplacement carte, divers...", &[])
        );
        assert_eq!("a_b_c_d_e_f_g_", sheet_name("a[b]c:d*e?f/g\\", &[]));
        assert_eq!("quoted", sheet_name("'quoted'", &[]));
        assert_eq!("x", sheet_name(" 'x", &[]));
        assert_eq!("y", sheet_name("'y' ", &[]));
        assert_eq!("Transactions", sheet_name("  ", &[]));
    }

    #[test]
    fn should_make_sheet_names_unique() {
        let used = vec!["Taiga".to_owned(), "taiga (2)".to_owned()];
        assert_eq!("TAIGA (3)", sheet_name("TAIGA", &used));
        let long = "x".repeat(40);
        let used = vec!["x".repeat(31)];
        let name = sheet_name(&long, &used);
        assert_eq!(31, name.chars().count());
        assert!(name.ends_with(" (2)"));
    }

    #[test]
    fn should_write_one_sheet_per_group() {
        let rows = [
            row("2024-09-02 10:00:00", "pri_1", "jean.dupont@nantes.archi.fr", "10.5"),
            row("2024-09-02 11:00:00", "regul_carte", "x@example.com", "4"),
            row("2024-09-02 12:00:00", "pri_2", "anne.martin@nantes.archi.fr", "2.25"),
        ];
        let groups = aggregate(&rows.iter().collect::<Vec<_>>(), false);
        let bytes = WorkbookBuilder::default()
            .build(&groups, "2024-09-02")
            .expect("workbook");
        let sheets = read_back(&bytes);

        assert_eq!(
            vec!["Parcoursup", "Voyage, remplacement carte, div"],
            sheets.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>()
        );
        assert_eq!(
            vec![
                vec!["Parcoursup - 2024-09-02", "", "", "", "", ""],
                vec!["Date de transaction", "Nom", "Prénom", "Mail", "Statut", "Montant"],
                vec!["2024-09-02 10:00:00", "dupont", "jean", "jean.dupont@nantes.archi.fr", "Accepte", "10.5"],
                vec!["2024-09-02 12:00:00", "martin", "anne", "anne.martin@nantes.archi.fr", "Accepte", "2.25"],
                vec!["", "", "", "", "Total", "12.75"],
            ],
            sheets[0].1
        );
        assert_eq!(
            vec!["", "", "", "", "Total", "4"],
            sheets[1].1[3]
        );
    }

    #[test]
    fn should_write_headers_only_for_the_placeholder() {
        let groups = aggregate(&[], false);
        let bytes = WorkbookBuilder::default()
            .build(&groups, "2024-09-02")
            .expect("workbook");
        let sheets = read_back(&bytes);
        assert_eq!(1, sheets.len());
        assert_eq!("Transactions", sheets[0].0);
        assert_eq!(
            vec![
                vec!["Transactions - 2024-09-02", "", "", "", "", ""],
                vec!["Date de transaction", "Nom", "Prénom", "Mail", "Statut", "Montant"],
            ],
            sheets[0].1
        );
    }

    pub(crate) mod helpers {
        use std::io::Cursor;

        use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

        use crate::table::{
            RawRow, AMOUNT_COLUMN, DATE_COLUMN, EMAIL_COLUMN, REFERENCE_COLUMN, STATUS_COLUMN,
        };

        pub(crate) fn row(date: &str, reference: &str, mail: &str, amount: &str) -> RawRow {
            [
                (DATE_COLUMN, date),
                (REFERENCE_COLUMN, reference),
                (EMAIL_COLUMN, mail),
                (AMOUNT_COLUMN, amount),
                (STATUS_COLUMN, "Accepte"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect()
        }

        /// Every sheet of an XLSX document, as rows of cells rendered to strings
        pub(crate) fn read_back(bytes: &[u8]) -> Vec<(String, Vec<Vec<String>>)> {
            let mut workbook: Xlsx<_> =
                open_workbook_from_rs(Cursor::new(bytes.to_vec())).expect("xlsx");
            workbook
                .sheet_names()
                .into_iter()
                .map(|name| {
                    let range = workbook.worksheet_range(&name).expect("sheet");
                    let rows = range
                        .rows()
                        .map(|cells| cells.iter().map(render).collect())
                        .collect();
                    (name, rows)
                })
                .collect()
        }

        fn render(cell: &Data) -> String {
            match cell {
                Data::Empty => String::new(),
                Data::String(s) => s.clone(),
                Data::Float(f) => f.to_string(),
                Data::Int(i) => i.to_string(),
                other => format!("{other:?}"),
            }
        }
    }
}
