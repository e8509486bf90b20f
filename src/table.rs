use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{InputRejection, SessionError};
use crate::normalize::{normalize, normalize_row};

pub const CSV_MEDIA_TYPE: &str = "text/csv";
pub const MAX_UPLOAD_BYTES: u64 = 2 * 1024 * 1024;

// Column names as they read once normalized
pub const DATE_COLUMN: &str = "Date & Heure";
pub const EMAIL_COLUMN: &str = "Email porteur";
pub const AMOUNT_COLUMN: &str = "Montant";
pub const REFERENCE_COLUMN: &str = "Reference commande";
pub const STATUS_COLUMN: &str = "Statut de la transaction";
pub const BANK_DEPOSIT_COLUMN: &str = "Numero remise banque";

pub const REQUIRED_COLUMNS: [&str; 3] = [DATE_COLUMN, EMAIL_COLUMN, AMOUNT_COLUMN];

/// One line of the uploaded CSV, keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RawRow(BTreeMap<String, String>);

impl RawRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// Value of `column`, or the empty string when the row has no such column
    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for RawRow {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A file handed over by the user, along with what it claims to be
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub media_type: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    /// Reads a file from disk, deriving its media type from its extension
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let media_type = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => CSV_MEDIA_TYPE,
            _ => "application/octet-stream",
        };
        Ok(Self {
            name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            media_type: media_type.to_owned(),
            content: fs::read(path)?,
        })
    }
}

/// A parsed CSV whose headers and cells have all been normalized
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<RawRow>,
}

impl Table {
    /// Accepts an upload and turns it into a table.
    ///
    /// Checks happen in order, and each one short-circuits the following ones: media type,
    /// size (before anything is parsed), CSV syntax, then presence of the required columns.
    pub fn from_upload(file: &UploadedFile, max_bytes: u64) -> Result<Self, SessionError> {
        if file.media_type != CSV_MEDIA_TYPE {
            return Err(InputRejection::NotCsv {
                name: file.name.clone(),
                media_type: file.media_type.clone(),
            }
            .into());
        }
        let size = file.content.len() as u64;
        if size > max_bytes {
            return Err(InputRejection::TooLarge {
                name: file.name.clone(),
                size,
                limit: max_bytes,
            }
            .into());
        }
        let table = Self::parse(&file.content).map_err(|source| InputRejection::Parse {
            name: file.name.clone(),
            source,
        })?;
        let missing = missing_headers(&table.headers, &REQUIRED_COLUMNS);
        if !missing.is_empty() {
            return Err(SessionError::SchemaInvalid { missing });
        }
        debug!(
            "Parsed {} rows with columns {:?} from {:?}",
            table.rows.len(),
            table.headers,
            file.name
        );
        Ok(table)
    }

    fn parse(content: &[u8]) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(content);
        let headers = reader.headers()?.iter().map(normalize).collect();
        let rows = reader
            .deserialize::<RawRow>()
            .map(|row| row.map(|row| normalize_row(&row)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }
}

/// Required columns absent from `headers`, in the order they were required.
///
/// Both sides are normalized before being compared.
pub fn missing_headers<S: AsRef<str>>(headers: &[S], required: &[&str]) -> Vec<String> {
    let present: Vec<String> = headers.iter().map(|h| normalize(h.as_ref())).collect();
    required
        .iter()
        .map(|column| normalize(column))
        .filter(|column| !present.contains(column))
        .collect()
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn should_parse_and_normalize_a_valid_upload() {
        let table = Table::from_upload(
            &csv_file("Date & Heure,Email porteur,Montant,Numéro remise banque,Statut de la transaction\n\
                       2024-09-02 10:12:00,jean.dupont@nantes.archi.fr,12.50,RB1,Accepté\n\
                       \n\
                       2024-09-03 08:00:00,,7,-,Refusé\n"),
            MAX_UPLOAD_BYTES,
        )
        .expect("table");
        assert_eq!(
            vec![
                "Date & Heure",
                "Email porteur",
                "Montant",
                "Numero remise banque",
                "Statut de la transaction"
            ],
            table.headers()
        );
        assert_eq!(2, table.rows().len());
        assert_eq!("Accepte", table.rows()[0].value(STATUS_COLUMN));
        assert_eq!("RB1", table.rows()[0].value(BANK_DEPOSIT_COLUMN));
        assert_eq!("Refuse", table.rows()[1].value(STATUS_COLUMN));
        assert_eq!("", table.rows()[1].value(EMAIL_COLUMN));
        assert_eq!("", table.rows()[1].value(REFERENCE_COLUMN));
    }

    #[test]
    fn should_accept_a_file_with_headers_only() {
        let table = Table::from_upload(
            &csv_file("Date & Heure,Email porteur,Montant\n"),
            MAX_UPLOAD_BYTES,
        )
        .expect("table");
        assert!(table.rows().is_empty());
    }

    #[test]
    fn should_report_exactly_the_missing_columns() {
        let err = Table::from_upload(
            &csv_file("Date & Heure,Email porteur\n2024-09-02 10:00:00,a@b.c\n"),
            MAX_UPLOAD_BYTES,
        )
        .expect_err("missing column");
        match err {
            SessionError::SchemaInvalid { missing } => assert_eq!(vec!["Montant"], missing),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn should_report_every_required_column_for_an_empty_file() {
        let err = Table::from_upload(&csv_file(""), MAX_UPLOAD_BYTES).expect_err("empty");
        assert_eq!(
            "Missing required columns: Date & Heure, Email porteur, Montant",
            err.to_string()
        );
    }

    #[test]
    fn should_reject_files_which_are_not_csv() {
        let mut file = csv_file("Date & Heure,Email porteur,Montant\n");
        file.media_type = "application/vnd.ms-excel".to_owned();
        let err = Table::from_upload(&file, MAX_UPLOAD_BYTES).expect_err("not csv");
        assert!(matches!(
            err,
            SessionError::InputRejected(InputRejection::NotCsv { .. })
        ));
    }

    #[test]
    fn should_reject_oversized_files_before_parsing() {
        // Not valid UTF-8, so this would fail to parse if parsing were attempted
        let file = UploadedFile {
            name: "big.csv".to_owned(),
            media_type: CSV_MEDIA_TYPE.to_owned(),
            content: vec![0xff; 3 * 1024 * 1024],
        };
        let err = Table::from_upload(&file, MAX_UPLOAD_BYTES).expect_err("too large");
        match err {
            SessionError::InputRejected(InputRejection::TooLarge { size, limit, .. }) => {
                assert_eq!(3 * 1024 * 1024, size);
                assert_eq!(MAX_UPLOAD_BYTES, limit);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn should_reject_malformed_csv() {
        let err = Table::from_upload(
            &csv_file("Date & Heure,Email porteur,Montant\n2024-09-02,a@b.c\n"),
            MAX_UPLOAD_BYTES,
        )
        .expect_err("unequal lengths");
        assert!(matches!(
            err,
            SessionError::InputRejected(InputRejection::Parse { .. })
        ));
    }

    #[test]
    fn should_compare_normalized_header_names() {
        let headers = ["Date & Heure", "Email porteur", "Numéro remise banque"];
        assert_eq!(
            Vec::<String>::new(),
            missing_headers(&headers, &["Numéro remise banque", "Date & Heure"])
        );
        assert_eq!(
            vec!["Montant"],
            missing_headers(&headers, &REQUIRED_COLUMNS)
        );
    }

    #[test]
    fn should_derive_the_media_type_from_the_extension() {
        let dir = std::env::temp_dir().join(format!("transactions_exporter_{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let csv_path = dir.join("export.CSV");
        let other_path = dir.join("export.txt");
        fs::write(&csv_path, "a,b\n").expect("write");
        fs::write(&other_path, "a,b\n").expect("write");

        let csv = UploadedFile::from_path(&csv_path).expect("csv");
        assert_eq!("export.CSV", csv.name);
        assert_eq!(CSV_MEDIA_TYPE, csv.media_type);
        assert_eq!(b"a,b\n".to_vec(), csv.content);
        let other = UploadedFile::from_path(&other_path).expect("txt");
        assert_eq!("application/octet-stream", other.media_type);

        fs::remove_dir_all(&dir).expect("cleanup");
    }

    fn csv_file(content: &str) -> UploadedFile {
        UploadedFile {
            name: "transactions.csv".to_owned(),
            media_type: CSV_MEDIA_TYPE.to_owned(),
            content: content.as_bytes().to_vec(),
        }
    }
}
