use thiserror::Error;

/// Why an uploaded file was refused before its content could be used.
#[derive(Error, Debug)]
pub enum InputRejection {
    #[error("no file was selected")]
    NoFile,
    #[error("{name:?} is not a CSV file (media type {media_type:?}, expected \"text/csv\")")]
    NotCsv { name: String, media_type: String },
    #[error("{name:?} weighs {size} bytes, the limit is {limit} bytes")]
    TooLarge { name: String, size: u64, limit: u64 },
    #[error("could not parse {name:?}: {source}")]
    Parse {
        name: String,
        #[source]
        source: csv::Error,
    },
}

/// Failures surfaced by a [`Session`](crate::session::Session) step.
///
/// None of these leave the session in a partially updated state: the step which reports one
/// can simply be attempted again.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid input: {0}")]
    InputRejected(#[from] InputRejection),
    #[error("Missing required columns: {}", missing.join(", "))]
    SchemaInvalid { missing: Vec<String> },
    #[error("Nothing to export: {0}")]
    SelectionIncomplete(String),
    #[error("Could not build the workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
}
