#![warn(clippy::unwrap_used)]

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use color_eyre::eyre::Context;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;
use transactions_exporter::dates::DateIndexMode;
use transactions_exporter::error::SessionError;
use transactions_exporter::filter::FilterMode;
use transactions_exporter::session::{Notice, NoticeLevel, Session, SessionConfig};
use transactions_exporter::table::{UploadedFile, MAX_UPLOAD_BYTES};

/// Classifies the transactions of a payment CSV export and writes those of one day to an XLSX
/// workbook, one sheet per category
#[derive(Debug, Parser)]
struct Args {
    /// CSV export of the payment transactions
    input: PathBuf,
    /// Day to export (YYYY-MM-DD), one of the available dates
    #[arg(long)]
    date: Option<String>,
    /// Offer every day from this one on, rather than the days found in the file
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Offer every day up to this one, rather than the days found in the file
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Which transactions of the day are exported
    #[arg(long, value_enum, default_value_t = FilterMode::AcceptedAndBanked)]
    filter: FilterMode,
    /// Sorts transactions by surname before grouping them
    #[arg(long)]
    sort_by_surname: bool,
    /// Prints the available dates and exits
    #[arg(long)]
    list_dates: bool,
    /// Directory the workbook is written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        let date_index_mode = if self.from.is_some() || self.to.is_some() {
            DateIndexMode::Range {
                start: self.from,
                end: self.to,
            }
        } else {
            DateIndexMode::Derived
        };
        SessionConfig {
            filter_mode: self.filter,
            date_index_mode,
            sort_by_surname: self.sort_by_surname,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

fn report(notice: &Notice) {
    match notice.level {
        NoticeLevel::Success => println!("{}", notice.message),
        NoticeLevel::Info => println!("Note: {}", notice.message),
    }
}

fn print_dates(session: &Session) {
    if session.available_dates().is_empty() {
        println!("No date available");
    }
    for date in session.available_dates() {
        println!("{date}");
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut session = Session::new(args.session_config());

    let file = UploadedFile::from_path(&args.input)
        .with_context(|| format!("Could not read input file {:?}", args.input))?;
    report(&session.upload(Some(file))?);

    if args.list_dates {
        print_dates(&session);
        return Ok(());
    }
    let Some(date) = args.date.as_deref() else {
        println!("Available dates:");
        print_dates(&session);
        return Err(SessionError::SelectionIncomplete(
            "no date selected, pick one of the above with --date".to_owned(),
        )
        .into());
    };
    session.select_date(date)?;

    let export = session.export()?;
    let output = args.output_dir.join(&export.file_name);
    fs::write(&output, &export.content)
        .with_context(|| format!("Could not write workbook to {output:?}"))?;
    report(&export.notice);
    Ok(())
}
