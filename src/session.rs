use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, CategoryGroup};
use crate::dates::DateIndexMode;
use crate::error::{InputRejection, SessionError};
use crate::filter::FilterMode;
use crate::table::{Table, UploadedFile, MAX_UPLOAD_BYTES};
use crate::workbook::WorkbookBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub filter_mode: FilterMode,
    pub date_index_mode: DateIndexMode,
    pub sort_by_surname: bool,
    pub max_upload_bytes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            filter_mode: FilterMode::default(),
            date_index_mode: DateIndexMode::default(),
            sort_by_surname: false,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
}

/// Message for the user about a step which went through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }
}

/// A generated workbook, ready to be saved under `file_name`
#[derive(Debug, Clone)]
pub struct Export {
    pub file_name: String,
    pub content: Vec<u8>,
    pub groups: Vec<CategoryGroup>,
    pub notice: Notice,
}

/// State of one interactive session: the uploaded table, the dates it offers and the date the
/// user picked.
///
/// A successful upload replaces all of it. A failed step leaves it untouched.
#[derive(Debug, Default)]
pub struct Session {
    config: SessionConfig,
    table: Option<Table>,
    available_dates: Vec<String>,
    selected_date: Option<String>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn available_dates(&self) -> &[String] {
        &self.available_dates
    }

    pub fn selected_date(&self) -> Option<&str> {
        self.selected_date.as_deref()
    }

    pub fn is_ready_to_export(&self) -> bool {
        self.table.is_some() && self.selected_date.is_some()
    }

    pub fn upload(&mut self, file: Option<UploadedFile>) -> Result<Notice, SessionError> {
        let file = file.ok_or(InputRejection::NoFile)?;
        let table = Table::from_upload(&file, self.config.max_upload_bytes).inspect_err(|err| {
            warn!("Upload of {:?} refused: {err}", file.name);
        })?;

        self.available_dates = self.config.date_index_mode.available_dates(table.rows());
        self.selected_date = None;
        let notice = Notice::success(format!(
            "Loaded {} transactions from {:?}, {} dates available",
            table.rows().len(),
            file.name,
            self.available_dates.len()
        ));
        info!("{}", notice.message);
        self.table = Some(table);
        Ok(notice)
    }

    /// Switches to offering every day between `start` and `end` rather than the days found in
    /// the data.
    ///
    /// The selected date is kept only if it is still on offer.
    pub fn set_date_range(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.config.date_index_mode = DateIndexMode::Range { start, end };
        self.refresh_dates();
    }

    /// Goes back to offering the days found in the data
    pub fn clear_date_range(&mut self) {
        self.config.date_index_mode = DateIndexMode::Derived;
        self.refresh_dates();
    }

    pub fn set_filter_mode(&mut self, filter_mode: FilterMode) {
        self.config.filter_mode = filter_mode;
    }

    pub fn set_sort_by_surname(&mut self, sort_by_surname: bool) {
        self.config.sort_by_surname = sort_by_surname;
    }

    fn refresh_dates(&mut self) {
        let rows = self.table.as_ref().map(Table::rows).unwrap_or_default();
        self.available_dates = self.config.date_index_mode.available_dates(rows);
        let dropped = self
            .selected_date
            .as_ref()
            .is_some_and(|selected| !self.available_dates.contains(selected));
        if dropped {
            debug!("Selected date {:?} is no longer available", self.selected_date);
            self.selected_date = None;
        }
    }

    pub fn select_date(&mut self, date: &str) -> Result<(), SessionError> {
        if !self.available_dates.iter().any(|available| available == date) {
            return Err(SessionError::SelectionIncomplete(format!(
                "{date} is not one of the available dates"
            )));
        }
        self.selected_date = Some(date.to_owned());
        Ok(())
    }

    /// Runs the filtered rows of the selected date through classification and grouping, and
    /// renders the result.
    ///
    /// Finding no matching transaction is not an error: the workbook then holds a single sheet
    /// with headers only, and the notice is informational.
    pub fn export(&self) -> Result<Export, SessionError> {
        let (table, date) = match (&self.table, &self.selected_date) {
            (Some(table), Some(date)) => (table, date),
            (None, _) => {
                return Err(SessionError::SelectionIncomplete(
                    "no file has been loaded".to_owned(),
                ))
            }
            (_, None) => {
                return Err(SessionError::SelectionIncomplete(
                    "no date has been selected".to_owned(),
                ))
            }
        };

        let rows = self.config.filter_mode.apply(table.rows(), date);
        debug!(
            "{} of {} rows kept for {date} with {:?}",
            rows.len(),
            table.rows().len(),
            self.config.filter_mode
        );
        let groups = aggregate(&rows, self.config.sort_by_surname);
        let content = WorkbookBuilder::default().build(&groups, date)?;
        let file_name = export_file_name(date);

        let notice = if rows.is_empty() {
            Notice::info(format!(
                "No transaction matches {date}, {file_name} only contains headers"
            ))
        } else {
            Notice::success(format!(
                "Exported {} transactions in {} categories to {file_name}",
                rows.len(),
                groups.len()
            ))
        };
        info!("{}", notice.message);
        Ok(Export {
            file_name,
            content,
            groups,
            notice,
        })
    }
}

pub fn export_file_name(date: &str) -> String {
    format!("Transactions_{date}.xlsx")
}
