//! Flat xlsx record store.
//!
//! A single worksheet holds every record. Loading validates the header
//! against the accepted flat layouts and normalizes cells (serial dates,
//! trailing `.0` integers); inserting only reorders the in-memory rows,
//! persistence happens on [`RecordStore::save`], which writes a fresh
//! canonical workbook carrying the source's column widths and cell styles.

use std::fs::OpenOptions;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use log::info;
use umya_spreadsheet::helper::coordinate::string_from_column_index;
use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::calc::{parse_sheet_date, serial_from_date};
use crate::error::{Result, StoreError};
use crate::record::{Record, format_cell};
use crate::schema::{Column, ColumnKind, Layout};
use crate::store::{
    InsertOutcome, RecordStore, StoreSummary, distinct_municipalities, find_row_position,
    latest_incident_date, sort_rows_by_incident_date, unique_values_of,
};

const DATE_FORMAT_CODE: &str = "DD/MM/YYYY";
const MIN_DATE_COLUMN_WIDTH: f64 = 12.0;

/// Record store backed by one flat xlsx file
pub struct WorkbookStore {
    path: PathBuf,
    /// Source workbook, kept after load for style carry-over on save
    book: Option<Spreadsheet>,
    sheet_name: String,
    layout: Layout,
    /// Canonical-width rows, cells normalized
    rows: Vec<Vec<String>>,
    loaded: bool,
}

impl WorkbookStore {
    /// Create a store for a file path; nothing is read until [`RecordStore::load`]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            book: None,
            sheet_name: String::new(),
            layout: Layout::Full,
            rows: Vec::new(),
            loaded: false,
        }
    }

    fn load_sync(&mut self) -> Result<StoreSummary> {
        if !self.path.exists() {
            return Err(StoreError::NotFound(format!(
                "workbook {} does not exist",
                self.path.display()
            )));
        }
        let book = umya_spreadsheet::reader::xlsx::read(&self.path)?;

        let (sheet_name, layout, rows) = {
            let sheet = book.get_sheet(&0).ok_or_else(|| {
                StoreError::InvalidFormat("workbook has no worksheets".to_string())
            })?;

            let headers: Vec<String> = (1..=sheet.get_highest_column())
                .map(|col| sheet.get_value((col, 1)))
                .collect();
            let layout = Layout::match_headers(&headers, &[Layout::Full, Layout::LegacyCore])?;

            let mut rows = Vec::new();
            for row_idx in 2..=sheet.get_highest_row() {
                let raw: Vec<String> = (1..=layout.width() as u32)
                    .map(|col| sheet.get_value((col, row_idx)))
                    .collect();
                if raw.iter().all(|cell| cell.trim().is_empty()) {
                    continue;
                }
                let formatted: Vec<String> = raw
                    .iter()
                    .zip(layout.columns())
                    .map(|(cell, column)| format_cell(cell, column.kind()))
                    .collect();
                rows.push(layout.widen_row(&formatted));
            }

            (sheet.get_name().to_string(), layout, rows)
        };

        self.book = Some(book);
        self.sheet_name = sheet_name;
        self.layout = layout;
        self.rows = rows;
        self.loaded = true;

        info!(
            "loaded {}: {} record(s), {}-column layout",
            self.path.display(),
            self.rows.len(),
            self.layout.width()
        );
        Ok(self.summary())
    }

    fn insert_sync(&mut self, record: &Record) -> Result<InsertOutcome> {
        self.ensure_loaded()?;

        let mut record = record.clone();
        record.recompute_derived();

        self.rows.push(record.to_row());
        sort_rows_by_incident_date(&mut self.rows);

        let position = find_row_position(&self.rows, &record);
        info!("record placed at row {position}, pending save");
        Ok(InsertOutcome {
            position,
            partition: None,
        })
    }

    fn save_sync(&mut self, destination: Option<&Path>) -> Result<()> {
        self.ensure_loaded()?;
        let target = destination.unwrap_or(&self.path).to_path_buf();
        ensure_writable(&target)?;

        let mut out = umya_spreadsheet::new_file();
        let sheet = out.get_sheet_mut(&0).ok_or_else(|| {
            StoreError::Unexpected("fresh workbook has no worksheet".to_string())
        })?;
        if !self.sheet_name.is_empty() {
            sheet.set_name(self.sheet_name.clone());
        }

        for (i, column) in Column::ALL.iter().enumerate() {
            sheet
                .get_cell_mut((i as u32 + 1, 1))
                .set_value(column.label());
        }
        for (r, row) in self.rows.iter().enumerate() {
            let row_idx = r as u32 + 2;
            for (i, column) in Column::ALL.iter().enumerate() {
                let value = row.get(i).map(String::as_str).unwrap_or_default();
                if value.trim().is_empty() {
                    continue;
                }
                write_data_cell(sheet, (i as u32 + 1, row_idx), value, column.kind());
            }
        }

        self.carry_source_styles(sheet);
        force_date_column_formats(sheet, self.rows.len());

        umya_spreadsheet::writer::xlsx::write(&out, &target)?;
        info!("saved {} record(s) to {}", self.rows.len(), target.display());
        Ok(())
    }

    /// Carry column widths and cell styles over from the source workbook.
    ///
    /// Header cells take the source header style; data cells take the style
    /// of the source's first data row, column by column. Columns the source
    /// layout does not carry keep the default style.
    fn carry_source_styles(&self, out_sheet: &mut Worksheet) {
        let Some(book) = &self.book else { return };
        let Some(source) = book.get_sheet(&0) else { return };

        for (source_idx, column) in self.layout.columns().iter().enumerate() {
            let source_col = source_idx as u32 + 1;
            let out_col = column.index() as u32 + 1;

            if let Some(dimension) = source.get_column_dimension(&string_from_column_index(&source_col)) {
                let width = *dimension.get_width();
                out_sheet
                    .get_column_dimension_mut(&string_from_column_index(&out_col))
                    .set_width(width);
            }

            if let Some(cell) = source.get_cell((source_col, 1)) {
                let style = cell.get_style().clone();
                out_sheet.get_cell_mut((out_col, 1)).set_style(style);
            }
            if let Some(style) = source
                .get_cell((source_col, 2))
                .map(|cell| cell.get_style().clone())
            {
                for row_idx in 0..self.rows.len() {
                    out_sheet
                        .get_cell_mut((out_col, row_idx as u32 + 2))
                        .set_style(style.clone());
                }
            }
        }
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.loaded {
            Ok(())
        } else {
            Err(StoreError::Unexpected(
                "workbook store used before load".to_string(),
            ))
        }
    }
}

impl RecordStore for WorkbookStore {
    fn backend_name(&self) -> &'static str {
        "workbook"
    }

    fn load<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = Result<StoreSummary>> + Send + 'a>> {
        Box::pin(async move { self.load_sync() })
    }

    fn insert<'a>(
        &'a mut self,
        record: &'a Record,
    ) -> Pin<Box<dyn Future<Output = Result<InsertOutcome>> + Send + 'a>> {
        Box::pin(async move { self.insert_sync(record) })
    }

    fn save<'a>(
        &'a mut self,
        destination: Option<&'a Path>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move { self.save_sync(destination) })
    }

    fn summary(&self) -> StoreSummary {
        StoreSummary {
            records: self.rows.len(),
            latest_incident: latest_incident_date(&self.rows),
            municipalities: distinct_municipalities(&self.rows),
            partitions: Vec::new(),
            source: self.path.display().to_string(),
        }
    }

    fn unique_values(&self, column: Column) -> Vec<String> {
        unique_values_of(&self.rows, column)
    }

    fn last_record(&self) -> Option<Record> {
        self.rows.last().map(|row| Record::from_row(row))
    }

    fn active_partition(&self) -> Option<i32> {
        None
    }
}

/// Write one data cell, typed by its column kind.
///
/// Dates become serial numbers so spreadsheet programs treat them as dates;
/// numeric columns become numbers when they parse. Anything else, and any
/// value that does not fit its kind, is written as text.
fn write_data_cell(sheet: &mut Worksheet, coordinate: (u32, u32), value: &str, kind: ColumnKind) {
    let cell = sheet.get_cell_mut(coordinate);
    match kind {
        ColumnKind::Date => match parse_sheet_date(value).and_then(serial_from_date) {
            Some(serial) => {
                cell.set_value_number(serial as f64);
            }
            None => {
                cell.set_value(value);
            }
        },
        ColumnKind::Integer | ColumnKind::Decimal => match value.parse::<f64>() {
            Ok(number) => {
                cell.set_value_number(number);
            }
            Err(_) => {
                cell.set_value(value);
            }
        },
        ColumnKind::Time | ColumnKind::Text => {
            cell.set_value(value);
        }
    }
}

/// Date columns always render as `DD/MM/YYYY` and stay wide enough to show it
fn force_date_column_formats(sheet: &mut Worksheet, data_rows: usize) {
    for column in Column::DATES {
        let col = column.index() as u32 + 1;
        for r in 0..data_rows {
            sheet
                .get_cell_mut((col, r as u32 + 2))
                .get_style_mut()
                .get_number_format_mut()
                .set_format_code(DATE_FORMAT_CODE);
        }
        let dimension = sheet.get_column_dimension_mut(&string_from_column_index(&col));
        if *dimension.get_width() < MIN_DATE_COLUMN_WIDTH {
            dimension.set_width(MIN_DATE_COLUMN_WIDTH);
        }
    }
}

/// Reject targets we cannot write before building the output workbook.
///
/// An existing file that refuses an append-mode open is usually held open
/// by a spreadsheet program.
fn ensure_writable(target: &Path) -> Result<()> {
    if !target.exists() {
        return Ok(());
    }
    match OpenOptions::new().append(true).open(target) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(StoreError::PermissionDenied(
            format!("{} is open in another program", target.display()),
        )),
        Err(e) => Err(e.into()),
    }
}
