//! Partitioned record store over a cloud spreadsheet document.
//!
//! Records live in one worksheet tab per calendar year. Loading fetches the
//! candidate year tabs concurrently, counts every partition and activates the
//! newest one; inserting routes the record to the tab matching its incident
//! year and rewrites that tab in full, sorted by incident date.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use chrono::NaiveDate;
use futures::future::join_all;
use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::error::{Result, StoreError};
use crate::record::Record;
use crate::schema::{Column, Layout};
use crate::store::transport::SheetTransport;
use crate::store::{
    InsertOutcome, RecordStore, StoreSummary, distinct_municipalities, find_row_position,
    latest_incident_date, sort_rows_by_incident_date, unique_values_of,
};

/// Candidate year partitions, ascending. Tabs with other titles are ignored.
pub const PARTITION_YEARS: [i32; 3] = [2024, 2025, 2026];

/// Record store backed by year-partitioned worksheet tabs
pub struct WorksheetStore<T: SheetTransport> {
    transport: T,
    document_title: String,
    /// Years that actually have a tab, ascending
    partitions: Vec<i32>,
    /// Data row count per present year tab
    counts: FxHashMap<i32, usize>,
    active_year: Option<i32>,
    /// Data rows of the active tab, canonical width, dates normalized
    rows: Vec<Vec<String>>,
    loaded: bool,
}

impl<T: SheetTransport> WorksheetStore<T> {
    /// Create a store over a transport; nothing is fetched until [`RecordStore::load`]
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            document_title: String::new(),
            partitions: Vec::new(),
            counts: FxHashMap::default(),
            active_year: None,
            rows: Vec::new(),
            loaded: false,
        }
    }

    async fn load_inner(&mut self) -> Result<StoreSummary> {
        let title = self.transport.document_title().await?;
        let titles = self.transport.worksheet_titles().await?;

        // Present tabs are independent, fetch them concurrently
        let transport = &self.transport;
        let mut fetches = Vec::new();
        for year in PARTITION_YEARS {
            let tab = year.to_string();
            if !titles.iter().any(|t| t == &tab) {
                debug!("worksheet {tab} not present, skipping");
                continue;
            }
            fetches.push(async move {
                let raw = transport.read_rows(&tab).await;
                (year, raw)
            });
        }
        let results = join_all(fetches).await;

        let mut partitions = Vec::new();
        let mut counts = FxHashMap::default();
        let mut newest: Option<(i32, Vec<Vec<String>>)> = None;
        for (year, raw) in results {
            let raw = raw?;
            counts.insert(year, raw.len().saturating_sub(1));
            partitions.push(year);
            newest = Some((year, raw));
        }

        let Some((active_year, raw)) = newest else {
            return Err(StoreError::NotFound(format!(
                "no year worksheet ({}-{}) in \"{title}\"",
                PARTITION_YEARS[0],
                PARTITION_YEARS[PARTITION_YEARS.len() - 1]
            )));
        };

        self.rows = frame_from_raw(raw)?;
        self.document_title = title;
        self.partitions = partitions;
        self.counts = counts;
        self.active_year = Some(active_year);
        self.loaded = true;

        info!(
            "loaded \"{}\": {} year tab(s), active {active_year}",
            self.document_title,
            self.partitions.len()
        );
        Ok(self.summary())
    }

    async fn insert_inner(&mut self, record: &Record) -> Result<InsertOutcome> {
        self.ensure_loaded()?;

        let mut record = record.clone();
        record.recompute_derived();

        let date_text = record.value_of(Column::IncidentDate);
        let year = year_of_date_text(&date_text).ok_or_else(|| StoreError::ValidationFailed {
            field: Column::IncidentDate.label().to_string(),
            reason: format!("\"{date_text}\" has no usable year"),
        })?;

        if !self.partitions.contains(&year) {
            return Err(StoreError::PartitionNotFound {
                year,
                available: self.partitions.clone(),
            });
        }
        if self.active_year != Some(year) {
            self.switch_to(year).await?;
        }

        let mut row = record.to_row();
        normalize_date_cells(&mut row);
        self.rows.push(row);
        sort_rows_by_incident_date(&mut self.rows);
        self.write_active().await?;
        self.counts.insert(year, self.rows.len());

        let position = find_row_position(&self.rows, &record);
        info!("record stored in worksheet {year} at row {position}");
        Ok(InsertOutcome {
            position,
            partition: Some(year),
        })
    }

    /// Make another year tab the active one
    async fn switch_to(&mut self, year: i32) -> Result<()> {
        let raw = self.transport.read_rows(&year.to_string()).await?;
        self.rows = frame_from_raw(raw)?;
        self.counts.insert(year, self.rows.len());
        self.active_year = Some(year);
        debug!("switched active worksheet to {year}");
        Ok(())
    }

    /// Rewrite the active tab in full: canonical header plus sorted rows.
    ///
    /// Concurrent edits between our read and this write are lost; the
    /// transport has no conditional update to offer.
    async fn write_active(&mut self) -> Result<()> {
        let Some(year) = self.active_year else {
            return Err(StoreError::Unexpected("no active worksheet".to_string()));
        };
        let mut payload = Vec::with_capacity(self.rows.len() + 1);
        payload.push(Layout::Full.header_row());
        payload.extend(self.rows.iter().cloned());
        self.transport
            .overwrite_rows(&year.to_string(), payload)
            .await
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.loaded {
            Ok(())
        } else {
            Err(StoreError::Unexpected(
                "worksheet store used before load".to_string(),
            ))
        }
    }
}

impl<T: SheetTransport> RecordStore for WorksheetStore<T> {
    fn backend_name(&self) -> &'static str {
        "worksheets"
    }

    fn load<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = Result<StoreSummary>> + Send + 'a>> {
        Box::pin(self.load_inner())
    }

    fn insert<'a>(
        &'a mut self,
        record: &'a Record,
    ) -> Pin<Box<dyn Future<Output = Result<InsertOutcome>> + Send + 'a>> {
        Box::pin(self.insert_inner(record))
    }

    fn save<'a>(
        &'a mut self,
        _destination: Option<&'a Path>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        // Every insert already rewrote its tab
        Box::pin(async move { Ok(()) })
    }

    fn summary(&self) -> StoreSummary {
        StoreSummary {
            records: self.counts.values().sum(),
            latest_incident: latest_incident_date(&self.rows),
            municipalities: distinct_municipalities(&self.rows),
            partitions: self.partitions.clone(),
            source: self.document_title.clone(),
        }
    }

    fn unique_values(&self, column: Column) -> Vec<String> {
        unique_values_of(&self.rows, column)
    }

    fn last_record(&self) -> Option<Record> {
        self.rows.last().map(|row| Record::from_row(row))
    }

    fn active_partition(&self) -> Option<i32> {
        self.active_year
    }
}

/// Validate a tab's header and widen its data rows to the canonical order.
/// A completely empty tab is a valid, zero-row frame.
fn frame_from_raw(raw: Vec<Vec<String>>) -> Result<Vec<Vec<String>>> {
    let mut rows = raw.into_iter();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let layout = Layout::match_headers(&header, &[Layout::Full, Layout::PartitionLegacy])?;
    Ok(rows
        .map(|row| {
            let mut canonical = layout.widen_row(&row);
            normalize_date_cells(&mut canonical);
            canonical
        })
        .collect())
}

fn normalize_date_cells(row: &mut [String]) {
    for column in Column::DATES {
        if let Some(cell) = row.get_mut(column.index()) {
            *cell = normalize_date_text(cell);
        }
    }
}

/// Bring a date cell to `dd/mm/yyyy`.
///
/// ISO dates are reformatted. Slash dates with an unambiguous component
/// (one part above 12) are read in the order that component dictates;
/// ambiguous ones are read day-first. Anything unparseable passes through
/// untouched, so the call is idempotent on already-normalized cells.
pub(crate) fn normalize_date_text(raw: &str) -> String {
    let text = raw.trim();
    if text.is_empty() {
        return String::new();
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.format("%d/%m/%Y").to_string();
    }

    let parts: Vec<&str> = text.split('/').collect();
    if parts.len() == 3 {
        // Slash-ISO: a four-digit year leads
        if parts[0].trim().len() == 4 {
            if let Ok(date) = NaiveDate::parse_from_str(text, "%Y/%m/%d") {
                return date.format("%d/%m/%Y").to_string();
            }
        }
        let first: Option<u32> = parts[0].trim().parse().ok();
        let second: Option<u32> = parts[1].trim().parse().ok();
        match (first, second) {
            (Some(day), _) if day > 12 => {
                if let Ok(date) = NaiveDate::parse_from_str(text, "%d/%m/%Y") {
                    return date.format("%d/%m/%Y").to_string();
                }
            }
            (_, Some(month)) if month > 12 => {
                if let Ok(date) = NaiveDate::parse_from_str(text, "%m/%d/%Y") {
                    return date.format("%d/%m/%Y").to_string();
                }
            }
            _ => {
                for format in ["%d/%m/%Y", "%m/%d/%Y"] {
                    if let Ok(date) = NaiveDate::parse_from_str(text, format) {
                        return date.format("%d/%m/%Y").to_string();
                    }
                }
            }
        }
    }

    text.to_string()
}

fn year_of_date_text(text: &str) -> Option<i32> {
    text.split('/').nth(2)?.trim().parse().ok()
}
