//! Record stores: backends that hold the fatality sheet.
//!
//! Two realizations exist behind the [`RecordStore`] trait: a flat `.xlsx`
//! workbook on disk and a cloud document with one worksheet tab per year.
//! Both keep the loaded sheet in memory as canonical 33-column rows of
//! display strings and persist the whole sheet back on insert or save, so
//! a submission always lands in incident-date order.

pub mod transport;
pub mod workbook;
pub mod worksheets;

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use chrono::NaiveDate;
use itertools::Itertools;
use rustc_hash::FxHashSet;

use crate::calc::parse_sheet_date;
use crate::error::Result;
use crate::record::Record;
use crate::schema::Column;

/// Summary of a loaded store, shown on the confirmation surfaces
#[derive(Debug, Clone, Default)]
pub struct StoreSummary {
    /// Number of data rows in the active sheet
    pub records: usize,
    /// Incident date of the last filled row, when it parses
    pub latest_incident: Option<NaiveDate>,
    /// Count of distinct municipalities in the active sheet
    pub municipalities: usize,
    /// Years that have a worksheet tab; empty for flat files
    pub partitions: Vec<i32>,
    /// Human-readable source: file path or document title
    pub source: String,
}

/// Where an inserted record ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    /// 1-based sheet row of the record after sorting, counting the header;
    /// -1 when the row could not be located again
    pub position: i64,
    /// Year tab that received the record, for partitioned stores
    pub partition: Option<i32>,
}

/// Base trait for record store backends
pub trait RecordStore: Send {
    /// Short name of the backend, for log lines
    fn backend_name(&self) -> &'static str;

    /// Load and validate the backing sheet
    fn load<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = Result<StoreSummary>> + Send + 'a>>;

    /// Insert a record in incident-date order
    ///
    /// Derived fields are recomputed before the row is placed. Partitioned
    /// backends persist immediately; flat backends persist on [`RecordStore::save`].
    fn insert<'a>(
        &'a mut self,
        record: &'a Record,
    ) -> Pin<Box<dyn Future<Output = Result<InsertOutcome>> + Send + 'a>>;

    /// Write the sheet back out
    ///
    /// `destination` overrides the original path for flat files and is
    /// ignored by backends that persist on insert.
    fn save<'a>(
        &'a mut self,
        destination: Option<&'a Path>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Summary of the in-memory sheet
    fn summary(&self) -> StoreSummary;

    /// Sorted distinct non-empty values of a column, for dynamic combos
    fn unique_values(&self, column: Column) -> Vec<String>;

    /// The last row of the active sheet as a record
    fn last_record(&self) -> Option<Record>;

    /// Year of the active partition, `None` for flat files
    fn active_partition(&self) -> Option<i32>;
}

/// Stable-sort rows by parsed incident date, unparseable dates last
///
/// Ties keep their relative order, so a new record lands after existing
/// rows of the same day.
pub(crate) fn sort_rows_by_incident_date(rows: &mut [Vec<String>]) {
    let date_idx = Column::IncidentDate.index();
    rows.sort_by_key(|row| {
        let parsed = row.get(date_idx).and_then(|v| parse_sheet_date(v));
        (parsed.is_none(), parsed)
    });
}

/// Locate a record by victim name and incident date text
///
/// Returns the 1-based sheet row counting the header (data row index + 2),
/// or -1 when no row matches. The first match wins when the same victim and
/// date appear twice.
pub(crate) fn find_row_position(rows: &[Vec<String>], record: &Record) -> i64 {
    let victim = record.victim_name.trim();
    let date_text = record.value_of(Column::IncidentDate);
    let victim_idx = Column::Victim.index();
    let date_idx = Column::IncidentDate.index();

    for (idx, row) in rows.iter().enumerate() {
        let row_victim = row.get(victim_idx).map(|v| v.trim()).unwrap_or_default();
        let row_date = row.get(date_idx).map(|v| v.trim()).unwrap_or_default();
        if row_victim == victim && row_date == date_text {
            return idx as i64 + 2;
        }
    }

    -1
}

/// Incident date of the last row that has one, parsed if possible
pub(crate) fn latest_incident_date(rows: &[Vec<String>]) -> Option<NaiveDate> {
    let date_idx = Column::IncidentDate.index();
    rows.iter()
        .rev()
        .find_map(|row| row.get(date_idx).map(|v| v.trim()).filter(|v| !v.is_empty()))
        .and_then(parse_sheet_date)
}

/// Number of distinct non-empty municipalities
pub(crate) fn distinct_municipalities(rows: &[Vec<String>]) -> usize {
    let idx = Column::Municipality.index();
    rows.iter()
        .filter_map(|row| row.get(idx).map(|v| v.trim()))
        .filter(|v| !v.is_empty())
        .collect::<FxHashSet<_>>()
        .len()
}

/// Sorted distinct non-empty values of one column
pub(crate) fn unique_values_of(rows: &[Vec<String>], column: Column) -> Vec<String> {
    let idx = column.index();
    rows.iter()
        .filter_map(|row| row.get(idx).map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
        .sorted()
        .dedup()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_with(victim: &str, date: &str) -> Vec<String> {
        let mut row = vec![String::new(); 33];
        row[Column::Victim.index()] = victim.to_string();
        row[Column::IncidentDate.index()] = date.to_string();
        row
    }

    #[test]
    fn test_sort_orders_by_date_with_unparseable_last() {
        let mut rows = vec![
            row_with("B", "30/01/2024"),
            row_with("X", "sem data"),
            row_with("A", "10/01/2024"),
            row_with("C", "20/01/2024"),
        ];
        sort_rows_by_incident_date(&mut rows);

        let victims: Vec<&str> = rows
            .iter()
            .map(|r| r[Column::Victim.index()].as_str())
            .collect();
        assert_eq!(victims, vec!["A", "C", "B", "X"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_dates() {
        let mut rows = vec![
            row_with("primeiro", "10/01/2024"),
            row_with("segundo", "10/01/2024"),
        ];
        sort_rows_by_incident_date(&mut rows);
        assert_eq!(rows[0][Column::Victim.index()], "primeiro");
        assert_eq!(rows[1][Column::Victim.index()], "segundo");
    }

    #[test]
    fn test_find_row_position_counts_header() {
        let rows = vec![
            row_with("A", "10/01/2024"),
            row_with("B", "15/01/2024"),
            row_with("C", "20/01/2024"),
        ];
        let record = Record {
            victim_name: "B".to_string(),
            incident_date: parse_sheet_date("15/01/2024"),
            ..Record::default()
        };
        assert_eq!(find_row_position(&rows, &record), 3);
    }

    #[test]
    fn test_find_row_position_missing_is_negative() {
        let rows = vec![row_with("A", "10/01/2024")];
        let record = Record {
            victim_name: "Z".to_string(),
            incident_date: parse_sheet_date("10/01/2024"),
            ..Record::default()
        };
        assert_eq!(find_row_position(&rows, &record), -1);
    }

    #[test]
    fn test_latest_incident_date_takes_last_filled_cell() {
        let rows = vec![
            row_with("A", "10/01/2024"),
            row_with("B", "05/01/2024"),
            row_with("C", ""),
        ];
        assert_eq!(latest_incident_date(&rows), parse_sheet_date("05/01/2024"));
    }

    #[test]
    fn test_distinct_municipalities_ignores_blanks() {
        let mut r1 = row_with("A", "");
        r1[Column::Municipality.index()] = "Teresina".to_string();
        let mut r2 = row_with("B", "");
        r2[Column::Municipality.index()] = " Teresina ".to_string();
        let mut r3 = row_with("C", "");
        r3[Column::Municipality.index()] = "Parnaíba".to_string();
        let r4 = row_with("D", "");

        let rows = vec![r1, r2, r3, r4];
        assert_eq!(distinct_municipalities(&rows), 2);
    }

    #[test]
    fn test_unique_values_sorted_without_blanks() {
        let mut r1 = row_with("A", "");
        r1[Column::DeathLocation.index()] = "Via".to_string();
        let mut r2 = row_with("B", "");
        r2[Column::DeathLocation.index()] = "Hospital".to_string();
        let mut r3 = row_with("C", "");
        r3[Column::DeathLocation.index()] = "Via".to_string();

        let rows = vec![r1, r2, r3];
        assert_eq!(
            unique_values_of(&rows, Column::DeathLocation),
            vec!["Hospital".to_string(), "Via".to_string()]
        );
    }
}
