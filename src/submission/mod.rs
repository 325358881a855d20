//! Submission pipeline: validate, persist, mirror.
//!
//! The pipeline owns a record store and optionally a relational mirror.
//! A submission validates the record, inserts it into the store in
//! incident-date order, then mirrors it. The store insert is the source of
//! truth: its failure aborts the submission, while a mirror failure only
//! surfaces as a note on the outcome.

use std::path::Path;

use log::warn;

use crate::error::{Result, StoreError};
use crate::mirror::RelationalMirror;
use crate::record::Record;
use crate::store::{RecordStore, StoreSummary};
use crate::validate::{missing_required_fields, validate_record};

/// What a completed submission reports back
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    /// Operator-facing confirmation
    pub message: String,
    /// 1-based sheet row the record landed on, -1 when not located
    pub position: i64,
    /// Year partition that received the record, for partitioned stores
    pub partition: Option<i32>,
    /// Mirror result note, present only when a mirror is attached
    pub mirror_note: Option<String>,
}

/// Validating front door over a store and an optional mirror
pub struct SubmissionPipeline<S: RecordStore> {
    store: S,
    mirror: Option<RelationalMirror>,
}

impl<S: RecordStore> SubmissionPipeline<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            mirror: None,
        }
    }

    /// Attach a relational mirror, builder style
    #[must_use]
    pub fn with_mirror(mut self, mirror: RelationalMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Load the backing store
    pub async fn load(&mut self) -> Result<StoreSummary> {
        self.store.load().await
    }

    /// Validate and persist one record, then mirror it.
    ///
    /// Missing required fields are reported together in a single error.
    pub async fn submit(&mut self, record: &Record) -> Result<SubmissionOutcome> {
        let missing = missing_required_fields(record);
        if !missing.is_empty() {
            let labels: Vec<&str> = missing.iter().map(|c| c.label()).collect();
            return Err(StoreError::ValidationFailed {
                field: labels.join(", "),
                reason: "required field(s) empty".to_string(),
            });
        }
        validate_record(record)?;

        let mut record = record.clone();
        record.recompute_derived();

        let outcome = self.store.insert(&record).await?;

        let mirror_note = match &mut self.mirror {
            Some(mirror) => Some(match mirror.insert_record(&record).await {
                Ok(_) => "PostgreSQL: Sincronizado".to_string(),
                Err(e) => {
                    warn!("mirror insert failed: {e}");
                    format!("PostgreSQL: Erro - {e}")
                }
            }),
            None => None,
        };

        let message = match outcome.partition {
            Some(year) => format!("Registro inserido com sucesso na aba {year}!"),
            None => "Registro inserido com sucesso!".to_string(),
        };

        Ok(SubmissionOutcome {
            message,
            position: outcome.position,
            partition: outcome.partition,
            mirror_note,
        })
    }

    /// Persist pending changes of the underlying store
    pub async fn save(&mut self, destination: Option<&Path>) -> Result<()> {
        self.store.save(destination).await
    }

    /// The underlying store, for summaries and combo values
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Layout};
    use crate::store::transport::MemoryTransport;
    use crate::store::worksheets::WorksheetStore;
    use chrono::NaiveDate;

    fn seeded_pipeline() -> SubmissionPipeline<WorksheetStore<MemoryTransport>> {
        let mut row = vec![String::new(); 33];
        row[Column::Victim.index()] = "ANA".to_string();
        row[Column::IncidentDate.index()] = "10/01/2024".to_string();
        let mut tab = vec![Layout::Full.header_row()];
        tab.push(row);
        let transport = MemoryTransport::new("Registro").with_tab("2024", tab);
        SubmissionPipeline::new(WorksheetStore::new(transport))
    }

    fn valid_record() -> Record {
        Record {
            occurrence_nature: "Acidente de Trânsito".to_string(),
            report_number: "2024.123".to_string(),
            accident_type: "Colisão Frontal".to_string(),
            death_date: NaiveDate::from_ymd_opt(2024, 1, 5),
            victim_name: "BETO SILVA".to_string(),
            sex: "Masculino".to_string(),
            municipality: "Teresina".to_string(),
            incident_date: NaiveDate::from_ymd_opt(2024, 1, 5),
            street: "Av. Frei Serafim".to_string(),
            victim_vehicle: "Motocicleta".to_string(),
            ..Record::default()
        }
    }

    #[tokio::test]
    async fn test_submit_places_record() {
        let mut pipeline = seeded_pipeline();
        pipeline.load().await.unwrap();

        let outcome = pipeline.submit(&valid_record()).await.unwrap();
        assert_eq!(outcome.message, "Registro inserido com sucesso na aba 2024!");
        assert_eq!(outcome.position, 2);
        assert_eq!(outcome.partition, Some(2024));
        assert_eq!(outcome.mirror_note, None);
        assert_eq!(pipeline.store().summary().records, 2);
    }

    #[tokio::test]
    async fn test_submit_reports_all_missing_fields() {
        let mut pipeline = seeded_pipeline();
        pipeline.load().await.unwrap();

        match pipeline.submit(&Record::default()).await {
            Err(StoreError::ValidationFailed { field, .. }) => {
                assert!(field.contains("Vítima"));
                assert!(field.contains("Data do Fato"));
            }
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_cpf() {
        let mut pipeline = seeded_pipeline();
        pipeline.load().await.unwrap();

        let record = Record {
            cpf: "12345678900".to_string(),
            ..valid_record()
        };
        assert!(pipeline.submit(&record).await.is_err());
    }

    #[tokio::test]
    async fn test_submit_fills_derived_fields() {
        let mut pipeline = seeded_pipeline();
        pipeline.load().await.unwrap();

        pipeline.submit(&valid_record()).await.unwrap();
        let stored = pipeline
            .store()
            .unique_values(Column::Weekday);
        // 2024-01-05 was a Friday
        assert!(stored.contains(&"SEXTA-FEIRA".to_string()));
    }
}
