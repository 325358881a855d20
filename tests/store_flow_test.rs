use chrono::NaiveDate;
use transito_cadastro::{
    Column, Layout, MemoryTransport, Record, RecordStore, StoreError, SubmissionPipeline,
    WorkbookStore, WorksheetStore,
};

fn canonical_row(victim: &str, date: &str, municipality: &str) -> Vec<String> {
    let mut row = vec![String::new(); 33];
    row[Column::Victim.index()] = victim.to_string();
    row[Column::IncidentDate.index()] = date.to_string();
    row[Column::Municipality.index()] = municipality.to_string();
    row
}

fn year_tab(rows: &[Vec<String>]) -> Vec<Vec<String>> {
    let mut tab = vec![Layout::Full.header_row()];
    tab.extend(rows.iter().cloned());
    tab
}

fn sample_record(victim: &str, year: i32, month: u32, day: u32) -> Record {
    Record {
        occurrence_nature: "Acidente de Trânsito".to_string(),
        report_number: format!("{year}.00123"),
        accident_type: "Colisão Frontal".to_string(),
        death_date: NaiveDate::from_ymd_opt(year, month, day),
        victim_name: victim.to_string(),
        sex: "Masculino".to_string(),
        municipality: "Parnaíba".to_string(),
        incident_date: NaiveDate::from_ymd_opt(year, month, day),
        ..Record::default()
    }
}

/// End-to-end submission into a partitioned worksheet document
#[tokio::test]
async fn test_worksheet_submission_flow() -> transito_cadastro::Result<()> {
    let transport = MemoryTransport::new("Registro de Acidentes")
        .with_tab(
            "2024",
            year_tab(&[
                canonical_row("ANA", "10/01/2024", "Teresina"),
                canonical_row("BETO", "20/03/2024", "Teresina"),
            ]),
        )
        .with_tab("2025", year_tab(&[canonical_row("CARLA", "05/02/2025", "Picos")]));
    let mut pipeline = SubmissionPipeline::new(WorksheetStore::new(transport));

    let summary = pipeline.load().await?;
    assert_eq!(summary.records, 3);
    assert_eq!(summary.partitions, vec![2024, 2025]);

    // The record is dated 2024, so it must land in the 2024 tab even though
    // the 2025 tab is active after load
    let outcome = pipeline.submit(&sample_record("DANIEL", 2024, 2, 15)).await?;
    assert_eq!(outcome.message, "Registro inserido com sucesso na aba 2024!");
    assert_eq!(outcome.partition, Some(2024));
    assert_eq!(outcome.position, 3);
    assert_eq!(outcome.mirror_note, None);
    assert_eq!(pipeline.store().summary().records, 4);

    let municipalities = pipeline.store().unique_values(Column::Municipality);
    assert_eq!(municipalities, vec!["Parnaíba", "Teresina"]);

    Ok(())
}

/// A submission that fails validation leaves the store untouched
#[tokio::test]
async fn test_rejected_submission_changes_nothing() -> transito_cadastro::Result<()> {
    let transport = MemoryTransport::new("Registro")
        .with_tab("2024", year_tab(&[canonical_row("ANA", "10/01/2024", "Teresina")]));
    let mut pipeline = SubmissionPipeline::new(WorksheetStore::new(transport));
    pipeline.load().await?;

    let result = pipeline.submit(&Record::default()).await;
    assert!(matches!(result, Err(StoreError::ValidationFailed { .. })));
    assert_eq!(pipeline.store().summary().records, 1);

    Ok(())
}

/// A record dated outside the available year tabs is rejected with the
/// years on offer
#[tokio::test]
async fn test_partition_mismatch_lists_available_years() -> transito_cadastro::Result<()> {
    let transport = MemoryTransport::new("Registro")
        .with_tab("2024", year_tab(&[canonical_row("ANA", "10/01/2024", "Teresina")]));
    let mut pipeline = SubmissionPipeline::new(WorksheetStore::new(transport));
    pipeline.load().await?;

    match pipeline.submit(&sample_record("BETO", 2023, 6, 1)).await {
        Err(StoreError::PartitionNotFound { year, available }) => {
            assert_eq!(year, 2023);
            assert_eq!(available, vec![2024]);
        }
        other => panic!("expected PartitionNotFound, got {other:?}"),
    }

    Ok(())
}

/// Flat workbook flow: inserts stay in memory until save writes a fresh file
#[tokio::test]
async fn test_workbook_save_round_trip() -> transito_cadastro::Result<()> {
    let source = std::env::temp_dir().join(format!("transito_flow_src_{}.xlsx", std::process::id()));
    let saved = std::env::temp_dir().join(format!("transito_flow_dst_{}.xlsx", std::process::id()));

    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_sheet_mut(&0).unwrap();
    sheet.set_name("Registro Geral");
    for (i, column) in Column::ALL.iter().enumerate() {
        sheet
            .get_cell_mut((i as u32 + 1, 1))
            .set_value(column.label());
    }
    for (r, (victim, date)) in [("ANA", "10/01/2024"), ("CARLA", "30/01/2024")]
        .iter()
        .enumerate()
    {
        let row_idx = r as u32 + 2;
        sheet
            .get_cell_mut((Column::Victim.index() as u32 + 1, row_idx))
            .set_value(*victim);
        sheet
            .get_cell_mut((Column::IncidentDate.index() as u32 + 1, row_idx))
            .set_value(*date);
    }
    umya_spreadsheet::writer::xlsx::write(&book, &source).unwrap();

    let mut pipeline = SubmissionPipeline::new(WorkbookStore::new(&source));
    let summary = pipeline.load().await?;
    assert_eq!(summary.records, 2);
    assert!(summary.partitions.is_empty());

    let outcome = pipeline.submit(&sample_record("BETO", 2024, 1, 15)).await?;
    assert_eq!(outcome.message, "Registro inserido com sucesso!");
    assert_eq!(outcome.position, 3);
    assert_eq!(outcome.partition, None);

    pipeline.save(Some(&saved)).await?;

    let mut reloaded = WorkbookStore::new(&saved);
    let summary = reloaded.load().await?;
    assert_eq!(summary.records, 3);
    assert_eq!(
        summary.latest_incident,
        NaiveDate::from_ymd_opt(2024, 1, 30)
    );
    assert_eq!(reloaded.last_record().unwrap().victim_name, "CARLA");

    let _ = std::fs::remove_file(&source);
    let _ = std::fs::remove_file(&saved);
    Ok(())
}
