use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use log::{info, warn};
use transito_cadastro::config::{MirrorConfig, SheetsConfig};
use transito_cadastro::mirror::RelationalMirror;
use transito_cadastro::schema::Column;
use transito_cadastro::store::RecordStore;
use transito_cadastro::store::transport::RestTransport;
use transito_cadastro::store::workbook::WorkbookStore;
use transito_cadastro::store::worksheets::WorksheetStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Check 1: flat workbook, first argument is an xlsx path
    if let Some(path) = std::env::args().nth(1).map(PathBuf::from) {
        info!("Loading workbook {}", path.display());
        let start = Instant::now();
        let mut store = WorkbookStore::new(&path);
        match store.load().await {
            Ok(summary) => {
                info!(
                    "Loaded {} record(s), {} municipalit(y/ies) in {:?}",
                    summary.records,
                    summary.municipalities,
                    start.elapsed()
                );
                if let Some(latest) = summary.latest_incident {
                    info!("Latest incident on {}", latest.format("%d/%m/%Y"));
                }
                let municipalities = store.unique_values(Column::Municipality);
                if !municipalities.is_empty() {
                    info!("Municipalities: {}", municipalities.join(", "));
                }
            }
            Err(e) => warn!("Workbook load failed: {e}"),
        }
    } else {
        info!("No workbook path given, skipping flat store check");
    }

    // Check 2: partitioned worksheet document via URL and access token
    if let (Ok(url), Ok(token)) = (std::env::var("SHEETS_URL"), std::env::var("SHEETS_TOKEN")) {
        let config = SheetsConfig::new("credentials.json", url.as_str());
        let spreadsheet_id = config
            .spreadsheet_id()
            .with_context(|| format!("SHEETS_URL \"{url}\" has no spreadsheet id"))?
            .to_string();
        info!("Loading worksheet document {spreadsheet_id}");
        let start = Instant::now();
        let mut store = WorksheetStore::new(RestTransport::new(spreadsheet_id, token));
        match store.load().await {
            Ok(summary) => {
                info!(
                    "Loaded \"{}\": {} record(s) over year tabs {:?} in {:?}",
                    summary.source,
                    summary.records,
                    summary.partitions,
                    start.elapsed()
                );
                if let Some(year) = store.active_partition() {
                    info!("Active partition: {year}");
                }
            }
            Err(e) => warn!("Worksheet load failed: {e}"),
        }
    } else {
        info!("SHEETS_URL/SHEETS_TOKEN not set, skipping worksheet check");
    }

    // Check 3: mirror connectivity probe
    if MirrorConfig::env_is_configured() {
        let mut mirror =
            RelationalMirror::from_env().context("reading the DB_* mirror configuration")?;
        let start = Instant::now();
        match mirror.test_connection().await {
            Ok(()) => info!("Mirror connection OK in {:?}", start.elapsed()),
            Err(e) => warn!("Mirror connection failed: {e}"),
        }
    } else {
        info!("DB_* variables not set, skipping mirror check");
    }

    Ok(())
}
