//! Transport layer for the partitioned worksheet store.
//!
//! The store only needs four operations against a spreadsheet document:
//! its title, the tab titles, the raw rows of one tab and a wholesale
//! rewrite of one tab. [`RestTransport`] speaks the Sheets v4 REST API with
//! a ready bearer token (token issuance happens outside this crate);
//! [`MemoryTransport`] backs tests and offline use.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{Result, StoreError};

/// Abstract access to a spreadsheet document
pub trait SheetTransport: Send + Sync {
    /// Title of the whole document
    fn document_title<'a>(&'a self)
    -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

    /// Titles of every worksheet tab, in document order
    fn worksheet_titles<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'a>>;

    /// All rows of one tab, header included, cells as display strings
    fn read_rows<'a>(
        &'a self,
        title: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<String>>>> + Send + 'a>>;

    /// Replace the full contents of one tab
    fn overwrite_rows<'a>(
        &'a self,
        title: &'a str,
        rows: Vec<Vec<String>>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

const SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Sheets v4 REST client with bearer authentication
#[derive(Debug, Clone)]
pub struct RestTransport {
    client: reqwest::Client,
    spreadsheet_id: String,
    access_token: String,
}

impl RestTransport {
    /// Create a transport for one spreadsheet with a ready access token
    #[must_use]
    pub fn new(spreadsheet_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            spreadsheet_id: spreadsheet_id.into(),
            access_token: access_token.into(),
        }
    }

    fn base_url(&self) -> String {
        format!("{SHEETS_ENDPOINT}/{}", self.spreadsheet_id)
    }

    async fn fetch_metadata(&self) -> Result<SpreadsheetMeta> {
        let url = format!(
            "{}?fields=properties.title,sheets.properties.title",
            self.base_url()
        );
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?;

        let meta = response
            .json::<SpreadsheetMeta>()
            .await
            .map_err(|e| StoreError::InvalidFormat(format!("spreadsheet metadata: {e}")))?;
        Ok(meta)
    }
}

impl SheetTransport for RestTransport {
    fn document_title<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move { Ok(self.fetch_metadata().await?.properties.title) })
    }

    fn worksheet_titles<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'a>> {
        Box::pin(async move {
            let meta = self.fetch_metadata().await?;
            Ok(meta
                .sheets
                .into_iter()
                .map(|sheet| sheet.properties.title)
                .collect())
        })
    }

    fn read_rows<'a>(
        &'a self,
        title: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<String>>>> + Send + 'a>> {
        Box::pin(async move {
            // Year tab titles need no A1-range quoting
            let url = format!("{}/values/{title}", self.base_url());
            let response = self
                .client
                .get(url)
                .bearer_auth(&self.access_token)
                .send()
                .await?
                .error_for_status()?;

            let range = response
                .json::<ValueRange>()
                .await
                .map_err(|e| StoreError::InvalidFormat(format!("value range: {e}")))?;

            Ok(range
                .values
                .into_iter()
                .map(|row| row.into_iter().map(json_cell_to_string).collect())
                .collect())
        })
    }

    fn overwrite_rows<'a>(
        &'a self,
        title: &'a str,
        rows: Vec<Vec<String>>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let clear_url = format!("{}/values/{title}:clear", self.base_url());
            self.client
                .post(clear_url)
                .bearer_auth(&self.access_token)
                .send()
                .await?
                .error_for_status()?;

            let update_url = format!(
                "{}/values/{title}?valueInputOption=USER_ENTERED",
                self.base_url()
            );
            let body = serde_json::json!({
                "range": title,
                "majorDimension": "ROWS",
                "values": rows,
            });
            self.client
                .put(update_url)
                .bearer_auth(&self.access_token)
                .json(&body)
                .send()
                .await?
                .error_for_status()?;

            Ok(())
        })
    }
}

fn json_cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    properties: DocumentProperties,
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct DocumentProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

/// `values.get` response; `values` is absent entirely for an empty tab
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// In-memory document for tests and offline runs
#[derive(Debug, Default)]
pub struct MemoryTransport {
    title: String,
    tabs: Mutex<Vec<(String, Vec<Vec<String>>)>>,
}

impl MemoryTransport {
    /// Create an empty document with a title
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tabs: Mutex::new(Vec::new()),
        }
    }

    /// Add a tab with its rows, builder style
    #[must_use]
    pub fn with_tab(mut self, title: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        self.tabs.get_mut().push((title.into(), rows));
        self
    }

    /// Current rows of a tab, for assertions
    pub async fn snapshot(&self, title: &str) -> Option<Vec<Vec<String>>> {
        let tabs = self.tabs.lock().await;
        tabs.iter()
            .find(|(name, _)| name == title)
            .map(|(_, rows)| rows.clone())
    }
}

impl SheetTransport for MemoryTransport {
    fn document_title<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move { Ok(self.title.clone()) })
    }

    fn worksheet_titles<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'a>> {
        Box::pin(async move {
            let tabs = self.tabs.lock().await;
            Ok(tabs.iter().map(|(name, _)| name.clone()).collect())
        })
    }

    fn read_rows<'a>(
        &'a self,
        title: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<String>>>> + Send + 'a>> {
        Box::pin(async move {
            let tabs = self.tabs.lock().await;
            tabs.iter()
                .find(|(name, _)| name == title)
                .map(|(_, rows)| rows.clone())
                .ok_or_else(|| StoreError::NotFound(format!("worksheet {title}")))
        })
    }

    fn overwrite_rows<'a>(
        &'a self,
        title: &'a str,
        rows: Vec<Vec<String>>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut tabs = self.tabs.lock().await;
            match tabs.iter_mut().find(|(name, _)| name == title) {
                Some((_, existing)) => {
                    *existing = rows;
                    Ok(())
                }
                None => Err(StoreError::NotFound(format!("worksheet {title}"))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_transport_round_trip() {
        let transport = MemoryTransport::new("Registro de Mortes")
            .with_tab("2024", vec![vec!["a".to_string()], vec!["b".to_string()]]);

        assert_eq!(transport.document_title().await.unwrap(), "Registro de Mortes");
        assert_eq!(transport.worksheet_titles().await.unwrap(), vec!["2024"]);

        let rows = transport.read_rows("2024").await.unwrap();
        assert_eq!(rows.len(), 2);

        transport
            .overwrite_rows("2024", vec![vec!["c".to_string()]])
            .await
            .unwrap();
        let rows = transport.snapshot("2024").await.unwrap();
        assert_eq!(rows, vec![vec!["c".to_string()]]);
    }

    #[tokio::test]
    async fn test_memory_transport_missing_tab() {
        let transport = MemoryTransport::new("vazio");
        assert!(transport.read_rows("2024").await.is_err());
    }

    #[test]
    fn test_json_cell_to_string() {
        use serde_json::json;
        assert_eq!(json_cell_to_string(json!("texto")), "texto");
        assert_eq!(json_cell_to_string(json!(12)), "12");
        assert_eq!(json_cell_to_string(json!(null)), "");
    }
}
