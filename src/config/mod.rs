//! Configuration for the record stores and the relational mirror.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Connection settings for the PostgreSQL mirror
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Database host
    pub host: String,
    /// Database port
    pub port: u16,
    /// Database name
    pub database: String,
    /// Login user
    pub user: String,
    /// Login password
    pub password: String,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl MirrorConfig {
    /// Read the mirror configuration from environment variables
    ///
    /// Reads `DB_HOST`, `DB_PORT` (default 5432), `DB_NAME`, `DB_USER` and
    /// `DB_PASSWORD`. Fails fast listing every missing variable so a broken
    /// environment is reported in one message.
    pub fn from_env() -> Result<Self> {
        let mut missing = Vec::new();
        let host = require_var("DB_HOST", &mut missing);
        let database = require_var("DB_NAME", &mut missing);
        let user = require_var("DB_USER", &mut missing);
        let password = require_var("DB_PASSWORD", &mut missing);

        if !missing.is_empty() {
            return Err(StoreError::Configuration(format!(
                "environment variables not set: {}",
                missing.join(", ")
            )));
        }

        let port = match std::env::var("DB_PORT") {
            Ok(value) => value.parse::<u16>().map_err(|_| {
                StoreError::Configuration(format!("DB_PORT is not a valid port: {value}"))
            })?,
            Err(_) => 5432,
        };

        Ok(Self {
            host: host.unwrap_or_default(),
            port,
            database: database.unwrap_or_default(),
            user: user.unwrap_or_default(),
            password: password.unwrap_or_default(),
            connect_timeout_secs: 15,
        })
    }

    /// True when every required mirror variable is present in the environment
    #[must_use]
    pub fn env_is_configured() -> bool {
        ["DB_HOST", "DB_NAME", "DB_USER", "DB_PASSWORD"]
            .iter()
            .all(|name| std::env::var(name).is_ok())
    }
}

fn require_var(name: &'static str, missing: &mut Vec<&'static str>) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => {
            missing.push(name);
            None
        }
    }
}

/// Settings for the partitioned cloud worksheet store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Path to the service account credentials artifact
    pub credentials_path: PathBuf,
    /// Full document URL as shared from the browser
    pub document_url: String,
}

impl SheetsConfig {
    /// Create a config from a credentials path and a document URL
    #[must_use]
    pub fn new(credentials_path: impl Into<PathBuf>, document_url: impl Into<String>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            document_url: document_url.into(),
        }
    }

    /// Load a previously saved config from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| StoreError::Configuration(format!("saved config is not valid: {e}")))
    }

    /// Persist the config as JSON so the next session can reuse it
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| StoreError::Unexpected(format!("config serialization: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Extract the spreadsheet id from the `/d/{id}` segment of the URL
    pub fn spreadsheet_id(&self) -> Result<&str> {
        let url = self.document_url.as_str();
        let start = url.find("/d/").map(|idx| idx + 3).ok_or_else(|| {
            StoreError::Configuration(format!("document URL has no /d/ segment: {url}"))
        })?;
        let rest = &url[start..];
        let end = rest
            .find(|c| c == '/' || c == '?' || c == '#')
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(StoreError::Configuration(format!(
                "document URL has an empty id segment: {url}"
            )));
        }
        Ok(&rest[..end])
    }
}
