//! Raw-row sources.
//!
//! A source answers "give me the raw rows for subsystem X". Snapshots are
//! one CSV file per subsystem, read either from a local directory or over
//! HTTP.

pub mod parser;

pub use parser::parse_rows;

use crate::models::{RawRow, Subsystem};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Why a snapshot could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to fetch {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Failed to fetch {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid data source: {0}")]
    InvalidSource(String),
}

/// Placeholder substituted with the snapshot file name in remote URLs.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Where snapshots come from.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// `<dir>/<subsystem>.csv`
    Local { dir: PathBuf },
    /// HTTP GET per subsystem.
    Remote {
        base_url: String,
        client: reqwest::Client,
    },
}

impl DataSource {
    /// A source reading from a local directory.
    pub fn local(dir: impl Into<PathBuf>) -> Self {
        DataSource::Local { dir: dir.into() }
    }

    /// A source fetching over HTTP.
    ///
    /// `base_url` may contain a `{file}` placeholder; otherwise the file
    /// name is appended as a path segment.
    pub fn remote(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(FetchError::InvalidSource(format!(
                "Base URL must start with 'http://' or 'https://': {}",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::InvalidSource(e.to_string()))?;

        Ok(DataSource::Remote {
            base_url: base_url.to_string(),
            client,
        })
    }

    /// Short description for logs and reports.
    pub fn describe(&self) -> String {
        match self {
            DataSource::Local { dir } => dir.display().to_string(),
            DataSource::Remote { base_url, .. } => base_url.clone(),
        }
    }

    /// Location of the snapshot for a subsystem.
    pub fn location(&self, subsystem: Subsystem) -> String {
        match self {
            DataSource::Local { dir } => dir.join(subsystem.file_name()).display().to_string(),
            DataSource::Remote { base_url, .. } => remote_url(base_url, subsystem),
        }
    }

    /// Fetch and parse the raw rows for a subsystem.
    pub async fn fetch(&self, subsystem: Subsystem) -> Result<Vec<RawRow>, FetchError> {
        let text = match self {
            DataSource::Local { dir } => {
                let path = dir.join(subsystem.file_name());
                debug!("Reading {}", path.display());
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| FetchError::Io {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })?
            }
            DataSource::Remote { base_url, client } => {
                let url = remote_url(base_url, subsystem);
                debug!("Fetching from URL: {}", url);
                fetch_text(client, &url).await?
            }
        };

        debug!("Snapshot text length: {} characters", text.len());

        let parsed = parse_rows(&text, subsystem);
        if parsed.skipped_records > 0 {
            debug!(
                "Skipped {} undecodable records in {}",
                parsed.skipped_records,
                subsystem.file_name()
            );
        }
        info!("Loaded {} rows from {}", parsed.rows.len(), subsystem.file_name());

        Ok(parsed.rows)
    }
}

async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    let transport = |e: reqwest::Error| FetchError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    };

    let response = client.get(url).send().await.map_err(transport)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(transport)
}

/// Build the download URL of a subsystem snapshot.
pub fn remote_url(base_url: &str, subsystem: Subsystem) -> String {
    let file = subsystem.file_name();
    if base_url.contains(FILE_PLACEHOLDER) {
        base_url.replace(FILE_PLACEHOLDER, &file)
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricKind;
    use std::path::Path;
    use tokio_test::{assert_err, assert_ok};

    fn fixtures_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    #[test]
    fn test_remote_url_append() {
        assert_eq!(
            remote_url("https://data.example.org/snapshots/", Subsystem::DefiGov),
            "https://data.example.org/snapshots/defi_gov.csv"
        );
    }

    #[test]
    fn test_remote_url_placeholder() {
        assert_eq!(
            remote_url(
                "https://storage.example.com/v0/b/bucket/o/{file}?alt=media",
                Subsystem::Consensus
            ),
            "https://storage.example.com/v0/b/bucket/o/consensus.csv?alt=media"
        );
    }

    #[test]
    fn test_remote_rejects_bad_scheme() {
        let result = DataSource::remote("ftp://example.org", Duration::from_secs(5));
        assert!(matches!(result, Err(FetchError::InvalidSource(_))));
    }

    #[tokio::test]
    async fn test_local_fixture() {
        let source = DataSource::local(fixtures_dir());
        let rows = assert_ok!(source.fetch(Subsystem::Consensus).await);

        assert!(!rows.is_empty());
        assert!(rows.iter().any(|r| r.group.as_deref() == Some("Bitcoin")));
        assert!(rows.iter().any(|r| r.metrics.get(MetricKind::Entropy).is_some()));
    }

    #[tokio::test]
    async fn test_local_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = DataSource::local(dir.path());
        let err = assert_err!(source.fetch(Subsystem::Exchanges).await);

        assert!(matches!(err, FetchError::Io { .. }));
        assert!(err.to_string().contains("exchanges.csv"));
    }

    #[tokio::test]
    async fn test_local_tempdir_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("developers.csv"),
            "Date,Subsystem,Group,Count\n2024-02-02,developers,Ethereum,312\n",
        )
        .unwrap();

        let source = DataSource::local(dir.path());
        let rows = assert_ok!(source.fetch(Subsystem::Developers).await);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].metrics.get(MetricKind::Count), Some(312.0));
    }
}
