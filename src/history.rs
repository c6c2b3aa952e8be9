//! Append-only JSON-lines record of raw provider responses

use crate::FareError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::value::RawValue;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Serialize)]
struct HistoryEntry<'a> {
    timestamp: DateTime<Utc>,
    origin: &'a str,
    destination: &'a str,
    departure_date: String,
    raw_response: &'a RawValue,
}

/// Appends one line per provider response. Writes are serialized through a
/// lock so concurrent samples never interleave partial lines.
pub struct ApiHistory {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ApiHistory {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best-effort append; failures are logged and swallowed
    pub async fn record(&self, origin: &str, destination: &str, departure_date: NaiveDate, raw_body: &str) {
        match self.try_record(origin, destination, departure_date, raw_body).await {
            Ok(()) => debug!(path = %self.path.display(), "Provider response appended to history"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to append provider response to history"),
        }
    }

    async fn try_record(
        &self,
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
        raw_body: &str,
    ) -> Result<(), FareError> {
        // Stored verbatim; a body that is not JSON cannot be embedded and is rejected here
        let raw_response: &RawValue = serde_json::from_str(raw_body.trim())?;

        let entry = HistoryEntry {
            timestamp: Utc::now(),
            origin,
            destination,
            departure_date: departure_date.format("%Y-%m-%d").to_string(),
            raw_response,
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
