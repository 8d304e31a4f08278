//! Local delivery: one JSON line per sent message.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::MailError;

/// A message as written to the outbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub message_id: String,
    pub thread_id: String,
    pub sent_at: DateTime<Utc>,
    pub to: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Append-only JSONL file of delivered messages.
pub struct Outbox {
    path: PathBuf,
    /// Serializes appends so lines never interleave.
    write_lock: Mutex<()>,
}

impl Outbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stamp ids and time onto a message and append it.
    pub async fn deliver(
        &self,
        to: String,
        cc: Vec<String>,
        bcc: Vec<String>,
        subject: &str,
        body: &str,
    ) -> Result<OutboxRecord, MailError> {
        let message_id = Uuid::new_v4().to_string();
        let record = OutboxRecord {
            thread_id: message_id.clone(),
            message_id,
            sent_at: Utc::now(),
            to,
            cc,
            bcc,
            subject: subject.trim().to_string(),
            body: body.to_string(),
        };

        let mut line = serde_json::to_string(&record).map_err(|e| MailError::Outbox {
            reason: format!("failed to encode message: {e}"),
        })?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;

        tracing::info!(
            message_id = %record.message_id,
            to = %record.to,
            cc = record.cc.len(),
            bcc = record.bcc.len(),
            outbox = %self.path.display(),
            "message delivered"
        );
        Ok(record)
    }

    fn io_error(&self, e: std::io::Error) -> MailError {
        MailError::Outbox {
            reason: format!("{}: {e}", self.path.display()),
        }
    }
}
