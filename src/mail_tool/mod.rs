//! Email tool server.
//!
//! Exposes one MCP tool, `send_email`, over stdio. Recipients are symbolic
//! names resolved through a [`ContactDirectory`]; delivered messages land in
//! a local JSONL [`Outbox`]. Run by the `toolbridge-mail` binary.

pub mod contacts;
pub mod outbox;
pub mod server;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

pub use contacts::ContactDirectory;
pub use outbox::{Outbox, OutboxRecord};
pub use server::{run_server, run_stdio};

/// Name of the only tool this server exposes.
pub const SEND_EMAIL: &str = "send_email";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("contact directory {path} unavailable: {reason}")]
    ContactsUnavailable { path: String, reason: String },

    #[error("address not found for '{name}'")]
    AddressNotFound { name: String },

    #[error("invalid arguments: {reason}")]
    InvalidArguments { reason: String },

    #[error("outbox write failed: {reason}")]
    Outbox { reason: String },
}

/// `send_email` arguments.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendEmailArgs {
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub cc: Option<Vec<String>>,
    #[serde(default)]
    pub bcc: Option<Vec<String>>,
}

/// Contact resolution plus delivery.
pub struct MailService {
    contacts: ContactDirectory,
    outbox: Outbox,
}

impl MailService {
    pub fn new(contacts: ContactDirectory, outbox: Outbox) -> Self {
        Self { contacts, outbox }
    }

    /// JSON schema advertised in `tools/list`.
    pub fn send_email_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "to": {
                    "type": "string",
                    "description": "Contact name of the recipient, e.g. \"alice\""
                },
                "subject": { "type": "string" },
                "body": { "type": "string" },
                "cc": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Contact names to copy"
                },
                "bcc": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Contact names to blind-copy"
                }
            },
            "required": ["to", "subject", "body"],
            "additionalProperties": false
        })
    }

    /// Resolve every recipient, then deliver. Nothing is written if any name
    /// is unknown.
    pub async fn send_email(&self, args: SendEmailArgs) -> Result<OutboxRecord, MailError> {
        let to = self.contacts.resolve(&args.to)?;
        let cc = self
            .contacts
            .resolve_all(args.cc.as_deref().unwrap_or_default())?;
        let bcc = self
            .contacts
            .resolve_all(args.bcc.as_deref().unwrap_or_default())?;

        self.outbox
            .deliver(to, cc, bcc, &args.subject, &args.body)
            .await
    }
}

/// Human-and-model-readable summary of a delivery.
pub fn delivery_report(record: &OutboxRecord) -> String {
    json!({
        "status": "success",
        "message_id": record.message_id,
        "thread_id": record.thread_id,
        "to": record.to,
        "cc": record.cc,
        "bcc": record.bcc,
    })
    .to_string()
}
