//! Email tool server binary.
//!
//! Spawned by `toolbridge` as its MCP tool server. Speaks JSON-RPC 2.0 on
//! stdio; logs go to stderr.
//!
//! Environment variables:
//! - `CONTACTS_PATH`: JSON object of contact name → email address
//! - `OUTBOX_PATH`: JSONL file delivered messages are appended to
//!   (default: `<data dir>/toolbridge/outbox.jsonl`)

use std::path::PathBuf;

use anyhow::Context;
use toolbridge::mail_tool::{run_stdio, ContactDirectory, MailService, Outbox};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    toolbridge::logging::init_stderr_tracing("toolbridge=info,toolbridge_mail=info,warn");

    let contacts = match std::env::var("CONTACTS_PATH") {
        Ok(path) => ContactDirectory::load(&PathBuf::from(&path))
            .with_context(|| format!("loading contacts from {path}"))?,
        Err(_) => {
            tracing::warn!("CONTACTS_PATH not set");
            ContactDirectory::default()
        }
    };
    if contacts.is_empty() {
        tracing::warn!("contact directory is empty; every recipient will be unknown");
    }

    let outbox_path = std::env::var("OUTBOX_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_outbox_path());

    tracing::info!(
        contacts = contacts.len(),
        outbox = %outbox_path.display(),
        "mail tool server starting"
    );

    let service = MailService::new(contacts, Outbox::new(outbox_path));
    run_stdio(service).await.context("stdio server failed")?;
    Ok(())
}

fn default_outbox_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toolbridge")
        .join("outbox.jsonl")
}
