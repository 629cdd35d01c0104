//! `scan` -- create a session, optionally watch it live.

use std::io::Write;

use serde::Serialize;

use scanwire_core::types::{ScanMode, ScanOptions};

use crate::client::ApiClient;
use crate::commands::watch;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Payload for the created-session confirmation.
#[derive(Serialize)]
pub struct ScanCreatedPayload {
    session_id: String,
}

impl Render for ScanCreatedPayload {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "session created: {}", self.session_id)
    }
}

/// Create a scan session; with `watch`, attach to it immediately.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    client: &ApiClient,
    writer: &OutputWriter,
    target: &str,
    mode: &str,
    seed: Option<u64>,
    fail: bool,
    watch: bool,
) -> Result<(), CliError> {
    let mode = ScanMode::from_str_loose(mode)
        .ok_or_else(|| CliError::Api(format!("unknown scan mode: {mode}")))?;
    let options = ScanOptions { seed, fail };

    let session_id = client.create_scan(target, mode, options).await?;
    writer.render(&ScanCreatedPayload {
        session_id: session_id.clone(),
    })?;

    if watch {
        watch::run(client, &session_id).await?;
    }
    Ok(())
}
