//! `sessions` / `evict` -- session listing and removal.

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use scanwire_core::types::Session;

use crate::client::ApiClient;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, status_colored};

/// Payload for the session listing.
#[derive(Serialize)]
pub struct SessionListPayload {
    sessions: Vec<Session>,
    total: usize,
}

impl Render for SessionListPayload {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.sessions.is_empty() {
            writeln!(w, "no sessions")?;
            return Ok(());
        }
        for session in &self.sessions {
            writeln!(
                w,
                "{}  {:>9}  {:>4}%  {} ({})",
                &session.id[..8.min(session.id.len())],
                status_colored(session.status),
                session.progress,
                session.target.bold(),
                session.mode,
            )?;
        }
        writeln!(w, "total: {}", self.total)?;
        Ok(())
    }
}

/// List all sessions, newest first.
pub async fn list(client: &ApiClient, writer: &OutputWriter) -> Result<(), CliError> {
    let sessions = client.sessions().await?;
    let total = sessions.len();
    writer.render(&SessionListPayload { sessions, total })
}

/// Evict a session from the registry.
pub async fn evict(client: &ApiClient, session_id: &str) -> Result<(), CliError> {
    client.evict(session_id).await?;
    println!("session {session_id} evicted");
    Ok(())
}
