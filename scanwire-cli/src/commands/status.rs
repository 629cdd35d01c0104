//! `status` -- full session snapshot (history query).

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use scanwire_core::snapshot::SessionSnapshot;

use crate::client::ApiClient;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, severity_colored, status_colored, tool_status_colored};

/// Payload wrapping the snapshot for rendering.
#[derive(Serialize)]
#[serde(transparent)]
pub struct SnapshotPayload(pub SessionSnapshot);

impl Render for SnapshotPayload {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        let snapshot = &self.0;
        let session = &snapshot.session;

        writeln!(
            w,
            "{}  {}  {} ({})",
            session.id.bold(),
            status_colored(session.status),
            session.target,
            session.mode,
        )?;
        if !session.phase.is_empty() {
            writeln!(w, "progress: {}%  phase: {}", session.progress, session.phase)?;
        } else {
            writeln!(w, "progress: {}%", session.progress)?;
        }
        if let Some(reason) = &snapshot.failure_reason {
            writeln!(w, "{}: {reason}", "failure".red().bold())?;
        }

        writeln!(
            w,
            "findings: {} (critical={} high={} medium={} low={})",
            snapshot.stats.total(),
            snapshot.stats.critical,
            snapshot.stats.high,
            snapshot.stats.medium,
            snapshot.stats.low,
        )?;
        for recorded in &snapshot.recent_findings {
            let finding = &recorded.finding;
            writeln!(
                w,
                "  [{}] {} (confidence {})",
                severity_colored(finding.severity),
                finding.title,
                finding.confidence,
            )?;
        }

        if !snapshot.tool_activity.is_empty() {
            writeln!(w, "tools:")?;
            for entry in &snapshot.tool_activity {
                match entry.findings {
                    Some(count) => writeln!(
                        w,
                        "  {} [{}] findings={count}",
                        entry.tool,
                        tool_status_colored(entry.status),
                    )?,
                    None => {
                        writeln!(w, "  {} [{}]", entry.tool, tool_status_colored(entry.status))?;
                    }
                }
            }
        }

        if !snapshot.chains.is_empty() {
            writeln!(w, "attack chains:")?;
            for chain in &snapshot.chains {
                writeln!(
                    w,
                    "  {} - {} ({} steps)",
                    chain.name.red().bold(),
                    chain.impact,
                    chain.steps.len(),
                )?;
            }
        }

        if !snapshot.insights.is_empty() {
            writeln!(w, "insights:")?;
            for insight in &snapshot.insights {
                writeln!(w, "  [{}] {}", insight.insight_type, insight.message)?;
            }
        }

        if let Some(summary) = &snapshot.summary {
            writeln!(w, "summary: {summary}")?;
        }
        Ok(())
    }
}

/// Fetch and render the snapshot of one session.
pub async fn run(
    client: &ApiClient,
    writer: &OutputWriter,
    session_id: &str,
) -> Result<(), CliError> {
    let snapshot = client.snapshot(session_id).await?;
    writer.render(&SnapshotPayload(snapshot))
}
