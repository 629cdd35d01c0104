//! `watch` -- attach to a session and render the live event stream.
//!
//! Connects to the observer WebSocket, attaches, and folds the incoming
//! stream with a local [`SessionReducer`] seeded from the catch-up
//! snapshot. Malformed frames are dropped without interrupting the
//! stream; the command ends when the session reaches a terminal state.

use colored::Colorize;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use scanwire_core::event::ScanEvent;
use scanwire_core::snapshot::LogLimits;
use scanwire_core::wire::{ClientMessage, ObserverMessage, ServerNotice};
use scanwire_reducer::SessionReducer;

use crate::client::ApiClient;
use crate::error::CliError;
use crate::output::severity_colored;

/// Attach to a session and stream it until its terminal event.
pub async fn run(client: &ApiClient, session_id: &str) -> Result<(), CliError> {
    let (mut ws, _) = tokio_tungstenite::connect_async(client.ws_url().as_str()).await?;

    let attach = serde_json::to_string(&ClientMessage::Attach {
        session_id: session_id.to_owned(),
    })?;
    ws.send(Message::Text(attach.into())).await?;

    let mut reducer: Option<SessionReducer> = None;

    while let Some(frame) = ws.next().await {
        let frame = frame?;
        let Message::Text(text) = frame else { continue };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else {
            eprintln!("{}", "dropped non-json frame".dimmed());
            continue;
        };
        let Ok(parsed) = serde_json::from_value::<ObserverMessage>(value.clone()) else {
            // Malformed frames never interrupt the stream; the event
            // validator names the reason
            match ScanEvent::from_json(&value) {
                Err(e) => eprintln!("{}", format!("dropped: {e}").dimmed()),
                Ok(_) => eprintln!("{}", "dropped malformed frame".dimmed()),
            }
            continue;
        };

        match parsed {
            ObserverMessage::Notice(ServerNotice::Snapshot { snapshot, .. }) => {
                let session = &snapshot.session;
                println!(
                    "attached to {} ({}, {}) at {}%, {} findings so far",
                    session.id.bold(),
                    session.target,
                    session.mode,
                    session.progress,
                    snapshot.stats.total(),
                );
                if session.status.is_terminal() {
                    // Late attach to a finished session: snapshot is all there is
                    print_final(&snapshot);
                    return Ok(());
                }
                reducer = Some(SessionReducer::from_snapshot(snapshot, LogLimits::default()));
            }
            ObserverMessage::Notice(ServerNotice::Error { error, .. }) => {
                return Err(CliError::Api(error));
            }
            ObserverMessage::Notice(ServerNotice::ConnectionStatus {
                status,
                connection_id,
            }) => {
                println!(
                    "{}",
                    format!("observer {connection_id} {status}").dimmed()
                );
            }
            ObserverMessage::Notice(ServerNotice::Pong { .. }) => {}
            ObserverMessage::Event(event) => {
                let Some(reducer) = reducer.as_mut() else {
                    continue;
                };
                print_event(&event);
                let terminal = event.is_terminal();
                if event.session_id().is_some() && reducer.apply(&event).is_err() {
                    // Foreign-session event: transport error, drop it
                    eprintln!("{}", "dropped event for another session".dimmed());
                    continue;
                }
                if terminal {
                    print_final(reducer.snapshot());
                    return Ok(());
                }
            }
        }
    }

    Err(CliError::Stream(
        "connection closed before the session finished".to_owned(),
    ))
}

fn print_event(event: &ScanEvent) {
    match event {
        ScanEvent::SessionStarted { target, mode, .. } => {
            println!("scan started: {target} ({mode})");
        }
        ScanEvent::Progress { percent, phase, .. } => {
            println!("[{percent:>3}%] {phase}");
        }
        ScanEvent::ToolStarted { tool, .. } => {
            println!("      {} {}", "tool started:".cyan(), tool);
        }
        ScanEvent::ToolCompleted {
            tool,
            findings_count,
            ..
        } => {
            println!(
                "      {} {} ({} findings)",
                "tool completed:".green(),
                tool,
                findings_count,
            );
        }
        ScanEvent::FindingDiscovered { finding, .. } => {
            println!(
                "      [{}] {} (confidence {})",
                severity_colored(finding.severity),
                finding.title,
                finding.confidence,
            );
        }
        ScanEvent::ChainDetected { chain, .. } => {
            println!(
                "      {} {} - {}",
                "attack chain:".red().bold(),
                chain.name,
                chain.impact,
            );
        }
        ScanEvent::InsightProduced { insight, .. } => {
            println!("      {} {}", "insight:".yellow(), insight.message);
        }
        ScanEvent::SessionCompleted { summary, .. } => {
            println!("{} {summary}", "scan completed:".green().bold());
        }
        ScanEvent::SessionFailed { reason, .. } => {
            println!("{} {reason}", "scan failed:".red().bold());
        }
        ScanEvent::Heartbeat { .. } => {}
    }
}

fn print_final(snapshot: &scanwire_core::snapshot::SessionSnapshot) {
    println!(
        "final: {} at {}%, {} findings (critical={} high={} medium={} low={})",
        snapshot.session.status,
        snapshot.session.progress,
        snapshot.stats.total(),
        snapshot.stats.critical,
        snapshot.stats.high,
        snapshot.stats.medium,
        snapshot.stats.low,
    );
}
