//! Output formatting abstraction for text vs JSON rendering
//!
//! All subcommand output flows through [`OutputWriter`] which handles format
//! switching. This keeps format-specific logic out of command handlers.

use std::io::Write;

use colored::{ColoredString, Colorize};
use serde::Serialize;

use scanwire_core::types::{SessionStatus, Severity, ToolStatus};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Abstraction for writing CLI output in different formats.
///
/// Subcommand handlers call `writer.render(&payload)` where `payload`
/// implements both `Serialize` (for JSON) and `Render` (for text).
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    /// Create a new output writer with the specified format.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a payload to stdout.
    ///
    /// For `Text` format, delegates to `Render::render_text()`.
    /// For `Json` format, serialises via `serde_json`.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        match self.format {
            OutputFormat::Text => {
                payload.render_text(&mut handle)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut handle, payload)?;
                writeln!(handle)?;
            }
        }
        Ok(())
    }
}

/// Trait for human-readable text rendering.
///
/// Implemented by every CLI output payload alongside `serde::Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

/// Severity label colored for terminal output.
pub fn severity_colored(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => "critical".red().bold(),
        Severity::High => "high".red(),
        Severity::Medium => "medium".yellow(),
        Severity::Low => "low".green(),
    }
}

/// Session status label colored for terminal output.
pub fn status_colored(status: SessionStatus) -> ColoredString {
    match status {
        SessionStatus::Pending => "pending".dimmed(),
        SessionStatus::Running => "running".cyan(),
        SessionStatus::Completed => "completed".green(),
        SessionStatus::Failed => "failed".red().bold(),
    }
}

/// Tool status label colored for terminal output.
pub fn tool_status_colored(status: ToolStatus) -> ColoredString {
    match status {
        ToolStatus::Running => "running".cyan(),
        ToolStatus::Completed => "completed".green(),
    }
}
