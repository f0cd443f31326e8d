use anyhow::Context;
use chrono::{DateTime, Utc};
use kb_api_client::session::SessionExpiredHandler;
use kb_api_client::PendingFile;
use kb_core::models::{PreviewItem, Record};
use kb_core::timesheet::{is_timesheet, total_timesheet_hours};
use kb_core::token::{decode_expiration, is_expiring_soon, time_left, UNKNOWN_LABEL};
use kb_core::{KbError, LogLevel};
use serde::Serialize;
use std::path::Path;

/// Prints a login hint on stderr when the session ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoginHint;

impl SessionExpiredHandler for LoginHint {
    fn on_session_expired(&self) {
        eprintln!("Session expired. Run `kb login` to sign in again.");
    }
}

/// Output of `kb status`.
#[derive(Debug, Serialize, PartialEq)]
pub struct SessionStatus {
    pub logged_in: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub time_left: String,
    pub expiring_soon: bool,
}

pub fn session_status(token: Option<&str>, threshold_secs: i64, now: DateTime<Utc>) -> SessionStatus {
    let expires_at = token.and_then(decode_expiration);
    SessionStatus {
        logged_in: expires_at.is_some_and(|exp| exp > now),
        expires_at,
        time_left: time_left(token, now).label(UNKNOWN_LABEL),
        expiring_soon: is_expiring_soon(token, threshold_secs, now),
    }
}

/// Output of `kb hours`.
#[derive(Debug, Serialize, PartialEq)]
pub struct HoursSummary {
    pub records: usize,
    pub hours: f64,
}

/// Sum worked hours over the timesheet records in `records`.
pub fn hours_summary(records: &[Record]) -> HoursSummary {
    let timesheets: Vec<Record> = records
        .iter()
        .filter(|r| is_timesheet(r.category.as_deref()))
        .cloned()
        .collect();
    HoursSummary {
        records: timesheets.len(),
        hours: (total_timesheet_hours(&timesheets) * 100.0).round() / 100.0,
    }
}

/// Content type guessed from the file extension.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime)
}

/// Read a local file into an upload queue entry.
pub async fn read_attachment(path: &Path) -> anyhow::Result<PendingFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;

    let file = PendingFile::new(filename, data);
    Ok(match content_type_for(path) {
        Some(mime) => file.with_content_type(mime),
        None => file,
    })
}

/// Index of the preview showing file `id`.
pub fn preview_index(previews: &[PreviewItem], id: i64) -> Option<usize> {
    previews.iter().position(|p| p.id == id)
}

/// Level and code of the first `KbError` in the chain of `err`.
pub fn failure_level(err: &anyhow::Error) -> Option<(LogLevel, &'static str)> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<KbError>())
        .map(|kb| (kb.log_level(), kb.error_code()))
}

/// Log a failed command at the level its error calls for.
pub fn log_failure(err: &anyhow::Error) {
    match failure_level(err) {
        Some((LogLevel::Debug, code)) => tracing::debug!(code, error = %err, "Command failed"),
        Some((LogLevel::Warn, code)) => tracing::warn!(code, error = %err, "Command failed"),
        Some((LogLevel::Error, code)) => tracing::error!(code, error = %err, "Command failed"),
        None => tracing::error!(error = %err, "Command failed"),
    }
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
