/// Session log export as delimited text
use crate::context::ApiContext;
use crate::error::ApiError;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use mailsurge_core::models::session::{LogEntry, LogStatus};
use std::sync::Arc;

const CSV_HEADER: &str =
    "Timestamp,Recipient,Status,Message ID,Error Code,Error Message,Retry Count";

fn status_label(status: LogStatus) -> &'static str {
    match status {
        LogStatus::Queued => "queued",
        LogStatus::Sending => "sending",
        LogStatus::Sent => "sent",
        LogStatus::Failed => "failed",
        LogStatus::Retry => "retry",
    }
}

/// Quote-escapes one field: embedded quotes double, the whole field is
/// quoted
fn csv_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn render_csv(logs: &[LogEntry]) -> String {
    let mut output = String::from(CSV_HEADER);
    output.push('\n');

    for log in logs {
        let fields = [
            log.timestamp.to_rfc3339(),
            log.recipient.clone(),
            status_label(log.status).to_string(),
            log.message_id.clone().unwrap_or_default(),
            log.error_code.clone().unwrap_or_default(),
            log.error_message.clone().unwrap_or_default(),
            log.retry_count.to_string(),
        ];
        let row: Vec<String> = fields.iter().map(|field| csv_field(field)).collect();
        output.push_str(&row.join(","));
        output.push('\n');
    }
    output
}

/// One row per attempt log entry, quote-escaped, served as a download
pub async fn download(
    State(ctx): State<Arc<ApiContext>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if ctx.store.get(&session_id).is_none() {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }
    let logs = ctx.store.logs(&session_id);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"email-logs-{}.csv\"", session_id),
            ),
        ],
        render_csv(&logs),
    ))
}
