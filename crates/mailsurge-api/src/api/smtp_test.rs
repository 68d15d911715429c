/// SMTP credential check endpoint
///
/// Connects a throwaway transport, performs the verification handshake,
/// and tears it down without sending mail. Expected auth/network
/// failures come back as a structured result, not an error status.
use crate::api::ApiResponse;
use crate::context::ApiContext;
use crate::error::ApiError;
use axum::{Json, extract::State};
use mailsurge_core::models::session::SmtpConfig;
use mailsurge_core::{Mailer, SmtpMailer};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct TestSmtpData {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<TestSmtpDetails>,
}

#[derive(Debug, Serialize)]
pub struct TestSmtpDetails {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

pub async fn handler(
    State(_ctx): State<Arc<ApiContext>>,
    Json(config): Json<SmtpConfig>,
) -> Result<Json<ApiResponse<TestSmtpData>>, ApiError> {
    if config.host.trim().is_empty()
        || config.auth.user.trim().is_empty()
        || config.auth.pass.trim().is_empty()
    {
        return Err(ApiError::BadRequest(
            "Missing required SMTP configuration fields".to_string(),
        ));
    }

    let result = match SmtpMailer::connect(&config) {
        Err(e) => TestSmtpData {
            success: false,
            message: e.to_string(),
            details: None,
        },
        Ok(mailer) => {
            let verified = mailer.verify().await;
            mailer.close().await;
            match verified {
                Ok(()) => TestSmtpData {
                    success: true,
                    message: "SMTP connection successful".to_string(),
                    details: Some(TestSmtpDetails {
                        host: config.host.clone(),
                        port: config.port,
                        secure: config.secure,
                    }),
                },
                Err(e) => TestSmtpData {
                    success: false,
                    message: e.to_string(),
                    details: None,
                },
            }
        }
    };

    info!(host = %config.host, port = config.port, success = result.success, "SMTP test");
    Ok(Json(ApiResponse::ok(result)))
}
