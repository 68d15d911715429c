/// Session lifecycle endpoints: creation, control commands, snapshots
use crate::api::{ApiResponse, MessageData};
use crate::context::ApiContext;
use crate::error::ApiError;
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use mailsurge_core::constants::SESSION_CLEANUP_GRACE_SECS;
use mailsurge_core::models::events::EventKind;
use mailsurge_core::models::session::{
    EmailTemplate, PacingConfig, Recipient, Session, SessionStats, SessionStatus, SessionUpdate,
    SmtpConfig,
};
use mailsurge_core::utils::validation;
use mailsurge_core::{Mailer, SessionEvent, SmtpMailer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct StartSendRequest {
    pub recipients: Vec<Recipient>,
    pub smtp: SmtpConfig,
    pub email: EmailTemplate,
    pub pacing: PacingConfig,
}

#[derive(Debug, Serialize)]
pub struct StartSendData {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub message: String,
    pub stats: SessionStats,
}

/// Creates a session and sets it running: validate -> store record ->
/// connect + verify the SMTP transport (deleting the partial record on
/// failure) -> enqueue jobs -> publish creation events
pub async fn start_send(
    State(ctx): State<Arc<ApiContext>>,
    Json(request): Json<StartSendRequest>,
) -> Result<Json<ApiResponse<StartSendData>>, ApiError> {
    validation::validate_recipients(&request.recipients)?;
    validation::validate_template(&request.email)?;
    validation::check_pacing(&request.pacing);

    let session = Session::new(
        request.recipients.clone(),
        request.smtp.clone(),
        request.email.clone(),
        request.pacing,
    );
    let session_id = session.id.clone();
    let total_recipients = request.recipients.len();
    ctx.store.create(session);

    // A transport that cannot even be configured or greeted aborts the
    // creation; nothing of the session survives
    let mailer = match SmtpMailer::connect(&request.smtp) {
        Ok(mailer) => mailer,
        Err(e) => {
            ctx.store.delete(&session_id);
            return Err(ApiError::BadRequest(e.to_string()));
        }
    };
    if let Err(e) = mailer.verify().await {
        ctx.store.delete(&session_id);
        error!(session_id = %session_id, error = %e, "SMTP verification failed");
        return Err(ApiError::BadRequest(format!("SMTP connection failed: {}", e)));
    }
    ctx.mailers.register(&session_id, Arc::new(mailer));

    ctx.queue.enqueue(
        &session_id,
        &request.recipients,
        Arc::new(request.email),
        &request.pacing,
    );
    ctx.store.update(
        &session_id,
        SessionUpdate::status(SessionStatus::Running).with_started_at(Utc::now()),
    );

    ctx.events.publish(
        &session_id,
        SessionEvent::now(
            &session_id,
            EventKind::SessionCreated { total_recipients },
        ),
    );
    ctx.events.publish(
        &session_id,
        SessionEvent::now(&session_id, EventKind::SessionStarted),
    );

    info!(
        session_id = %session_id,
        recipients = total_recipients,
        delay_ms = request.pacing.delay_ms,
        "Send session started"
    );

    let stats = ctx
        .store
        .get(&session_id)
        .map(|session| session.stats)
        .unwrap_or_default();
    Ok(Json(ApiResponse::ok(StartSendData {
        session_id,
        message: "Email sending session started".to_string(),
        stats,
    })))
}

pub async fn pause(
    State(ctx): State<Arc<ApiContext>>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<MessageData>>, ApiError> {
    let session = ctx
        .store
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;
    if session.status != SessionStatus::Running {
        return Err(ApiError::BadRequest("Session is not running".to_string()));
    }

    ctx.queue.pause(&session_id);
    ctx.store
        .update(&session_id, SessionUpdate::status(SessionStatus::Paused));
    ctx.events.publish(
        &session_id,
        SessionEvent::now(&session_id, EventKind::SessionPaused),
    );

    info!(session_id = %session_id, "Session paused");
    Ok(Json(ApiResponse::ok(MessageData::new(
        "Session paused successfully",
    ))))
}

pub async fn resume(
    State(ctx): State<Arc<ApiContext>>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<MessageData>>, ApiError> {
    let session = ctx
        .store
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;
    if session.status != SessionStatus::Paused {
        return Err(ApiError::BadRequest("Session is not paused".to_string()));
    }

    ctx.queue.resume(&session_id);
    ctx.store
        .update(&session_id, SessionUpdate::status(SessionStatus::Running));
    ctx.events.publish(
        &session_id,
        SessionEvent::now(&session_id, EventKind::SessionResumed),
    );

    info!(session_id = %session_id, "Session resumed");
    Ok(Json(ApiResponse::ok(MessageData::new(
        "Session resumed successfully",
    ))))
}

/// Cancellation is final: future selection stops immediately, in-flight
/// sends settle on their own, and the queue state is dropped after the
/// observer grace period
pub async fn cancel(
    State(ctx): State<Arc<ApiContext>>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<MessageData>>, ApiError> {
    let session = ctx
        .store
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;
    if session.status.is_terminal() {
        return Err(ApiError::BadRequest(
            "Session already completed or cancelled".to_string(),
        ));
    }

    ctx.queue.cancel(&session_id);
    ctx.store.update(
        &session_id,
        SessionUpdate::status(SessionStatus::Cancelled).with_completed_at(Utc::now()),
    );
    ctx.events.publish(
        &session_id,
        SessionEvent::now(&session_id, EventKind::SessionCancelled),
    );

    let queue = Arc::clone(&ctx.queue);
    let mailers = Arc::clone(&ctx.mailers);
    let events = Arc::clone(&ctx.events);
    let cleanup_id = session_id.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(SESSION_CLEANUP_GRACE_SECS)).await;
        queue.cleanup(&cleanup_id);
        if let Some(mailer) = mailers.remove(&cleanup_id) {
            mailer.close().await;
        }
        events.remove(&cleanup_id);
    });

    info!(session_id = %session_id, "Session cancelled");
    Ok(Json(ApiResponse::ok(MessageData::new(
        "Session cancelled successfully",
    ))))
}

/// Full current session record, the reconciliation point for observers
pub async fn snapshot(
    State(ctx): State<Arc<ApiContext>>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<Session>>, ApiError> {
    let session = ctx
        .store
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;
    Ok(Json(ApiResponse::ok(session)))
}
