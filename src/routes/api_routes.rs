use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::errors::AppError;
use crate::models::{
    SubmitRequest, SubmitResponse, SummaryRequest, SummaryResponse, WebinarContext,
};
use crate::service::chat_service::ChatService;
use crate::service::chat_session::SubmitOutcome;

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST `/api/sessions` — open a session grounded in the posted webinar
pub async fn create_session_handler(
    State(svc): State<ChatService>,
    Json(context): Json<WebinarContext>,
) -> Response {
    if context.title.trim().is_empty() {
        return error_response(&AppError::EmptyField { field_name: "title".to_string() });
    }
    (StatusCode::CREATED, Json(svc.create_session(context).await)).into_response()
}

/// GET `/api/sessions/{id}` — current snapshot and loading flag
pub async fn get_session_handler(
    Path(id): Path<String>,
    State(svc): State<ChatService>,
) -> Response {
    match svc.session(&id).await {
        Ok(handle) => Json(handle.view().await).into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE `/api/sessions/{id}`
pub async fn close_session_handler(
    Path(id): Path<String>,
    State(svc): State<ChatService>,
) -> Response {
    match svc.close_session(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

/// PUT `/api/sessions/{id}/context` — swap the webinar, resetting the chat
pub async fn switch_context_handler(
    Path(id): Path<String>,
    State(svc): State<ChatService>,
    Json(context): Json<WebinarContext>,
) -> Response {
    if context.title.trim().is_empty() {
        return error_response(&AppError::EmptyField { field_name: "title".to_string() });
    }
    match svc.switch_context(&id, context).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST `/api/sessions/{id}/messages` — submit a user turn and wait for the reply.
/// Blank or concurrent submits are answered with `accepted: false`.
pub async fn submit_handler(
    Path(id): Path<String>,
    State(svc): State<ChatService>,
    Json(request): Json<SubmitRequest>,
) -> Response {
    let response = match svc.submit(&id, &request.message).await {
        Err(e) => return error_response(&e),
        Ok(SubmitOutcome::Replied(message)) => {
            SubmitResponse { accepted: true, ignored_reason: None, reply: Some(message) }
        }
        Ok(SubmitOutcome::Discarded) => {
            SubmitResponse { accepted: true, ignored_reason: None, reply: None }
        }
        Ok(SubmitOutcome::Ignored(reason)) => {
            SubmitResponse { accepted: false, ignored_reason: Some(reason), reply: None }
        }
    };
    Json(response).into_response()
}

/// POST `/api/summary` — short bullet summary of a webinar
pub async fn summary_handler(
    State(svc): State<ChatService>,
    Json(request): Json<SummaryRequest>,
) -> Response {
    if request.description.trim().is_empty() && request.topics.is_empty() {
        return error_response(&AppError::EmptyField { field_name: "description".to_string() });
    }
    let response = match svc.summarize(&request.description, &request.topics).await {
        Ok(summary) => SummaryResponse { summary, is_error: false },
        Err(e) => SummaryResponse { summary: e.user_message().to_string(), is_error: true },
    };
    Json(response).into_response()
}

// ── Helper ────────────────────────────────────────────────────────────────────

pub(crate) fn error_response(err: &AppError) -> Response {
    let status = if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}
