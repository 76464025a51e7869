//! Charging session REST handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::error;

use super::dto::{
    ChargingSessionResponse, DeactivateResponse, IssueSessionRequest, IssuedSessionResponse,
    ListSessionsQuery, SessionScope, VerifyQuery, VerifyResponse,
};
use crate::application::SharedSessionTokenManager;
use crate::interfaces::http::common::{ApiResponse, FieldViolation, ValidatedJson};
use crate::shared::errors::SessionError;

#[derive(Clone)]
pub struct ChargingSessionState {
    pub manager: SharedSessionTokenManager,
}

type ApiError = (StatusCode, Json<ApiResponse<()>>);

fn session_error(e: SessionError) -> ApiError {
    let status = match &e {
        SessionError::Storage(inner) => {
            error!(error = %inner, "Charging session storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        denied if denied.is_access_denied() => StatusCode::FORBIDDEN,
        _ => StatusCode::NOT_FOUND,
    };
    (status, Json(ApiResponse::error(e.to_string())))
}

#[utoipa::path(
    post,
    path = "/api/v1/charging-sessions",
    tag = "Charging Sessions",
    request_body = IssueSessionRequest,
    responses(
        (status = 201, description = "Session issued", body = ApiResponse<IssuedSessionResponse>),
        (status = 400, description = "Body is not a valid request"),
        (status = 404, description = "Payment not found"),
        (status = 422, description = "Validation failed", body = ApiResponse<Vec<FieldViolation>>)
    )
)]
pub async fn issue_session(
    State(state): State<ChargingSessionState>,
    ValidatedJson(req): ValidatedJson<IssueSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IssuedSessionResponse>>), ApiError> {
    let issued = state
        .manager
        .issue(req.user_id, req.payment_id)
        .await
        .map_err(session_error)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(issued.into()))))
}

/// 200 only when charging may proceed. An inactive or expired session is
/// answered with 403.
#[utoipa::path(
    get,
    path = "/api/v1/charging-sessions/verify",
    tag = "Charging Sessions",
    params(VerifyQuery),
    responses(
        (status = 200, description = "Session is valid", body = ApiResponse<VerifyResponse>),
        (status = 403, description = "Unknown, inactive or expired session")
    )
)]
pub async fn verify_session(
    State(state): State<ChargingSessionState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<ApiResponse<VerifyResponse>>, ApiError> {
    let verdict = state
        .manager
        .verify(&query.token)
        .await
        .map_err(session_error)?;

    if !verdict.status {
        return Err(session_error(SessionError::SessionNotActive));
    }
    if verdict.expired {
        return Err(session_error(SessionError::SessionExpired));
    }
    Ok(Json(ApiResponse::success(verdict.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/{payment_id}/charging-sessions/deactivate",
    tag = "Charging Sessions",
    params(("payment_id" = i32, Path, description = "Payment that funded the sessions")),
    responses(
        (status = 200, description = "Sessions deactivated", body = ApiResponse<DeactivateResponse>),
        (status = 404, description = "No session references this payment")
    )
)]
pub async fn deactivate_sessions(
    State(state): State<ChargingSessionState>,
    Path(payment_id): Path<i32>,
) -> Result<Json<ApiResponse<DeactivateResponse>>, ApiError> {
    let affected_count = state
        .manager
        .deactivate(payment_id)
        .await
        .map_err(session_error)?;
    Ok(Json(ApiResponse::success(DeactivateResponse { affected_count })))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/charging-sessions",
    tag = "Charging Sessions",
    params(
        ("user_id" = i32, Path, description = "Owning user"),
        ListSessionsQuery
    ),
    responses(
        (status = 200, description = "Sessions, newest first", body = ApiResponse<Vec<ChargingSessionResponse>>)
    )
)]
pub async fn list_user_sessions(
    State(state): State<ChargingSessionState>,
    Path(user_id): Path<i32>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<ApiResponse<Vec<ChargingSessionResponse>>>, ApiError> {
    let sessions = match query.scope {
        SessionScope::Today => state.manager.list_today(user_id).await,
        SessionScope::Active => state.manager.list_active(user_id).await,
    }
    .map_err(session_error)?;

    Ok(Json(ApiResponse::success(
        sessions.into_iter().map(Into::into).collect(),
    )))
}

// ── Tests ──────────────────────────────────────────────────────
