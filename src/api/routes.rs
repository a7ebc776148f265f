//! API route handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use super::events::{TOPIC_LOGIN, TOPIC_LOGOUT, TOPIC_SESSION_REVOKED};
use super::server::SharedState;
use crate::auth::middleware::LOGOUT_MESSAGE;
use crate::auth::{AuthError, AuthorizationContext, LoginRequest, LoginResponse};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// Health check

pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok("healthy"))
}

// Session routes

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AuthError> {
    let response = state.auth.login(&req).await?;

    state.events.publish(
        TOPIC_LOGIN,
        json!({ "subjectId": response.user.id }),
    );

    Ok(Json(ApiResponse::ok(response)))
}

pub async fn logout(
    State(state): State<SharedState>,
    ctx: AuthorizationContext,
) -> Result<Json<ApiResponse<&'static str>>, AuthError> {
    state.auth.invalidate(&ctx.session_id).await?;

    state.events.publish(
        TOPIC_LOGOUT,
        json!({ "subjectId": ctx.subject_id }),
    );

    Ok(Json(ApiResponse::ok(LOGOUT_MESSAGE)))
}

pub async fn profile(ctx: AuthorizationContext) -> impl IntoResponse {
    Json(ApiResponse::ok(ctx))
}

pub async fn subscription(ctx: AuthorizationContext) -> impl IntoResponse {
    Json(ApiResponse::ok(json!({
        "subjectId": ctx.subject_id,
        "subscriptionStatus": ctx.subscription_status,
    })))
}

// Admin routes

pub async fn revoke_session(
    State(state): State<SharedState>,
    ctx: AuthorizationContext,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<&'static str>>, AuthError> {
    state.auth.invalidate(&session_id).await?;

    tracing::info!(
        admin_id = ctx.subject_id,
        session_id = %session_id,
        "Session revoked by administrator"
    );
    state.events.publish(
        TOPIC_SESSION_REVOKED,
        json!({ "sessionId": session_id, "revokedBy": ctx.subject_id }),
    );

    Ok(Json(ApiResponse::ok("Session revoked")))
}

// Key material

pub async fn jwks(State(state): State<SharedState>) -> Response {
    match &state.jwks {
        Some(keys) => Json(keys.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::err("Not Found")),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_envelope() {
        let ok = serde_json::to_value(ApiResponse::ok("x")).unwrap();
        assert_eq!(ok["success"], true);
        assert_eq!(ok["data"], "x");
        assert!(ok["error"].is_null());

        let err = serde_json::to_value(ApiResponse::<()>::err("nope")).unwrap();
        assert_eq!(err["success"], false);
        assert_eq!(err["error"], "nope");
    }
}
