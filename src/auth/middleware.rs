//! Authentication middleware and extractors
//!
//! Gates run in this order when stacked: token validity, session validity,
//! then capability checks on the attached [`AuthorizationContext`].

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::error::AuthError;
use super::models::{AuthorizationContext, Role};
use super::session::AuthService;
use crate::api::routes::ApiResponse;

pub const LOGOUT_MESSAGE: &str = "Logout successful";

/// Shared state of the session gates
#[derive(Clone)]
pub struct GateState {
    pub auth: Arc<dyn AuthService>,
    /// Header carrying a gateway identity assertion, when trusted
    pub gateway_header: Option<HeaderName>,
}

impl GateState {
    pub fn new(auth: Arc<dyn AuthService>) -> Self {
        Self {
            auth,
            gateway_header: None,
        }
    }

    pub fn with_gateway_header(mut self, header: HeaderName) -> Self {
        self.gateway_header = Some(header);
        self
    }

    async fn authorize(&self, headers: &HeaderMap) -> Result<AuthorizationContext, AuthError> {
        let asserted = self
            .gateway_header
            .as_ref()
            .and_then(|name| headers.get(name))
            .filter(|value| !value.as_bytes().trim_ascii().is_empty());

        let session_id = match asserted {
            Some(value) => session_id_from_assertion(value)?,
            None => {
                let token = bearer_token(headers)?;
                self.auth.verify_token(token)?.session_id
            }
        };

        self.auth.resolve_session(&session_id).await
    }
}

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::MissingCredentials)?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::MissingCredentials),
    }
}

#[derive(Deserialize)]
struct GatewayUserInfo {
    #[serde(rename = "sessionId", alias = "Uuid")]
    session_id: String,
}

/// Session id from a base64url JSON assertion forwarded by the gateway
pub fn session_id_from_assertion(value: &HeaderValue) -> Result<String, AuthError> {
    let encoded = value
        .to_str()
        .map_err(|_| AuthError::MalformedAssertion("header is not ASCII".to_string()))?;

    let decoded = URL_SAFE_NO_PAD
        .decode(encoded.trim().trim_end_matches('='))
        .map_err(|e| AuthError::MalformedAssertion(e.to_string()))?;

    let info: GatewayUserInfo = serde_json::from_slice(&decoded)
        .map_err(|e| AuthError::MalformedAssertion(e.to_string()))?;

    if info.session_id.is_empty() {
        return Err(AuthError::MalformedAssertion("empty session id".to_string()));
    }
    Ok(info.session_id)
}

/// Reject requests without a live session
pub async fn require_session(
    State(gate): State<GateState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let ctx = gate.authorize(req.headers()).await?;
    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

/// Gate for the logout route
///
/// An expired token ends the request with success and never reaches the handler.
pub async fn logout_session(
    State(gate): State<GateState>,
    mut req: Request,
    next: Next,
) -> Response {
    match gate.authorize(req.headers()).await {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(AuthError::ExpiredToken) => {
            debug!("Logout with expired token");
            (StatusCode::OK, Json(ApiResponse::ok(LOGOUT_MESSAGE))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Require the attached context to carry exactly `role`
pub async fn require_role(
    State(role): State<Role>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let ctx = attached_context(&req)?;
    if !ctx.has_role(role) {
        warn!(subject_id = ctx.subject_id, required = %role, "Role check failed");
        return Err(AuthError::Forbidden);
    }
    Ok(next.run(req).await)
}

pub async fn require_active_subscription(req: Request, next: Next) -> Result<Response, AuthError> {
    let ctx = attached_context(&req)?;
    if !ctx.has_active_subscription() {
        warn!(subject_id = ctx.subject_id, "Subscription check failed");
        return Err(AuthError::Forbidden);
    }
    Ok(next.run(req).await)
}

fn attached_context(req: &Request) -> Result<&AuthorizationContext, AuthError> {
    req.extensions()
        .get::<AuthorizationContext>()
        .ok_or(AuthError::Unauthorized)
}

impl<S> FromRequestParts<S> for AuthorizationContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthorizationContext>()
            .cloned()
            .ok_or(AuthError::Unauthorized)
    }
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidCredentials
            | AuthError::MissingCredentials
            | AuthError::InvalidSignature
            | AuthError::InvalidToken(_)
            | AuthError::ExpiredToken
            | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::MalformedAssertion(_) => StatusCode::BAD_REQUEST,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Store(_) | AuthError::Directory(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the client
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::UserNotFound => "User not found",
            AuthError::InvalidCredentials => "Invalid username or password",
            AuthError::InvalidSignature | AuthError::InvalidToken(_) => "Token is invalid",
            AuthError::ExpiredToken => "Token is expired",
            AuthError::MissingCredentials | AuthError::Unauthorized => "Unauthorized",
            AuthError::MalformedAssertion(_) => "Bad Request",
            AuthError::Forbidden => "Forbidden access",
            AuthError::Store(_) | AuthError::Directory(_) | AuthError::Internal(_) => {
                "Internal Server Error"
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.is_internal() {
            error!(error = %self, "Auth subsystem failure");
        } else {
            debug!(error = %self, "Request rejected");
        }
        (
            self.status_code(),
            Json(ApiResponse::<()>::err(self.public_message())),
        )
            .into_response()
    }
}
