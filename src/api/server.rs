//! HTTP API server

use axum::{
    http::{HeaderName, HeaderValue},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::middleware::{self, GateState};
use crate::auth::{
    AuthService, Clock, JsonWebKeySet, MemorySessionStore, PostgresUserDirectory,
    RedisSessionStore, Role, SessionManager, SessionStore, StaticUserDirectory, SystemClock,
    TokenService, UserDirectory,
};
use crate::config::{Config, ServerConfig, SessionBackend, UserBackend};
use crate::error::{Error, Result};

use super::events::{BroadcastEventBus, EventBus};
use super::routes;

/// Application state shared across handlers
pub struct AppState {
    pub auth: Arc<dyn AuthService>,
    pub gate: GateState,
    pub events: Arc<dyn EventBus>,
    /// Published verification keys, asymmetric mode only
    pub jwks: Option<JsonWebKeySet>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(auth: Arc<dyn AuthService>, events: Arc<dyn EventBus>) -> Self {
        Self {
            gate: GateState::new(auth.clone()),
            auth,
            events,
            jwks: None,
        }
    }

    pub fn with_gateway_header(mut self, header: HeaderName) -> Self {
        self.gate = self.gate.with_gateway_header(header);
        self
    }

    pub fn with_jwks(mut self, jwks: Option<JsonWebKeySet>) -> Self {
        self.jwks = jwks;
        self
    }
}

/// Wire the auth subsystem from configuration
pub async fn build_state(config: &Config) -> Result<AppState> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let tokens = TokenService::from_config(&config.token, clock.clone())?;
    let jwks = tokens.key_set().cloned();

    let store: Arc<dyn SessionStore> = match config.sessions.backend {
        SessionBackend::Memory => Arc::new(MemorySessionStore::new(clock.clone())),
        SessionBackend::Redis => {
            let store = RedisSessionStore::connect(&config.sessions.redis_url)
                .await
                .map_err(crate::auth::AuthError::from)?;
            tracing::info!("Using Redis session store");
            Arc::new(store)
        }
    };

    let users: Arc<dyn UserDirectory> = match config.users.backend {
        UserBackend::Static => {
            let directory = StaticUserDirectory::from_accounts(&config.users.accounts);
            if directory.is_empty() {
                tracing::warn!("No static accounts configured; every login will fail");
            }
            Arc::new(directory)
        }
        UserBackend::Postgres => {
            let conn = config.users.postgres.as_deref().ok_or_else(|| {
                Error::Config("users.postgres is required for the postgres backend".to_string())
            })?;
            let directory = PostgresUserDirectory::connect(conn)
                .await
                .map_err(crate::auth::AuthError::from)?;
            Arc::new(directory)
        }
    };

    let manager = SessionManager::new(tokens, store, users, clock)
        .with_reveal_unknown_users(config.policy.reveal_unknown_users)
        .with_legacy_sessions(config.sessions.accept_legacy_sessions);

    let mut state = AppState::new(Arc::new(manager), Arc::new(BroadcastEventBus::new()))
        .with_jwks(jwks);

    if config.gateway.trust_userinfo_header {
        let header = HeaderName::from_bytes(config.gateway.userinfo_header.as_bytes())
            .map_err(|e| Error::Config(format!("invalid gateway header name: {}", e)))?;
        tracing::warn!(header = %header, "Trusting gateway identity assertions");
        state = state.with_gateway_header(header);
    }

    Ok(state)
}

/// Run the HTTP API server
pub async fn run_server(config: Config, host: &str, port: u16) -> Result<()> {
    let state = build_state(&config).await?;
    let app = create_router(state).layer(cors_layer(&config.server));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    if server.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    let gate = state.gate.clone();

    let protected = Router::new()
        .route("/api/profile", get(routes::profile))
        .route(
            "/api/subscription",
            get(routes::subscription)
                .layer(from_fn(middleware::require_active_subscription)),
        )
        .route(
            "/api/admin/sessions/{session_id}",
            delete(routes::revoke_session)
                .layer(from_fn_with_state(Role::Admin, middleware::require_role)),
        )
        .route_layer(from_fn_with_state(gate.clone(), middleware::require_session));

    let logout = Router::new()
        .route("/api/auth/logout", post(routes::logout))
        .route_layer(from_fn_with_state(gate, middleware::logout_session));

    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/auth/login", post(routes::login))
        .route("/.well-known/jwks.json", get(routes::jwks))
        .merge(protected)
        .merge(logout)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
