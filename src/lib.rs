//! authgate - session-backed token authentication
//!
//! Signed bearer tokens carry a subject id and a session id; a server-side
//! session store decides whether that session is still logged in. Axum
//! middleware gates requests on session validity, role and subscription.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;

pub use config::Config;
pub use error::Error;
