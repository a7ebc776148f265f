//! Configuration management for authgate

pub mod loader;
mod schema;

pub use loader::{load_config, save_config};
pub use schema::*;
