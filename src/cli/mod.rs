//! CLI interface for authgate

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "authgate")]
#[command(author = "Krakaw")]
#[command(version)]
#[command(about = "Session-backed token authentication service", long_about = None)]
pub struct Cli {
    /// Path to authgate.toml (searched upward from the working directory by default)
    #[arg(short, long, global = true, env = "AUTHGATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new authgate.toml configuration file
    Init,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate an RSA signing key and its JWKS entry
    Keygen {
        /// Directory to write private.pem and jwks.json into
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Key id placed in the token header
        #[arg(short, long)]
        key_id: String,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Print the JWKS document for the configured keys
    Jwks,

    /// Hash a password for a static account
    HashPassword {
        /// Password to hash (prompted on stdin when omitted)
        password: Option<String>,
    },
}
