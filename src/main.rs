use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use authgate::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authgate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => cli::commands::init().await,
        Commands::Serve { host, port } => cli::commands::serve(cli.config, host, port).await,
        Commands::Keygen {
            out_dir,
            key_id,
            force,
        } => cli::commands::keygen(&out_dir, &key_id, force).await,
        Commands::Jwks => cli::commands::jwks(cli.config).await,
        Commands::HashPassword { password } => cli::commands::hash_password(password).await,
    }
}
