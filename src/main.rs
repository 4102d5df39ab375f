use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use admin_session::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "admin_session=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => cli::commands::init().await,
        Commands::Login { email, password } => cli::commands::login(email, password).await,
        Commands::Logout => cli::commands::logout().await,
        Commands::Whoami { format, refresh } => cli::commands::whoami(format, refresh).await,
        Commands::Status => cli::commands::status().await,
        Commands::Migrate => cli::commands::migrate().await,
        Commands::ResetPassword { email } => cli::commands::reset_password(email).await,
        Commands::Users {
            search,
            role,
            page,
            page_size,
            format,
        } => cli::commands::users(search, role, page, page_size, format).await,
        Commands::Watch => cli::commands::watch().await,
    }
}
