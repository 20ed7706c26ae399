use std::io;
use std::net::SocketAddr;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use keyforge_panel::{AppState, DEFAULT_SESSION_TTL_SECS, cli, ensure_default_admin, router};

#[derive(Parser)]
#[command(name = "keyforge-panel")]
#[command(about = "License key management panel", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve,
    /// Administrative tools
    Admin {
        #[command(subcommand)]
        subcommand: AdminCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Reset an administrator's password (creates the account if missing)
    ResetPassword {
        /// Username of the admin
        username: String,
        /// New password
        new_pass: String,
    },
    /// Show panel connection information
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("no .env file loaded: {e}");
    }

    let cli_args = Cli::parse();

    let file_appender = tracing_appender::rolling::never(".", "server.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keyforge=debug,axum=info,tower_http=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let pool = keyforge_db::db::init_db().await?;

    match cli_args.command {
        Commands::Serve => {
            ensure_default_admin(&pool).await?;
            run_server(pool).await?;
        }
        Commands::Admin { subcommand } => match subcommand {
            AdminCommands::ResetPassword { username, new_pass } => {
                cli::reset_password(&pool, &username, &new_pass).await?;
            }
            AdminCommands::Info => cli::info(),
        },
    }

    Ok(())
}

async fn run_server(pool: sqlx::SqlitePool) -> Result<()> {
    let session_ttl = std::env::var("SESSION_TTL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_SESSION_TTL_SECS);

    let state = AppState::new(pool, session_ttl);
    let app = router(state);

    let port: u16 = std::env::var("PANEL_PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .map_err(|_| anyhow::anyhow!("PANEL_PORT must be a number"))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
