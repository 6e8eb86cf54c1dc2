use clap::Parser;
use gitcdn::{
    api::{handlers::AppState, routes},
    config::Settings,
    Error, Result,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// GitCDN server: serve a GitHub repository folder as a CDN-backed asset bucket
#[derive(Parser, Debug)]
#[command(name = "gitcdn", version, about)]
struct Cli {
    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,

    /// Override the configured bind host
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gitcdn=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut settings = Settings::from_env()?;
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    settings.validate()?;

    info!("Starting GitCDN server");
    info!("Server: {}:{}", settings.server.host, settings.server.port);
    info!("Asset root: {}", settings.assets.root);
    if !settings.oauth.is_configured() {
        info!("GitHub OAuth is not configured; /api/auth/url will refuse requests");
    }
    if settings.session.secret.is_none() {
        info!("SESSION_SECRET is not set; using the built-in development key");
    }

    let state = AppState::new(settings.clone())?;
    let app = routes::create_router(state, &settings);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    println!("\n========================================");
    println!("GitCDN Server");
    println!("========================================");
    println!("Status: Running");
    println!("Address: http://{addr}");
    println!("Asset root: {}", settings.assets.root);
    println!("\nAPI Endpoints:");
    println!("  GET    /api/health");
    println!("  GET    /api/auth/url");
    println!("  GET    /api/auth/callback");
    println!("  GET    /api/me");
    println!("  POST   /api/logout");
    println!("  GET    /api/repos");
    println!("  POST   /api/select-repo");
    println!("  GET    /api/assets");
    println!("  POST   /api/upload");
    println!("  POST   /api/assets/move");
    println!("  DELETE /api/assets");
    println!("  GET/POST/DELETE /api/folders");
    println!("\nPress Ctrl+C to stop");
    println!("========================================\n");

    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    info!("Shutting down...");
    Ok(())
}
