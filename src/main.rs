use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::Parser;
use scim_provider::{
    AppState, build_app,
    config::Config,
    db::DbPool,
    observability::init_tracing,
};

/// CLI arguments for the SCIM provider
#[derive(Parser, Debug)]
#[command(version, about = "SCIM 2.0 provisioning server", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the config file
    #[arg(short, long, global = true, default_value = "scim.toml")]
    config: PathBuf,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the SCIM server (default)
    Serve,
    /// Run database migrations and exit
    Migrate,
    /// Validate the configuration file and exit
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::CheckConfig) => run_check_config(&args.config),
        Some(Command::Migrate) => run_migrate(&args.config).await,
        Some(Command::Serve) | None => run_server(&args.config).await,
    }
}

fn load_config(path: &Path) -> Config {
    match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn load_config_with_tracing(path: &Path) -> Config {
    let config = load_config(path);
    if let Err(e) = init_tracing(&config.observability.logging) {
        eprintln!("Failed to initialize tracing: {}", e);
        std::process::exit(1);
    }
    config
}

async fn connect(config: &Config) -> DbPool {
    match DbPool::from_config(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            eprintln!("Error: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_check_config(path: &Path) {
    let config = load_config(path);
    println!(
        "Configuration OK: {} (SCIM base {}/scim/v2, database {:?})",
        path.display(),
        config.scim.base_location.trim_end_matches('/'),
        config.database
    );
}

async fn run_migrate(path: &Path) {
    let config = load_config_with_tracing(path);
    tracing::info!(config_file = %path.display(), "Running database migrations");

    let pool = connect(&config).await;
    let result = pool.run_migrations().await;
    pool.close().await;

    match result {
        Ok(()) => tracing::info!("Database migrations completed successfully"),
        Err(e) => {
            tracing::error!(error = %e, "Database migrations failed");
            eprintln!("Error: Database migrations failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_server(path: &Path) {
    let config = load_config_with_tracing(path);
    tracing::info!(config_file = %path.display(), "Starting SCIM provider");

    let pool = connect(&config).await;
    if config.database.run_migrations()
        && let Err(e) = pool.run_migrations().await
    {
        tracing::error!(error = %e, "Database migrations failed");
        std::process::exit(1);
    }
    let db = Arc::new(pool);

    let addr = config.server.socket_addr();
    let state = AppState::new(config, db.clone());
    let app = build_app(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, %addr, "Failed to bind to address");
            std::process::exit(1);
        }
    };
    tracing::info!("Server listening on http://{}", addr);

    // Graceful shutdown: wait for SIGINT/SIGTERM, then drain in-flight requests
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    db.close().await;
    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests");
}
