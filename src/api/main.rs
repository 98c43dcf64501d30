use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

use critique_sessions_api::config::{self, Config};
use critique_sessions_api::routes::{AppState, create_app};
use critique_sessions_api::services::{
    FileObjectStorage, GoogleOAuthService, S3ObjectStorage, SharedIdentityProvider,
    SharedObjectStorage,
};
use critique_sessions_api::storage::{PostgresStorageBackend, StorageBackend};

// Panic hook to catch and log panics
fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC occurred!");
        if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            eprintln!("Panic message: {}", s);
        }
        if let Some(location) = panic_info.location() {
            eprintln!(
                "Panic location: {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!("Backtrace:\n{:?}", std::backtrace::Backtrace::capture());
    }));
}

fn init_tracing(debug: bool) {
    // RUST_LOG wins; otherwise DEBUG=true turns on debug output for this crate
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if debug { "debug" } else { "info" };
        tracing_subscriber::EnvFilter::new(format!(
            "{level},critique_sessions_api={level},api={level},tower_http={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn object_storage(config: &Config) -> SharedObjectStorage {
    match &config.s3 {
        Some(settings) => {
            info!("Storing uploads in S3 bucket {}", settings.bucket);
            Arc::new(S3ObjectStorage::new(settings))
        }
        None => {
            info!("Storing uploads locally in {:?}", config.upload_dir);
            Arc::new(FileObjectStorage::new(
                config.upload_dir.clone(),
                config.public_base_url.clone(),
            ))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for CTRL+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, shutting down gracefully"),
        _ = terminate => info!("SIGTERM received, shutting down gracefully"),
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn StdError + Send + Sync + 'static>> {
    setup_panic_hook();
    config::load_dotenv();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.debug);
    info!("Application starting ({} mode)...", config.app_env);
    config.log_warnings();

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to PostgreSQL: {}", e))?;
    info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .inspect_err(|e| error!("Failed to run migrations: {}", e))?;
    info!("Database migrations applied");

    let storage: Arc<dyn StorageBackend> = Arc::new(PostgresStorageBackend::new(pool));
    let google: SharedIdentityProvider =
        Arc::new(GoogleOAuthService::new(config.google_userinfo_url.clone()));
    let object_storage = object_storage(&config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let app = create_app(AppState::new(config, storage, object_storage, google));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .inspect_err(|e| error!("Failed to bind listener on {}: {}", addr, e))?;
    info!("Server listening on {}", addr);
    info!("Health check available at http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
