use clap::Parser;
use dotenvy::dotenv;
use s3_url_gateway::config::GatewayConfig;
use s3_url_gateway::infrastructure::storage;
use s3_url_gateway::services::auth_service::AuthService;
use s3_url_gateway::services::file_service::FileService;
use s3_url_gateway::services::storage::StorageService;
use s3_url_gateway::services::user_registry::InMemoryUserRepository;
use s3_url_gateway::{AppState, create_app, with_tracing};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the API server (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & logging
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "s3_url_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting S3 URL Gateway...");

    let mut config = GatewayConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    info!(
        "🛡️  Config: Partition={:?}, Upload TTL={}s, Download TTL={}s, Max Size={}MB",
        config.partition_strategy,
        config.upload_url_ttl_secs,
        config.download_url_ttl_secs,
        config.max_file_size / 1024 / 1024
    );

    // 2. Storage
    let storage_service = storage::setup_storage().await?;
    match storage_service.ping().await {
        Ok(()) => info!("✅ Bucket '{}' is reachable", storage_service.bucket()),
        Err(e) => warn!(
            "⚠️  Bucket '{}' is not reachable yet: {}",
            storage_service.bucket(),
            e
        ),
    }
    let storage: Arc<dyn StorageService> = storage_service;

    // 3. Services
    let users = Arc::new(InMemoryUserRepository::new());
    let auth_service = Arc::new(AuthService::new(
        users,
        config.jwt_secret.clone(),
        config.jwt_expires_in_secs,
    ));
    let file_service = Arc::new(FileService::new(storage.clone()));

    let state = AppState {
        storage,
        file_service,
        auth_service,
        config: config.clone(),
    };

    // 4. Serve
    let app = with_tracing(create_app(state));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ API Server listening on: http://0.0.0.0:{}", config.port);
    info!(
        "📖 Swagger UI documentation: http://localhost:{}/swagger-ui",
        config.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Gateway exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
