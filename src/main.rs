use africanite_payment_hub::api::{build_app, AppState};
use africanite_payment_hub::config::AppConfig;
use africanite_payment_hub::database::transaction_repository::TransactionRepository;
use africanite_payment_hub::database::{init_pool_from_config, run_migrations};
use africanite_payment_hub::logging::init_tracing;
use africanite_payment_hub::payments::providers::FreshPayProvider;
use africanite_payment_hub::services::ip_lookup::IpifyLookup;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.logging);
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        "🚀 Starting Africanite Payment Hub"
    );

    info!("📊 Initializing database connection pool...");
    let pool = init_pool_from_config(&config.database).await.map_err(|e| {
        error!("Failed to initialize database pool: {}", e);
        e
    })?;
    info!(
        max_connections = pool.options().get_max_connections(),
        "✅ Database connection pool initialized"
    );

    if config.database.run_migrations {
        info!("🗄️  Running database migrations...");
        run_migrations(&pool).await?;
        info!("✅ Migrations applied");
    }

    if let Err(e) = config.freshpay.ensure_ready() {
        warn!(error = %e, "⚠️  FreshPay is not fully configured; payment initiation will fail");
    }

    let store = Arc::new(TransactionRepository::new(pool));
    let gateway = Arc::new(FreshPayProvider::new(config.freshpay.clone())?);
    let ip_lookup = Arc::new(IpifyLookup::new(config.ip_lookup_url.clone())?);

    let state = AppState::new(
        store,
        gateway,
        ip_lookup,
        config.freshpay.clone(),
        config.server.public_base_url.clone(),
    );
    let app = build_app(state, &config.server);
    info!("✅ Routes configured");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("❌ Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "🚀 Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("👋 Server shutdown complete");

    Ok(())
}
