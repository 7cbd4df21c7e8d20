use std::sync::Arc;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use appointly::{
    api,
    config::Settings,
    integrations::{
        earnings::SqliteEarningsRecorder,
        notifications::{NotificationIntegration, SqliteNotifier},
        IntegrationManager,
    },
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "appointly=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!("Starting Appointly server on {}:{}", settings.server.host, settings.server.port);

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    // Initialize integration manager
    let integration_manager = Arc::new(IntegrationManager::new());

    // Register integrations
    let notifier = Arc::new(SqliteNotifier::new(db_pool.clone()));
    integration_manager
        .register(Arc::new(NotificationIntegration::new(notifier)))
        .await;

    // Check integration health
    let health_results = integration_manager.health_check_all().await;
    for (name, result) in health_results {
        match result {
            Ok(_) => tracing::info!("Integration {} is healthy", name),
            Err(e) => tracing::warn!("Integration {} health check failed: {:?}", name, e),
        }
    }

    let earnings = Arc::new(SqliteEarningsRecorder::new(db_pool.clone()));

    // Create service context
    let service_context = Arc::new(ServiceContext::new(
        &settings,
        earnings,
        integration_manager,
        db_pool.clone(),
    ));

    // Completions whose earnings failed to record in an earlier run
    match service_context.booking_state_machine.reconcile_earnings().await {
        Ok(0) => {}
        Ok(n) => tracing::info!("Recorded earnings for {} previously completed bookings", n),
        Err(e) => tracing::warn!("Earnings reconciliation failed: {:?}", e),
    }

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down, closing database pool");
    db_pool.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
