//! CrewTask API server entrypoint
//!
//! Loads configuration, connects to the database, runs migrations, builds
//! the notifier and router, and serves.

use anyhow::Context;
use crewtask_api::{
    app::{build_router, AppState},
    config::Config,
    notify::mailer::MailNotifier,
};
use crewtask_shared::db::{self, DatabaseConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crewtask_api=debug,tower_http=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "CrewTask API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = db::create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("Failed to connect to database")?;

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let notifier = Arc::new(MailNotifier::new(&config.mail)?);
    if config.mail.url.is_none() {
        tracing::warn!("MAIL_SERVICE_URL is not set; notifications are disabled");
    }

    let bind_address = config.bind_address();
    let state = AppState::new(pool, config, notifier);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Server listening on http://{}", bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}
