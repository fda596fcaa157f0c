use anyhow::Result;
use fieldwatch_monitor::{OutbreakMonitor, SurveillanceContext};
use fieldwatch_storage::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fieldwatch_monitor=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("fieldwatch-monitor starting...");

    let ctx = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let db = Database::from_url(&url).await?;
            db.migrate().await?;
            tracing::info!("using postgres-backed stores");
            SurveillanceContext::postgres(db)
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set, using in-memory stores");
            SurveillanceContext::in_memory()
        }
    };

    let monitor = OutbreakMonitor::new(ctx);

    tracing::info!("monitor ready, waiting for shutdown signal...");
    tokio::signal::ctrl_c().await?;

    monitor.shutdown().await;
    tracing::info!("monitor shutdown complete");
    Ok(())
}
