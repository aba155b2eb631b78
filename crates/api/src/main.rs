use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use opsconsole_api::{ApiConfig, app};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    opsconsole_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(app::services::build_services(&config).await?);
    let _sweeper = app::services::spawn_session_sweeper(Arc::clone(&services), SWEEP_INTERVAL);

    let app = app::build_app(services, &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
