//! Infrastructure wiring: stores, blob storage, change bus and the
//! background session sweeper.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use opsconsole_auth::JwtIssuer;
use opsconsole_events::BroadcastChangeBus;
use opsconsole_infra::{BlobStore, LocalBlobStore, Services, Stores, store};

use crate::config::ApiConfig;

const MAX_DB_CONNECTIONS: u32 = 10;

/// Postgres when `DATABASE_URL` is set (migrations run first), otherwise
/// in-memory stores. Seeds the bootstrap super_admin when configured.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<Services> {
    let stores = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(MAX_DB_CONNECTIONS)
                .connect(url)
                .await
                .context("failed to connect to DATABASE_URL")?;
            store::migrate(&pool).await.context("failed to run migrations")?;
            tracing::info!("using postgres record stores");
            Stores::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; records are kept in memory only");
            Stores::in_memory()
        }
    };

    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(&config.blob_storage_dir));
    let services = Services::new(
        stores,
        Arc::new(BroadcastChangeBus::default()),
        blobs,
        JwtIssuer::new(config.jwt_secret.as_bytes(), config.jwt_ttl),
        config.service.clone(),
    );

    if let Some((email, password)) = &config.bootstrap_admin {
        match services
            .bootstrap_super_admin(email, password)
            .await
            .context("failed to seed bootstrap super_admin")?
        {
            Some(profile) => tracing::info!(user_id = %profile.id, email = %profile.email, "bootstrap super_admin created"),
            None => tracing::debug!("bootstrap super_admin already present"),
        }
    }

    Ok(services)
}

/// Periodically marks idle sessions inactive.
pub fn spawn_session_sweeper(services: Arc<Services>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match services.sweep_sessions().await {
                Ok(0) => {}
                Ok(swept) => tracing::info!(swept, "idle sessions marked inactive"),
                Err(e) => tracing::warn!(error = %e, "session sweep failed"),
            }
        }
    })
}
