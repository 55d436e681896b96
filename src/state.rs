use crate::config::{AppConfig, JwtConfig, ReadPolicy, StorageBackend};
use crate::storage::{MemoryStore, PgStore, PortalStore};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn PortalStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match config.storage {
            StorageBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is required for the postgres storage backend")?;
                let pg = PgStore::connect(url, config.database_max_connections).await?;
                pg.migrate().await?;
                info!("using postgres storage");
                Arc::new(pg) as Arc<dyn PortalStore>
            }
            StorageBackend::Memory => {
                info!("using in-memory storage; data is lost on restart");
                Arc::new(MemoryStore::new()) as Arc<dyn PortalStore>
            }
        };

        Ok(Self { config, store })
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn PortalStore>) -> Self {
        Self { config, store }
    }

    /// In-memory state for tests: domain `inst.edu`, public project reads.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            storage: StorageBackend::Memory,
            database_url: None,
            database_max_connections: 1,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 30,
            },
            allowed_email_domain: "inst.edu".into(),
            projects_read: ReadPolicy::Public,
            bind_addr: ([127, 0, 0, 1], 0).into(),
        });

        Self::from_parts(config, Arc::new(MemoryStore::new()))
    }
}
