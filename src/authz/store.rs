use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::catalog::{CatalogError, RoleCatalog};
use crate::errors::AppError;
use crate::utils::utc_now;

/// The live permission matrix. Readers take a cheap `Arc` snapshot and keep
/// evaluating against it even if a newer catalog is committed meanwhile.
#[derive(Debug)]
pub struct PolicyStore {
    current: RwLock<Arc<RoleCatalog>>,
}

impl PolicyStore {
    pub fn new(catalog: RoleCatalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    pub fn snapshot(&self) -> Arc<RoleCatalog> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in `next`, which must be the direct successor of the live catalog.
    pub fn commit(&self, next: RoleCatalog) -> Result<Arc<RoleCatalog>, CatalogError> {
        next.validate()?;
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if next.version() != guard.version() + 1 {
            return Err(CatalogError::StaleVersion {
                expected: next.version().saturating_sub(1),
                current: guard.version(),
            });
        }
        let next = Arc::new(next);
        *guard = Arc::clone(&next);
        tracing::info!(version = next.version(), digest = %next.digest(), "role catalog committed");
        Ok(next)
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new(RoleCatalog::canonical())
    }
}

/// Durable home of committed catalogs.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Newest committed catalog, if any was ever stored.
    async fn load_latest(&self) -> Result<Option<RoleCatalog>, AppError>;

    /// Persist `catalog` as a new version. A version that already exists is a
    /// conflict.
    async fn save(&self, catalog: &RoleCatalog, committed_by: Option<Uuid>) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct SqliteCatalogStore {
    pool: SqlitePool,
}

impl SqliteCatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn load_latest(&self) -> Result<Option<RoleCatalog>, AppError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT catalog_json, digest FROM role_catalog ORDER BY version DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;

        let Some((raw, digest)) = row else {
            return Ok(None);
        };
        let catalog = RoleCatalog::from_json(&raw)?;
        if catalog.digest() != digest {
            return Err(AppError::internal(format!(
                "role catalog v{} failed its digest check",
                catalog.version()
            )));
        }
        Ok(Some(catalog))
    }

    async fn save(&self, catalog: &RoleCatalog, committed_by: Option<Uuid>) -> Result<(), AppError> {
        let version = i64::try_from(catalog.version())
            .map_err(|_| AppError::internal("catalog version out of range"))?;

        let result = sqlx::query(
            "INSERT INTO role_catalog (version, catalog_json, digest, committed_by, committed_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(version)
        .bind(catalog.to_json()?)
        .bind(catalog.digest())
        .bind(committed_by)
        .bind(utc_now())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(AppError::conflict(format!(
                "role catalog version {} was already committed",
                catalog.version()
            ))),
            Err(err) => Err(err.into()),
        }
    }
}

/// Load the newest stored catalog, seeding the canonical matrix on first run.
pub async fn load_or_seed(store: &dyn CatalogStore) -> Result<RoleCatalog, AppError> {
    if let Some(catalog) = store.load_latest().await? {
        tracing::info!(version = catalog.version(), "loaded role catalog");
        return Ok(catalog);
    }
    let catalog = RoleCatalog::canonical();
    store.save(&catalog, None).await?;
    tracing::info!(version = catalog.version(), "seeded canonical role catalog");
    Ok(catalog)
}
