// SQLite CredentialStore Implementation (settings table)

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use panelcraft_core::error::Result;
use panelcraft_core::port::{ApiKey, CredentialStore, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

/// Settings row holding the remote service API key
pub const API_KEY_SETTING: &str = "dashscope_api_key";

pub struct SqliteCredentialStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
    key: &'static str,
}

impl SqliteCredentialStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self::with_key(pool, time_provider, API_KEY_SETTING)
    }

    /// Store the credential under a different settings key
    pub fn with_key(
        pool: SqlitePool,
        time_provider: Arc<dyn TimeProvider>,
        key: &'static str,
    ) -> Self {
        Self {
            pool,
            time_provider,
            key,
        }
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn get(&self) -> Result<Option<ApiKey>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(self.key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        // A blank stored value counts as "not configured"
        match value {
            Some(raw) => match ApiKey::parse(&raw) {
                Ok(key) => Ok(Some(key)),
                Err(_) => {
                    warn!(setting = self.key, "Ignoring blank stored credential");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn set(&self, key: &ApiKey) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(self.key)
        .bind(key.expose())
        .bind(self.time_provider.now_millis())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        info!(setting = self.key, key = %key.masked(), "Credential stored");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(self.key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        info!(setting = self.key, "Credential cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use panelcraft_core::port::time_provider::ManualTimeProvider;

    async fn setup_test_db() -> SqlitePool {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_absent_set_overwrite_clear() {
        let pool = setup_test_db().await;
        let store = SqliteCredentialStore::new(pool, Arc::new(ManualTimeProvider::new(1)));

        assert!(store.get().await.unwrap().is_none());

        store.set(&ApiKey::parse("sk-first").unwrap()).await.unwrap();
        store.set(&ApiKey::parse("sk-second").unwrap()).await.unwrap();
        assert_eq!(store.get().await.unwrap().unwrap().expose(), "sk-second");

        store.clear().await.unwrap();
        assert!(store.get().await.unwrap().is_none());
        // Clearing twice is fine
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_are_scoped() {
        let pool = setup_test_db().await;
        let clock: Arc<dyn TimeProvider> = Arc::new(ManualTimeProvider::new(1));
        let main = SqliteCredentialStore::new(pool.clone(), clock.clone());
        let other = SqliteCredentialStore::with_key(pool, clock, "other_api_key");

        main.set(&ApiKey::parse("sk-main").unwrap()).await.unwrap();
        assert!(other.get().await.unwrap().is_none());
    }
}
