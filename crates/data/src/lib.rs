pub mod db;

use async_trait::async_trait;
use brokerlink_core::{LinkStore, LinkUpdate, StoreError, UserBrokerLink};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A process-local link store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    links: RwLock<HashMap<String, UserBrokerLink>>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing merge semantics.
    pub async fn insert(&self, link: UserBrokerLink) {
        self.links.write().await.insert(link.user_id.clone(), link);
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserBrokerLink>, StoreError> {
        Ok(self.links.read().await.get(user_id).cloned())
    }

    async fn upsert(&self, user_id: &str, update: &LinkUpdate) -> Result<(), StoreError> {
        let mut links = self.links.write().await;
        links
            .entry(user_id.to_string())
            .or_insert_with(|| UserBrokerLink::new(user_id))
            .apply(update);
        Ok(())
    }

    async fn clear_account(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(link) = self.links.write().await.get_mut(user_id) {
            link.clear_account(at);
        }
        Ok(())
    }
}

/// A PostgreSQL-backed link store.
pub struct PgLinkStore {
    pub pool: sqlx::PgPool,
}

impl PgLinkStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkStore for PgLinkStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserBrokerLink>, StoreError> {
        db::load_link(&self.pool, user_id)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }

    async fn upsert(&self, user_id: &str, update: &LinkUpdate) -> Result<(), StoreError> {
        db::upsert_link(&self.pool, user_id, update)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }

    async fn clear_account(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let rows = db::clear_link_account(&self.pool, user_id, at)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        tracing::debug!(user_id = %user_id, rows = rows, "Cleared broker link");
        Ok(())
    }
}
