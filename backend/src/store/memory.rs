//! In-process JSON store
//!
//! The reference implementation of the [`Store`] contract: a single-process
//! key-value store holding plain JSON records per (organization, collection).
//! Last write wins; batches are applied under one write lock, which makes
//! `upsert_many` atomic with respect to every other accessor.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared::OrgId;

use crate::error::AppResult;

use super::{Store, WriteOp};

type Collection = HashMap<Uuid, Value>;

#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<(OrgId, String), Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn read_one(
        &self,
        org_id: OrgId,
        collection: &str,
        id: Uuid,
    ) -> AppResult<Option<Value>> {
        let data = self.data.read().await;
        Ok(data
            .get(&(org_id, collection.to_string()))
            .and_then(|c| c.get(&id))
            .cloned())
    }

    async fn read_all(&self, org_id: OrgId, collection: &str) -> AppResult<Vec<Value>> {
        let data = self.data.read().await;
        Ok(data
            .get(&(org_id, collection.to_string()))
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert(
        &self,
        org_id: OrgId,
        collection: &str,
        id: Uuid,
        record: Value,
    ) -> AppResult<()> {
        let mut data = self.data.write().await;
        data.entry((org_id, collection.to_string()))
            .or_default()
            .insert(id, record);
        Ok(())
    }

    async fn upsert_many(&self, org_id: OrgId, writes: Vec<WriteOp>) -> AppResult<()> {
        // One write lock for the whole batch: all records land together
        let mut data = self.data.write().await;
        for write in writes {
            data.entry((org_id, write.collection.to_string()))
                .or_default()
                .insert(write.id, write.record);
        }
        Ok(())
    }

    async fn delete(&self, org_id: OrgId, collection: &str, id: Uuid) -> AppResult<bool> {
        let mut data = self.data.write().await;
        Ok(data
            .get_mut(&(org_id, collection.to_string()))
            .map(|c| c.remove(&id).is_some())
            .unwrap_or(false))
    }
}
