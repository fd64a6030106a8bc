//! Persistence collaborator contract
//!
//! The engine never embeds persistence logic. Every entity read or write
//! goes through the [`Store`] trait, scoped by an explicit [`OrgId`], so the
//! backing technology (the default in-process JSON store, a relational
//! database, ...) can be substituted without touching the services.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use shared::OrgId;

use crate::error::{AppError, AppResult};

/// Collection names used by the engine
pub mod collections {
    pub const STOCK_ITEMS: &str = "stock_items";
    pub const STOCK_MOVEMENTS: &str = "stock_movements";
    pub const RECIPES: &str = "recipes";
    pub const PACKS: &str = "packs";
    pub const ORDERS: &str = "orders";
    pub const SETTINGS: &str = "settings";
}

/// One write inside an atomic batch
#[derive(Debug, Clone)]
pub struct WriteOp {
    pub collection: &'static str,
    pub id: Uuid,
    pub record: Value,
}

impl WriteOp {
    pub fn new(collection: &'static str, id: Uuid, record: Value) -> Self {
        Self {
            collection,
            id,
            record,
        }
    }
}

/// Uniform read/write/upsert contract over plain JSON records.
///
/// `upsert_many` is the transactional unit of the engine: implementations
/// must apply the whole batch or none of it. Order confirmation relies on
/// this to commit snapshot, stock deductions, and status change together.
#[async_trait]
pub trait Store: Send + Sync {
    async fn read_one(&self, org_id: OrgId, collection: &str, id: Uuid)
        -> AppResult<Option<Value>>;

    async fn read_all(&self, org_id: OrgId, collection: &str) -> AppResult<Vec<Value>>;

    async fn upsert(&self, org_id: OrgId, collection: &str, id: Uuid, record: Value)
        -> AppResult<()>;

    /// All-or-nothing batch write
    async fn upsert_many(&self, org_id: OrgId, writes: Vec<WriteOp>) -> AppResult<()>;

    /// Returns whether a record was actually removed
    async fn delete(&self, org_id: OrgId, collection: &str, id: Uuid) -> AppResult<bool>;
}

/// Read and decode one record, failing with `NotFound` when absent
pub async fn load<T: DeserializeOwned>(
    store: &dyn Store,
    org_id: OrgId,
    collection: &str,
    id: Uuid,
    entity: &str,
) -> AppResult<T> {
    let value = store
        .read_one(org_id, collection, id)
        .await?
        .ok_or_else(|| AppError::NotFound(entity.to_string()))?;
    decode(value, collection)
}

/// Read and decode one record, `None` when absent
pub async fn load_opt<T: DeserializeOwned>(
    store: &dyn Store,
    org_id: OrgId,
    collection: &str,
    id: Uuid,
) -> AppResult<Option<T>> {
    match store.read_one(org_id, collection, id).await? {
        Some(value) => Ok(Some(decode(value, collection)?)),
        None => Ok(None),
    }
}

/// Read and decode a whole collection
pub async fn load_all<T: DeserializeOwned>(
    store: &dyn Store,
    org_id: OrgId,
    collection: &str,
) -> AppResult<Vec<T>> {
    store
        .read_all(org_id, collection)
        .await?
        .into_iter()
        .map(|value| decode(value, collection))
        .collect()
}

/// Encode an entity into a plain JSON record
pub fn encode<T: Serialize>(entity: &T, collection: &str) -> AppResult<Value> {
    serde_json::to_value(entity)
        .map_err(|e| AppError::StorageError(format!("encoding {collection} record: {e}")))
}

fn decode<T: DeserializeOwned>(value: Value, collection: &str) -> AppResult<T> {
    serde_json::from_value(value)
        .map_err(|e| AppError::StorageError(format!("decoding {collection} record: {e}")))
}
