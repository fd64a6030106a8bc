//! Stock ledger service: items, movements, weighted-average cost
//!
//! The movement history is the source of truth; `StockItem.current_quantity`
//! and `weighted_average_cost` are kept consistent with it on every write.
//! Movement appends and item updates land in one atomic batch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use shared::{
    display_unit_cost, normalize_unit_cost, validate_positive_quantity, validate_unit_price,
    MovementKind, OrgId, StockCategory, StockItem, StockMovement,
};

use crate::error::{AppError, AppResult};
use crate::external::AuditSink;
use crate::store::{collections, encode, load, load_all, Store, WriteOp};

/// Stock service managing items and their movement ledgers
#[derive(Clone)]
pub struct StockService {
    store: Arc<dyn Store>,
    audit: Arc<dyn AuditSink>,
    /// Per-item locks serializing read-modify-write on quantity/WAC
    item_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

/// Input for creating a stock item
#[derive(Debug, Deserialize)]
pub struct CreateStockItemInput {
    pub name: String,
    pub category: StockCategory,
    pub alert_threshold: Option<f64>,
    pub capacity_g: Option<u32>,
    pub subtype: Option<String>,
}

/// Input for updating a stock item (category is fixed at creation: it
/// determines the cost basis the whole ledger is recorded in)
#[derive(Debug, Deserialize)]
pub struct UpdateStockItemInput {
    pub name: Option<String>,
    pub alert_threshold: Option<f64>,
    pub capacity_g: Option<Option<u32>>,
    pub subtype: Option<Option<String>>,
}

/// Input for recording a stock movement
#[derive(Debug, Deserialize)]
pub struct RecordMovementInput {
    pub item_id: Uuid,
    pub kind: MovementKind,
    /// Positive; the sign is inferred from `kind`. For adjustments the
    /// caller's signed value is trusted verbatim.
    pub quantity: f64,
    /// In the item's entry unit (EUR/kg or EUR/piece); required for
    /// purchases, ignored otherwise
    pub unit_price: Option<f64>,
    pub reason: Option<String>,
    pub order_id: Option<Uuid>,
}

/// Valuation of one item at current quantity and WAC
#[derive(Debug, Clone, Serialize)]
pub struct ItemValuation {
    pub item_id: Uuid,
    pub name: String,
    pub category: StockCategory,
    pub quantity: f64,
    /// Stored base-unit cost (EUR/g or EUR/piece)
    pub unit_cost: f64,
    /// Boundary-unit cost for display (EUR/kg or EUR/piece)
    pub display_unit_cost: f64,
    /// Label for the display cost, e.g. "EUR/kg"
    pub display_unit: &'static str,
    pub total_value: f64,
}

/// Whole-stock valuation
#[derive(Debug, Clone, Serialize)]
pub struct StockValuation {
    pub items: Vec<ItemValuation>,
    pub total_value: f64,
}

/// WAC update policy, purchases only: blend the incoming units into the
/// rolling average. Averaging against non-positive stock is undefined, so
/// the WAC resets to the incoming price in that case.
pub fn purchase_wac(old_qty: f64, old_wac: f64, delta_qty: f64, unit_cost: f64) -> f64 {
    if old_qty + delta_qty <= 0.0 {
        return unit_cost;
    }
    (old_qty * old_wac + delta_qty * unit_cost) / (old_qty + delta_qty)
}

/// Signed delta for a movement: purchases add, consumptions remove,
/// adjustments pass through as given.
pub fn signed_delta(kind: MovementKind, quantity: f64) -> f64 {
    match kind {
        MovementKind::Purchase => quantity,
        MovementKind::Sale | MovementKind::Loss | MovementKind::Production => -quantity,
        MovementKind::Adjustment => quantity,
    }
}

impl StockService {
    pub fn new(store: Arc<dyn Store>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            audit,
            item_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Lock handle for one item. Confirmation acquires these in sorted-id
    /// order across all consumed items before touching any of them.
    pub(crate) async fn item_lock(&self, item_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.item_locks.lock().await;
        locks.entry(item_id).or_default().clone()
    }

    pub async fn create_item(
        &self,
        org_id: OrgId,
        input: CreateStockItemInput,
    ) -> AppResult<StockItem> {
        if input.name.trim().is_empty() {
            return Err(AppError::validation("name", "Name is required"));
        }

        let now = Utc::now();
        let item = StockItem {
            id: Uuid::new_v4(),
            org_id,
            name: input.name,
            category: input.category,
            current_quantity: 0.0,
            weighted_average_cost: 0.0,
            alert_threshold: input.alert_threshold.unwrap_or(0.0),
            capacity_g: input.capacity_g,
            subtype: input.subtype,
            created_at: now,
            updated_at: now,
        };

        self.store
            .upsert(
                org_id,
                collections::STOCK_ITEMS,
                item.id,
                encode(&item, collections::STOCK_ITEMS)?,
            )
            .await?;

        self.audit
            .log(org_id, "create", "stock_item", item.id, &item.name);
        Ok(item)
    }

    pub async fn get_item(&self, org_id: OrgId, item_id: Uuid) -> AppResult<StockItem> {
        load(
            self.store.as_ref(),
            org_id,
            collections::STOCK_ITEMS,
            item_id,
            "Stock item",
        )
        .await
    }

    pub async fn list_items(&self, org_id: OrgId) -> AppResult<Vec<StockItem>> {
        let mut items: Vec<StockItem> =
            load_all(self.store.as_ref(), org_id, collections::STOCK_ITEMS).await?;
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    pub async fn update_item(
        &self,
        org_id: OrgId,
        item_id: Uuid,
        input: UpdateStockItemInput,
    ) -> AppResult<StockItem> {
        let _guard = self.item_lock(item_id).await.lock_owned().await;

        let mut item = self.get_item(org_id, item_id).await?;
        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(AppError::validation("name", "Name is required"));
            }
            item.name = name;
        }
        if let Some(threshold) = input.alert_threshold {
            item.alert_threshold = threshold;
        }
        if let Some(capacity) = input.capacity_g {
            item.capacity_g = capacity;
        }
        if let Some(subtype) = input.subtype {
            item.subtype = subtype;
        }
        item.updated_at = Utc::now();

        self.store
            .upsert(
                org_id,
                collections::STOCK_ITEMS,
                item.id,
                encode(&item, collections::STOCK_ITEMS)?,
            )
            .await?;

        self.audit
            .log(org_id, "update", "stock_item", item.id, &item.name);
        Ok(item)
    }

    /// Delete an item. Its movement history stays in place and recipes
    /// referencing it are left alone; the integrity scan reports the
    /// resulting orphan references.
    pub async fn delete_item(&self, org_id: OrgId, item_id: Uuid) -> AppResult<()> {
        let removed = self
            .store
            .delete(org_id, collections::STOCK_ITEMS, item_id)
            .await?;
        if !removed {
            return Err(AppError::NotFound("Stock item".to_string()));
        }
        self.audit
            .log(org_id, "delete", "stock_item", item_id, "stock item deleted");
        Ok(())
    }

    /// Record a stock movement: append to the ledger and update the item's
    /// quantity (and WAC for purchases) in one atomic batch.
    pub async fn record_movement(
        &self,
        org_id: OrgId,
        input: RecordMovementInput,
    ) -> AppResult<StockMovement> {
        match input.kind {
            MovementKind::Adjustment => {
                if !input.quantity.is_finite() || input.quantity == 0.0 {
                    return Err(AppError::validation(
                        "quantity",
                        "Adjustment quantity must be a non-zero signed value",
                    ));
                }
            }
            _ => {
                validate_positive_quantity(input.quantity)
                    .map_err(|msg| AppError::validation("quantity", msg))?;
            }
        }

        let unit_price = match input.kind {
            MovementKind::Purchase => {
                let price = input.unit_price.ok_or_else(|| {
                    AppError::validation("unit_price", "Purchases require a unit price")
                })?;
                validate_unit_price(price)
                    .map_err(|msg| AppError::validation("unit_price", msg))?;
                Some(price)
            }
            _ => None,
        };

        let _guard = self.item_lock(input.item_id).await.lock_owned().await;

        let mut item = self.get_item(org_id, input.item_id).await?;
        let delta = signed_delta(input.kind, input.quantity);
        let normalized = unit_price.map(|p| normalize_unit_cost(item.cost_basis(), p));

        if let Some(cost) = normalized {
            item.weighted_average_cost = purchase_wac(
                item.current_quantity,
                item.weighted_average_cost,
                delta,
                cost,
            );
        }
        item.current_quantity += delta;
        item.updated_at = Utc::now();

        if item.current_quantity < 0.0 {
            // Overselling is allowed; the integrity scan reports it
            tracing::warn!(
                item_id = %item.id,
                quantity = item.current_quantity,
                "stock went negative"
            );
        }

        let movement = StockMovement {
            id: Uuid::new_v4(),
            org_id,
            item_id: item.id,
            kind: input.kind,
            quantity_delta: delta,
            unit_cost: normalized,
            reason: input.reason,
            order_id: input.order_id,
            created_at: Utc::now(),
        };

        self.store
            .upsert_many(
                org_id,
                vec![
                    WriteOp::new(
                        collections::STOCK_MOVEMENTS,
                        movement.id,
                        encode(&movement, collections::STOCK_MOVEMENTS)?,
                    ),
                    WriteOp::new(
                        collections::STOCK_ITEMS,
                        item.id,
                        encode(&item, collections::STOCK_ITEMS)?,
                    ),
                ],
            )
            .await?;

        self.audit.log(
            org_id,
            input.kind.as_str(),
            "stock_movement",
            movement.id,
            &format!("{} {:+} on {}", input.kind.as_str(), delta, item.name),
        );
        Ok(movement)
    }

    /// Movements of one item, most recent first
    pub async fn list_movements(
        &self,
        org_id: OrgId,
        item_id: Uuid,
    ) -> AppResult<Vec<StockMovement>> {
        // Validate the item exists before filtering its ledger
        self.get_item(org_id, item_id).await?;

        let mut movements: Vec<StockMovement> =
            load_all(self.store.as_ref(), org_id, collections::STOCK_MOVEMENTS).await?;
        movements.retain(|m| m.item_id == item_id);
        movements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(movements)
    }

    /// Items at or below their alert threshold
    pub async fn low_stock(&self, org_id: OrgId) -> AppResult<Vec<StockItem>> {
        let items = self.list_items(org_id).await?;
        Ok(items
            .into_iter()
            .filter(|item| item.alert_threshold > 0.0)
            .filter(|item| item.current_quantity <= item.alert_threshold)
            .collect())
    }

    /// Value the whole stock at current quantities and WACs
    pub async fn valuation(&self, org_id: OrgId) -> AppResult<StockValuation> {
        let items = self.list_items(org_id).await?;
        let valuations: Vec<ItemValuation> = items
            .into_iter()
            .map(|item| {
                let basis = item.cost_basis();
                ItemValuation {
                    item_id: item.id,
                    name: item.name,
                    category: item.category,
                    quantity: item.current_quantity,
                    unit_cost: item.weighted_average_cost,
                    display_unit_cost: display_unit_cost(basis, item.weighted_average_cost),
                    display_unit: basis.entry_unit(),
                    total_value: item.current_quantity * item.weighted_average_cost,
                }
            })
            .collect();
        let total_value = valuations.iter().map(|v| v.total_value).sum();
        Ok(StockValuation {
            items: valuations,
            total_value,
        })
    }
}
