//! Stock items and the movement ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::OrgId;
use crate::units::CostBasis;

/// Stock item category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockCategory {
    /// Loose-leaf tea bought in bulk (grams)
    TeaBulk,
    /// Blending ingredients: flowers, fruit pieces, flavoring (grams)
    Ingredient,
    /// Pouches, boxes, labels (pieces)
    Packaging,
    /// Resold accessories: infusers, tins (pieces)
    Accessory,
}

impl StockCategory {
    /// Measurement basis for this category. Packaging and accessories are
    /// counted by the piece; everything else is weighed in grams.
    pub fn cost_basis(&self) -> CostBasis {
        match self {
            StockCategory::Packaging | StockCategory::Accessory => CostBasis::DiscreteByUnit,
            StockCategory::TeaBulk | StockCategory::Ingredient => CostBasis::BulkByMass,
        }
    }
}

/// A stock item: ingredient, packaging, or accessory.
///
/// `current_quantity` and `weighted_average_cost` are always consistent with
/// a full replay of the item's movement history; only purchase movements
/// (the ones carrying a unit price) ever move the WAC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockItem {
    pub id: Uuid,
    pub org_id: OrgId,
    pub name: String,
    pub category: StockCategory,
    /// Grams or pieces depending on the category's cost basis
    pub current_quantity: f64,
    /// EUR per base unit (gram or piece)
    pub weighted_average_cost: f64,
    /// Low-stock alert threshold, in base units
    pub alert_threshold: f64,
    /// Capacity in grams for sized packaging (pouches, boxes)
    pub capacity_g: Option<u32>,
    /// Free-form subtype tag used by the packaging matcher, e.g. "sachet"
    pub subtype: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    pub fn cost_basis(&self) -> CostBasis {
        self.category.cost_basis()
    }
}

/// Kind of stock movement. The sign of the recorded delta is derived from
/// the kind, except for manual adjustments which are caller-signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Stock in, carries a unit price, moves the WAC
    Purchase,
    /// Consumption by a confirmed order
    Sale,
    /// Breakage, spoilage, theft
    Loss,
    /// Consumption by in-house production (samples, blending trials)
    Production,
    /// Manual correction, caller-signed
    Adjustment,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Purchase => "purchase",
            MovementKind::Sale => "sale",
            MovementKind::Loss => "loss",
            MovementKind::Production => "production",
            MovementKind::Adjustment => "adjustment",
        }
    }
}

/// One signed quantity event in an item's ledger.
///
/// Movements are append-only: once written they are never mutated or
/// deleted. They are the source of truth for the current item state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub org_id: OrgId,
    pub item_id: Uuid,
    pub kind: MovementKind,
    /// Signed, in the item's base unit (grams or pieces)
    pub quantity_delta: f64,
    /// Normalized (per base unit) price, present only on purchases
    pub unit_cost: Option<f64>,
    pub reason: Option<String>,
    /// Originating order, for sale consumptions
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
