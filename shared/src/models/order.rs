//! Orders and their frozen cost snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::OrgId;

/// Order lifecycle.
///
/// Draft orders are freely editable and have no stock effect. Confirmation
/// freezes line cost snapshots and deducts stock; every later state is
/// status bookkeeping only and never re-opens the snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Confirmed,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Snapshots exist and lines are immutable from Confirmed onward
    pub fn is_locked(&self) -> bool {
        !matches!(self, OrderStatus::Draft)
    }

    /// Allowed status-bookkeeping transitions after confirmation.
    /// Draft -> Confirmed is not listed here: it goes through `confirm`,
    /// never through a plain status update.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Confirmed, Paid)
                | (Confirmed, Shipped)
                | (Confirmed, Cancelled)
                | (Paid, Shipped)
                | (Paid, Cancelled)
                | (Paid, Refunded)
                | (Shipped, Delivered)
                | (Shipped, Refunded)
                | (Delivered, Refunded)
        )
    }
}

/// What an order line sells
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineRef {
    /// One recipe at a given sale format
    Recipe { recipe_id: Uuid, format_g: u32 },
    /// One pack
    Pack { pack_id: Uuid },
    /// A raw accessory straight from stock
    Accessory { item_id: Uuid },
}

/// One order line.
///
/// The three snapshot fields are written exactly once, at confirmation, and
/// never recomputed afterward. While the order is a draft they are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: Uuid,
    pub reference: LineRef,
    pub quantity: u32,
    /// Sale price per unit, EUR
    pub unit_price: f64,
    /// Frozen at confirmation: ingredient mix + labor per unit
    pub unit_material_cost: Option<f64>,
    /// Frozen at confirmation: pouches and pack packaging per unit
    pub unit_packaging_cost: Option<f64>,
    /// Frozen at confirmation: material + packaging
    pub unit_total_cost: Option<f64>,
}

impl OrderLine {
    pub fn line_revenue(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

/// Order-level profitability aggregates, derived from frozen line snapshots
/// plus order-level fees at confirmation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTotals {
    pub cogs_materials: f64,
    pub cogs_packaging: f64,
    pub revenue: f64,
    pub platform_fee: f64,
    /// VAT on the revenue at the organization's flat rate. Bookkeeping
    /// figure only; it does not enter the profit calculation.
    pub vat: f64,
    pub net_profit: f64,
    pub margin_percent: f64,
}

/// A customer order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub org_id: OrgId,
    pub customer_name: String,
    /// Sales channel: "shop", "market", "online", ...
    pub channel: Option<String>,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    /// Shipping charged to the business, EUR
    pub shipping_cost: f64,
    /// Flat discount applied to the order, EUR
    pub discount: f64,
    /// Platform commission on revenue, percent
    pub platform_fee_percent: f64,
    /// Populated at confirmation, never recomputed
    pub totals: Option<OrderTotals>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
