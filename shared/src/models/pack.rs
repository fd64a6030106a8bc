//! Packs: bundles of recipe units plus packaging

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::OrgId;

/// A recipe included in a pack, at a given format and count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackRecipeLine {
    pub recipe_id: Uuid,
    pub quantity: u32,
    /// Sale size of each included unit, grams
    pub format_g: u32,
}

/// A packaging stock item included in a pack (gift box, ribbon, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackPackagingLine {
    pub item_id: Uuid,
    pub quantity: u32,
}

/// A sellable pack.
///
/// `cost` and `margin_percent` are derived and cached, recomputed on every
/// composition or price write from the referenced recipes' cached numbers
/// and current packaging WACs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pack {
    pub id: Uuid,
    pub org_id: OrgId,
    pub name: String,
    pub recipe_lines: Vec<PackRecipeLine>,
    pub packaging_lines: Vec<PackPackagingLine>,
    pub sale_price: f64,
    /// Cached total cost of one pack, EUR
    pub cost: f64,
    /// Cached margin at the current sale price
    pub margin_percent: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
