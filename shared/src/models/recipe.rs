//! Recipes: percentage-based ingredient blends

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::OrgId;

/// One ingredient line of a recipe mix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixItem {
    pub ingredient_id: Uuid,
    /// Share of the finished mix by mass, 0..=100
    pub percent: f64,
}

/// Sale price for one discrete sale size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatPrice {
    /// Sale size in grams
    pub format_g: u32,
    /// Sale price for one unit of this format, EUR
    pub price: f64,
}

/// A tea recipe.
///
/// `mix_cost_per_gram` is derived and cached: it is recomputed from current
/// ingredient WACs whenever the composition changes. It is never
/// authoritative for historical reporting; only order snapshots are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub org_id: OrgId,
    pub name: String,
    pub items: Vec<MixItem>,
    /// Fixed labor cost per unit sold, EUR
    pub labor_cost: f64,
    /// Cached cost of one gram of finished mix, EUR/g
    pub mix_cost_per_gram: f64,
    /// Sale formats and their prices
    pub format_prices: Vec<FormatPrice>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn price_for_format(&self, format_g: u32) -> Option<f64> {
        self.format_prices
            .iter()
            .find(|fp| fp.format_g == format_g)
            .map(|fp| fp.price)
    }
}
