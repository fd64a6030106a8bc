//! Per-organization settings

use serde::{Deserialize, Serialize};

use crate::types::OrgId;

/// Flat-rate fee and tax settings used in order-level aggregation.
/// These never enter the costing core itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgSettings {
    pub org_id: OrgId,
    /// Default platform commission on online orders, percent
    pub platform_fee_percent: f64,
    /// Flat VAT rate, percent
    pub vat_percent: f64,
    /// Default shipping cost applied to new orders, EUR
    pub default_shipping_cost: f64,
}
