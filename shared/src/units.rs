//! Unit-cost normalization
//!
//! All stock costs are persisted in a single base unit: euros per gram for
//! goods tracked by mass, euros per piece for discrete goods. User input and
//! display naturally use euros per kilogram for bulk goods, so the kg↔g
//! conversion happens exactly once at each boundary, through the two
//! functions below. A past data migration stored costs 1000x too large
//! because this conversion was scattered across call sites; it lives here
//! and nowhere else.

use serde::{Deserialize, Serialize};

/// Grams per kilogram, the only conversion factor in the system
pub const GRAMS_PER_KG: f64 = 1000.0;

/// How a stock item's cost and quantity are measured.
///
/// Dispatch on this variant, never on category-name strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostBasis {
    /// Quantity in grams, cost entered per kilogram, stored per gram
    BulkByMass,
    /// Quantity in pieces, cost entered and stored per piece
    DiscreteByUnit,
}

impl CostBasis {
    /// Unit label for the entered (boundary) cost
    pub fn entry_unit(&self) -> &'static str {
        match self {
            CostBasis::BulkByMass => "EUR/kg",
            CostBasis::DiscreteByUnit => "EUR/piece",
        }
    }
}

/// Convert a boundary unit cost (EUR/kg or EUR/piece) into the stored base
/// unit (EUR/g or EUR/piece). Applied exactly once, at ledger entry.
pub fn normalize_unit_cost(basis: CostBasis, entered: f64) -> f64 {
    match basis {
        CostBasis::BulkByMass => entered / GRAMS_PER_KG,
        CostBasis::DiscreteByUnit => entered,
    }
}

/// Convert a stored base-unit cost back to its boundary unit for display or
/// export. Applied exactly once, at the display boundary.
pub fn display_unit_cost(basis: CostBasis, stored: f64) -> f64 {
    match basis {
        CostBasis::BulkByMass => stored * GRAMS_PER_KG,
        CostBasis::DiscreteByUnit => stored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_bulk_divides_by_thousand() {
        // 24 EUR/kg stored as 0.024 EUR/g
        assert!((normalize_unit_cost(CostBasis::BulkByMass, 24.0) - 0.024).abs() < 1e-12);
    }

    #[test]
    fn normalize_discrete_is_identity() {
        assert_eq!(normalize_unit_cost(CostBasis::DiscreteByUnit, 0.35), 0.35);
    }

    #[test]
    fn display_inverts_normalize() {
        let entered = 18.5;
        let stored = normalize_unit_cost(CostBasis::BulkByMass, entered);
        let shown = display_unit_cost(CostBasis::BulkByMass, stored);
        assert!((shown - entered).abs() < 1e-9);
    }
}
