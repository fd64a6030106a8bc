//! Cost roll-up and margin/price tests
//!
//! Covers the pure arithmetic core: mix cost, recipe unit cost, pack cost,
//! margin/price inversion, and the kg<->g normalization boundary.

use proptest::prelude::*;
use uuid::Uuid;

use shared::{display_unit_cost, normalize_unit_cost, CostBasis, MixItem};
use tea_business_backend::services::costing::{
    mix_cost_per_gram, pack_cost, recipe_unit_cost, PackPackagingCost, PackRecipeCost,
};
use tea_business_backend::services::pricing::{margin, price_from_margin};

const EPS: f64 = 1e-9;

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Mix of 90% tea at 10 and 10% flowers at 50 costs 14 per gram
    #[test]
    fn test_mix_cost_scenario() {
        let tea = Uuid::new_v4();
        let flower = Uuid::new_v4();
        let items = vec![
            MixItem {
                ingredient_id: tea,
                percent: 90.0,
            },
            MixItem {
                ingredient_id: flower,
                percent: 10.0,
            },
        ];

        let cost = mix_cost_per_gram(&items, |id| if id == tea { 10.0 } else { 50.0 });

        assert!((cost - 14.0).abs() < EPS);
    }

    /// Recipe at 100g: 0.05/g mix + 0.2 packaging + 0.5 labor = 5.7
    #[test]
    fn test_recipe_unit_cost_scenario() {
        let cost = recipe_unit_cost(0.05, 100, 0.2, 0.5, 0.0);
        assert!((cost - 5.7).abs() < EPS);
    }

    /// Two recipe units at 5.7 plus one 1.5 packaging item = 12.9
    #[test]
    fn test_pack_cost_scenario() {
        let recipe_lines = vec![PackRecipeCost {
            mix_cost_per_gram: 0.05,
            format_g: 100,
            labor_cost: 0.5,
            packaging_cost: 0.2,
            quantity: 2,
        }];
        let packaging_lines = vec![PackPackagingCost {
            unit_cost: 1.5,
            quantity: 1,
        }];

        assert!((pack_cost(&recipe_lines, &packaging_lines) - 12.9).abs() < EPS);
    }

    /// price=20, cost=10 -> margin {amount: 10, percent: 50}
    #[test]
    fn test_margin_scenario() {
        let m = margin(20.0, 10.0);
        assert!((m.amount - 10.0).abs() < EPS);
        assert!((m.percent - 50.0).abs() < EPS);
    }

    /// priceFromMargin(10, 50) = 20
    #[test]
    fn test_price_from_margin_scenario() {
        let price = price_from_margin(10.0, 50.0).unwrap();
        assert!((price - 20.0).abs() < EPS);
    }

    /// A 100% margin target is unachievable and rejected
    #[test]
    fn test_price_from_margin_rejects_100_percent() {
        assert!(price_from_margin(10.0, 100.0).is_err());
    }

    /// Zero-price items are valid: margin(0, 10) = {-10, 0}, not a crash
    #[test]
    fn test_margin_zero_price_degenerate_case() {
        let m = margin(0.0, 10.0);
        assert_eq!(m.amount, -10.0);
        assert_eq!(m.percent, 0.0);
    }

    /// Bulk costs are entered per kg and stored per gram
    #[test]
    fn test_bulk_normalization() {
        assert!((normalize_unit_cost(CostBasis::BulkByMass, 24.0) - 0.024).abs() < 1e-12);
        assert!((display_unit_cost(CostBasis::BulkByMass, 0.024) - 24.0).abs() < 1e-12);
    }

    /// Discrete costs pass through unchanged
    #[test]
    fn test_discrete_normalization_is_identity() {
        assert_eq!(normalize_unit_cost(CostBasis::DiscreteByUnit, 0.35), 0.35);
        assert_eq!(display_unit_cost(CostBasis::DiscreteByUnit, 0.35), 0.35);
    }

    /// An empty pack costs nothing
    #[test]
    fn test_empty_pack_is_free() {
        assert_eq!(pack_cost(&[], &[]), 0.0);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn cost_strategy() -> impl Strategy<Value = f64> {
        (1i64..=1_000_000i64).prop_map(|n| n as f64 / 100.0) // 0.01 to 10000.00
    }

    fn margin_percent_strategy() -> impl Strategy<Value = f64> {
        (0i64..=9990i64).prop_map(|n| n as f64 / 100.0) // 0.00 to 99.90
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Margin/price inverse law: for cost > 0 and 0 <= m < 100,
        /// margin(priceFromMargin(cost, m), cost).percent == m
        #[test]
        fn prop_margin_price_inverse(
            cost in cost_strategy(),
            target in margin_percent_strategy()
        ) {
            let price = price_from_margin(cost, target).unwrap();
            let m = margin(price, cost);

            prop_assert!((m.percent - target).abs() < 1e-6);
        }

        /// The reached price never falls below the cost for non-negative targets
        #[test]
        fn prop_price_covers_cost(
            cost in cost_strategy(),
            target in margin_percent_strategy()
        ) {
            let price = price_from_margin(cost, target).unwrap();
            prop_assert!(price >= cost - 1e-9);
        }

        /// Unit round-trip: normalize then display returns the input
        #[test]
        fn prop_unit_round_trip(entered in cost_strategy()) {
            let stored = normalize_unit_cost(CostBasis::BulkByMass, entered);
            let shown = display_unit_cost(CostBasis::BulkByMass, stored);

            prop_assert!((shown - entered).abs() < entered * 1e-12 + 1e-12);
        }

        /// Mix cost is linear in ingredient costs: scaling every cost by k
        /// scales the mix cost by k
        #[test]
        fn prop_mix_cost_linear(
            percents in prop::collection::vec(1u32..=100u32, 1..6),
            costs in prop::collection::vec(cost_strategy(), 6),
            k in 1u32..=10u32
        ) {
            let ids: Vec<Uuid> = percents.iter().map(|_| Uuid::new_v4()).collect();
            let items: Vec<MixItem> = ids
                .iter()
                .zip(&percents)
                .map(|(id, p)| MixItem { ingredient_id: *id, percent: *p as f64 })
                .collect();
            let lookup = |scale: f64| {
                let ids = ids.clone();
                let costs = costs.clone();
                move |id: Uuid| {
                    let idx = ids.iter().position(|i| *i == id).unwrap();
                    costs[idx % costs.len()] * scale
                }
            };

            let base = mix_cost_per_gram(&items, lookup(1.0));
            let scaled = mix_cost_per_gram(&items, lookup(k as f64));

            prop_assert!((scaled - base * k as f64).abs() < base.abs() * 1e-9 + 1e-9);
        }

        /// Pack cost equals the sum of its independently priced lines
        #[test]
        fn prop_pack_cost_additive(
            mix in cost_strategy(),
            labor in cost_strategy(),
            pouch in cost_strategy(),
            unit in cost_strategy(),
            qty_r in 1u32..=5u32,
            qty_p in 1u32..=5u32
        ) {
            let recipe_line = PackRecipeCost {
                mix_cost_per_gram: mix,
                format_g: 100,
                labor_cost: labor,
                packaging_cost: pouch,
                quantity: qty_r,
            };
            let packaging_line = PackPackagingCost { unit_cost: unit, quantity: qty_p };

            let total = pack_cost(&[recipe_line.clone()], &[packaging_line.clone()]);
            let recipes_only = pack_cost(&[recipe_line], &[]);
            let packaging_only = pack_cost(&[], &[packaging_line]);

            prop_assert!((total - (recipes_only + packaging_only)).abs() < 1e-9);
        }
    }
}
