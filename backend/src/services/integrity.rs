//! Data-integrity audit pass
//!
//! Warning-only: the scan reports drift and dangling references, it never
//! blocks or repairs anything. Run it periodically or after imports.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use shared::{
    percents_sum_to_100, IntegrityWarning, OrgId, Pack, Recipe, StockCategory, StockItem,
    StockMovement, WarningCode,
};

use crate::error::AppResult;
use crate::services::stock::purchase_wac;
use crate::store::{collections, load_all, Store};

const QUANTITY_TOLERANCE: f64 = 1e-6;
const COST_TOLERANCE: f64 = 1e-9;

/// Integrity scan service
#[derive(Clone)]
pub struct IntegrityService {
    store: Arc<dyn Store>,
}

impl IntegrityService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Full scan of one organization's data
    pub async fn scan(&self, org_id: OrgId) -> AppResult<Vec<IntegrityWarning>> {
        let items: Vec<StockItem> =
            load_all(self.store.as_ref(), org_id, collections::STOCK_ITEMS).await?;
        let movements: Vec<StockMovement> =
            load_all(self.store.as_ref(), org_id, collections::STOCK_MOVEMENTS).await?;
        let recipes: Vec<Recipe> =
            load_all(self.store.as_ref(), org_id, collections::RECIPES).await?;
        let packs: Vec<Pack> = load_all(self.store.as_ref(), org_id, collections::PACKS).await?;

        let mut warnings = Vec::new();
        check_stock(&items, &movements, &mut warnings);
        check_recipes(&recipes, &items, &mut warnings);
        check_packs(&packs, &recipes, &items, &mut warnings);
        Ok(warnings)
    }
}

fn check_stock(
    items: &[StockItem],
    movements: &[StockMovement],
    warnings: &mut Vec<IntegrityWarning>,
) {
    let mut by_item: HashMap<Uuid, Vec<&StockMovement>> = HashMap::new();
    for movement in movements {
        by_item.entry(movement.item_id).or_default().push(movement);
    }

    for item in items {
        if item.current_quantity < -QUANTITY_TOLERANCE {
            warnings.push(IntegrityWarning::new(
                WarningCode::NegativeStock,
                "stock_item",
                Some(item.id),
                format!("'{}' holds {:.3} (negative)", item.name, item.current_quantity),
            ));
        }

        if item.category == StockCategory::Packaging && item.capacity_g.is_none() {
            warnings.push(IntegrityWarning::new(
                WarningCode::MissingCapacity,
                "stock_item",
                Some(item.id),
                format!("packaging '{}' has no capacity; matching falls back to names", item.name),
            ));
        }

        // Replay the full ledger: stored quantity and WAC must agree with it
        let mut ledger: Vec<&StockMovement> = by_item.remove(&item.id).unwrap_or_default();
        ledger.sort_by_key(|m| m.created_at);
        let mut quantity = 0.0;
        let mut wac = 0.0;
        for movement in ledger {
            if let Some(cost) = movement.unit_cost {
                wac = purchase_wac(quantity, wac, movement.quantity_delta, cost);
            }
            quantity += movement.quantity_delta;
        }

        if (quantity - item.current_quantity).abs() > QUANTITY_TOLERANCE {
            warnings.push(IntegrityWarning::new(
                WarningCode::LedgerDrift,
                "stock_item",
                Some(item.id),
                format!(
                    "'{}' stores quantity {:.3} but its ledger replays to {:.3}",
                    item.name, item.current_quantity, quantity
                ),
            ));
        }
        if (wac - item.weighted_average_cost).abs() > COST_TOLERANCE {
            warnings.push(IntegrityWarning::new(
                WarningCode::LedgerDrift,
                "stock_item",
                Some(item.id),
                format!(
                    "'{}' stores WAC {:.6} but its ledger replays to {:.6}",
                    item.name, item.weighted_average_cost, wac
                ),
            ));
        }
    }

    // Movements pointing at deleted items
    for (item_id, orphaned) in by_item {
        warnings.push(IntegrityWarning::new(
            WarningCode::OrphanReference,
            "stock_movement",
            Some(item_id),
            format!("{} movements reference a deleted stock item", orphaned.len()),
        ));
    }
}

fn check_recipes(recipes: &[Recipe], items: &[StockItem], warnings: &mut Vec<IntegrityWarning>) {
    for recipe in recipes {
        for mix_item in &recipe.items {
            if !items.iter().any(|i| i.id == mix_item.ingredient_id) {
                warnings.push(IntegrityWarning::new(
                    WarningCode::OrphanReference,
                    "recipe",
                    Some(recipe.id),
                    format!(
                        "recipe '{}' references deleted ingredient {}",
                        recipe.name, mix_item.ingredient_id
                    ),
                ));
            }
        }

        let percents: Vec<f64> = recipe.items.iter().map(|i| i.percent).collect();
        if !percents_sum_to_100(&percents) {
            let total: f64 = percents.iter().sum();
            warnings.push(IntegrityWarning::new(
                WarningCode::PercentSumOff,
                "recipe",
                Some(recipe.id),
                format!(
                    "recipe '{}' percentages sum to {total:.2}, expected 100",
                    recipe.name
                ),
            ));
        }
    }
}

fn check_packs(
    packs: &[Pack],
    recipes: &[Recipe],
    items: &[StockItem],
    warnings: &mut Vec<IntegrityWarning>,
) {
    for pack in packs {
        for line in &pack.recipe_lines {
            if !recipes.iter().any(|r| r.id == line.recipe_id) {
                warnings.push(IntegrityWarning::new(
                    WarningCode::OrphanReference,
                    "pack",
                    Some(pack.id),
                    format!("pack '{}' references deleted recipe {}", pack.name, line.recipe_id),
                ));
            }
        }
        for line in &pack.packaging_lines {
            if !items.iter().any(|i| i.id == line.item_id) {
                warnings.push(IntegrityWarning::new(
                    WarningCode::OrphanReference,
                    "pack",
                    Some(pack.id),
                    format!(
                        "pack '{}' references deleted packaging item {}",
                        pack.name, line.item_id
                    ),
                ));
            }
        }
    }
}
