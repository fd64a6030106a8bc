//! Cost roll-up: ingredient mix -> recipe unit -> pack
//!
//! Pure functions over already-loaded numbers. Stock lookups, caching, and
//! persistence live in the recipe/pack/order services; this module is the
//! arithmetic they all share.

use uuid::Uuid;

use shared::MixItem;

/// Cost of one gram of finished mix.
///
/// `cost_lookup` returns the per-gram cost of an ingredient. This is
/// cost-per-gram of mix, not cost-per-batch: percentages are mass shares of
/// the blend.
pub fn mix_cost_per_gram<F>(items: &[MixItem], mut cost_lookup: F) -> f64
where
    F: FnMut(Uuid) -> f64,
{
    items
        .iter()
        .map(|item| item.percent / 100.0 * cost_lookup(item.ingredient_id))
        .sum()
}

/// Full cost of one sold unit of a recipe at a given format.
///
/// `format_g` is the sale size in grams; `packaging_cost` is the resolved
/// pouch cost for that format (0 when unmatched).
pub fn recipe_unit_cost(
    mix_cost_per_gram: f64,
    format_g: u32,
    packaging_cost: f64,
    labor_cost: f64,
    overhead_cost: f64,
) -> f64 {
    mix_cost_per_gram * format_g as f64 + packaging_cost + labor_cost + overhead_cost
}

/// One recipe line of a pack, priced from the recipe's cached numbers
#[derive(Debug, Clone)]
pub struct PackRecipeCost {
    pub mix_cost_per_gram: f64,
    pub format_g: u32,
    pub labor_cost: f64,
    /// Pouch cost for this line's format
    pub packaging_cost: f64,
    pub quantity: u32,
}

/// One packaging line of a pack, priced from current stock cost
#[derive(Debug, Clone)]
pub struct PackPackagingCost {
    pub unit_cost: f64,
    pub quantity: u32,
}

/// Total cost of one pack.
///
/// Recipe lines reuse the recipes' cached mix costs and fixed costs rather
/// than re-deriving ingredient by ingredient; packaging items are leaves and
/// priced directly.
pub fn pack_cost(recipe_lines: &[PackRecipeCost], packaging_lines: &[PackPackagingCost]) -> f64 {
    let recipes: f64 = recipe_lines
        .iter()
        .map(|line| {
            recipe_unit_cost(
                line.mix_cost_per_gram,
                line.format_g,
                line.packaging_cost,
                line.labor_cost,
                0.0,
            ) * line.quantity as f64
        })
        .sum();

    let packaging: f64 = packaging_lines
        .iter()
        .map(|line| line.unit_cost * line.quantity as f64)
        .sum();

    recipes + packaging
}
