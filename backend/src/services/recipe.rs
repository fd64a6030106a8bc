//! Recipe service: blends, cached mix costs, per-format costing
//!
//! The cached `mix_cost_per_gram` is a memoized pure function of the
//! composition and current ingredient WACs. It is recomputed on every
//! composition write (never patched incrementally) and is not authoritative
//! for history; confirmed order snapshots are.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::{
    percents_sum_to_100, validate_format, validate_percent, validate_unit_price, CostBasis,
    FormatPrice, IntegrityWarning, MixItem, OrgId, Recipe, StockItem, WarningCode, WithWarnings,
};

use crate::error::{AppError, AppResult};
use crate::external::AuditSink;
use crate::services::costing;
use crate::services::packaging::{self, MatchMethod, SACHET_CATEGORY};
use crate::services::pricing::{self, Margin};
use crate::store::{collections, encode, load, load_all, load_opt, Store};

/// Recipe service
#[derive(Clone)]
pub struct RecipeService {
    store: Arc<dyn Store>,
    audit: Arc<dyn AuditSink>,
}

/// Input for creating a recipe
#[derive(Debug, Deserialize)]
pub struct CreateRecipeInput {
    pub name: String,
    pub items: Vec<MixItem>,
    pub labor_cost: f64,
    pub format_prices: Vec<FormatPrice>,
}

/// Input for updating a recipe
#[derive(Debug, Deserialize)]
pub struct UpdateRecipeInput {
    pub name: Option<String>,
    pub items: Option<Vec<MixItem>>,
    pub labor_cost: Option<f64>,
    pub format_prices: Option<Vec<FormatPrice>>,
}

/// Cost breakdown of one sold unit at a given format
#[derive(Debug, Clone, Serialize)]
pub struct RecipeFormatCosting {
    pub recipe_id: Uuid,
    pub format_g: u32,
    pub mix_cost_per_gram: f64,
    pub packaging_cost: f64,
    pub packaging_method: MatchMethod,
    pub labor_cost: f64,
    pub unit_cost: f64,
    pub sale_price: Option<f64>,
    pub margin: Option<Margin>,
}

impl RecipeService {
    pub fn new(store: Arc<dyn Store>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    pub async fn create(
        &self,
        org_id: OrgId,
        input: CreateRecipeInput,
    ) -> AppResult<WithWarnings<Recipe>> {
        if input.name.trim().is_empty() {
            return Err(AppError::validation("name", "Name is required"));
        }
        validate_composition(&input.items)?;
        validate_fixed_costs(input.labor_cost, &input.format_prices)?;

        let mix_cost = self.compute_mix_cost(org_id, &input.items).await?;
        let warnings = composition_warnings(&input.items, None);

        let now = Utc::now();
        let recipe = Recipe {
            id: Uuid::new_v4(),
            org_id,
            name: input.name,
            items: input.items,
            labor_cost: input.labor_cost,
            mix_cost_per_gram: mix_cost,
            format_prices: input.format_prices,
            created_at: now,
            updated_at: now,
        };

        self.save(org_id, &recipe).await?;
        self.audit
            .log(org_id, "create", "recipe", recipe.id, &recipe.name);
        Ok(WithWarnings::new(recipe, warnings))
    }

    pub async fn get(&self, org_id: OrgId, recipe_id: Uuid) -> AppResult<Recipe> {
        load(
            self.store.as_ref(),
            org_id,
            collections::RECIPES,
            recipe_id,
            "Recipe",
        )
        .await
    }

    pub async fn list(&self, org_id: OrgId) -> AppResult<Vec<Recipe>> {
        let mut recipes: Vec<Recipe> =
            load_all(self.store.as_ref(), org_id, collections::RECIPES).await?;
        recipes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(recipes)
    }

    pub async fn update(
        &self,
        org_id: OrgId,
        recipe_id: Uuid,
        input: UpdateRecipeInput,
    ) -> AppResult<WithWarnings<Recipe>> {
        let mut recipe = self.get(org_id, recipe_id).await?;

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(AppError::validation("name", "Name is required"));
            }
            recipe.name = name;
        }
        if let Some(labor_cost) = input.labor_cost {
            recipe.labor_cost = labor_cost;
        }
        if let Some(format_prices) = input.format_prices {
            recipe.format_prices = format_prices;
        }
        validate_fixed_costs(recipe.labor_cost, &recipe.format_prices)?;

        if let Some(items) = input.items {
            validate_composition(&items)?;
            recipe.items = items;
            // Composition changed: recompute the cached mix cost
            recipe.mix_cost_per_gram = self.compute_mix_cost(org_id, &recipe.items).await?;
        }
        recipe.updated_at = Utc::now();

        let warnings = composition_warnings(&recipe.items, Some(recipe.id));
        self.save(org_id, &recipe).await?;
        self.audit
            .log(org_id, "update", "recipe", recipe.id, &recipe.name);
        Ok(WithWarnings::new(recipe, warnings))
    }

    pub async fn delete(&self, org_id: OrgId, recipe_id: Uuid) -> AppResult<()> {
        let removed = self
            .store
            .delete(org_id, collections::RECIPES, recipe_id)
            .await?;
        if !removed {
            return Err(AppError::NotFound("Recipe".to_string()));
        }
        self.audit
            .log(org_id, "delete", "recipe", recipe_id, "recipe deleted");
        Ok(())
    }

    /// Recompute the cached mix cost from current ingredient WACs, e.g.
    /// after purchases have moved them.
    pub async fn refresh_cost(&self, org_id: OrgId, recipe_id: Uuid) -> AppResult<Recipe> {
        let mut recipe = self.get(org_id, recipe_id).await?;
        recipe.mix_cost_per_gram = self.compute_mix_cost(org_id, &recipe.items).await?;
        recipe.updated_at = Utc::now();
        self.save(org_id, &recipe).await?;
        Ok(recipe)
    }

    /// Full unit cost of one sold unit at `format_g`, with pouch packaging
    /// resolved through the matcher. An unmatched pouch degrades to zero
    /// cost and is surfaced as a warning, never an error.
    pub async fn format_costing(
        &self,
        org_id: OrgId,
        recipe_id: Uuid,
        format_g: u32,
    ) -> AppResult<WithWarnings<RecipeFormatCosting>> {
        validate_format(format_g).map_err(|msg| AppError::validation("format_g", msg))?;
        let recipe = self.get(org_id, recipe_id).await?;
        let mix_cost = self.compute_mix_cost(org_id, &recipe.items).await?;

        let candidates: Vec<StockItem> =
            load_all(self.store.as_ref(), org_id, collections::STOCK_ITEMS).await?;
        let matched = packaging::match_packaging(&candidates, format_g, SACHET_CATEGORY);
        let mut warnings = matched.warnings.clone();
        if matched.method == MatchMethod::None {
            warnings.push(IntegrityWarning::new(
                WarningCode::PackagingUnmatched,
                "recipe",
                Some(recipe.id),
                format!(
                    "no {SACHET_CATEGORY} packaging matches format {format_g}g; packaging cost counted as 0"
                ),
            ));
        }

        let packaging_cost = matched.unit_cost();
        let unit_cost =
            costing::recipe_unit_cost(mix_cost, format_g, packaging_cost, recipe.labor_cost, 0.0);
        let sale_price = recipe.price_for_format(format_g);
        let margin = sale_price.map(|price| pricing::margin(price, unit_cost));

        Ok(WithWarnings::new(
            RecipeFormatCosting {
                recipe_id: recipe.id,
                format_g,
                mix_cost_per_gram: mix_cost,
                packaging_cost,
                packaging_method: matched.method,
                labor_cost: recipe.labor_cost,
                unit_cost,
                sale_price,
                margin,
            },
            warnings,
        ))
    }

    /// Mix cost per gram from current ingredient WACs. Fails with NotFound
    /// when an ingredient is missing and rejects non-bulk references.
    async fn compute_mix_cost(&self, org_id: OrgId, items: &[MixItem]) -> AppResult<f64> {
        let mut costs = Vec::with_capacity(items.len());
        for mix_item in items {
            let item: Option<StockItem> = load_opt(
                self.store.as_ref(),
                org_id,
                collections::STOCK_ITEMS,
                mix_item.ingredient_id,
            )
            .await?;
            let item = item.ok_or_else(|| AppError::NotFound("Ingredient".to_string()))?;
            if item.cost_basis() != CostBasis::BulkByMass {
                return Err(AppError::validation(
                    "items",
                    format!("'{}' is not a bulk ingredient", item.name),
                ));
            }
            costs.push((mix_item.ingredient_id, item.weighted_average_cost));
        }
        Ok(costing::mix_cost_per_gram(items, |id| {
            costs
                .iter()
                .find(|(item_id, _)| *item_id == id)
                .map(|(_, cost)| *cost)
                .unwrap_or(0.0)
        }))
    }

    async fn save(&self, org_id: OrgId, recipe: &Recipe) -> AppResult<()> {
        self.store
            .upsert(
                org_id,
                collections::RECIPES,
                recipe.id,
                encode(recipe, collections::RECIPES)?,
            )
            .await
    }
}

fn validate_composition(items: &[MixItem]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::validation(
            "items",
            "A recipe needs at least one ingredient",
        ));
    }
    for item in items {
        validate_percent(item.percent).map_err(|msg| AppError::validation("items", msg))?;
    }
    Ok(())
}

fn validate_fixed_costs(labor_cost: f64, format_prices: &[FormatPrice]) -> AppResult<()> {
    validate_unit_price(labor_cost).map_err(|msg| AppError::validation("labor_cost", msg))?;
    for fp in format_prices {
        validate_format(fp.format_g).map_err(|msg| AppError::validation("format_prices", msg))?;
        validate_unit_price(fp.price)
            .map_err(|msg| AppError::validation("format_prices", msg))?;
    }
    Ok(())
}

/// Soft invariant: bulk percentages should sum to 100. Reported, not
/// enforced, so recipes can be saved mid-edit.
fn composition_warnings(items: &[MixItem], recipe_id: Option<Uuid>) -> Vec<IntegrityWarning> {
    let percents: Vec<f64> = items.iter().map(|i| i.percent).collect();
    if percents_sum_to_100(&percents) {
        return Vec::new();
    }
    let total: f64 = percents.iter().sum();
    vec![IntegrityWarning::new(
        WarningCode::PercentSumOff,
        "recipe",
        recipe_id,
        format!("ingredient percentages sum to {total:.2}, expected 100"),
    )]
}
