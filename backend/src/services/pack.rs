//! Pack service: bundles priced from cached recipe numbers
//!
//! A pack's recipe lines reuse the recipes' cached mix costs and fixed
//! costs, so pack costing is a cheap read of already-validated numbers
//! rather than a second copy of the roll-up. Packaging items are leaves
//! priced at current WAC.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use shared::{
    validate_unit_price, IntegrityWarning, OrgId, Pack, PackPackagingLine, PackRecipeLine, Recipe,
    StockItem, WarningCode, WithWarnings,
};

use crate::error::{AppError, AppResult};
use crate::external::AuditSink;
use crate::services::costing::{self, PackPackagingCost, PackRecipeCost};
use crate::services::packaging::{self, MatchMethod, SACHET_CATEGORY};
use crate::services::pricing;
use crate::store::{collections, encode, load, load_all, load_opt, Store};

/// Pack service
#[derive(Clone)]
pub struct PackService {
    store: Arc<dyn Store>,
    audit: Arc<dyn AuditSink>,
}

/// Input for creating a pack
#[derive(Debug, Deserialize)]
pub struct CreatePackInput {
    pub name: String,
    pub recipe_lines: Vec<PackRecipeLine>,
    pub packaging_lines: Vec<PackPackagingLine>,
    pub sale_price: f64,
}

/// Input for updating a pack
#[derive(Debug, Deserialize)]
pub struct UpdatePackInput {
    pub name: Option<String>,
    pub recipe_lines: Option<Vec<PackRecipeLine>>,
    pub packaging_lines: Option<Vec<PackPackagingLine>>,
    pub sale_price: Option<f64>,
}

impl PackService {
    pub fn new(store: Arc<dyn Store>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    pub async fn create(
        &self,
        org_id: OrgId,
        input: CreatePackInput,
    ) -> AppResult<WithWarnings<Pack>> {
        if input.name.trim().is_empty() {
            return Err(AppError::validation("name", "Name is required"));
        }
        if input.recipe_lines.is_empty() && input.packaging_lines.is_empty() {
            return Err(AppError::validation(
                "recipe_lines",
                "A pack needs at least one line",
            ));
        }
        validate_unit_price(input.sale_price)
            .map_err(|msg| AppError::validation("sale_price", msg))?;

        let costed = self
            .compute_cost(org_id, &input.recipe_lines, &input.packaging_lines)
            .await?;

        let now = Utc::now();
        let pack = Pack {
            id: Uuid::new_v4(),
            org_id,
            name: input.name,
            recipe_lines: input.recipe_lines,
            packaging_lines: input.packaging_lines,
            sale_price: input.sale_price,
            cost: costed.value,
            margin_percent: pricing::margin(input.sale_price, costed.value).percent,
            created_at: now,
            updated_at: now,
        };

        self.save(org_id, &pack).await?;
        self.audit.log(org_id, "create", "pack", pack.id, &pack.name);
        Ok(WithWarnings::new(pack, costed.warnings))
    }

    pub async fn get(&self, org_id: OrgId, pack_id: Uuid) -> AppResult<Pack> {
        load(
            self.store.as_ref(),
            org_id,
            collections::PACKS,
            pack_id,
            "Pack",
        )
        .await
    }

    pub async fn list(&self, org_id: OrgId) -> AppResult<Vec<Pack>> {
        let mut packs: Vec<Pack> =
            load_all(self.store.as_ref(), org_id, collections::PACKS).await?;
        packs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(packs)
    }

    pub async fn update(
        &self,
        org_id: OrgId,
        pack_id: Uuid,
        input: UpdatePackInput,
    ) -> AppResult<WithWarnings<Pack>> {
        let mut pack = self.get(org_id, pack_id).await?;

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(AppError::validation("name", "Name is required"));
            }
            pack.name = name;
        }
        if let Some(recipe_lines) = input.recipe_lines {
            pack.recipe_lines = recipe_lines;
        }
        if let Some(packaging_lines) = input.packaging_lines {
            pack.packaging_lines = packaging_lines;
        }
        if let Some(sale_price) = input.sale_price {
            validate_unit_price(sale_price)
                .map_err(|msg| AppError::validation("sale_price", msg))?;
            pack.sale_price = sale_price;
        }
        if pack.recipe_lines.is_empty() && pack.packaging_lines.is_empty() {
            return Err(AppError::validation(
                "recipe_lines",
                "A pack needs at least one line",
            ));
        }

        // Any write recomputes the cached cost/margin pair
        let costed = self
            .compute_cost(org_id, &pack.recipe_lines, &pack.packaging_lines)
            .await?;
        pack.cost = costed.value;
        pack.margin_percent = pricing::margin(pack.sale_price, pack.cost).percent;
        pack.updated_at = Utc::now();

        self.save(org_id, &pack).await?;
        self.audit.log(org_id, "update", "pack", pack.id, &pack.name);
        Ok(WithWarnings::new(pack, costed.warnings))
    }

    pub async fn delete(&self, org_id: OrgId, pack_id: Uuid) -> AppResult<()> {
        let removed = self
            .store
            .delete(org_id, collections::PACKS, pack_id)
            .await?;
        if !removed {
            return Err(AppError::NotFound("Pack".to_string()));
        }
        self.audit
            .log(org_id, "delete", "pack", pack_id, "pack deleted");
        Ok(())
    }

    /// Recompute the cached cost/margin from current recipe caches and
    /// packaging WACs.
    pub async fn refresh_cost(&self, org_id: OrgId, pack_id: Uuid) -> AppResult<WithWarnings<Pack>> {
        let pack = self.get(org_id, pack_id).await?;
        self.update(
            org_id,
            pack.id,
            UpdatePackInput {
                name: None,
                recipe_lines: None,
                packaging_lines: None,
                sale_price: None,
            },
        )
        .await
    }

    /// Price a pack composition. Missing recipes are an error; missing
    /// packaging items degrade to zero cost with an orphan warning.
    async fn compute_cost(
        &self,
        org_id: OrgId,
        recipe_lines: &[PackRecipeLine],
        packaging_lines: &[PackPackagingLine],
    ) -> AppResult<WithWarnings<f64>> {
        let mut warnings = Vec::new();

        let stock: Vec<StockItem> =
            load_all(self.store.as_ref(), org_id, collections::STOCK_ITEMS).await?;

        let mut recipe_costs = Vec::with_capacity(recipe_lines.len());
        for line in recipe_lines {
            let recipe: Recipe = load(
                self.store.as_ref(),
                org_id,
                collections::RECIPES,
                line.recipe_id,
                "Recipe",
            )
            .await?;

            let matched = packaging::match_packaging(&stock, line.format_g, SACHET_CATEGORY);
            warnings.extend(matched.warnings.clone());
            if matched.method == MatchMethod::None {
                warnings.push(IntegrityWarning::new(
                    WarningCode::PackagingUnmatched,
                    "recipe",
                    Some(recipe.id),
                    format!(
                        "no {SACHET_CATEGORY} packaging matches format {}g; counted as 0",
                        line.format_g
                    ),
                ));
            }

            recipe_costs.push(PackRecipeCost {
                mix_cost_per_gram: recipe.mix_cost_per_gram,
                format_g: line.format_g,
                labor_cost: recipe.labor_cost,
                packaging_cost: matched.unit_cost(),
                quantity: line.quantity,
            });
        }

        let mut packaging_costs = Vec::with_capacity(packaging_lines.len());
        for line in packaging_lines {
            let item: Option<StockItem> = load_opt(
                self.store.as_ref(),
                org_id,
                collections::STOCK_ITEMS,
                line.item_id,
            )
            .await?;
            match item {
                Some(item) => packaging_costs.push(PackPackagingCost {
                    unit_cost: item.weighted_average_cost,
                    quantity: line.quantity,
                }),
                None => warnings.push(IntegrityWarning::new(
                    WarningCode::OrphanReference,
                    "pack",
                    None,
                    format!("packaging item {} no longer exists; counted as 0", line.item_id),
                )),
            }
        }

        Ok(WithWarnings::new(
            costing::pack_cost(&recipe_costs, &packaging_costs),
            warnings,
        ))
    }

    async fn save(&self, org_id: OrgId, pack: &Pack) -> AppResult<()> {
        self.store
            .upsert(
                org_id,
                collections::PACKS,
                pack.id,
                encode(pack, collections::PACKS)?,
            )
            .await
    }
}
