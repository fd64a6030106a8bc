//! Order service: drafts, cost snapshots, confirmation
//!
//! Confirmation is the one write point for line cost snapshots. The
//! sequence is: pure costing pass (no side effects), per-item locks in
//! sorted order, authoritative re-read, then a single atomic batch carrying
//! the sale movements, the updated stock items, and the confirmed order.
//! A failure anywhere before the batch leaves the order a draft and the
//! stock untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use shared::{
    validate_percent, validate_unit_price, IntegrityWarning, LineRef,
    MovementKind, Order, OrderLine, OrderStatus, OrderTotals, OrgId, Pack, Recipe, StockItem,
    StockMovement, WarningCode, WithWarnings,
};

use crate::error::{AppError, AppResult};
use crate::external::AuditSink;
use crate::services::costing;
use crate::services::packaging::{self, MatchMethod, SACHET_CATEGORY};
use crate::services::pricing;
use crate::services::settings::SettingsService;
use crate::services::stock::StockService;
use crate::store::{collections, encode, load, load_all, Store, WriteOp};

/// Order service
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    audit: Arc<dyn AuditSink>,
    stock: StockService,
    settings: SettingsService,
}

/// Input for one order line
#[derive(Debug, Deserialize)]
pub struct OrderLineInput {
    pub reference: LineRef,
    pub quantity: u32,
    pub unit_price: f64,
}

/// Input for creating a draft order
#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub customer_name: String,
    pub channel: Option<String>,
    pub lines: Vec<OrderLineInput>,
    pub shipping_cost: Option<f64>,
    pub discount: Option<f64>,
    pub platform_fee_percent: Option<f64>,
}

/// Input for editing draft order headers
#[derive(Debug, Deserialize)]
pub struct UpdateOrderInput {
    pub customer_name: Option<String>,
    pub channel: Option<Option<String>>,
    pub shipping_cost: Option<f64>,
    pub discount: Option<f64>,
    pub platform_fee_percent: Option<f64>,
}

/// Input for editing one draft line
#[derive(Debug, Deserialize)]
pub struct UpdateOrderLineInput {
    pub quantity: Option<u32>,
    pub unit_price: Option<f64>,
}

/// Per-line result of the pure costing pass
struct LineCosting {
    unit_material_cost: f64,
    unit_packaging_cost: f64,
    /// Total base units consumed by the whole line, per stock item
    consumptions: Vec<(Uuid, f64)>,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn Store>,
        audit: Arc<dyn AuditSink>,
        stock: StockService,
        settings: SettingsService,
    ) -> Self {
        Self {
            store,
            audit,
            stock,
            settings,
        }
    }

    pub async fn create_draft(&self, org_id: OrgId, input: CreateOrderInput) -> AppResult<Order> {
        if input.customer_name.trim().is_empty() {
            return Err(AppError::validation("customer_name", "Customer is required"));
        }
        let settings = self.settings.get(org_id).await?;

        let mut lines = Vec::with_capacity(input.lines.len());
        for line in input.lines {
            lines.push(build_line(line)?);
        }

        let shipping_cost = input
            .shipping_cost
            .unwrap_or(settings.default_shipping_cost);
        let platform_fee_percent = input
            .platform_fee_percent
            .unwrap_or(settings.platform_fee_percent);
        validate_unit_price(shipping_cost)
            .map_err(|msg| AppError::validation("shipping_cost", msg))?;
        validate_unit_price(input.discount.unwrap_or(0.0))
            .map_err(|msg| AppError::validation("discount", msg))?;
        validate_percent(platform_fee_percent)
            .map_err(|msg| AppError::validation("platform_fee_percent", msg))?;

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            org_id,
            customer_name: input.customer_name,
            channel: input.channel,
            status: OrderStatus::Draft,
            lines,
            shipping_cost,
            discount: input.discount.unwrap_or(0.0),
            platform_fee_percent,
            totals: None,
            confirmed_at: None,
            created_at: now,
            updated_at: now,
        };

        self.save(org_id, &order).await?;
        self.audit
            .log(org_id, "create", "order", order.id, &order.customer_name);
        Ok(order)
    }

    pub async fn get(&self, org_id: OrgId, order_id: Uuid) -> AppResult<Order> {
        load(
            self.store.as_ref(),
            org_id,
            collections::ORDERS,
            order_id,
            "Order",
        )
        .await
    }

    pub async fn list(&self, org_id: OrgId) -> AppResult<Vec<Order>> {
        let mut orders: Vec<Order> =
            load_all(self.store.as_ref(), org_id, collections::ORDERS).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    pub async fn update(
        &self,
        org_id: OrgId,
        order_id: Uuid,
        input: UpdateOrderInput,
    ) -> AppResult<Order> {
        let mut order = self.draft(org_id, order_id).await?;

        if let Some(customer_name) = input.customer_name {
            if customer_name.trim().is_empty() {
                return Err(AppError::validation("customer_name", "Customer is required"));
            }
            order.customer_name = customer_name;
        }
        if let Some(channel) = input.channel {
            order.channel = channel;
        }
        if let Some(shipping_cost) = input.shipping_cost {
            validate_unit_price(shipping_cost)
                .map_err(|msg| AppError::validation("shipping_cost", msg))?;
            order.shipping_cost = shipping_cost;
        }
        if let Some(discount) = input.discount {
            validate_unit_price(discount)
                .map_err(|msg| AppError::validation("discount", msg))?;
            order.discount = discount;
        }
        if let Some(fee) = input.platform_fee_percent {
            validate_percent(fee)
                .map_err(|msg| AppError::validation("platform_fee_percent", msg))?;
            order.platform_fee_percent = fee;
        }
        order.updated_at = Utc::now();

        self.save(org_id, &order).await?;
        Ok(order)
    }

    pub async fn add_line(
        &self,
        org_id: OrgId,
        order_id: Uuid,
        input: OrderLineInput,
    ) -> AppResult<Order> {
        let mut order = self.draft(org_id, order_id).await?;
        order.lines.push(build_line(input)?);
        order.updated_at = Utc::now();
        self.save(org_id, &order).await?;
        Ok(order)
    }

    pub async fn update_line(
        &self,
        org_id: OrgId,
        order_id: Uuid,
        line_id: Uuid,
        input: UpdateOrderLineInput,
    ) -> AppResult<Order> {
        let mut order = self.draft(org_id, order_id).await?;
        let line = order
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| AppError::NotFound("Order line".to_string()))?;

        if let Some(quantity) = input.quantity {
            if quantity == 0 {
                return Err(AppError::validation("quantity", "Quantity must be positive"));
            }
            line.quantity = quantity;
        }
        if let Some(unit_price) = input.unit_price {
            validate_unit_price(unit_price)
                .map_err(|msg| AppError::validation("unit_price", msg))?;
            line.unit_price = unit_price;
        }
        order.updated_at = Utc::now();
        self.save(org_id, &order).await?;
        Ok(order)
    }

    pub async fn remove_line(
        &self,
        org_id: OrgId,
        order_id: Uuid,
        line_id: Uuid,
    ) -> AppResult<Order> {
        let mut order = self.draft(org_id, order_id).await?;
        let before = order.lines.len();
        order.lines.retain(|l| l.id != line_id);
        if order.lines.len() == before {
            return Err(AppError::NotFound("Order line".to_string()));
        }
        order.updated_at = Utc::now();
        self.save(org_id, &order).await?;
        Ok(order)
    }

    /// Drafts can be discarded; confirmed orders are history and cannot
    pub async fn delete(&self, org_id: OrgId, order_id: Uuid) -> AppResult<()> {
        let order = self.get(org_id, order_id).await?;
        if order.status.is_locked() {
            return Err(AppError::InvalidStateTransition(
                "Only draft orders can be deleted".to_string(),
            ));
        }
        self.store
            .delete(org_id, collections::ORDERS, order_id)
            .await?;
        self.audit
            .log(org_id, "delete", "order", order_id, "draft discarded");
        Ok(())
    }

    /// Status bookkeeping after confirmation. Draft -> Confirmed never goes
    /// through here: that transition is `confirm` and nothing else.
    pub async fn update_status(
        &self,
        org_id: OrgId,
        order_id: Uuid,
        status: OrderStatus,
    ) -> AppResult<Order> {
        let mut order = self.get(org_id, order_id).await?;
        if order.status == OrderStatus::Draft {
            return Err(AppError::InvalidStateTransition(
                "Draft orders are confirmed, not status-updated".to_string(),
            ));
        }
        if !order.status.can_transition_to(status) {
            return Err(AppError::InvalidStateTransition(format!(
                "{} -> {}",
                order.status.as_str(),
                status.as_str()
            )));
        }
        order.status = status;
        order.updated_at = Utc::now();
        self.save(org_id, &order).await?;
        self.audit
            .log(org_id, status.as_str(), "order", order.id, "status updated");
        Ok(order)
    }

    /// Confirm a draft order: freeze per-line cost snapshots at current
    /// stock costs, deduct the consumed stock, aggregate profitability, and
    /// lock the order. Everything lands in one committed batch.
    ///
    /// Not idempotent: the Draft precondition is the only guard against
    /// double deduction. Callers must not retry a confirmed order.
    pub async fn confirm(&self, org_id: OrgId, order_id: Uuid) -> AppResult<WithWarnings<Order>> {
        let mut order = self.get(org_id, order_id).await?;
        if order.status != OrderStatus::Draft {
            return Err(AppError::InvalidStateTransition(format!(
                "Order is {}, only drafts can be confirmed",
                order.status.as_str()
            )));
        }
        if order.lines.is_empty() {
            return Err(AppError::InvalidStateTransition(
                "Cannot confirm an order without lines".to_string(),
            ));
        }

        // Discovery pass: validates every reference and finds the items to
        // lock. Pure, nothing written yet.
        let mut warnings = Vec::new();
        let discovered = self.cost_lines(org_id, &order.lines, &mut warnings).await?;
        let mut item_ids: Vec<Uuid> = discovered
            .iter()
            .flat_map(|c| c.consumptions.iter().map(|(id, _)| *id))
            .collect();
        item_ids.sort();
        item_ids.dedup();

        // Lock every touched item in sorted order, then re-cost against the
        // now-stable stock state.
        let mut guards = Vec::with_capacity(item_ids.len());
        for item_id in &item_ids {
            guards.push(self.stock.item_lock(*item_id).await.lock_owned().await);
        }
        let mut warnings = Vec::new();
        let costings = self.cost_lines(org_id, &order.lines, &mut warnings).await?;

        // Freeze the snapshots: the only write point for these fields
        let now = Utc::now();
        for (line, costing) in order.lines.iter_mut().zip(&costings) {
            line.unit_material_cost = Some(costing.unit_material_cost);
            line.unit_packaging_cost = Some(costing.unit_packaging_cost);
            line.unit_total_cost =
                Some(costing.unit_material_cost + costing.unit_packaging_cost);
        }

        // Aggregate consumption per item and build the deduction batch
        let mut consumed: BTreeMap<Uuid, f64> = BTreeMap::new();
        for costing in &costings {
            for (item_id, quantity) in &costing.consumptions {
                *consumed.entry(*item_id).or_insert(0.0) += quantity;
            }
        }

        let mut writes = Vec::with_capacity(consumed.len() * 2 + 1);
        for (item_id, quantity) in &consumed {
            let mut item = self.stock.get_item(org_id, *item_id).await?;
            item.current_quantity -= quantity;
            item.updated_at = now;
            if item.current_quantity < 0.0 {
                tracing::warn!(
                    item_id = %item.id,
                    quantity = item.current_quantity,
                    order_id = %order.id,
                    "stock went negative on confirmation"
                );
                warnings.push(IntegrityWarning::new(
                    WarningCode::NegativeStock,
                    "stock_item",
                    Some(item.id),
                    format!("'{}' went to {:.3} on confirmation", item.name, item.current_quantity),
                ));
            }

            let movement = StockMovement {
                id: Uuid::new_v4(),
                org_id,
                item_id: *item_id,
                kind: MovementKind::Sale,
                quantity_delta: -quantity,
                unit_cost: None,
                reason: Some(format!("order {} confirmation", order.id)),
                order_id: Some(order.id),
                created_at: now,
            };
            writes.push(WriteOp::new(
                collections::STOCK_MOVEMENTS,
                movement.id,
                encode(&movement, collections::STOCK_MOVEMENTS)?,
            ));
            writes.push(WriteOp::new(
                collections::STOCK_ITEMS,
                item.id,
                encode(&item, collections::STOCK_ITEMS)?,
            ));
        }

        // Order-level aggregates from the frozen line snapshots
        let cogs_materials: f64 = order
            .lines
            .iter()
            .map(|l| l.unit_material_cost.unwrap_or(0.0) * l.quantity as f64)
            .sum();
        let cogs_packaging: f64 = order
            .lines
            .iter()
            .map(|l| l.unit_packaging_cost.unwrap_or(0.0) * l.quantity as f64)
            .sum();
        let revenue: f64 =
            order.lines.iter().map(OrderLine::line_revenue).sum::<f64>() - order.discount;
        let platform_fee = revenue * order.platform_fee_percent / 100.0;
        let settings = self.settings.get(org_id).await?;
        let vat = revenue * settings.vat_percent / 100.0;
        let total_cost = cogs_materials + cogs_packaging + order.shipping_cost + platform_fee;
        let profit = pricing::margin(revenue, total_cost);

        order.totals = Some(OrderTotals {
            cogs_materials,
            cogs_packaging,
            revenue,
            platform_fee,
            vat,
            net_profit: profit.amount,
            margin_percent: profit.percent,
        });
        order.status = OrderStatus::Confirmed;
        order.confirmed_at = Some(now);
        order.updated_at = now;

        writes.push(WriteOp::new(
            collections::ORDERS,
            order.id,
            encode(&order, collections::ORDERS)?,
        ));

        // Single commit point: snapshots, deductions, and status together
        self.store.upsert_many(org_id, writes).await?;
        drop(guards);

        self.audit.log(
            org_id,
            "confirm",
            "order",
            order.id,
            &format!("{} lines, {} items deducted", order.lines.len(), consumed.len()),
        );
        Ok(WithWarnings::new(order, warnings))
    }

    /// Pure costing pass over all lines against current stock. Missing
    /// referenced entities are fatal here, before anything is written.
    async fn cost_lines(
        &self,
        org_id: OrgId,
        lines: &[OrderLine],
        warnings: &mut Vec<IntegrityWarning>,
    ) -> AppResult<Vec<LineCosting>> {
        let stock: Vec<StockItem> =
            load_all(self.store.as_ref(), org_id, collections::STOCK_ITEMS).await?;

        let mut costings = Vec::with_capacity(lines.len());
        for line in lines {
            let costing = match &line.reference {
                LineRef::Recipe {
                    recipe_id,
                    format_g,
                } => {
                    let recipe: Recipe = load(
                        self.store.as_ref(),
                        org_id,
                        collections::RECIPES,
                        *recipe_id,
                        "Recipe",
                    )
                    .await?;
                    self.cost_recipe_unit(&recipe, *format_g, 1, &stock, warnings)?
                }
                LineRef::Pack { pack_id } => {
                    let pack: Pack = load(
                        self.store.as_ref(),
                        org_id,
                        collections::PACKS,
                        *pack_id,
                        "Pack",
                    )
                    .await?;
                    let mut material = 0.0;
                    let mut packaging = 0.0;
                    let mut consumptions = Vec::new();
                    for recipe_line in &pack.recipe_lines {
                        let recipe: Recipe = load(
                            self.store.as_ref(),
                            org_id,
                            collections::RECIPES,
                            recipe_line.recipe_id,
                            "Recipe",
                        )
                        .await?;
                        let unit = self.cost_recipe_unit(
                            &recipe,
                            recipe_line.format_g,
                            recipe_line.quantity,
                            &stock,
                            warnings,
                        )?;
                        material += unit.unit_material_cost * recipe_line.quantity as f64;
                        packaging += unit.unit_packaging_cost * recipe_line.quantity as f64;
                        consumptions.extend(unit.consumptions);
                    }
                    for packaging_line in &pack.packaging_lines {
                        let item = find_item(&stock, packaging_line.item_id, "Packaging item")?;
                        packaging +=
                            item.weighted_average_cost * packaging_line.quantity as f64;
                        consumptions.push((item.id, packaging_line.quantity as f64));
                    }
                    LineCosting {
                        unit_material_cost: material,
                        unit_packaging_cost: packaging,
                        consumptions,
                    }
                }
                LineRef::Accessory { item_id } => {
                    let item = find_item(&stock, *item_id, "Accessory")?;
                    LineCosting {
                        unit_material_cost: item.weighted_average_cost,
                        unit_packaging_cost: 0.0,
                        consumptions: vec![(item.id, 1.0)],
                    }
                }
            };

            // Scale per-unit consumption by the line quantity
            let quantity = line.quantity as f64;
            costings.push(LineCosting {
                unit_material_cost: costing.unit_material_cost,
                unit_packaging_cost: costing.unit_packaging_cost,
                consumptions: costing
                    .consumptions
                    .into_iter()
                    .map(|(id, q)| (id, q * quantity))
                    .collect(),
            });
        }
        Ok(costings)
    }

    /// Cost and consumption of `units` sold units of a recipe at a format,
    /// per single enclosing unit. Ingredient costs come from current WACs,
    /// consumption from the composition percentages.
    fn cost_recipe_unit(
        &self,
        recipe: &Recipe,
        format_g: u32,
        units: u32,
        stock: &[StockItem],
        warnings: &mut Vec<IntegrityWarning>,
    ) -> AppResult<LineCosting> {
        let mut wacs = Vec::with_capacity(recipe.items.len());
        for mix_item in &recipe.items {
            let item = find_item(stock, mix_item.ingredient_id, "Ingredient")?;
            wacs.push((item.id, item.weighted_average_cost));
        }
        let mix_cost = costing::mix_cost_per_gram(&recipe.items, |id| {
            wacs.iter()
                .find(|(item_id, _)| *item_id == id)
                .map(|(_, wac)| *wac)
                .unwrap_or(0.0)
        });

        let matched = packaging::match_packaging(stock, format_g, SACHET_CATEGORY);
        warnings.extend(matched.warnings.clone());
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

        let mut consumptions: Vec<(Uuid, f64)> = recipe
            .items
            .iter()
            .map(|mix_item| {
                (
                    mix_item.ingredient_id,
                    format_g as f64 * mix_item.percent / 100.0 * units as f64,
                )
            })
            .collect();
        if let Some(pouch) = matched.item {
            consumptions.push((pouch.id, units as f64));
        }

        Ok(LineCosting {
            unit_material_cost: mix_cost * format_g as f64 + recipe.labor_cost,
            unit_packaging_cost: matched.unit_cost(),
            consumptions,
        })
    }

    async fn draft(&self, org_id: OrgId, order_id: Uuid) -> AppResult<Order> {
        let order = self.get(org_id, order_id).await?;
        if order.status.is_locked() {
            return Err(AppError::InvalidStateTransition(format!(
                "Order is {}; its lines and snapshots are locked",
                order.status.as_str()
            )));
        }
        Ok(order)
    }

    async fn save(&self, org_id: OrgId, order: &Order) -> AppResult<()> {
        self.store
            .upsert(
                org_id,
                collections::ORDERS,
                order.id,
                encode(order, collections::ORDERS)?,
            )
            .await
    }
}

fn build_line(input: OrderLineInput) -> AppResult<OrderLine> {
    if input.quantity == 0 {
        return Err(AppError::validation("quantity", "Quantity must be positive"));
    }
    validate_unit_price(input.unit_price)
        .map_err(|msg| AppError::validation("unit_price", msg))?;
    Ok(OrderLine {
        id: Uuid::new_v4(),
        reference: input.reference,
        quantity: input.quantity,
        unit_price: input.unit_price,
        unit_material_cost: None,
        unit_packaging_cost: None,
        unit_total_cost: None,
    })
}

fn find_item<'a>(stock: &'a [StockItem], item_id: Uuid, entity: &str) -> AppResult<&'a StockItem> {
    stock
        .iter()
        .find(|item| item.id == item_id)
        .ok_or_else(|| AppError::NotFound(entity.to_string()))
}
