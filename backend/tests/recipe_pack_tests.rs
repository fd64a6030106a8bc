//! Recipe and pack tests
//!
//! Cached mix costs, per-format costing through the pouch matcher, pack
//! roll-ups from cached recipe numbers, and the orphan handling around
//! deleted references.

use std::sync::Arc;

use uuid::Uuid;

use shared::{
    FormatPrice, MixItem, MovementKind, OrgId, PackPackagingLine, PackRecipeLine, StockCategory,
    WarningCode,
};
use tea_business_backend::external::{AuditSink, TracingAuditSink};
use tea_business_backend::services::packaging::MatchMethod;
use tea_business_backend::services::pack::{CreatePackInput, PackService};
use tea_business_backend::services::recipe::{CreateRecipeInput, RecipeService, UpdateRecipeInput};
use tea_business_backend::services::stock::{
    CreateStockItemInput, RecordMovementInput, StockService,
};
use tea_business_backend::services::IntegrityService;
use tea_business_backend::store::{MemoryStore, Store};

const EPS: f64 = 1e-9;

struct Env {
    org: OrgId,
    stock: StockService,
    recipes: RecipeService,
    packs: PackService,
    integrity: IntegrityService,
}

fn env() -> Env {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
    Env {
        org: OrgId::new(),
        stock: StockService::new(store.clone(), audit.clone()),
        recipes: RecipeService::new(store.clone(), audit.clone()),
        packs: PackService::new(store.clone(), audit),
        integrity: IntegrityService::new(store),
    }
}

async fn stocked_item(
    env: &Env,
    name: &str,
    category: StockCategory,
    subtype: Option<&str>,
    capacity_g: Option<u32>,
    quantity: f64,
    unit_price: f64,
) -> Uuid {
    let item = env
        .stock
        .create_item(
            env.org,
            CreateStockItemInput {
                name: name.to_string(),
                category,
                alert_threshold: None,
                capacity_g,
                subtype: subtype.map(String::from),
            },
        )
        .await
        .unwrap();
    env.stock
        .record_movement(
            env.org,
            RecordMovementInput {
                item_id: item.id,
                kind: MovementKind::Purchase,
                quantity,
                unit_price: Some(unit_price),
                reason: None,
                order_id: None,
            },
        )
        .await
        .unwrap();
    item.id
}

/// Tea at WAC 0.01/g and flowers at 0.05/g
async fn seed_ingredients(env: &Env) -> (Uuid, Uuid) {
    let tea = stocked_item(env, "Sencha", StockCategory::TeaBulk, None, None, 1000.0, 10.0).await;
    let flower = stocked_item(
        env,
        "Jasmine flowers",
        StockCategory::Ingredient,
        None,
        None,
        500.0,
        50.0,
    )
    .await;
    (tea, flower)
}

fn blend(tea: Uuid, flower: Uuid) -> Vec<MixItem> {
    vec![
        MixItem {
            ingredient_id: tea,
            percent: 90.0,
        },
        MixItem {
            ingredient_id: flower,
            percent: 10.0,
        },
    ]
}

/// Creation computes and caches the mix cost from current WACs
#[tokio::test]
async fn test_recipe_caches_mix_cost() {
    let env = env();
    let (tea, flower) = seed_ingredients(&env).await;

    let recipe = env
        .recipes
        .create(
            env.org,
            CreateRecipeInput {
                name: "Jasmine Sencha".to_string(),
                items: blend(tea, flower),
                labor_cost: 0.5,
                format_prices: vec![],
            },
        )
        .await
        .unwrap();

    assert!(recipe.warnings.is_empty());
    // 0.9 * 0.01 + 0.1 * 0.05
    assert!((recipe.value.mix_cost_per_gram - 0.014).abs() < EPS);
}

/// Unknown ingredients are rejected at creation
#[tokio::test]
async fn test_recipe_rejects_unknown_ingredient() {
    let env = env();
    let result = env
        .recipes
        .create(
            env.org,
            CreateRecipeInput {
                name: "Ghost blend".to_string(),
                items: vec![MixItem {
                    ingredient_id: Uuid::new_v4(),
                    percent: 100.0,
                }],
                labor_cost: 0.0,
                format_prices: vec![],
            },
        )
        .await;
    assert!(result.is_err());
}

/// Only bulk items can appear in a composition
#[tokio::test]
async fn test_recipe_rejects_non_bulk_ingredient() {
    let env = env();
    let pouch = stocked_item(
        &env,
        "Kraft pouch",
        StockCategory::Packaging,
        Some("sachet"),
        Some(100),
        50.0,
        0.2,
    )
    .await;

    let result = env
        .recipes
        .create(
            env.org,
            CreateRecipeInput {
                name: "Paper blend".to_string(),
                items: vec![MixItem {
                    ingredient_id: pouch,
                    percent: 100.0,
                }],
                labor_cost: 0.0,
                format_prices: vec![],
            },
        )
        .await;
    assert!(result.is_err());
}

/// A composition not summing to 100 saves, with a warning
#[tokio::test]
async fn test_percent_sum_off_is_a_warning_not_an_error() {
    let env = env();
    let (tea, _) = seed_ingredients(&env).await;

    let recipe = env
        .recipes
        .create(
            env.org,
            CreateRecipeInput {
                name: "Mid-edit blend".to_string(),
                items: vec![MixItem {
                    ingredient_id: tea,
                    percent: 90.0,
                }],
                labor_cost: 0.0,
                format_prices: vec![],
            },
        )
        .await
        .unwrap();

    assert_eq!(recipe.warnings.len(), 1);
    assert_eq!(recipe.warnings[0].code, WarningCode::PercentSumOff);
    assert!(env.recipes.get(env.org, recipe.value.id).await.is_ok());
}

/// The cached cost is stale by design until refreshed
#[tokio::test]
async fn test_refresh_cost_follows_wac_changes() {
    let env = env();
    let (tea, flower) = seed_ingredients(&env).await;
    let recipe = env
        .recipes
        .create(
            env.org,
            CreateRecipeInput {
                name: "Jasmine Sencha".to_string(),
                items: blend(tea, flower),
                labor_cost: 0.5,
                format_prices: vec![],
            },
        )
        .await
        .unwrap()
        .value;

    // A pricier restock moves the tea WAC from 0.01 to 0.02
    env.stock
        .record_movement(
            env.org,
            RecordMovementInput {
                item_id: tea,
                kind: MovementKind::Purchase,
                quantity: 1000.0,
                unit_price: Some(30.0),
                reason: None,
                order_id: None,
            },
        )
        .await
        .unwrap();

    let stale = env.recipes.get(env.org, recipe.id).await.unwrap();
    assert!((stale.mix_cost_per_gram - 0.014).abs() < EPS);

    let refreshed = env.recipes.refresh_cost(env.org, recipe.id).await.unwrap();
    // 0.9 * 0.02 + 0.1 * 0.05
    assert!((refreshed.mix_cost_per_gram - 0.023).abs() < EPS);
}

/// Per-format costing resolves the pouch and prices the unit
#[tokio::test]
async fn test_format_costing_with_matched_pouch() {
    let env = env();
    let (tea, flower) = seed_ingredients(&env).await;
    stocked_item(
        &env,
        "Kraft pouch",
        StockCategory::Packaging,
        Some("sachet"),
        Some(100),
        50.0,
        0.2,
    )
    .await;
    let recipe = env
        .recipes
        .create(
            env.org,
            CreateRecipeInput {
                name: "Jasmine Sencha".to_string(),
                items: blend(tea, flower),
                labor_cost: 0.5,
                format_prices: vec![FormatPrice {
                    format_g: 100,
                    price: 12.0,
                }],
            },
        )
        .await
        .unwrap()
        .value;

    let costing = env
        .recipes
        .format_costing(env.org, recipe.id, 100)
        .await
        .unwrap();

    assert!(costing.warnings.is_empty());
    let costing = costing.value;
    assert_eq!(costing.packaging_method, MatchMethod::ExactCapacity);
    assert!((costing.packaging_cost - 0.2).abs() < EPS);
    // 0.014 * 100 + 0.2 + 0.5
    assert!((costing.unit_cost - 2.1).abs() < EPS);
    assert_eq!(costing.sale_price, Some(12.0));
    let margin = costing.margin.unwrap();
    assert!((margin.amount - 9.9).abs() < EPS);
    assert!((margin.percent - 82.5).abs() < EPS);
}

/// No pouch for the format: zero packaging cost plus a warning
#[tokio::test]
async fn test_format_costing_unmatched_pouch_degrades() {
    let env = env();
    let (tea, flower) = seed_ingredients(&env).await;
    let recipe = env
        .recipes
        .create(
            env.org,
            CreateRecipeInput {
                name: "Jasmine Sencha".to_string(),
                items: blend(tea, flower),
                labor_cost: 0.5,
                format_prices: vec![],
            },
        )
        .await
        .unwrap()
        .value;

    let costing = env
        .recipes
        .format_costing(env.org, recipe.id, 250)
        .await
        .unwrap();

    assert!(costing
        .warnings
        .iter()
        .any(|w| w.code == WarningCode::PackagingUnmatched));
    let costing = costing.value;
    assert_eq!(costing.packaging_method, MatchMethod::None);
    assert_eq!(costing.packaging_cost, 0.0);
    // 0.014 * 250 + 0.5, no pouch
    assert!((costing.unit_cost - 4.0).abs() < EPS);
    assert_eq!(costing.sale_price, None);
}

/// Pack cost rolls up cached recipe numbers plus pack-level packaging
#[tokio::test]
async fn test_pack_cached_cost_and_margin() {
    let env = env();
    let (tea, flower) = seed_ingredients(&env).await;
    stocked_item(
        &env,
        "Kraft pouch",
        StockCategory::Packaging,
        Some("sachet"),
        Some(100),
        50.0,
        0.2,
    )
    .await;
    let box_item = stocked_item(
        &env,
        "Gift box",
        StockCategory::Packaging,
        Some("box"),
        None,
        10.0,
        1.5,
    )
    .await;
    let recipe = env
        .recipes
        .create(
            env.org,
            CreateRecipeInput {
                name: "Jasmine Sencha".to_string(),
                items: blend(tea, flower),
                labor_cost: 0.5,
                format_prices: vec![],
            },
        )
        .await
        .unwrap()
        .value;

    let pack = env
        .packs
        .create(
            env.org,
            CreatePackInput {
                name: "Duo".to_string(),
                recipe_lines: vec![PackRecipeLine {
                    recipe_id: recipe.id,
                    quantity: 2,
                    format_g: 100,
                }],
                packaging_lines: vec![PackPackagingLine {
                    item_id: box_item,
                    quantity: 1,
                }],
                sale_price: 10.0,
            },
        )
        .await
        .unwrap();

    assert!(pack.warnings.is_empty());
    // 2 * (0.014 * 100 + 0.2 + 0.5) + 1.5
    assert!((pack.value.cost - 5.7).abs() < EPS);
    assert!((pack.value.margin_percent - 43.0).abs() < EPS);
}

/// A deleted packaging item degrades the pack cost with an orphan warning
#[tokio::test]
async fn test_pack_refresh_with_deleted_packaging() {
    let env = env();
    let (tea, flower) = seed_ingredients(&env).await;
    stocked_item(
        &env,
        "Kraft pouch",
        StockCategory::Packaging,
        Some("sachet"),
        Some(100),
        50.0,
        0.2,
    )
    .await;
    let box_item = stocked_item(
        &env,
        "Gift box",
        StockCategory::Packaging,
        Some("box"),
        None,
        10.0,
        1.5,
    )
    .await;
    let recipe = env
        .recipes
        .create(
            env.org,
            CreateRecipeInput {
                name: "Jasmine Sencha".to_string(),
                items: blend(tea, flower),
                labor_cost: 0.5,
                format_prices: vec![],
            },
        )
        .await
        .unwrap()
        .value;
    let pack = env
        .packs
        .create(
            env.org,
            CreatePackInput {
                name: "Duo".to_string(),
                recipe_lines: vec![PackRecipeLine {
                    recipe_id: recipe.id,
                    quantity: 2,
                    format_g: 100,
                }],
                packaging_lines: vec![PackPackagingLine {
                    item_id: box_item,
                    quantity: 1,
                }],
                sale_price: 10.0,
            },
        )
        .await
        .unwrap()
        .value;

    env.stock.delete_item(env.org, box_item).await.unwrap();

    let refreshed = env.packs.refresh_cost(env.org, pack.id).await.unwrap();
    assert!(refreshed
        .warnings
        .iter()
        .any(|w| w.code == WarningCode::OrphanReference));
    // Box priced as 0: 5.7 - 1.5
    assert!((refreshed.value.cost - 4.2).abs() < EPS);
}

/// Empty packs are rejected
#[tokio::test]
async fn test_pack_requires_at_least_one_line() {
    let env = env();
    let result = env
        .packs
        .create(
            env.org,
            CreatePackInput {
                name: "Empty".to_string(),
                recipe_lines: vec![],
                packaging_lines: vec![],
                sale_price: 5.0,
            },
        )
        .await;
    assert!(result.is_err());
}

/// Composition updates recompute the cached cost
#[tokio::test]
async fn test_recipe_update_recomputes_cache() {
    let env = env();
    let (tea, flower) = seed_ingredients(&env).await;
    let recipe = env
        .recipes
        .create(
            env.org,
            CreateRecipeInput {
                name: "Jasmine Sencha".to_string(),
                items: blend(tea, flower),
                labor_cost: 0.5,
                format_prices: vec![],
            },
        )
        .await
        .unwrap()
        .value;

    let updated = env
        .recipes
        .update(
            env.org,
            recipe.id,
            UpdateRecipeInput {
                name: None,
                items: Some(vec![
                    MixItem {
                        ingredient_id: tea,
                        percent: 50.0,
                    },
                    MixItem {
                        ingredient_id: flower,
                        percent: 50.0,
                    },
                ]),
                labor_cost: None,
                format_prices: None,
            },
        )
        .await
        .unwrap();

    // 0.5 * 0.01 + 0.5 * 0.05
    assert!((updated.value.mix_cost_per_gram - 0.03).abs() < EPS);
}

/// Deleting referenced entities leaves orphans that the scan reports
#[tokio::test]
async fn test_integrity_scan_reports_orphans() {
    let env = env();
    let (tea, flower) = seed_ingredients(&env).await;
    env.recipes
        .create(
            env.org,
            CreateRecipeInput {
                name: "Jasmine Sencha".to_string(),
                items: blend(tea, flower),
                labor_cost: 0.5,
                format_prices: vec![],
            },
        )
        .await
        .unwrap();
    let plain = env
        .recipes
        .create(
            env.org,
            CreateRecipeInput {
                name: "Plain Sencha".to_string(),
                items: vec![MixItem {
                    ingredient_id: tea,
                    percent: 100.0,
                }],
                labor_cost: 0.0,
                format_prices: vec![],
            },
        )
        .await
        .unwrap()
        .value;
    env.packs
        .create(
            env.org,
            CreatePackInput {
                name: "Solo".to_string(),
                recipe_lines: vec![PackRecipeLine {
                    recipe_id: plain.id,
                    quantity: 1,
                    format_g: 100,
                }],
                packaging_lines: vec![],
                sale_price: 10.0,
            },
        )
        .await
        .unwrap();

    // Deleting the flowers orphans the first recipe; deleting the plain
    // recipe orphans the pack
    env.stock.delete_item(env.org, flower).await.unwrap();
    env.recipes.delete(env.org, plain.id).await.unwrap();

    let warnings = env.integrity.scan(env.org).await.unwrap();
    assert!(warnings
        .iter()
        .any(|w| w.code == WarningCode::OrphanReference && w.entity == "recipe"));
    assert!(warnings
        .iter()
        .any(|w| w.code == WarningCode::OrphanReference && w.entity == "pack"));
    // The flowers' purchase movement now dangles too
    assert!(warnings
        .iter()
        .any(|w| w.code == WarningCode::OrphanReference && w.entity == "stock_movement"));
}
