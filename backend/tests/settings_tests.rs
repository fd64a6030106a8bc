//! Per-organization settings tests

use std::sync::Arc;

use shared::OrgId;
use tea_business_backend::config::EngineConfig;
use tea_business_backend::services::settings::{SettingsService, UpdateSettingsInput};
use tea_business_backend::store::{MemoryStore, Store};

fn service() -> SettingsService {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    SettingsService::new(store, EngineConfig::default())
}

/// Unstored organizations read configuration defaults
#[tokio::test]
async fn test_defaults_before_first_write() {
    let service = service();
    let org = OrgId::new();

    let settings = service.get(org).await.unwrap();

    assert_eq!(settings.org_id, org);
    assert_eq!(settings.platform_fee_percent, 0.0);
    assert_eq!(settings.vat_percent, 20.0);
    assert_eq!(settings.default_shipping_cost, 0.0);
}

/// Partial updates persist and later reads return them
#[tokio::test]
async fn test_update_persists() {
    let service = service();
    let org = OrgId::new();

    service
        .update(
            org,
            UpdateSettingsInput {
                platform_fee_percent: Some(12.5),
                vat_percent: None,
                default_shipping_cost: Some(4.9),
            },
        )
        .await
        .unwrap();

    let settings = service.get(org).await.unwrap();
    assert_eq!(settings.platform_fee_percent, 12.5);
    assert_eq!(settings.vat_percent, 20.0);
    assert_eq!(settings.default_shipping_cost, 4.9);
}

/// Percentages outside 0..=100 are rejected
#[tokio::test]
async fn test_update_validates_percentages() {
    let service = service();
    let org = OrgId::new();

    let result = service
        .update(
            org,
            UpdateSettingsInput {
                platform_fee_percent: Some(120.0),
                vat_percent: None,
                default_shipping_cost: None,
            },
        )
        .await;
    assert!(result.is_err());

    let result = service
        .update(
            org,
            UpdateSettingsInput {
                platform_fee_percent: None,
                vat_percent: Some(-1.0),
                default_shipping_cost: None,
            },
        )
        .await;
    assert!(result.is_err());
}

/// Settings are org-scoped singletons
#[tokio::test]
async fn test_settings_are_per_org() {
    let service = service();
    let org_a = OrgId::new();
    let org_b = OrgId::new();

    service
        .update(
            org_a,
            UpdateSettingsInput {
                platform_fee_percent: Some(15.0),
                vat_percent: None,
                default_shipping_cost: None,
            },
        )
        .await
        .unwrap();

    let settings_b = service.get(org_b).await.unwrap();
    assert_eq!(settings_b.platform_fee_percent, 0.0);
}
