//! Per-organization settings provider
//!
//! Flat-rate fee and VAT percentages consumed by order-level aggregation.
//! Falls back to configuration defaults when an organization has stored
//! nothing yet.

use std::sync::Arc;

use serde::Deserialize;

use shared::{validate_percent, validate_unit_price, OrgId, OrgSettings};

use crate::config::EngineConfig;
use crate::error::{AppError, AppResult};
use crate::store::{collections, encode, load_opt, Store};

/// Settings service
#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn Store>,
    defaults: EngineConfig,
}

/// Input for updating settings
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsInput {
    pub platform_fee_percent: Option<f64>,
    pub vat_percent: Option<f64>,
    pub default_shipping_cost: Option<f64>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn Store>, defaults: EngineConfig) -> Self {
        Self { store, defaults }
    }

    pub async fn get(&self, org_id: OrgId) -> AppResult<OrgSettings> {
        // Settings are a per-org singleton keyed by the org id itself
        let stored: Option<OrgSettings> = load_opt(
            self.store.as_ref(),
            org_id,
            collections::SETTINGS,
            org_id.0,
        )
        .await?;
        Ok(stored.unwrap_or_else(|| OrgSettings {
            org_id,
            platform_fee_percent: self.defaults.default_platform_fee_percent,
            vat_percent: self.defaults.default_vat_percent,
            default_shipping_cost: 0.0,
        }))
    }

    pub async fn update(
        &self,
        org_id: OrgId,
        input: UpdateSettingsInput,
    ) -> AppResult<OrgSettings> {
        let mut settings = self.get(org_id).await?;
        if let Some(fee) = input.platform_fee_percent {
            validate_percent(fee)
                .map_err(|msg| AppError::validation("platform_fee_percent", msg))?;
            settings.platform_fee_percent = fee;
        }
        if let Some(vat) = input.vat_percent {
            validate_percent(vat).map_err(|msg| AppError::validation("vat_percent", msg))?;
            settings.vat_percent = vat;
        }
        if let Some(shipping) = input.default_shipping_cost {
            validate_unit_price(shipping)
                .map_err(|msg| AppError::validation("default_shipping_cost", msg))?;
            settings.default_shipping_cost = shipping;
        }

        self.store
            .upsert(
                org_id,
                collections::SETTINGS,
                org_id.0,
                encode(&settings, collections::SETTINGS)?,
            )
            .await?;
        Ok(settings)
    }
}
