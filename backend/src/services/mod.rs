//! Business logic services for the Tea Business Management Platform

pub mod costing;
pub mod integrity;
pub mod order;
pub mod pack;
pub mod packaging;
pub mod pricing;
pub mod recipe;
pub mod settings;
pub mod stock;

pub use integrity::IntegrityService;
pub use order::OrderService;
pub use pack::PackService;
pub use recipe::RecipeService;
pub use settings::SettingsService;
pub use stock::StockService;
