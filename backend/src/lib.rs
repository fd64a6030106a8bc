//! Tea Business Management Platform - Costing & Inventory Valuation Engine
//!
//! Tracks ingredient and packaging stock under a moving weighted-average
//! cost model, rolls raw-material costs up through recipes and packs,
//! derives margins and prices, and freezes per-line unit costs onto orders
//! at confirmation so later cost changes never rewrite history.
//!
//! Persistence, authentication, UI, import/export, and HTTP routing are
//! external collaborators reached through the contracts in [`store`] and
//! [`external`].

pub mod config;
pub mod error;
pub mod external;
pub mod services;
pub mod store;

pub use config::Config;
