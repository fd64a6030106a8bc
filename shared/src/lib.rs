//! Shared types and models for the Tea Business Management Platform
//!
//! This crate contains the domain entities used by the costing engine,
//! the import/export tooling, and other components of the system.

pub mod models;
pub mod types;
pub mod units;
pub mod validation;

pub use models::*;
pub use types::*;
pub use units::*;
pub use validation::*;
