//! Domain models for the Tea Business Management Platform

mod order;
mod pack;
mod recipe;
mod settings;
mod stock;

pub use order::*;
pub use pack::*;
pub use recipe::*;
pub use settings::*;
pub use stock::*;
